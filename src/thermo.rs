//! Nearest-neighbor duplex thermodynamics (SantaLucia 1998 unified
//! parameters) with the Owczarzy 2004 monovalent salt correction.

use serde::{Deserialize, Serialize};

/// Gas constant in cal/(K·mol).
const GAS_CONSTANT: f64 = 1.987;
const KELVIN: f64 = 273.15;
/// 37 °C, the reference temperature for structure free energies.
pub const STRUCTURE_TEMPERATURE_K: f64 = 310.15;

/// Helix initiation per terminal pair, (ΔH kcal/mol, ΔS cal/(K·mol)).
const INIT_TERMINAL_GC: (f64, f64) = (0.1, -2.8);
const INIT_TERMINAL_AT: (f64, f64) = (2.3, 4.1);

/// Mg2+ is folded into a monovalent equivalent as Na + 120·√Mg (mM).
const MG_EQUIVALENCE_FACTOR: f64 = 120.0;

/// ΔH (kcal/mol) and ΔS (cal/(K·mol)) for one 5'→3' dinucleotide step.
#[inline(always)]
fn nearest_neighbor(first: u8, second: u8) -> Option<(f64, f64)> {
    let ret = match (first, second) {
        (b'A', b'A') | (b'T', b'T') => (-7.9, -22.2),
        (b'A', b'T') => (-7.2, -20.4),
        (b'T', b'A') => (-7.2, -21.3),
        (b'C', b'A') | (b'T', b'G') => (-8.5, -22.7),
        (b'G', b'T') | (b'A', b'C') => (-8.4, -22.4),
        (b'C', b'T') | (b'A', b'G') => (-7.8, -21.0),
        (b'G', b'A') | (b'T', b'C') => (-8.2, -22.2),
        (b'C', b'G') => (-10.6, -27.2),
        (b'G', b'C') => (-9.8, -24.4),
        (b'G', b'G') | (b'C', b'C') => (-8.0, -19.9),
        _ => return None,
    };
    Some(ret)
}

#[inline(always)]
fn terminal_initiation(base: u8) -> (f64, f64) {
    match base {
        b'G' | b'C' => INIT_TERMINAL_GC,
        _ => INIT_TERMINAL_AT,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionConditions {
    /// Monovalent cation concentration, mM.
    pub na_mm: f64,
    /// Divalent cation concentration, mM.
    pub mg_mm: f64,
    /// Total strand concentration, nM.
    pub primer_nm: f64,
}

impl Default for ReactionConditions {
    fn default() -> Self {
        Self {
            na_mm: 50.0,
            mg_mm: 0.0,
            primer_nm: 500.0,
        }
    }
}

impl ReactionConditions {
    pub fn new(na_mm: f64, mg_mm: f64, primer_nm: f64) -> Self {
        Self {
            na_mm,
            mg_mm,
            primer_nm,
        }
    }

    fn monovalent_equivalent_molar(&self) -> f64 {
        (self.na_mm.max(0.0) + MG_EQUIVALENCE_FACTOR * self.mg_mm.max(0.0).sqrt()) / 1000.0
    }
}

/// Summed nearest-neighbor ΔH/ΔS, or `None` if any step is not in the table.
fn stack_sums(seq: &[u8]) -> Option<(f64, f64)> {
    seq.windows(2).try_fold((0.0, 0.0), |(dh, ds), step| {
        let (h, s) = nearest_neighbor(step[0], step[1])?;
        Some((dh + h, ds + s))
    })
}

pub fn gc_fraction(seq: &[u8]) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let gc = seq
        .iter()
        .filter(|&&c| matches!(c.to_ascii_uppercase(), b'G' | b'C' | b'S'))
        .count();
    gc as f64 / seq.len() as f64
}

pub fn gc_percent(seq: &[u8]) -> f64 {
    gc_fraction(seq) * 100.0
}

/// Melting temperature in °C. NaN for sequences shorter than two bases or
/// containing a dinucleotide outside the table.
pub fn melting_temp(seq: &[u8], conditions: &ReactionConditions) -> f64 {
    if seq.len() < 2 {
        return f64::NAN;
    }
    let Some((mut dh, mut ds)) = stack_sums(seq) else {
        return f64::NAN;
    };
    for terminal in [seq[0], seq[seq.len() - 1]] {
        let (h, s) = terminal_initiation(terminal);
        dh += h;
        ds += s;
    }

    let strand_molar = conditions.primer_nm * 1e-9;
    if strand_molar <= 0.0 {
        return f64::NAN;
    }
    let tm_1m = dh * 1000.0 / (ds + GAS_CONSTANT * (strand_molar / 4.0).ln());

    let salt = conditions.monovalent_equivalent_molar();
    if salt <= 0.0 {
        return tm_1m - KELVIN;
    }
    let ln_salt = salt.ln();
    let inv_tm = 1.0 / tm_1m
        + (4.29 * gc_fraction(seq) - 3.95) * 1e-5 * ln_salt
        + 9.40e-6 * ln_salt * ln_salt;
    1.0 / inv_tm - KELVIN
}

/// Duplex ΔG (kcal/mol) at 37 °C over the literal sequence. Steps with a
/// degenerate base contribute nothing. NaN below two bases.
pub fn duplex_free_energy(seq: &[u8]) -> f64 {
    if seq.len() < 2 {
        return f64::NAN;
    }
    seq.windows(2)
        .filter_map(|step| nearest_neighbor(step[0], step[1]))
        .map(|(dh, ds)| dh - STRUCTURE_TEMPERATURE_K * ds / 1000.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(unit: &str, n: usize) -> Vec<u8> {
        unit.repeat(n).into_bytes()
    }

    #[test]
    fn test_melting_temp_short_is_nan() {
        let c = ReactionConditions::default();
        assert!(melting_temp(b"", &c).is_nan());
        assert!(melting_temp(b"A", &c).is_nan());
        assert!(melting_temp(b"ACGNT", &c).is_nan());
    }

    #[test]
    fn test_melting_temp_plausible_range() {
        let c = ReactionConditions::default();
        let tm = melting_temp(b"AGCGGATAACAATTTCACACAGGA", &c);
        assert!(tm > 50.0 && tm < 70.0, "tm = {tm}");
    }

    #[test]
    fn test_melting_temp_monotonic_in_gc() {
        let c = ReactionConditions::default();
        let at = melting_temp(&repeat("AT", 10), &c);
        let half = melting_temp(&repeat("ATGC", 5), &c);
        let gc = melting_temp(&repeat("GC", 10), &c);
        assert!(at <= half, "{at} > {half}");
        assert!(half <= gc, "{half} > {gc}");
    }

    #[test]
    fn test_melting_temp_rises_with_salt() {
        let seq = b"AGCGGATAACAATTTCACACAGGA";
        let low = melting_temp(seq, &ReactionConditions::new(10.0, 0.0, 500.0));
        let high = melting_temp(seq, &ReactionConditions::new(200.0, 0.0, 500.0));
        let with_mg = melting_temp(seq, &ReactionConditions::new(10.0, 2.0, 500.0));
        assert!(low < high);
        assert!(low < with_mg);
    }

    #[test]
    fn test_duplex_free_energy() {
        assert!(duplex_free_energy(b"G").is_nan());
        let dg = duplex_free_energy(b"GC");
        assert!((dg - (-9.8 + STRUCTURE_TEMPERATURE_K * 24.4 / 1000.0)).abs() < 1e-9);
        assert!(duplex_free_energy(b"GCGCGC") < duplex_free_energy(b"ATATAT"));
        assert!(duplex_free_energy(b"ATATAT") < 0.0);
    }

    #[test]
    fn test_gc_fraction() {
        assert_eq!(gc_fraction(b""), 0.0);
        assert!((gc_fraction(b"AAAGGGTTTCCC") - 0.5).abs() < 1e-12);
        assert!((gc_percent(b"GGCC") - 100.0).abs() < 1e-12);
    }
}
