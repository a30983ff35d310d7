//! Primer core selection and per-primer quality metrics.

use crate::{
    iupac_code::reverse_complement,
    structure::{self, StructureHit},
    thermo::{self, ReactionConditions},
};
use primerkit_protocol::{PrimerPairRecord, PrimerRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Core length used when no candidate yields a usable Tm.
pub const DEFAULT_CORE_LENGTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Anneals to the bottom strand at the template start; the core reads
    /// like the template.
    FromStart,
    /// Anneals to the top strand at the template end; the core is the
    /// reverse complement of the template tail.
    FromEnd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreParameters {
    pub target_tm: f64,
    pub tolerance: f64,
    pub min_length: usize,
    pub max_length: usize,
    pub conditions: ReactionConditions,
}

impl Default for CoreParameters {
    fn default() -> Self {
        Self {
            target_tm: 60.0,
            tolerance: 2.5,
            min_length: 18,
            max_length: 40,
            conditions: ReactionConditions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimerCore {
    pub sequence: String,
    pub length: usize,
    pub melting_temp: f64,
}

impl PrimerCore {
    fn new(bases: Vec<u8>, conditions: &ReactionConditions) -> Self {
        let melting_temp = thermo::melting_temp(&bases, conditions);
        Self {
            length: bases.len(),
            sequence: String::from_utf8_lossy(&bases).to_string(),
            melting_temp,
        }
    }

    fn has_gc_clamp(&self) -> bool {
        matches!(self.sequence.as_bytes().last(), Some(b'G' | b'C'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreFallback {
    /// No length reached the tolerance; the closest Tm was taken.
    ClosestTm,
    /// No length gave a finite Tm; the default length was taken.
    DefaultLength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSelection {
    pub core: PrimerCore,
    pub within_tolerance: bool,
    pub fallback: Option<CoreFallback>,
}

fn candidate(template: &[u8], direction: Direction, length: usize) -> Vec<u8> {
    match direction {
        Direction::FromStart => template[..length].to_vec(),
        Direction::FromEnd => reverse_complement(&template[template.len() - length..]),
    }
}

/// Picks the core for one primer end of `template`.
pub fn select_core(template: &[u8], direction: Direction, params: &CoreParameters) -> CoreSelection {
    let min_length = params.min_length.max(1);
    let max_length = params.max_length.min(template.len());
    let candidates: Vec<PrimerCore> = (min_length..=max_length)
        .map(|length| PrimerCore::new(candidate(template, direction, length), &params.conditions))
        .filter(|core| core.melting_temp.is_finite())
        .collect();
    let delta = |core: &PrimerCore| (core.melting_temp - params.target_tm).abs();

    let in_tolerance = candidates
        .iter()
        .filter(|core| delta(core) <= params.tolerance)
        .min_by(|a, b| {
            b.has_gc_clamp()
                .cmp(&a.has_gc_clamp())
                .then_with(|| delta(a).total_cmp(&delta(b)))
                .then_with(|| a.length.cmp(&b.length))
        });
    if let Some(core) = in_tolerance {
        return CoreSelection {
            core: core.clone(),
            within_tolerance: true,
            fallback: None,
        };
    }

    let closest = candidates.iter().min_by(|a, b| match delta(a).total_cmp(&delta(b)) {
        Ordering::Equal => a.length.cmp(&b.length),
        other => other,
    });
    if let Some(core) = closest {
        return CoreSelection {
            core: core.clone(),
            within_tolerance: false,
            fallback: Some(CoreFallback::ClosestTm),
        };
    }

    let length = DEFAULT_CORE_LENGTH.min(template.len());
    CoreSelection {
        core: PrimerCore::new(candidate(template, direction, length), &params.conditions),
        within_tolerance: false,
        fallback: Some(CoreFallback::DefaultLength),
    }
}

/// A complete primer: 5' tail followed by the annealing core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primer {
    pub name: String,
    pub tail: String,
    pub selection: CoreSelection,
    pub sequence: String,
    pub full_melting_temp: f64,
    pub gc_percent: f64,
    pub hairpin: Option<StructureHit>,
    pub self_dimer: Option<StructureHit>,
}

impl Primer {
    pub fn new(name: &str, tail: &[u8], selection: CoreSelection, conditions: &ReactionConditions) -> Self {
        let mut bases = tail.to_vec();
        bases.extend_from_slice(selection.core.sequence.as_bytes());
        Self {
            name: name.to_string(),
            tail: String::from_utf8_lossy(tail).to_string(),
            full_melting_temp: thermo::melting_temp(&bases, conditions),
            gc_percent: thermo::gc_percent(&bases),
            hairpin: structure::hairpin(&bases),
            self_dimer: structure::self_dimer(&bases),
            sequence: String::from_utf8_lossy(&bases).to_string(),
            selection,
        }
    }

    pub fn core(&self) -> &PrimerCore {
        &self.selection.core
    }

    pub fn to_record(&self) -> PrimerRecord {
        PrimerRecord {
            name: self.name.clone(),
            sequence: self.sequence.clone(),
            tail: self.tail.clone(),
            core: self.core().sequence.clone(),
            core_melting_temp: self.core().melting_temp,
            full_melting_temp: self.full_melting_temp,
            gc_percent: self.gc_percent,
            core_within_tolerance: self.selection.within_tolerance,
            hairpin_delta_g: self.hairpin.as_ref().map(|h| h.delta_g),
            self_dimer_delta_g: self.self_dimer.as_ref().map(|h| h.delta_g),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimerPair {
    pub insert: String,
    pub forward: Primer,
    pub reverse: Primer,
    pub cross_dimer: Option<StructureHit>,
}

impl PrimerPair {
    pub fn new(insert: &str, forward: Primer, reverse: Primer) -> Self {
        let cross_dimer = structure::cross_dimer(forward.sequence.as_bytes(), reverse.sequence.as_bytes());
        Self {
            insert: insert.to_string(),
            forward,
            reverse,
            cross_dimer,
        }
    }

    pub fn to_record(&self) -> PrimerPairRecord {
        PrimerPairRecord {
            insert: self.insert.clone(),
            forward: self.forward.to_record(),
            reverse: self.reverse.to_record(),
            cross_dimer_delta_g: self.cross_dimer.as_ref().map(|h| h.delta_g),
        }
    }
}

/// Stand-alone oligo summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OligoAnalysis {
    pub sequence: String,
    pub length: usize,
    pub melting_temp: f64,
    pub gc_percent: f64,
    pub delta_g: f64,
    pub hairpin: Option<StructureHit>,
    pub self_dimer: Option<StructureHit>,
}

pub fn analyze_oligo(seq: &[u8], conditions: &ReactionConditions) -> OligoAnalysis {
    OligoAnalysis {
        sequence: String::from_utf8_lossy(seq).to_string(),
        length: seq.len(),
        melting_temp: thermo::melting_temp(seq, conditions),
        gc_percent: thermo::gc_percent(seq),
        delta_g: thermo::duplex_free_energy(seq),
        hairpin: structure::hairpin(seq),
        self_dimer: structure::self_dimer(seq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSERT_29: &[u8] = b"ATGCGTAGCTAGCTAGCTAGCTAGCTAGC";

    #[test]
    fn test_short_insert_core() {
        let params = CoreParameters::default();
        let selection = select_core(INSERT_29, Direction::FromStart, &params);
        let core = &selection.core;
        assert!(!core.sequence.is_empty());
        assert!((18..=29).contains(&core.length));
        assert!(INSERT_29.starts_with(core.sequence.as_bytes()));
        let best_delta = (18..=29)
            .map(|n| (thermo::melting_temp(&INSERT_29[..n], &params.conditions) - 60.0).abs())
            .fold(f64::INFINITY, f64::min);
        if selection.within_tolerance {
            assert!((core.melting_temp - 60.0).abs() <= params.tolerance);
        } else {
            assert_eq!(selection.fallback, Some(CoreFallback::ClosestTm));
            assert_eq!((core.melting_temp - 60.0).abs(), best_delta);
        }
    }

    #[test]
    fn test_from_end_is_reverse_complement_of_tail() {
        let params = CoreParameters::default();
        let selection = select_core(INSERT_29, Direction::FromEnd, &params);
        let core = selection.core.sequence.as_bytes();
        let tail = &INSERT_29[INSERT_29.len() - core.len()..];
        assert_eq!(core, reverse_complement(tail).as_slice());
    }

    #[test]
    fn test_prefers_gc_clamp() {
        // Wide tolerance: every length qualifies, so the clamp decides.
        let params = CoreParameters {
            tolerance: 100.0,
            min_length: 18,
            max_length: 22,
            ..Default::default()
        };
        let template = b"ATGAAAGCTTTAGCATTAGATTTAAAT";
        let selection = select_core(template, Direction::FromStart, &params);
        assert!(selection.within_tolerance);
        assert!(selection.core.has_gc_clamp());
        assert_eq!(selection.core.length, 19);
    }

    #[test]
    fn test_unreachable_target_takes_closest() {
        let params = CoreParameters {
            target_tm: 95.0,
            ..Default::default()
        };
        let template = "ATGC".repeat(15);
        let selection = select_core(template.as_bytes(), Direction::FromStart, &params);
        assert!(!selection.within_tolerance);
        assert_eq!(selection.fallback, Some(CoreFallback::ClosestTm));
        let highest = (18..=40)
            .map(|n| thermo::melting_temp(&template.as_bytes()[..n], &params.conditions))
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(selection.core.melting_temp, highest);
    }

    #[test]
    fn test_degenerate_template_uses_default_length() {
        let template = "N".repeat(30);
        let selection = select_core(template.as_bytes(), Direction::FromStart, &CoreParameters::default());
        assert_eq!(selection.fallback, Some(CoreFallback::DefaultLength));
        assert_eq!(selection.core.length, DEFAULT_CORE_LENGTH);
        let short = select_core(b"NNNN", Direction::FromEnd, &CoreParameters::default());
        assert_eq!(short.core.length, 4);
        let empty = select_core(b"", Direction::FromStart, &CoreParameters::default());
        assert!(empty.core.sequence.is_empty());
    }

    #[test]
    fn test_primer_pair_record() {
        let params = CoreParameters::default();
        let conditions = params.conditions;
        let forward = Primer::new(
            "insert_fwd",
            b"GGATCCAAA",
            select_core(INSERT_29, Direction::FromStart, &params),
            &conditions,
        );
        assert!(forward.sequence.starts_with("GGATCCAAA"));
        assert_eq!(forward.sequence.len(), 9 + forward.core().length);
        let reverse = Primer::new(
            "insert_rev",
            b"",
            select_core(INSERT_29, Direction::FromEnd, &params),
            &conditions,
        );
        let pair = PrimerPair::new("insert", forward, reverse);
        let record = pair.to_record();
        assert_eq!(record.forward.tail, "GGATCCAAA");
        assert_eq!(record.reverse.tail, "");
        assert_eq!(record.forward.core.len() + 9, record.forward.sequence.len());
        assert_eq!(
            record.cross_dimer_delta_g,
            pair.cross_dimer.as_ref().map(|h| h.delta_g)
        );
    }

    #[test]
    fn test_analyze_oligo() {
        let analysis = analyze_oligo(b"GTAAAACGACGGCCAGT", &ReactionConditions::default());
        assert_eq!(analysis.length, 17);
        assert!(analysis.melting_temp > 40.0 && analysis.melting_temp < 65.0);
        assert!(analysis.delta_g < 0.0);
    }
}
