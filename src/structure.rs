//! Hairpin and primer-dimer detection by diagonal complementarity scan.
//!
//! The first strand is laid against the reverse complement of the second at
//! every relative offset. On each diagonal, identical unambiguous symbols are
//! Watson-Crick pairs between the two strands; uninterrupted stretches of
//! pairs are candidate duplexes, scored with the nearest-neighbor ΔG.

use crate::{
    iupac_code::{IupacCode, reverse_complement},
    thermo::duplex_free_energy,
};
use serde::{Deserialize, Serialize};

pub const MIN_DIMER_RUN: usize = 3;
pub const MIN_HAIRPIN_STEM: usize = 4;
pub const MIN_HAIRPIN_LOOP: usize = 3;

/// Runs ending within this many bases of a 3' end count as 3'-proximal.
pub const THREE_PRIME_WINDOW: usize = 5;

/// Runs within this ΔG of each other are ties; 3'-proximal runs win ties.
const DELTA_G_TIE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureHit {
    /// Paired stretch on the first strand, 5'→3'.
    pub motif_sequence: String,
    pub delta_g: f64,
    pub touches_three_prime: bool,
    /// Offset of the stretch on the first strand.
    pub position: usize,
    /// Offset of the complementary stretch on the second strand.
    pub partner_position: usize,
}

impl StructureHit {
    pub fn len(&self) -> usize {
        self.motif_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motif_sequence.is_empty()
    }

    fn is_better_than(&self, other: &StructureHit) -> bool {
        if (self.delta_g - other.delta_g).abs() <= DELTA_G_TIE {
            if self.touches_three_prime != other.touches_three_prime {
                return self.touches_three_prime;
            }
        }
        self.delta_g < other.delta_g
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    pub min_run: usize,
    /// Minimum unpaired loop; only meaningful when both strands are the same
    /// molecule (hairpins).
    pub min_loop: Option<usize>,
}

/// Lowest-ΔG complementary run between `first` and `second`, or `None` when
/// no run reaches `params.min_run`.
pub fn scan(first: &[u8], second: &[u8], params: ScanParameters) -> Option<StructureHit> {
    if first.is_empty() || second.is_empty() || params.min_run == 0 {
        return None;
    }
    let second_rc = reverse_complement(second);
    let len1 = first.len() as isize;
    let len2 = second_rc.len() as isize;
    let mut best: Option<StructureHit> = None;

    for diagonal in -(len2 - 1)..len1 {
        let i_from = diagonal.max(0);
        let i_to = len1.min(len2 + diagonal);
        let mut run_start: Option<isize> = None;
        for i in i_from..=i_to {
            let pairs = i < i_to && {
                let j = i - diagonal;
                let base = first[i as usize];
                let paired = IupacCode::is_unambiguous(base) && base == second_rc[j as usize];
                paired && loop_allows(params, i, j, len2)
            };
            match (pairs, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    if let Some(hit) =
                        evaluate_run(first, second.len(), start, i - 1, diagonal, params)
                    {
                        if best.as_ref().is_none_or(|b| hit.is_better_than(b)) {
                            best = Some(hit);
                        }
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
    }
    best
}

/// In a hairpin, position `i` pairs with original position `len-1-j`; that
/// partner must lie downstream with at least `min_loop` bases in between.
#[inline(always)]
fn loop_allows(params: ScanParameters, i: isize, j: isize, len: isize) -> bool {
    match params.min_loop {
        Some(min_loop) => {
            let partner = len - 1 - j;
            partner - i - 1 >= min_loop as isize
        }
        None => true,
    }
}

fn evaluate_run(
    first: &[u8],
    second_len: usize,
    start: isize,
    end: isize,
    diagonal: isize,
    params: ScanParameters,
) -> Option<StructureHit> {
    let length = (end - start + 1) as usize;
    if length < params.min_run {
        return None;
    }
    let motif = &first[start as usize..=end as usize];
    let delta_g = duplex_free_energy(motif);
    if delta_g.is_nan() {
        return None;
    }
    // On the reverse complement, j==0 is the 3' end of the second strand.
    let j_start = (start - diagonal) as usize;
    let j_end = (end - diagonal) as usize;
    let first_tail = first.len().saturating_sub(THREE_PRIME_WINDOW);
    let touches_three_prime = end as usize >= first_tail || j_start < THREE_PRIME_WINDOW;
    Some(StructureHit {
        motif_sequence: String::from_utf8_lossy(motif).to_string(),
        delta_g,
        touches_three_prime,
        position: start as usize,
        partner_position: second_len - 1 - j_end,
    })
}

pub fn hairpin(seq: &[u8]) -> Option<StructureHit> {
    scan(
        seq,
        seq,
        ScanParameters {
            min_run: MIN_HAIRPIN_STEM,
            min_loop: Some(MIN_HAIRPIN_LOOP),
        },
    )
}

pub fn self_dimer(seq: &[u8]) -> Option<StructureHit> {
    cross_dimer(seq, seq)
}

pub fn cross_dimer(first: &[u8], second: &[u8]) -> Option<StructureHit> {
    scan(
        first,
        second,
        ScanParameters {
            min_run: MIN_DIMER_RUN,
            min_loop: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_structure_is_none() {
        assert_eq!(self_dimer(b"AAAAAAAAAAAA"), None);
        assert_eq!(hairpin(b"AAAAAAAAAAAA"), None);
        assert_eq!(cross_dimer(b"AAAAAA", b"CCCCCC"), None);
        assert_eq!(self_dimer(b""), None);
    }

    #[test]
    fn test_hairpin_stem_and_loop() {
        let hit = hairpin(b"GGGGAAAACCCC").unwrap();
        assert_eq!(hit.motif_sequence, "GGGG");
        assert_eq!(hit.position, 0);
        assert_eq!(hit.partner_position, 8);
        assert!(hit.touches_three_prime);
        assert!(hit.delta_g < 0.0);
    }

    #[test]
    fn test_hairpin_requires_loop() {
        assert_eq!(hairpin(b"GGGGCCCC"), None);
        let hit = hairpin(b"GGGGTTTCCCC").unwrap();
        assert_eq!(hit.len(), 4);
        assert_eq!(hit.partner_position, 7);
    }

    #[test]
    fn test_self_dimer_palindrome() {
        let hit = self_dimer(b"TTGAATTCTT").unwrap();
        assert!(hit.motif_sequence.contains("GAATTC"));
        assert!(hit.touches_three_prime);
    }

    #[test]
    fn test_cross_dimer_partner_position() {
        let hit = cross_dimer(b"CCCCGCGCTTT", b"TTTTTTGCGCG").unwrap();
        assert_eq!(hit.motif_sequence, "CGCGC");
        assert_eq!(hit.position, 3);
        assert_eq!(hit.partner_position, 6);
    }

    #[test]
    fn test_tie_prefers_three_prime() {
        let a = StructureHit {
            motif_sequence: "GCG".to_string(),
            delta_g: -3.00,
            touches_three_prime: false,
            position: 0,
            partner_position: 0,
        };
        let b = StructureHit {
            delta_g: -2.95,
            touches_three_prime: true,
            ..a.clone()
        };
        assert!(b.is_better_than(&a));
        assert!(!a.is_better_than(&b));
    }
}
