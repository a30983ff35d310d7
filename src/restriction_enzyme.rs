use crate::{
    circular::window_circular,
    dna_sequence::DNAsequence,
    iupac_code::{IupacCode, pattern_matches, reverse_complement},
};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestrictionEnzyme {
    pub name: String,
    /// Recognition site, IUPAC, 5'→3' on the top strand.
    pub sequence: String,
    pub note: Option<String>,
    /// Top-strand cut, counted from the first base of the site.
    pub cut: isize,
    /// Signed overhang length: positive for 5' overhangs, negative for 3'
    /// overhangs, zero for blunt cutters.
    pub overlap: isize,
    #[serde(skip_serializing, default)]
    is_palindromic: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RestrictionEnzymeSite {
    pub offset: usize,
    pub enzyme: RestrictionEnzyme,
}

impl RestrictionEnzymeSite {
    /// Top-strand cut position, wrapped onto the sequence.
    pub fn cut_position(&self, seq_len: usize) -> usize {
        crate::circular::wrap(seq_len, self.offset as isize + self.enzyme.cut)
    }
}

impl RestrictionEnzyme {
    pub fn new(name: &str, sequence: &str, cut: isize, overlap: isize) -> Result<Self> {
        let mut ret = Self {
            name: name.to_string(),
            sequence: sequence.to_ascii_uppercase(),
            note: None,
            cut,
            overlap,
            is_palindromic: false,
        };
        ret.validate()?;
        ret.check_palindromic();
        Ok(ret)
    }

    pub fn check_palindromic(&mut self) {
        self.is_palindromic = self.sequence.as_bytes() == reverse_complement(self.sequence.as_bytes());
    }

    pub fn is_palindromic(&self) -> bool {
        self.is_palindromic
    }

    pub fn site_len(&self) -> usize {
        self.sequence.len()
    }

    /// Load-time checks: a non-empty IUPAC site and cut/overhang positions
    /// that stay inside it.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("Restriction enzyme without a name"));
        }
        if self.sequence.is_empty() {
            return Err(anyhow!("{}: empty recognition site", self.name));
        }
        if let Some(bad) = self
            .sequence
            .bytes()
            .find(|c| !IupacCode::is_valid_letter(*c))
        {
            return Err(anyhow!(
                "{}: invalid symbol '{}' in recognition site",
                self.name,
                bad as char
            ));
        }
        let len = self.site_len() as isize;
        if self.cut < 0 || self.cut > len {
            return Err(anyhow!(
                "{}: cut offset {} outside recognition site of length {len}",
                self.name,
                self.cut
            ));
        }
        let other_cut = self.cut + self.overlap;
        if other_cut < 0 || other_cut > len {
            return Err(anyhow!(
                "{}: overhang {} reaches outside the recognition site",
                self.name,
                self.overlap
            ));
        }
        Ok(())
    }

    /// Single-stranded overhang left by the cut, `None` for blunt cutters.
    pub fn sticky_end(&self) -> Option<String> {
        if self.overlap == 0 {
            return None;
        }
        let (from, to) = if self.overlap > 0 {
            (self.cut, self.cut + self.overlap)
        } else {
            (self.cut + self.overlap, self.cut)
        };
        self.sequence
            .get(from.max(0) as usize..to.max(0) as usize)
            .map(|s| s.to_string())
    }

    /// Bases of the site left on a fragment whose left edge is this cut.
    pub fn left_remnant_len(&self) -> usize {
        self.site_len() - self.cut as usize
    }

    /// Bases of the site left on a fragment whose right edge is this cut.
    pub fn right_remnant_len(&self) -> usize {
        self.cut as usize
    }

    pub fn get_sites(&self, seq: &DNAsequence) -> Vec<RestrictionEnzymeSite> {
        let recognition = self.sequence.as_bytes();
        let forward = seq.forward();
        if recognition.is_empty() || recognition.len() > forward.len() {
            return vec![];
        }
        let last_start = if seq.is_circular() {
            forward.len()
        } else {
            forward.len() - recognition.len() + 1
        };
        (0..last_start)
            .filter(|&start| {
                if start + recognition.len() <= forward.len() {
                    pattern_matches(recognition, &forward[start..start + recognition.len()])
                } else {
                    let window = window_circular(forward, start as isize, recognition.len());
                    pattern_matches(recognition, &window)
                }
            })
            .map(|start| RestrictionEnzymeSite {
                offset: start,
                enzyme: self.to_owned(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna_sequence::DNAsequence;

    fn eco_ri() -> RestrictionEnzyme {
        RestrictionEnzyme::new("EcoRI", "GAATTC", 1, 4).unwrap()
    }

    #[test]
    fn test_restriction_enzyme() {
        let re = eco_ri();
        assert!(re.is_palindromic());
        assert_eq!(re.sticky_end(), Some("AATT".to_string()));
        let seq = DNAsequence::from_sequence("GAATTC").unwrap();
        let sites = re.get_sites(&seq);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].offset, 0);
        assert_eq!(sites[0].cut_position(seq.len()), 1);
    }

    #[test]
    fn test_restriction_enzyme_sites() {
        let re = eco_ri();
        let seq = DNAsequence::from_sequence("GAATTCGAATTC").unwrap();
        let sites = re.get_sites(&seq);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].offset, 0);
        assert_eq!(sites[1].offset, 6);
    }

    #[test]
    fn test_sites_across_origin() {
        let re = eco_ri();
        let mut seq = DNAsequence::from_sequence("TTCAAAAAAGAA").unwrap();
        assert!(re.get_sites(&seq).is_empty());
        seq.set_circular(true);
        let sites = re.get_sites(&seq);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].offset, 9);
        assert_eq!(sites[0].cut_position(seq.len()), 10);
    }

    #[test]
    fn test_degenerate_site() {
        let ava_i = RestrictionEnzyme::new("AvaI", "CYCGRG", 1, 4).unwrap();
        assert!(ava_i.is_palindromic());
        let seq = DNAsequence::from_sequence("AACTCGAGAACCCGGGAA").unwrap();
        let offsets: Vec<usize> = ava_i.get_sites(&seq).iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![2, 10]);
    }

    #[test]
    fn test_validation() {
        assert!(RestrictionEnzyme::new("Empty", "", 0, 0).is_err());
        assert!(RestrictionEnzyme::new("Far", "GAATTC", 8, 0).is_err());
        assert!(RestrictionEnzyme::new("Bad", "GAXTTC", 1, 4).is_err());
        assert!(RestrictionEnzyme::new("Overhang", "GAATTC", 5, 4).is_err());
        let kpn_i = RestrictionEnzyme::new("KpnI", "GGTACC", 5, -4).unwrap();
        assert_eq!(kpn_i.sticky_end(), Some("GTAC".to_string()));
        assert_eq!(kpn_i.left_remnant_len(), 1);
        assert_eq!(kpn_i.right_remnant_len(), 5);
        let sma_i = RestrictionEnzyme::new("SmaI", "CCCGGG", 3, 0).unwrap();
        assert_eq!(sma_i.sticky_end(), None);
    }
}
