//! In-silico restriction digestion of circular molecules.

use crate::{
    circular::{rotate, subsequence_circular, window_circular, wrap},
    dna_sequence::DNAsequence,
    restriction_enzyme::RestrictionEnzyme,
};
use primerkit_protocol::FragmentRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutSite {
    pub position: usize,
    pub enzyme: RestrictionEnzyme,
    /// Bases of the recognition site this cut came from, as found on the
    /// molecule (resolves degenerate sites).
    pub site_bases: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestFragment {
    pub start: usize,
    /// Exclusive; smaller than `start` when the fragment spans the origin.
    pub end: usize,
    pub length: usize,
    pub sequence: String,
    pub left: Option<CutSite>,
    pub right: Option<CutSite>,
}

impl DigestFragment {
    pub fn left_enzyme(&self) -> Option<&RestrictionEnzyme> {
        self.left.as_ref().map(|c| &c.enzyme)
    }

    pub fn right_enzyme(&self) -> Option<&RestrictionEnzyme> {
        self.right.as_ref().map(|c| &c.enzyme)
    }

    /// Both edges were cut by the same enzyme, so the fragment can be
    /// re-ligated in either orientation.
    pub fn is_pseudo_single(&self) -> bool {
        match (self.left_enzyme(), self.right_enzyme()) {
            (Some(l), Some(r)) => l.name == r.name,
            _ => false,
        }
    }

    /// Fragment without the partial recognition sites at its edges.
    pub fn strip_site_remnants(&self) -> String {
        let left = self.left_enzyme().map_or(0, |e| e.left_remnant_len());
        let right = self.right_enzyme().map_or(0, |e| e.right_remnant_len());
        if left + right >= self.sequence.len() {
            return String::new();
        }
        self.sequence[left..self.sequence.len() - right].to_string()
    }

    /// Stripped fragment flanked by the complete recognition sites, so that
    /// whatever replaces the excised region keeps both sites intact.
    pub fn with_restored_sites(&self) -> String {
        let left = self.left.as_ref().map_or("", |c| c.site_bases.as_str());
        let right = self.right.as_ref().map_or("", |c| c.site_bases.as_str());
        format!("{left}{}{right}", self.strip_site_remnants())
    }

    pub fn to_record(&self) -> FragmentRecord {
        FragmentRecord {
            start: self.start,
            end: self.end,
            length: self.length,
            left_enzyme: self.left_enzyme().map(|e| e.name.clone()),
            right_enzyme: self.right_enzyme().map(|e| e.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digestion {
    pub sequence_length: usize,
    pub cuts: Vec<CutSite>,
    pub fragments: Vec<DigestFragment>,
}

impl Digestion {
    /// Longest fragment, first one on ties.
    pub fn backbone(&self) -> Option<&DigestFragment> {
        self.fragments
            .iter()
            .reduce(|best, f| if f.length > best.length { f } else { best })
    }

    /// Selected enzymes that produced at least one cut, in selection order.
    pub fn cutting_enzymes<'a>(&self, selection: &'a [RestrictionEnzyme]) -> Vec<&'a RestrictionEnzyme> {
        selection
            .iter()
            .filter(|e| self.cuts.iter().any(|c| c.enzyme.name == e.name))
            .collect()
    }
}

/// Cuts the molecule as a circle with every enzyme in `enzymes`. Cuts at the
/// same position collapse onto the enzyme listed first.
pub fn digest_circular(seq: &DNAsequence, enzymes: &[RestrictionEnzyme]) -> Digestion {
    let len = seq.len();
    let mut circle = seq.clone();
    circle.set_circular(true);

    let sites = circle.calculate_restriction_enzyme_sites(enzymes);
    log::debug!(
        "Digesting with {} enzyme(s): {} site(s)",
        enzymes.len(),
        sites.len()
    );
    let mut cuts: Vec<CutSite> = sites
        .into_iter()
        .map(|site| {
            let site_bases =
                window_circular(circle.forward(), site.offset as isize, site.enzyme.site_len());
            CutSite {
                position: site.cut_position(len),
                site_bases: String::from_utf8_lossy(&site_bases).to_string(),
                enzyme: site.enzyme,
            }
        })
        .collect();
    // Stable sort keeps selection order among cuts at the same position.
    cuts.sort_by_key(|c| c.position);
    cuts.dedup_by_key(|c| c.position);

    let fragments = fragments_between(circle.forward(), &cuts);
    log::debug!(
        "Digest of {len} bp produced {} cut(s) and {} fragment(s)",
        cuts.len(),
        fragments.len()
    );
    Digestion {
        sequence_length: len,
        cuts,
        fragments,
    }
}

fn fragments_between(forward: &[u8], cuts: &[CutSite]) -> Vec<DigestFragment> {
    let len = forward.len();
    if cuts.is_empty() {
        return vec![DigestFragment {
            start: 0,
            end: len,
            length: len,
            sequence: String::from_utf8_lossy(forward).to_string(),
            left: None,
            right: None,
        }];
    }
    // Open the circle at the first cut; the last fragment then ends at `len`.
    let origin = cuts[0].position as isize;
    let opened = rotate(forward, cuts[0].position);
    (0..cuts.len())
        .map(|idx| {
            let left = &cuts[idx];
            let right = &cuts[(idx + 1) % cuts.len()];
            let from = wrap(len, left.position as isize - origin);
            let to = match wrap(len, right.position as isize - origin) {
                0 => len,
                pos => pos,
            };
            let length = to - from;
            let bases = subsequence_circular(&opened, from, to);
            DigestFragment {
                start: left.position,
                end: right.position,
                length,
                sequence: String::from_utf8_lossy(&bases).to_string(),
                left: Some(left.clone()),
                right: Some(right.clone()),
            }
        })
        .collect()
}
