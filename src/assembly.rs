//! Seamless assembly of a backbone with inserts and linkers, and the
//! overlap/primer derivation at every seam.

use crate::{
    circular::{rotate, window_circular, wrap},
    error::DesignError,
    iupac_code::reverse_complement,
    primer::{CoreFallback, CoreParameters, Direction, Primer, PrimerPair, select_core},
    thermo::{self, ReactionConditions},
};
use itertools::Itertools;
use primerkit_protocol::{DesignWarning, Junction, WarningCode};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const MIN_URACIL_MOTIF: usize = 6;
pub const MAX_URACIL_MOTIF: usize = 13;

const DISTANCE_WEIGHT: f64 = 1.0;
const TM_WEIGHT: f64 = 0.5;
const LENGTH_WEIGHT: f64 = 1.0;
const SCORE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloningMethod {
    /// Fixed-length homology on both sides of every seam.
    Overlap,
    /// USER-style A…T motif near every seam.
    UracilExcision,
}

impl CloningMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CloningMethod::Overlap => "overlap",
            CloningMethod::UracilExcision => "uracil_excision",
        }
    }
}

impl fmt::Display for CloningMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CloningMethod {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overlap" | "gibson" | "infusion" => Ok(CloningMethod::Overlap),
            "uracil" | "uracil_excision" | "user" => Ok(CloningMethod::UracilExcision),
            other => Err(DesignError::invalid_input(format!(
                "Unknown cloning method '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartKind {
    Backbone,
    Insert,
    Linker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyPart {
    pub name: String,
    pub kind: PartKind,
    pub sequence: Vec<u8>,
}

impl AssemblyPart {
    pub fn new(name: &str, kind: PartKind, sequence: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            sequence: sequence.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyParameters {
    pub method: CloningMethod,
    pub overlap_length: usize,
    /// Target Tm of a uracil-excision motif.
    pub overlap_tm: f64,
    /// Half-width of the uracil motif search window around a seam.
    pub search_radius: usize,
    pub core: CoreParameters,
}

impl Default for AssemblyParameters {
    fn default() -> Self {
        Self {
            method: CloningMethod::Overlap,
            overlap_length: 25,
            overlap_tm: 45.0,
            search_radius: 12,
            core: CoreParameters::default(),
        }
    }
}

impl AssemblyParameters {
    fn conditions(&self) -> &ReactionConditions {
        &self.core.conditions
    }

    /// Preferred uracil motif length.
    pub fn uracil_target_length(&self) -> usize {
        self.overlap_length.clamp(MIN_URACIL_MOTIF, MAX_URACIL_MOTIF)
    }

    /// Minimum distance between a seam and either end of the rotated
    /// sequence that keeps every seam window clear of the origin.
    pub fn safety_margin(&self) -> usize {
        self.overlap_length.max(MAX_URACIL_MOTIF) + self.search_radius + self.core.max_length
    }
}

/// A seam with its homology. `homology_start..homology_end` is relative to
/// the seam in the assembled sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedJunction {
    pub left_part: usize,
    pub right_part: usize,
    pub homology_start: isize,
    pub homology_end: isize,
    pub junction: Junction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyPlan {
    pub method: CloningMethod,
    /// Backbone first, then inserts interleaved with linkers.
    pub parts: Vec<AssemblyPart>,
    /// Part start positions in the provisional sequence.
    pub part_starts: Vec<usize>,
    pub rotation_offset: usize,
    pub margin: usize,
    /// Assembled construct, rotated by `rotation_offset`.
    pub sequence: Vec<u8>,
    pub junctions: Vec<PlannedJunction>,
    pub warnings: Vec<DesignWarning>,
}

impl AssemblyPlan {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Part start in the assembled (rotated) sequence.
    pub fn rotated_part_start(&self, part: usize) -> usize {
        wrap(
            self.sequence.len(),
            self.part_starts[part] as isize - self.rotation_offset as isize,
        )
    }
}

/// Backbone followed by `inserts` interleaved with `linkers`.
pub fn interleave_parts(
    backbone: AssemblyPart,
    inserts: Vec<AssemblyPart>,
    linkers: Vec<AssemblyPart>,
) -> Result<Vec<AssemblyPart>, DesignError> {
    if inserts.is_empty() {
        return Err(DesignError::invalid_input("At least one insert is required"));
    }
    if linkers.len() != inserts.len() - 1 {
        return Err(DesignError::invalid_input(format!(
            "{} insert(s) need {} linker(s), got {}",
            inserts.len(),
            inserts.len() - 1,
            linkers.len()
        )));
    }
    if let Some(empty) = inserts.iter().find(|p| p.is_empty()) {
        return Err(DesignError::invalid_input(format!(
            "Insert '{}' is empty",
            empty.name
        )));
    }
    Ok(std::iter::once(backbone)
        .chain(inserts.into_iter().interleave(linkers))
        .collect())
}

/// Seams as (provisional position, left part, right part): one at the start
/// of every non-empty part, the closing seam listed last.
pub fn seams(parts: &[AssemblyPart], part_starts: &[usize]) -> Vec<(usize, usize, usize)> {
    let non_empty: Vec<usize> = (0..parts.len()).filter(|&i| !parts[i].is_empty()).collect();
    if non_empty.len() < 2 {
        return vec![];
    }
    non_empty
        .iter()
        .cycle()
        .tuple_windows()
        .take(non_empty.len())
        .map(|(&left, &right)| (part_starts[right], left, right))
        .collect()
}

/// Offset in the middle of the widest seam-free arc.
pub fn rotation_offset(length: usize, seam_positions: &[usize], margin: usize) -> usize {
    if length == 0 || seam_positions.is_empty() {
        return 0;
    }
    let sorted: Vec<usize> = seam_positions.iter().copied().sorted().dedup().collect();
    let (start, gap) = sorted
        .iter()
        .enumerate()
        .map(|(i, &pos)| {
            let next = sorted[(i + 1) % sorted.len()];
            let gap = match (next + length - pos) % length {
                0 => length,
                g => g,
            };
            (pos, gap)
        })
        .fold((0, 0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if gap < 2 * margin {
        log::debug!("Widest seam-free arc is {gap} bp, below twice the {margin} bp margin");
    }
    (start + gap / 2) % length
}

/// Standard overlap pair at `seam`: `length` bases on each side.
pub fn extract_junction(seq: &[u8], seam: usize, length: usize) -> (Vec<u8>, Vec<u8>) {
    let left = window_circular(seq, seam as isize - length as isize, length);
    let right = window_circular(seq, seam as isize, length);
    (left, right)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UracilMotif {
    /// Motif start relative to the seam.
    pub start: isize,
    pub sequence: Vec<u8>,
    pub melting_temp: f64,
}

impl UracilMotif {
    fn end(&self) -> isize {
        self.start + self.sequence.len() as isize
    }

    /// Bases between the motif and the seam; 0 when the motif touches or
    /// spans it.
    fn distance(&self) -> usize {
        0.max(self.start).max(-self.end()) as usize
    }

    /// Twice the distance of the motif centre from the seam.
    fn centre_offset(&self) -> usize {
        (2 * self.start + self.sequence.len() as isize).unsigned_abs()
    }
}

/// Best A…T motif inside `seam ± search_radius`.
pub fn find_uracil_motif(seq: &[u8], seam: usize, params: &AssemblyParameters) -> Option<UracilMotif> {
    let radius = params.search_radius as isize;
    let target_length = params.uracil_target_length();
    let score = |motif: &UracilMotif| {
        DISTANCE_WEIGHT * motif.distance() as f64
            + TM_WEIGHT * (motif.melting_temp - params.overlap_tm).abs()
            + LENGTH_WEIGHT * motif.sequence.len().abs_diff(target_length) as f64
    };
    let compare = |a: &UracilMotif, b: &UracilMotif| {
        let (sa, sb) = (score(a), score(b));
        if (sa - sb).abs() > SCORE_EPSILON {
            return sa.total_cmp(&sb);
        }
        a.centre_offset()
            .cmp(&b.centre_offset())
            .then_with(|| a.start.cmp(&b.start))
    };

    (-radius..=radius)
        .cartesian_product(MIN_URACIL_MOTIF..=MAX_URACIL_MOTIF)
        .filter(|&(start, length)| start + length as isize <= radius)
        .filter_map(|(start, length)| {
            let sequence = window_circular(seq, seam as isize + start, length);
            if sequence.first() != Some(&b'A') || sequence.last() != Some(&b'T') {
                return None;
            }
            let melting_temp = thermo::melting_temp(&sequence, params.conditions());
            if !melting_temp.is_finite() {
                return None;
            }
            Some(UracilMotif {
                start,
                sequence,
                melting_temp,
            })
        })
        .min_by(|a, b| compare(a, b))
}

fn standard_junction(seq: &[u8], seam: usize, params: &AssemblyParameters) -> (Junction, isize, isize) {
    let length = params.overlap_length;
    let (left, right) = extract_junction(seq, seam, length);
    let homology = [left.as_slice(), right.as_slice()].concat();
    let junction = Junction {
        label: String::new(),
        provisional_seam: 0,
        seam,
        overlap_start: wrap(seq.len(), seam as isize - length as isize),
        left_overlap: String::from_utf8_lossy(&left).to_string(),
        right_overlap: String::from_utf8_lossy(&right).to_string(),
        length: homology.len(),
        melting_temp: thermo::melting_temp(&homology, params.conditions()),
        gc_percent: thermo::gc_percent(&homology),
        motif_found: true,
    };
    (junction, -(length as isize), length as isize)
}

fn uracil_junction(seq: &[u8], seam: usize, params: &AssemblyParameters) -> (Junction, isize, isize) {
    let (start, motif, found) = match find_uracil_motif(seq, seam, params) {
        Some(motif) => (motif.start, motif.sequence, true),
        None => {
            let length = params.uracil_target_length();
            let start = -(length as isize / 2);
            (start, window_circular(seq, seam as isize + start, length), false)
        }
    };
    let text = String::from_utf8_lossy(&motif).to_string();
    let junction = Junction {
        label: String::new(),
        provisional_seam: 0,
        seam,
        overlap_start: wrap(seq.len(), seam as isize + start),
        left_overlap: text.clone(),
        right_overlap: text,
        length: motif.len(),
        melting_temp: thermo::melting_temp(&motif, params.conditions()),
        gc_percent: thermo::gc_percent(&motif),
        motif_found: found,
    };
    (junction, start, start + motif.len() as isize)
}

/// Builds the circular construct and derives the homology at every seam.
pub fn assemble(parts: Vec<AssemblyPart>, params: &AssemblyParameters) -> AssemblyPlan {
    let part_starts: Vec<usize> = parts
        .iter()
        .scan(0, |pos, part| {
            let start = *pos;
            *pos += part.len();
            Some(start)
        })
        .collect();
    let provisional: Vec<u8> = parts.iter().flat_map(|p| p.sequence.iter().copied()).collect();
    let length = provisional.len();
    let seam_list = seams(&parts, &part_starts);
    let margin = params.safety_margin();
    let positions: Vec<usize> = seam_list.iter().map(|s| s.0).collect();
    let rotation_offset = rotation_offset(length, &positions, margin);
    log::debug!(
        "Assembling {length} bp from {} part(s), {} seam(s), rotation offset {rotation_offset}",
        parts.len(),
        seam_list.len()
    );
    let sequence = rotate(&provisional, rotation_offset);

    let mut warnings = vec![];
    let junctions = seam_list
        .iter()
        .map(|&(provisional_seam, left_part, right_part)| {
            let seam = wrap(length, provisional_seam as isize - rotation_offset as isize);
            let (mut junction, homology_start, homology_end) = match params.method {
                CloningMethod::Overlap => standard_junction(&sequence, seam, params),
                CloningMethod::UracilExcision => uracil_junction(&sequence, seam, params),
            };
            junction.label = format!("{}|{}", parts[left_part].name, parts[right_part].name);
            junction.provisional_seam = provisional_seam;
            if !junction.motif_found {
                warnings.push(DesignWarning::new(
                    WarningCode::FrameshiftRisk,
                    format!(
                        "No A…T motif within {} bp of seam {}; using fixed {} bp overlap {}",
                        params.search_radius, junction.label, junction.length, junction.left_overlap
                    ),
                ));
            }
            PlannedJunction {
                left_part,
                right_part,
                homology_start,
                homology_end,
                junction,
            }
        })
        .collect();

    AssemblyPlan {
        method: params.method,
        parts,
        part_starts,
        rotation_offset,
        margin,
        sequence,
        junctions,
        warnings,
    }
}

fn core_warning(primer: &Primer) -> Option<DesignWarning> {
    let core = primer.core();
    match primer.selection.fallback? {
        CoreFallback::ClosestTm => Some(DesignWarning::new(
            WarningCode::CoreOutsideTolerance,
            format!(
                "{}: closest core Tm is {:.1} °C ({} nt)",
                primer.name, core.melting_temp, core.length
            ),
        )),
        CoreFallback::DefaultLength => Some(DesignWarning::new(
            WarningCode::CoreDefaultLength,
            format!("{}: no usable Tm, core set to {} nt", primer.name, core.length),
        )),
    }
}

/// One primer pair per insert. The forward primer starts at the homology of
/// the leading seam, the reverse primer at the homology of the trailing
/// seam; both cores anneal inside the insert.
pub fn design_primers(plan: &AssemblyPlan, params: &AssemblyParameters) -> (Vec<PrimerPair>, Vec<DesignWarning>) {
    let mut pairs = vec![];
    let mut warnings = vec![];
    for (idx, part) in plan.parts.iter().enumerate() {
        if part.kind != PartKind::Insert {
            continue;
        }
        let leading = plan.junctions.iter().find(|j| j.right_part == idx);
        let trailing = plan.junctions.iter().find(|j| j.left_part == idx);
        let (Some(leading), Some(trailing)) = (leading, trailing) else {
            continue;
        };

        let len = part.len();
        let insert_start = plan.rotated_part_start(idx) as isize;
        let skip_start = (leading.homology_start.max(0) as usize).min(len);
        let forward_tail = match leading.homology_start {
            start if start < 0 => window_circular(
                &plan.sequence,
                insert_start + start,
                start.unsigned_abs(),
            ),
            _ => vec![],
        };
        let forward_core = select_core(&part.sequence[skip_start..], Direction::FromStart, &params.core);
        let forward = Primer::new(
            &format!("{}_fwd", part.name),
            &forward_tail,
            forward_core,
            params.conditions(),
        );

        let skip_end = ((-trailing.homology_end).max(0) as usize).min(len);
        let reverse_tail = match trailing.homology_end {
            end if end > 0 => reverse_complement(&window_circular(
                &plan.sequence,
                insert_start + len as isize,
                end as usize,
            )),
            _ => vec![],
        };
        let reverse_core = select_core(&part.sequence[..len - skip_end], Direction::FromEnd, &params.core);
        let reverse = Primer::new(
            &format!("{}_rev", part.name),
            &reverse_tail,
            reverse_core,
            params.conditions(),
        );

        warnings.extend(core_warning(&forward));
        warnings.extend(core_warning(&reverse));
        pairs.push(PrimerPair::new(&part.name, forward, reverse));
    }
    (pairs, warnings)
}

/// Smallest distance between a seam and either end of the assembled
/// sequence.
pub fn seam_clearance(plan: &AssemblyPlan) -> usize {
    let len = plan.len();
    plan.junctions
        .iter()
        .map(|j| j.junction.seam.min(len - j.junction.seam))
        .min()
        .unwrap_or(len)
}
