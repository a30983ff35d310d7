//! Machine-readable contracts shared by the primerkit engine and its
//! consumers (CLI, table/diagram renderers, FASTA exporters).

use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROTOCOL_VERSION: &str = "1";

/// FASTA line width used by every exporter.
pub const FASTA_LINE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCode {
    /// A selected enzyme has no site on the target and was dropped.
    EnzymeAbsent,
    /// Both backbone boundaries come from the same enzyme.
    NonDirectional,
    /// No primer core length reached the target Tm within tolerance.
    CoreOutsideTolerance,
    /// No primer core length produced a usable Tm at all.
    CoreDefaultLength,
    /// No uracil-excision motif near a seam; a fixed-length overlap was used.
    FrameshiftRisk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignWarning {
    pub code: WarningCode,
    pub message: String,
}

impl DesignWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for DesignWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// One engineered seam of an assembled construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub label: String,
    /// Seam position in the provisional (unrotated) sequence.
    pub provisional_seam: usize,
    /// Seam position in the assembled (rotated) sequence.
    pub seam: usize,
    /// Start of the shared homology in the assembled sequence. May be
    /// larger than `seam` when the homology sits right of the seam.
    pub overlap_start: usize,
    pub left_overlap: String,
    pub right_overlap: String,
    pub length: usize,
    pub melting_temp: f64,
    pub gc_percent: f64,
    /// False when a uracil-excision motif was not found and a fixed-length
    /// overlap was substituted.
    pub motif_found: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimerRecord {
    pub name: String,
    /// Full primer, 5'→3' (tail followed by core).
    pub sequence: String,
    pub tail: String,
    pub core: String,
    pub core_melting_temp: f64,
    pub full_melting_temp: f64,
    pub gc_percent: f64,
    pub core_within_tolerance: bool,
    pub hairpin_delta_g: Option<f64>,
    pub self_dimer_delta_g: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimerPairRecord {
    pub insert: String,
    pub forward: PrimerRecord,
    pub reverse: PrimerRecord,
    pub cross_dimer_delta_g: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub start: usize,
    pub end: usize,
    pub length: usize,
    pub left_enzyme: Option<String>,
    pub right_enzyme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignReport {
    pub protocol_version: String,
    pub method: String,
    pub assembled_length: usize,
    /// Assembled construct, rotated so that no seam sits near the origin.
    pub assembled_sequence: String,
    pub rotation_offset: usize,
    pub backbone_length: usize,
    pub non_directional: bool,
    pub junctions: Vec<Junction>,
    pub primer_pairs: Vec<PrimerPairRecord>,
    pub warnings: Vec<DesignWarning>,
}

impl DesignReport {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastaRecord {
    pub name: String,
    pub sequence: String,
}

impl FastaRecord {
    pub fn new(name: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
        }
    }

    /// Header line plus the sequence wrapped at [`FASTA_LINE_WIDTH`].
    pub fn to_fasta(&self) -> String {
        let header = self.name.replace(' ', "_");
        let mut ret = format!(">{header}\n");
        for chunk in self.sequence.as_bytes().chunks(FASTA_LINE_WIDTH) {
            ret.push_str(&String::from_utf8_lossy(chunk));
            ret.push('\n');
        }
        ret
    }
}

pub fn records_to_fasta(records: &[FastaRecord]) -> String {
    records.iter().map(FastaRecord::to_fasta).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fasta_wraps_at_80() {
        let record = FastaRecord::new("pUC19 insert", "A".repeat(170));
        let text = record.to_fasta();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">pUC19_insert");
        assert_eq!(lines[1].len(), 80);
        assert_eq!(lines[2].len(), 80);
        assert_eq!(lines[3].len(), 10);
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_records_to_fasta() {
        let records = vec![FastaRecord::new("a", "ACGT"), FastaRecord::new("b", "TTTT")];
        assert_eq!(records_to_fasta(&records), ">a\nACGT\n>b\nTTTT\n");
    }

    #[test]
    fn test_warning_display() {
        let w = DesignWarning::new(WarningCode::FrameshiftRisk, "no motif at seam 2");
        assert_eq!(w.to_string(), "FrameshiftRisk: no motif at seam 2");
    }
}
