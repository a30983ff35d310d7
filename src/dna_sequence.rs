use crate::{
    error::{DesignError, ErrorCode},
    iupac_code::IupacCode,
    restriction_enzyme::{RestrictionEnzyme, RestrictionEnzymeSite},
};
use bio::io::fasta;
use gb_io::seq::{Seq, Topology};
use serde::{Deserialize, Serialize};
use std::{fmt, fs};

type DNAstring = Vec<u8>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DNAsequence {
    seq: Seq,
}

impl DNAsequence {
    /// Plain sequence text; whitespace and digits are ignored.
    pub fn from_sequence(sequence: &str) -> Result<DNAsequence, DesignError> {
        let normalized = Self::normalize_dna_sequence(sequence.as_bytes())?;
        Ok(DNAsequence::from_u8(&normalized))
    }

    /// Plain text, single-record FASTA or single-record GenBank, detected
    /// from the first non-blank line.
    pub fn from_text(text: &str) -> Result<DNAsequence, DesignError> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('>') {
            Self::from_fasta_text(trimmed)
        } else if trimmed.starts_with("LOCUS") {
            Self::from_genbank_text(trimmed)
        } else {
            Self::from_sequence(trimmed)
        }
    }

    pub fn from_file(filename: &str) -> Result<DNAsequence, DesignError> {
        let text = fs::read_to_string(filename).map_err(|e| {
            DesignError::new(
                ErrorCode::Io,
                format!("Could not read sequence file '{filename}': {e}"),
            )
        })?;
        let mut ret = Self::from_text(&text)?;
        if ret.name().is_none() {
            if let Some(stem) = std::path::Path::new(filename).file_stem() {
                ret.set_name(&stem.to_string_lossy());
            }
        }
        Ok(ret)
    }

    pub fn from_fasta_text(text: &str) -> Result<DNAsequence, DesignError> {
        let records = fasta::Reader::new(text.as_bytes())
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DesignError::invalid_input(format!("Could not parse FASTA: {e}")))?;
        match records.len() {
            0 => Err(DesignError::invalid_input("FASTA text contains no record")),
            1 => Self::from_fasta_record(&records[0]),
            n => Err(DesignError::new(
                ErrorCode::MultipleRecords,
                format!("Expected one FASTA record, found {n}"),
            )),
        }
    }

    pub fn from_genbank_text(text: &str) -> Result<DNAsequence, DesignError> {
        let mut records = gb_io::reader::SeqReader::new(text.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DesignError::invalid_input(format!("Could not parse GenBank: {e}")))?;
        match records.len() {
            0 => Err(DesignError::invalid_input("GenBank text contains no record")),
            1 => Self::from_genbank_seq(records.remove(0)),
            n => Err(DesignError::new(
                ErrorCode::MultipleRecords,
                format!("Expected one GenBank record, found {n}"),
            )),
        }
    }

    pub fn from_genbank_seq(mut seq: Seq) -> Result<Self, DesignError> {
        seq.seq = Self::normalize_dna_sequence(&seq.seq)?;
        seq.len = Some(seq.seq.len());
        Ok(Self { seq })
    }

    pub fn from_fasta_record(record: &fasta::Record) -> Result<Self, DesignError> {
        let normalized = Self::normalize_dna_sequence(record.seq())?;
        let mut ret = Self::from_u8(&normalized);
        ret.seq.name = Some(record.id().to_string());
        if let Some(desc) = record.desc() {
            ret.seq.comments.push(desc.to_string())
        }
        Ok(ret)
    }

    /// Wraps already-normalized bases.
    pub(crate) fn from_u8(s: &[u8]) -> Self {
        let seq = Seq {
            name: None,
            topology: Topology::Linear,
            date: None,
            len: Some(s.len()),
            molecule_type: Some("DNA".to_string()),
            division: String::new(),
            definition: None,
            accession: None,
            version: None,
            source: None,
            dblink: None,
            keywords: None,
            references: vec![],
            comments: vec![],
            seq: s.to_vec(),
            contig: None,
            features: vec![],
        };
        Self { seq }
    }

    /// Upper-cases, maps U to T and drops whitespace and digits. Anything
    /// that is not an IUPAC nucleotide is rejected.
    pub fn normalize_dna_sequence(v: &[u8]) -> Result<DNAstring, DesignError> {
        let mut ret = Vec::with_capacity(v.len());
        for (pos, c) in v.iter().enumerate() {
            if c.is_ascii_whitespace() || c.is_ascii_digit() {
                continue;
            }
            if !IupacCode::is_valid_letter(*c) {
                return Err(DesignError::invalid_input(format!(
                    "Invalid nucleotide '{}' at position {pos}",
                    *c as char
                )));
            }
            ret.push(match c.to_ascii_uppercase() {
                b'U' => b'T',
                other => other,
            });
        }
        if ret.is_empty() {
            return Err(DesignError::invalid_input("Sequence is empty"));
        }
        Ok(ret)
    }

    pub fn calculate_restriction_enzyme_sites(
        &self,
        restriction_enzymes: &[RestrictionEnzyme],
    ) -> Vec<RestrictionEnzymeSite> {
        restriction_enzymes
            .iter()
            .flat_map(|re| re.get_sites(self))
            .collect()
    }

    #[inline(always)]
    pub fn forward(&self) -> &Vec<u8> {
        &self.seq.seq
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.forward().len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward().is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.seq.name.as_deref()
    }

    pub fn set_name(&mut self, name: &str) {
        self.seq.name = Some(name.to_string());
    }

    pub fn is_circular(&self) -> bool {
        self.seq.topology == Topology::Circular
    }

    pub fn set_circular(&mut self, is_circular: bool) {
        self.seq.topology = match is_circular {
            true => Topology::Circular,
            false => Topology::Linear,
        };
    }
}

impl fmt::Display for DNAsequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.forward()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let dna = DNAsequence::from_sequence("  1 acgu nnrr\n 11 GATC").unwrap();
        assert_eq!(dna.to_string(), "ACGTNNRRGATC");
        let err = DNAsequence::from_sequence("ACGTX").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(DNAsequence::from_sequence(" \n ").is_err());
    }

    #[test]
    fn test_fasta_single_record() {
        let dna = DNAsequence::from_text(">pUC_fragment test\nACGT\nTTGA\n").unwrap();
        assert_eq!(dna.name(), Some("pUC_fragment"));
        assert_eq!(dna.to_string(), "ACGTTTGA");
        assert_eq!(dna.seq.comments, vec!["test".to_string()]);
        assert!(!dna.is_circular());
    }

    #[test]
    fn test_fasta_multiple_records() {
        let err = DNAsequence::from_text(">a\nACGT\n>b\nGGCC\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::MultipleRecords);
    }

    #[test]
    fn test_fasta_empty_record() {
        assert!(DNAsequence::from_text(">a\n\n").is_err());
    }

    #[test]
    fn test_genbank_record() {
        let text = "LOCUS       tiny                      12 bp    DNA     circular SYN 01-JAN-2000\n\
ORIGIN\n        1 gaattcaaaa aa\n//\n";
        let dna = DNAsequence::from_text(text).unwrap();
        assert_eq!(dna.to_string(), "GAATTCAAAAAA");
        assert!(dna.is_circular());
        assert_eq!(dna.name(), Some("tiny"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insert.txt");
        std::fs::write(&path, "acgtacgt\n").unwrap();
        let dna = DNAsequence::from_file(&path.to_string_lossy()).unwrap();
        assert_eq!(dna.to_string(), "ACGTACGT");
        assert_eq!(dna.name(), Some("insert"));
        let missing = DNAsequence::from_file("/nonexistent/primerkit.fa").unwrap_err();
        assert_eq!(missing.code, ErrorCode::Io);
    }
}
