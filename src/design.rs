//! End-to-end design run: backbone preparation, assembly, primers, report.

use crate::{
    ENZYMES,
    assembly::{
        AssemblyParameters, AssemblyPart, AssemblyPlan, CloningMethod, PartKind, assemble,
        design_primers, interleave_parts, seam_clearance,
    },
    circular::rotate,
    digest::{DigestFragment, digest_circular},
    dna_sequence::DNAsequence,
    enzymes::Enzymes,
    error::{DesignError, ErrorCode},
    primer::{CoreParameters, PrimerPair},
    thermo::ReactionConditions,
};
use primerkit_protocol::{DesignReport, DesignWarning, FastaRecord, PROTOCOL_VERSION, WarningCode};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    pub target_tm: f64,
    pub tm_tolerance: f64,
    pub na_mm: f64,
    pub mg_mm: f64,
    pub primer_nm: f64,
    pub min_core_length: usize,
    pub max_core_length: usize,
    pub overlap_length: usize,
    pub uracil_overlap_tm: f64,
    pub uracil_search_radius: usize,
    /// Put the complete recognition sites back around the insertion.
    pub restore_recognition_sites: bool,
    /// Upper bound for any single input sequence and the assembled construct.
    pub max_sequence_length: usize,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            target_tm: 60.0,
            tm_tolerance: 2.5,
            na_mm: 50.0,
            mg_mm: 0.0,
            primer_nm: 500.0,
            min_core_length: 18,
            max_core_length: 40,
            overlap_length: 25,
            uracil_overlap_tm: 45.0,
            uracil_search_radius: 12,
            restore_recognition_sites: false,
            max_sequence_length: 1_000_000,
        }
    }
}

impl DesignConfig {
    pub fn from_json_text(text: &str) -> Result<Self, DesignError> {
        let ret: Self = serde_json::from_str(text)?;
        ret.validate()?;
        Ok(ret)
    }

    /// Inline JSON, or `@path` to a JSON file.
    pub fn from_json_arg(value: &str) -> Result<Self, DesignError> {
        match value.strip_prefix('@') {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    DesignError::new(
                        ErrorCode::Io,
                        format!("Could not read JSON file '{path}': {e}"),
                    )
                })?;
                Self::from_json_text(&text)
            }
            None => Self::from_json_text(value),
        }
    }

    pub fn validate(&self) -> Result<(), DesignError> {
        let finite = [
            ("target_tm", self.target_tm),
            ("tm_tolerance", self.tm_tolerance),
            ("na_mm", self.na_mm),
            ("mg_mm", self.mg_mm),
            ("primer_nm", self.primer_nm),
            ("uracil_overlap_tm", self.uracil_overlap_tm),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(DesignError::invalid_input(format!("{name} must be a finite number")));
        }
        if self.tm_tolerance < 0.0 || self.na_mm < 0.0 || self.mg_mm < 0.0 {
            return Err(DesignError::invalid_input(
                "Tolerance and ion concentrations must not be negative",
            ));
        }
        if self.na_mm == 0.0 && self.mg_mm == 0.0 {
            return Err(DesignError::invalid_input("No cations in the reaction"));
        }
        if self.primer_nm <= 0.0 {
            return Err(DesignError::invalid_input("primer_nm must be positive"));
        }
        if self.min_core_length < 2 || self.min_core_length > self.max_core_length {
            return Err(DesignError::invalid_input(format!(
                "Invalid core length window {}..{}",
                self.min_core_length, self.max_core_length
            )));
        }
        if self.overlap_length == 0 {
            return Err(DesignError::invalid_input("overlap_length must be positive"));
        }
        if self.max_sequence_length == 0 {
            return Err(DesignError::invalid_input("max_sequence_length must be positive"));
        }
        Ok(())
    }

    pub fn conditions(&self) -> ReactionConditions {
        ReactionConditions::new(self.na_mm, self.mg_mm, self.primer_nm)
    }

    pub fn core_parameters(&self) -> CoreParameters {
        CoreParameters {
            target_tm: self.target_tm,
            tolerance: self.tm_tolerance,
            min_length: self.min_core_length,
            max_length: self.max_core_length,
            conditions: self.conditions(),
        }
    }

    pub fn assembly_parameters(&self, method: CloningMethod) -> AssemblyParameters {
        AssemblyParameters {
            method,
            overlap_length: self.overlap_length,
            overlap_tm: self.uracil_overlap_tm,
            search_radius: self.uracil_search_radius,
            core: self.core_parameters(),
        }
    }

    /// Both sides of a seam's homology, and the uracil motif search window,
    /// must fit on the construct.
    fn check_homology_fits(&self, method: CloningMethod, assembled_length: usize) -> Result<(), DesignError> {
        let (what, span) = match method {
            CloningMethod::Overlap => ("overlap_length", 2 * self.overlap_length),
            CloningMethod::UracilExcision => ("uracil_search_radius", 2 * self.uracil_search_radius),
        };
        if span > assembled_length {
            return Err(DesignError::invalid_input(format!(
                "{what} spans {span} bp around a seam, the construct is only {assembled_length} bp"
            )));
        }
        Ok(())
    }

    fn check_length(&self, what: &str, length: usize) -> Result<(), DesignError> {
        if length > self.max_sequence_length {
            return Err(DesignError::invalid_input(format!(
                "{what} is {length} bp, limit is {}",
                self.max_sequence_length
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DesignRequest {
    pub method: CloningMethod,
    pub vector: DNAsequence,
    pub inserts: Vec<DNAsequence>,
    /// One per gap between consecutive inserts; empty strings are allowed.
    pub linkers: Vec<String>,
    /// Enzymes linearizing the vector; mutually exclusive with `insert_at`.
    pub enzymes: Vec<String>,
    pub insert_at: Option<usize>,
}

/// Linearized vector ready for assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackbonePrep {
    pub sequence: Vec<u8>,
    /// Digest fragment the backbone was taken from; `None` for an explicit
    /// insertion position.
    pub fragment: Option<DigestFragment>,
    pub enzymes: Vec<String>,
    pub non_directional: bool,
    pub restored_sites: bool,
}

pub fn prepare_backbone(
    vector: &DNAsequence,
    enzyme_names: &[String],
    insert_at: Option<usize>,
    config: &DesignConfig,
    registry: &Enzymes,
) -> Result<(BackbonePrep, Vec<DesignWarning>), DesignError> {
    match (enzyme_names.is_empty(), insert_at) {
        (false, Some(_)) => Err(DesignError::invalid_input(
            "Give either enzymes or an insertion position, not both",
        )),
        (true, None) => Err(DesignError::invalid_input(
            "Give enzymes or an insertion position to open the vector",
        )),
        (true, Some(position)) => {
            if position > vector.len() {
                return Err(DesignError::invalid_input(format!(
                    "Insertion position {position} is beyond the {} bp vector",
                    vector.len()
                )));
            }
            let prep = BackbonePrep {
                sequence: rotate(vector.forward(), position),
                fragment: None,
                enzymes: vec![],
                non_directional: false,
                restored_sites: false,
            };
            Ok((prep, vec![]))
        }
        (false, None) => digest_backbone(vector, enzyme_names, config, registry),
    }
}

fn digest_backbone(
    vector: &DNAsequence,
    enzyme_names: &[String],
    config: &DesignConfig,
    registry: &Enzymes,
) -> Result<(BackbonePrep, Vec<DesignWarning>), DesignError> {
    let selection = registry.resolve(enzyme_names);
    if !selection.missing.is_empty() {
        return Err(DesignError::new(
            ErrorCode::UnknownEnzyme,
            format!("Unknown enzyme(s): {}", selection.missing.join(", ")),
        ));
    }
    let digestion = digest_circular(vector, &selection.found);
    let cutting = digestion.cutting_enzymes(&selection.found);
    if cutting.is_empty() {
        return Err(DesignError::new(
            ErrorCode::NoUsableEnzyme,
            format!(
                "None of {} cuts the vector",
                enzyme_names.join(", ")
            ),
        ));
    }

    let mut warnings: Vec<DesignWarning> = selection
        .found
        .iter()
        .filter(|e| !cutting.iter().any(|c| c.name == e.name))
        .map(|e| {
            DesignWarning::new(
                WarningCode::EnzymeAbsent,
                format!("{} has no site in the vector and was ignored", e.name),
            )
        })
        .collect();

    let fragment = digestion
        .backbone()
        .ok_or_else(|| DesignError::new(ErrorCode::Internal, "Digest produced no fragment"))?
        .clone();
    let non_directional = fragment.is_pseudo_single();
    if non_directional {
        let name = fragment.left_enzyme().map_or("", |e| e.name.as_str());
        warnings.push(DesignWarning::new(
            WarningCode::NonDirectional,
            format!("Both backbone ends were cut by {name}; the insert can ligate in either orientation"),
        ));
    }
    let sequence = match config.restore_recognition_sites {
        true => fragment.with_restored_sites(),
        false => fragment.strip_site_remnants(),
    };
    if sequence.is_empty() {
        return Err(DesignError::invalid_input("Backbone is empty after digestion"));
    }
    let prep = BackbonePrep {
        sequence: sequence.into_bytes(),
        enzymes: cutting.iter().map(|e| e.name.clone()).collect(),
        fragment: Some(fragment),
        non_directional,
        restored_sites: config.restore_recognition_sites,
    };
    Ok((prep, warnings))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignResult {
    pub backbone: BackbonePrep,
    pub plan: AssemblyPlan,
    pub primer_pairs: Vec<PrimerPair>,
    pub warnings: Vec<DesignWarning>,
    pub vector_name: String,
}

impl DesignResult {
    pub fn to_report(&self) -> DesignReport {
        DesignReport {
            protocol_version: PROTOCOL_VERSION.to_string(),
            method: self.plan.method.name().to_string(),
            assembled_length: self.plan.len(),
            assembled_sequence: String::from_utf8_lossy(&self.plan.sequence).to_string(),
            rotation_offset: self.plan.rotation_offset,
            backbone_length: self.backbone.sequence.len(),
            non_directional: self.backbone.non_directional,
            junctions: self.plan.junctions.iter().map(|j| j.junction.clone()).collect(),
            primer_pairs: self.primer_pairs.iter().map(|p| p.to_record()).collect(),
            warnings: self.warnings.clone(),
        }
    }

    /// Assembled construct followed by every primer.
    pub fn fasta_records(&self) -> Vec<FastaRecord> {
        let mut ret = vec![FastaRecord::new(
            format!("{}_assembled", self.vector_name),
            String::from_utf8_lossy(&self.plan.sequence),
        )];
        for pair in &self.primer_pairs {
            for primer in [&pair.forward, &pair.reverse] {
                ret.push(FastaRecord::new(primer.name.clone(), primer.sequence.clone()));
            }
        }
        ret
    }
}

/// Runs a design against the global enzyme registry.
pub fn run_design(request: &DesignRequest, config: &DesignConfig) -> Result<DesignResult, DesignError> {
    run_design_with(request, config, &ENZYMES)
}

pub fn run_design_with(
    request: &DesignRequest,
    config: &DesignConfig,
    registry: &Enzymes,
) -> Result<DesignResult, DesignError> {
    config.validate()?;
    config.check_length("Vector", request.vector.len())?;
    for insert in &request.inserts {
        config.check_length("Insert", insert.len())?;
    }
    let linkers = request
        .linkers
        .iter()
        .map(|l| match l.trim().is_empty() {
            true => Ok(vec![]),
            false => DNAsequence::normalize_dna_sequence(l.as_bytes()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (backbone, mut warnings) = prepare_backbone(
        &request.vector,
        &request.enzymes,
        request.insert_at,
        config,
        registry,
    )?;
    let vector_name = request.vector.name().unwrap_or("vector").to_string();

    let inserts = request
        .inserts
        .iter()
        .enumerate()
        .map(|(i, dna)| {
            let name = dna.name().map_or_else(|| format!("insert_{}", i + 1), |n| n.to_string());
            AssemblyPart::new(&name, PartKind::Insert, dna.forward())
        })
        .collect();
    let linkers = linkers
        .iter()
        .enumerate()
        .map(|(i, l)| AssemblyPart::new(&format!("linker_{}", i + 1), PartKind::Linker, l))
        .collect();
    let parts = interleave_parts(
        AssemblyPart::new(&vector_name, PartKind::Backbone, &backbone.sequence),
        inserts,
        linkers,
    )?;
    let total: usize = parts.iter().map(|p| p.len()).sum();
    config.check_length("Assembled construct", total)?;
    config.check_homology_fits(request.method, total)?;

    let params = config.assembly_parameters(request.method);
    let plan = assemble(parts, &params);
    log::debug!(
        "Closest seam is {} bp from the sequence ends (margin {})",
        seam_clearance(&plan),
        plan.margin
    );
    let (primer_pairs, primer_warnings) = design_primers(&plan, &params);
    warnings.extend(plan.warnings.iter().cloned());
    warnings.extend(primer_warnings);
    for warning in &warnings {
        log::warn!("{warning}");
    }

    Ok(DesignResult {
        backbone,
        plan,
        primer_pairs,
        warnings,
        vector_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iupac_code::reverse_complement;

    fn pseudo_random_insert(len: usize, seed: u64) -> String {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                b"ACGT"[((state >> 33) % 4) as usize] as char
            })
            .collect()
    }

    /// 3000 bp with EcoRI at 100 and BamHI at 400.
    fn vector() -> DNAsequence {
        let mut bases = "ACGT".repeat(750).into_bytes();
        bases[100..106].copy_from_slice(b"GAATTC");
        bases[400..406].copy_from_slice(b"GGATCC");
        let mut dna = DNAsequence::from_sequence(&String::from_utf8(bases).unwrap()).unwrap();
        dna.set_circular(true);
        dna.set_name("pTest");
        dna
    }

    fn request(enzymes: &[&str]) -> DesignRequest {
        let mut insert = DNAsequence::from_sequence(&pseudo_random_insert(500, 42)).unwrap();
        insert.set_name("gfp");
        DesignRequest {
            method: CloningMethod::Overlap,
            vector: vector(),
            inserts: vec![insert],
            linkers: vec![],
            enzymes: enzymes.iter().map(|s| s.to_string()).collect(),
            insert_at: None,
        }
    }

    fn registry() -> Enzymes {
        Enzymes::builtin().unwrap()
    }

    #[test]
    fn test_config_defaults_and_parsing() {
        let config = DesignConfig::from_json_text("{}").unwrap();
        assert_eq!(config, DesignConfig::default());
        let config = DesignConfig::from_json_text(r#"{"target_tm": 58.0, "overlap_length": 30}"#).unwrap();
        assert_eq!(config.target_tm, 58.0);
        assert_eq!(config.overlap_length, 30);
        assert_eq!(config.max_core_length, 40);
        let err = DesignConfig::from_json_text(r#"{"min_core_length": 50}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(DesignConfig::from_json_text(r#"{"primer_nm": 0}"#).is_err());
        assert!(DesignConfig::from_json_text("not json").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"na_mm": 100.0}"#).unwrap();
        let config = DesignConfig::from_json_arg(&format!("@{}", path.to_string_lossy())).unwrap();
        assert_eq!(config.na_mm, 100.0);
        let err = DesignConfig::from_json_arg("@/nonexistent/config.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::Io);
    }

    #[test]
    fn test_directional_design() {
        let result = run_design_with(&request(&["EcoRI", "BamHI"]), &DesignConfig::default(), &registry()).unwrap();
        // Backbone runs BamHI → EcoRI: 2700 bp minus the GATCC and G remnants.
        assert_eq!(result.backbone.sequence.len(), 2694);
        assert!(!result.backbone.non_directional);
        assert_eq!(result.plan.len(), 3194);
        assert_eq!(result.primer_pairs.len(), 1);
        assert!(
            result
                .warnings
                .iter()
                .all(|w| w.code != WarningCode::EnzymeAbsent && w.code != WarningCode::NonDirectional)
        );

        let report = result.to_report();
        assert_eq!(report.method, "overlap");
        assert_eq!(report.assembled_length, 3194);
        assert_eq!(report.assembled_sequence.as_bytes(), result.plan.sequence.as_slice());
        assert_eq!(report.junctions.len(), 2);
        assert_eq!(report.junctions[0].label, "pTest|gfp");
        assert_eq!(report.primer_pairs[0].forward.name, "gfp_fwd");
        assert_eq!(report.primer_pairs[0].forward.tail.len(), 25);
        assert!(report.to_json_pretty().unwrap().contains("\"protocol_version\": \"1\""));

        let records = result.fasta_records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "pTest_assembled");
        assert_eq!(records[0].sequence.len(), 3194);
        assert_eq!(records[0].sequence, report.assembled_sequence);
    }

    #[test]
    fn test_restored_sites() {
        let config = DesignConfig {
            restore_recognition_sites: true,
            ..Default::default()
        };
        let result = run_design_with(&request(&["EcoRI", "BamHI"]), &config, &registry()).unwrap();
        let backbone = String::from_utf8(result.backbone.sequence.clone()).unwrap();
        assert!(backbone.starts_with("GGATCC"));
        assert!(backbone.ends_with("GAATTC"));
        assert_eq!(result.plan.len(), 3206);
    }

    #[test]
    fn test_absent_enzyme_falls_back_to_single_cut() {
        let result = run_design_with(&request(&["EcoRI", "NotI"]), &DesignConfig::default(), &registry()).unwrap();
        let codes: Vec<WarningCode> = result.warnings.iter().map(|w| w.code).collect();
        assert!(codes.contains(&WarningCode::EnzymeAbsent));
        assert!(codes.contains(&WarningCode::NonDirectional));
        assert!(result.backbone.non_directional);
        assert_eq!(result.backbone.enzymes, vec!["EcoRI".to_string()]);
        assert_eq!(result.backbone.sequence.len(), 2994);
    }

    #[test]
    fn test_enzyme_errors() {
        let err = run_design_with(&request(&["EcoRI", "Bogus"]), &DesignConfig::default(), &registry()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownEnzyme);
        let err = run_design_with(&request(&["NotI"]), &DesignConfig::default(), &registry()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoUsableEnzyme);
        let mut both = request(&["EcoRI"]);
        both.insert_at = Some(10);
        let err = run_design_with(&both, &DesignConfig::default(), &registry()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_insert_at_with_linkers() {
        let mut req = request(&[]);
        req.insert_at = Some(1000);
        let second = DNAsequence::from_sequence(&pseudo_random_insert(300, 7)).unwrap();
        req.inserts.push(second);
        req.linkers = vec!["GGSGGS".replace('S', "C")];
        let result = run_design_with(&req, &DesignConfig::default(), &registry()).unwrap();
        assert_eq!(result.plan.len(), 3000 + 500 + 6 + 300);
        assert_eq!(result.plan.junctions.len(), 4);
        assert_eq!(result.primer_pairs.len(), 2);
        assert_eq!(result.primer_pairs[1].insert, "insert_2");
        // The first insert's reverse primer carries the linker.
        let tail = reverse_complement(result.primer_pairs[0].reverse.tail.as_bytes());
        assert!(tail.starts_with(b"GGCGGC"));

        req.linkers.clear();
        let err = run_design_with(&req, &DesignConfig::default(), &registry()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_sequence_limit() {
        let config = DesignConfig {
            max_sequence_length: 1000,
            ..Default::default()
        };
        let err = run_design_with(&request(&["EcoRI", "BamHI"]), &config, &registry()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_homology_longer_than_construct() {
        let mut req = request(&[]);
        req.insert_at = Some(1000);
        let config = DesignConfig {
            overlap_length: 2000,
            ..Default::default()
        };
        let err = run_design_with(&req, &config, &registry()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.message.contains("overlap_length"));

        req.method = CloningMethod::UracilExcision;
        let config = DesignConfig {
            uracil_search_radius: 2000,
            ..Default::default()
        };
        let err = run_design_with(&req, &config, &registry()).unwrap_err();
        assert!(err.message.contains("uracil_search_radius"));
        assert!(run_design_with(&req, &DesignConfig::default(), &registry()).is_ok());
    }
}
