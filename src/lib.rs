use enzymes::Enzymes;
use lazy_static::lazy_static;

pub mod assembly;
pub mod circular;
pub mod design;
pub mod digest;
pub mod dna_sequence;
pub mod enzymes;
pub mod error;
pub mod iupac_code;
pub mod primer;
pub mod restriction_enzyme;
pub mod structure;
pub mod thermo;

lazy_static! {
    // Restriction enzymes
    pub static ref ENZYMES: Enzymes = Enzymes::default();
}
