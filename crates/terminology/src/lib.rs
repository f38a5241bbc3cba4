//! Dual-coding terminology support.
//!
//! This crate holds the reference data that links traditional-medicine terms (NAMASTE codes for
//! Ayurveda, Siddha and Unani) to ICD-11 (Traditional Medicine Module 2 and Biomedicine) and to
//! SNOMED CT, and the two lookups the diagnosis workflow runs over it:
//! - [`ConceptTables::search`]: case-insensitive substring search over source concepts
//! - [`ConceptTables::resolve_targets`]: source code to ICD-11 target codes
//!
//! Both lookups are total: no match is an empty result, never an error. Errors only arise while
//! loading tables.

pub mod model;
pub mod resolve;
pub mod search;
pub mod tables;

pub use model::{
    ConceptEntry, ConceptMapping, Equivalence, TargetCode, TargetModule, TargetSystem,
};
pub use resolve::{TargetGroups, Translation, PLACEHOLDER_BIOMEDICAL_DISPLAY};
pub use tables::ConceptTables;

/// Errors returned while building or loading concept tables.
#[derive(Debug, thiserror::Error)]
pub enum TerminologyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Schema(String),

    #[error("failed to read terminology tables from {path}: {source}", path = path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate concept code: {0}")]
    DuplicateConcept(String),

    #[error("duplicate target code: {0}")]
    DuplicateTarget(String),

    #[error("mappings[{index}] references unknown source code {code}")]
    UnknownSourceCode { index: usize, code: String },

    #[error("mappings[{index}] references unknown ICD-11-TM2 code {code}")]
    UnknownTargetCode { index: usize, code: String },

    #[error("mappings[{index}] references {code} outside its {module} module")]
    ModuleMismatch {
        index: usize,
        code: String,
        module: &'static str,
    },
}

/// Type alias for Results that can fail with a [`TerminologyError`].
pub type TerminologyResult<T> = Result<T, TerminologyError>;
