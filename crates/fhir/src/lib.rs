//! FHIR wire/boundary support for encounter submissions.
//!
//! This crate provides **wire models** and **translation helpers** for the FHIR-shaped bundle
//! a finalised encounter is submitted as:
//! - `Bundle` of type `collection`
//! - one `Encounter`, one `Condition` per diagnosis, one `MedicationRequest` per prescription
//!
//! This crate focuses on:
//! - FHIR semantic alignment (JSON field names and value sets)
//! - serialisation/deserialisation
//! - translation between domain primitives and wire structs
//!
//! It does not model FHIR generally; only the resource kinds and fields a submission carries.

pub mod bundle;

pub use bundle::{
    Bundle, BundleEntry, BundleType, CodeableConcept, Coding, Condition, DiagnosisEntry,
    Encounter, EncounterMeta, MedicationOrder, MedicationRequest, Resource, ACT_CODE_SYSTEM,
    ICD11_SYSTEM, NAMASTE_SYSTEM,
};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
