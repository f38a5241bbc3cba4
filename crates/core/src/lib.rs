//! # EMR Core
//!
//! Core business logic for the dual-coding diagnosis workflow.
//!
//! This crate contains:
//! - The in-progress encounter ([`EncounterDraft`]) with its diagnosis list state machine
//! - Encounter validation with per-field errors
//! - Seams for everything outside the process: bundle submission, authentication and the
//!   patient/doctor gateways, each with an in-memory and an HTTP implementation
//! - Startup configuration ([`CoreConfig`]) and an injectable [`Clock`]
//!
//! **No API concerns**: HTTP servers, request extraction and OpenAPI belong in `api-rest` and
//! `api-shared`.

pub mod auth;
pub mod clock;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod diagnosis;
pub mod encounter;
pub mod error;
pub mod http;
pub mod repositories;
pub mod roles;
pub mod submission;
pub mod validation;

pub use auth::{AuthProvider, Credentials, DemoAuthProvider, HttpAuthProvider, Session, User};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Backend, CoreConfig, EnvValues};
pub use debounce::SearchDebouncer;
pub use diagnosis::{DiagnosisSelection, Prescription, PrescriptionField};
pub use encounter::{
    compose_bundle, DraftRejected, EncounterDetails, EncounterDraft, EncounterForm, Editing,
    ReadyToSubmit, SearchState, Submitted,
};
pub use error::{EmrError, EmrResult};
pub use http::ApiClient;
pub use repositories::{
    Doctor, DoctorRepository, HttpDoctorRepository, HttpPatientRepository, MockDoctorRepository,
    MockPatientRepository, Patient, PatientRepository,
};
pub use roles::{NavItem, Role, RouteGroup};
pub use submission::{
    BundleSubmitter, HttpBundleSubmitter, InMemoryBundleSubmitter, SubmissionReceipt,
};
pub use validation::{validate_encounter, EncounterFields, FieldError, ValidationErrors};
