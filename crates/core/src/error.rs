use crate::validation::ValidationErrors;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum EmrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("code {0} is not in the current search results")]
    NotInResults(String),

    #[error("no search result is selected")]
    NoSelection,

    #[error("unknown diagnosis: {0}")]
    UnknownDiagnosis(Uuid),

    #[error("unknown prescription: {0}")]
    UnknownPrescription(Uuid),

    #[error("submission failed: {0}")]
    Transport(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing or invalid token")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("terminology error: {0}")]
    Terminology(#[from] terminology::TerminologyError),

    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
}

impl From<reqwest::Error> for EmrError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Type alias for Results that can fail with an [`EmrError`].
pub type EmrResult<T> = std::result::Result<T, EmrError>;
