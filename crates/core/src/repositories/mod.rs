//! Patient and doctor gateways.
//!
//! Each gateway is a trait with two implementations:
//! - `Mock*`: seeded from the demo data set, for development and tests
//! - `Http*`: the upstream EMR API
//!
//! Upstream payloads carry numeric or string ids; both are read into a `String`.

pub mod doctors;
pub mod patients;

pub use doctors::{Doctor, DoctorRepository, HttpDoctorRepository, MockDoctorRepository};
pub use patients::{HttpPatientRepository, MockPatientRepository, Patient, PatientRepository};

use serde::{Deserialize, Deserializer};

/// Accept `"7"` or `7` for an id field.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

/// Upstream list endpoints return either a bare array or `{"data": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListBody<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

/// Case-insensitive containment of `needle` (already lowercased) in any of `fields`.
pub(crate) fn any_field_contains<'a>(
    fields: impl IntoIterator<Item = Option<&'a str>>,
    needle: &str,
) -> bool {
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}
