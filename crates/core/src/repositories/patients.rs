//! Patient gateway.

use super::{any_field_contains, string_or_number, ListBody};
use crate::http::ApiClient;
use crate::{EmrError, EmrResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abha_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
}

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn list(&self) -> EmrResult<Vec<Patient>>;

    /// Patients whose name, email or ABHA id contains `query` (case-insensitive).
    async fn search(&self, query: &str) -> EmrResult<Vec<Patient>>;

    /// # Errors
    ///
    /// Returns [`EmrError::NotFound`] for an unknown id.
    async fn get(&self, id: &str) -> EmrResult<Patient>;
}

// ============================================================================
// Demo data
// ============================================================================

#[derive(Clone, Debug)]
pub struct MockPatientRepository {
    patients: Vec<Patient>,
}

impl Default for MockPatientRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPatientRepository {
    pub fn new() -> Self {
        let patient = |id: &str,
                       name: &str,
                       email: &str,
                       abha_id: &str,
                       date_of_birth: &str,
                       gender: &str,
                       status: &str,
                       primary_diagnosis: &str,
                       allergies: &str| Patient {
            id: id.into(),
            name: name.into(),
            email: Some(email.into()),
            phone: None,
            abha_id: Some(abha_id.into()),
            date_of_birth: Some(date_of_birth.into()),
            gender: Some(gender.into()),
            status: Some(status.into()),
            primary_diagnosis: Some(primary_diagnosis.into()),
            allergies: Some(allergies.into()),
        };

        Self::with_patients(vec![
            patient(
                "1",
                "Rajesh Kumar",
                "rajesh.kumar@email.com",
                "ABHA-1234567890",
                "1979-05-15",
                "Male",
                "active",
                "Type 2 Diabetes",
                "Penicillin",
            ),
            patient(
                "2",
                "Priya Sharma",
                "priya.sharma@email.com",
                "ABHA-0987654321",
                "1992-03-22",
                "Female",
                "active",
                "Hypertension",
                "None",
            ),
            patient(
                "3",
                "Amit Patel",
                "amit.patel@email.com",
                "ABHA-1122334455",
                "1996-11-08",
                "Male",
                "inactive",
                "Acute Bronchitis",
                "Dust",
            ),
            patient(
                "4",
                "Sunita Devi",
                "sunita.devi@email.com",
                "ABHA-5566778899",
                "1969-09-12",
                "Female",
                "active",
                "Osteoarthritis",
                "None",
            ),
            patient(
                "5",
                "Vikram Singh",
                "vikram.singh@email.com",
                "ABHA-9988776655",
                "1985-07-30",
                "Male",
                "active",
                "Asthma",
                "Pollen, Dust",
            ),
        ])
    }

    pub fn with_patients(patients: Vec<Patient>) -> Self {
        Self { patients }
    }
}

#[async_trait]
impl PatientRepository for MockPatientRepository {
    async fn list(&self) -> EmrResult<Vec<Patient>> {
        Ok(self.patients.clone())
    }

    async fn search(&self, query: &str) -> EmrResult<Vec<Patient>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .patients
            .iter()
            .filter(|p| {
                any_field_contains(
                    [
                        Some(p.name.as_str()),
                        p.email.as_deref(),
                        p.abha_id.as_deref(),
                    ],
                    &needle,
                )
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> EmrResult<Patient> {
        self.patients
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| EmrError::NotFound(format!("patient {id}")))
    }
}

// ============================================================================
// Upstream API
// ============================================================================

/// `GET {base}/doctor/patients`, `GET {base}/patients?q=`, `GET {base}/patients/{id}`.
#[derive(Clone, Debug)]
pub struct HttpPatientRepository {
    client: ApiClient,
}

impl HttpPatientRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PatientRepository for HttpPatientRepository {
    async fn list(&self) -> EmrResult<Vec<Patient>> {
        let body: ListBody<Patient> = self.client.get_json("/doctor/patients", &[]).await?;
        Ok(body.into_vec())
    }

    async fn search(&self, query: &str) -> EmrResult<Vec<Patient>> {
        let body: ListBody<Patient> = self
            .client
            .get_json("/patients", &[("q", query.trim())])
            .await?;
        Ok(body.into_vec())
    }

    async fn get(&self, id: &str) -> EmrResult<Patient> {
        if id.trim().is_empty() || id.contains('/') {
            return Err(EmrError::InvalidInput(format!("invalid patient id: {id:?}")));
        }
        self.client
            .get_json(&format!("/patients/{id}"), &[])
            .await
    }
}
