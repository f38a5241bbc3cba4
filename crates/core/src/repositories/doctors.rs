//! Doctor gateway.

use super::{string_or_number, ListBody};
use crate::http::ApiClient;
use crate::{EmrError, EmrResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abha_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
}

#[async_trait]
pub trait DoctorRepository: Send + Sync {
    async fn list(&self) -> EmrResult<Vec<Doctor>>;

    /// # Errors
    ///
    /// Returns [`EmrError::NotFound`] for an unknown id.
    async fn get(&self, id: &str) -> EmrResult<Doctor>;
}

#[derive(Clone, Debug)]
pub struct MockDoctorRepository {
    doctors: Vec<Doctor>,
}

impl Default for MockDoctorRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDoctorRepository {
    pub fn new() -> Self {
        let doctor = |id: &str,
                      name: &str,
                      email: &str,
                      license_number: &str,
                      specialty: &str,
                      qualification: &str,
                      status: &str,
                      hospital: &str| Doctor {
            id: id.into(),
            name: name.into(),
            email: Some(email.into()),
            abha_id: Some(format!("ABHA-DOC-00{id}")),
            license_number: Some(license_number.into()),
            specialty: Some(specialty.into()),
            qualification: Some(qualification.into()),
            status: Some(status.into()),
            hospital: Some(hospital.into()),
        };

        Self {
            doctors: vec![
                doctor(
                    "1",
                    "Dr. Priya Sharma",
                    "priya.sharma@hospital.com",
                    "MH-12345",
                    "Cardiology",
                    "MD, DM Cardiology",
                    "active",
                    "Apollo Hospital, Mumbai",
                ),
                doctor(
                    "2",
                    "Dr. Rajesh Kumar",
                    "rajesh.kumar@hospital.com",
                    "DL-67890",
                    "General Medicine",
                    "MBBS, MD Medicine",
                    "pending_approval",
                    "Fortis Hospital, Delhi",
                ),
                doctor(
                    "3",
                    "Dr. Amit Patel",
                    "amit.patel@hospital.com",
                    "KA-54321",
                    "Pediatrics",
                    "MBBS, MD Pediatrics",
                    "active",
                    "Manipal Hospital, Bangalore",
                ),
                doctor(
                    "4",
                    "Dr. Sunita Devi",
                    "sunita.devi@hospital.com",
                    "TN-98765",
                    "Orthopedics",
                    "MBBS, MS Orthopedics",
                    "suspended",
                    "Apollo Hospital, Chennai",
                ),
            ],
        }
    }
}

#[async_trait]
impl DoctorRepository for MockDoctorRepository {
    async fn list(&self) -> EmrResult<Vec<Doctor>> {
        Ok(self.doctors.clone())
    }

    async fn get(&self, id: &str) -> EmrResult<Doctor> {
        self.doctors
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| EmrError::NotFound(format!("doctor {id}")))
    }
}

/// `GET {base}/admin/doctors` and `GET {base}/getDoctors/{id}`.
#[derive(Clone, Debug)]
pub struct HttpDoctorRepository {
    client: ApiClient,
}

impl HttpDoctorRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DoctorRepository for HttpDoctorRepository {
    async fn list(&self) -> EmrResult<Vec<Doctor>> {
        let body: ListBody<Doctor> = self.client.get_json("/admin/doctors", &[]).await?;
        Ok(body.into_vec())
    }

    async fn get(&self, id: &str) -> EmrResult<Doctor> {
        if id.trim().is_empty() || id.contains('/') {
            return Err(EmrError::InvalidInput(format!("invalid doctor id: {id:?}")));
        }
        self.client
            .get_json(&format!("/getDoctors/{id}"), &[])
            .await
    }
}
