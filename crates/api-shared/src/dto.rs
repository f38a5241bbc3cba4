//! Request and response bodies for the REST API.
//!
//! Every type here carries a `utoipa` schema and camelCase field names. Conversions from the
//! core types live beside each DTO.

use chrono::NaiveDate;
use emr_core::encounter::{DiagnosisForm, PrescriptionForm};
use emr_core::{Doctor, EncounterForm, FieldError, NavItem, Patient, Role, Session, User};
use serde::{Deserialize, Serialize};
use terminology::{ConceptEntry, ConceptMapping, ConceptTables, TargetCode, TargetGroups};
use utoipa::ToSchema;

// ============================================================================
// Health and errors
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Generic failure body.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub success: bool,
    pub message: String,
}

impl ErrorRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FieldErrorDto {
    pub field: String,
    pub message: String,
}

impl From<FieldError> for FieldErrorDto {
    fn from(e: FieldError) -> Self {
        Self {
            field: e.field,
            message: e.message,
        }
    }
}

/// Validation failure body (HTTP 422).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorRes {
    pub success: bool,
    pub message: String,
    pub errors: Vec<FieldErrorDto>,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    /// `admin`, `doctor` or `user`.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abha_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role.as_str().to_owned(),
            abha_id: u.abha_id,
            phone: u.phone,
            specialty: u.specialty,
            license_number: u.license_number,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NavItemDto {
    pub name: String,
    pub href: String,
    pub description: String,
}

impl From<&NavItem> for NavItemDto {
    fn from(n: &NavItem) -> Self {
        Self {
            name: n.name.into(),
            href: n.href.into(),
            description: n.description.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleNavigationDto {
    pub role: String,
    pub default_route: String,
    pub navigation: Vec<NavItemDto>,
}

impl From<Role> for RoleNavigationDto {
    fn from(role: Role) -> Self {
        Self {
            role: role.as_str().into(),
            default_route: role.default_route().into(),
            navigation: role.navigation().iter().map(NavItemDto::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRes {
    pub success: bool,
    pub token: String,
    pub user: UserDto,
    pub default_route: String,
    pub navigation: Vec<NavItemDto>,
}

impl From<Session> for LoginRes {
    fn from(session: Session) -> Self {
        let nav = RoleNavigationDto::from(session.user.role);
        Self {
            success: true,
            token: session.token,
            user: session.user.into(),
            default_route: nav.default_route,
            navigation: nav.navigation,
        }
    }
}

// ============================================================================
// Terminology
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConceptDto {
    pub code: String,
    pub display: String,
    pub system: String,
    pub description: String,
}

impl From<&ConceptEntry> for ConceptDto {
    fn from(e: &ConceptEntry) -> Self {
        Self {
            code: e.code.to_string(),
            display: e.display.to_string(),
            system: e.system.to_string(),
            description: e.description.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetDto {
    pub code: String,
    pub display: String,
    /// `TM2` or `Biomedicine`.
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&TargetCode> for TargetDto {
    fn from(t: &TargetCode) -> Self {
        Self {
            code: t.code.to_string(),
            display: t.display.to_string(),
            module: t.module.as_str().into(),
            description: t.description.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroupsDto {
    pub tm2: Vec<TargetDto>,
    pub biomedicine: Vec<TargetDto>,
}

impl From<&TargetGroups> for TargetGroupsDto {
    fn from(g: &TargetGroups) -> Self {
        Self {
            tm2: g.tm2.iter().map(TargetDto::from).collect(),
            biomedicine: g.biomedicine.iter().map(TargetDto::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitDto {
    #[serde(flatten)]
    pub concept: ConceptDto,
    pub targets: TargetGroupsDto,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchRes {
    pub query: String,
    pub results: Vec<SearchHitDto>,
}

impl SearchRes {
    /// Search `tables` and attach resolved targets to every hit.
    pub fn build(tables: &ConceptTables, query: &str) -> Self {
        let results = tables
            .search(query)
            .into_iter()
            .map(|entry| SearchHitDto {
                concept: entry.into(),
                targets: (&tables.resolve_grouped(entry.code.as_str())).into(),
            })
            .collect();
        Self {
            query: query.to_owned(),
            results,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateReq {
    pub namaste_code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MappingDto {
    pub source_code: String,
    pub source_system: String,
    pub target_code: String,
    pub target_system: String,
    pub equivalence: String,
}

impl From<&ConceptMapping> for MappingDto {
    fn from(m: &ConceptMapping) -> Self {
        Self {
            source_code: m.source_code.to_string(),
            source_system: m.source_system.to_string(),
            target_code: m.target_code.to_string(),
            target_system: m.target_system.to_string(),
            equivalence: m.equivalence.as_str().into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRes {
    pub namaste_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ConceptDto>,
    pub targets: TargetGroupsDto,
    pub mappings: Vec<MappingDto>,
}

impl TranslateRes {
    pub fn build(tables: &ConceptTables, namaste_code: &str) -> Self {
        let code = namaste_code.trim();
        let translation = tables.translate(code);
        Self {
            namaste_code: code.to_owned(),
            source: translation.source.as_ref().map(ConceptDto::from),
            targets: (&translation.targets.into_iter().collect::<TargetGroups>()).into(),
            mappings: translation.mappings.iter().map(MappingDto::from).collect(),
        }
    }
}

// ============================================================================
// Bundles
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReq {
    /// NAMASTE source code, for example `AYU003`.
    pub code: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub include_target_codes: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionReq {
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// A complete encounter to validate and compose.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComposeBundleReq {
    #[serde(default)]
    pub patient_id: String,
    /// Defaults to today.
    #[serde(default)]
    pub encounter_date: Option<NaiveDate>,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub clinical_notes: String,
    #[serde(default)]
    pub diagnoses: Vec<DiagnosisReq>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionReq>,
}

impl From<ComposeBundleReq> for EncounterForm {
    fn from(req: ComposeBundleReq) -> Self {
        Self {
            patient_id: req.patient_id,
            encounter_date: req.encounter_date,
            chief_complaint: req.chief_complaint,
            clinical_notes: req.clinical_notes,
            diagnoses: req
                .diagnoses
                .into_iter()
                .map(|d| DiagnosisForm {
                    code: d.code,
                    notes: d.notes,
                    include_target_codes: d.include_target_codes,
                })
                .collect(),
            prescriptions: req
                .prescriptions
                .into_iter()
                .map(|p| PrescriptionForm {
                    medication: p.medication,
                    strength: p.strength,
                    form: p.form,
                    dosage: p.dosage,
                    frequency: p.frequency,
                    duration: p.duration,
                    instructions: p.instructions,
                    quantity: p.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BundleRes {
    pub success: bool,
    /// FHIR `Bundle` of type `collection`.
    #[schema(value_type = Object)]
    pub bundle: fhir::Bundle,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadBundleRes {
    pub success: bool,
    pub message: String,
    pub bundle_id: String,
    pub entries: usize,
}

// ============================================================================
// Gateways
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDto {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
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
}

impl From<Patient> for PatientDto {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            name: p.name,
            email: p.email,
            abha_id: p.abha_id,
            date_of_birth: p.date_of_birth,
            gender: p.gender,
            status: p.status,
            primary_diagnosis: p.primary_diagnosis,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDto {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
}

impl From<Doctor> for DoctorDto {
    fn from(d: Doctor) -> Self {
        Self {
            id: d.id,
            name: d.name,
            email: d.email,
            license_number: d.license_number,
            specialty: d.specialty,
            status: d.status,
            hospital: d.hospital,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListDoctorsRes {
    pub doctors: Vec<DoctorDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_res_attaches_grouped_targets() {
        let tables = ConceptTables::embedded().unwrap();
        let res = SearchRes::build(&tables, "  prameha ");
        assert_eq!(res.query, "prameha");
        assert_eq!(res.results.len(), 1);

        let hit = &res.results[0];
        assert_eq!(hit.concept.code, "AYU003");
        assert_eq!(hit.targets.tm2[0].code, "TM2-125");
        assert_eq!(hit.targets.biomedicine[0].code, "E14.9");

        let json = serde_json::to_value(hit).unwrap();
        assert_eq!(json["code"], "AYU003");
        assert_eq!(json["targets"]["biomedicine"][0]["module"], "Biomedicine");
    }

    #[test]
    fn translate_res_keeps_snomed_mappings() {
        let tables = ConceptTables::embedded().unwrap();
        let res = TranslateRes::build(&tables, "AYU001");
        assert_eq!(res.source.as_ref().map(|s| s.display.as_str()), Some("Amavata"));
        assert!(res
            .mappings
            .iter()
            .any(|m| m.target_system == "SNOMED-CT" && m.equivalence == "equivalent"));
        let tm2: Vec<&str> = res.targets.tm2.iter().map(|t| t.code.as_str()).collect();
        let bio: Vec<&str> = res.targets.biomedicine.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(tm2, vec!["TM2-123"]);
        assert_eq!(bio, vec!["M06.9"]);

        let unknown = TranslateRes::build(&tables, "XYZ");
        assert!(unknown.source.is_none());
        assert!(unknown.mappings.is_empty());
        assert!(unknown.targets.tm2.is_empty() && unknown.targets.biomedicine.is_empty());
    }

    #[test]
    fn login_res_carries_role_navigation() {
        let session = Session {
            token: "demo-token-demo-admin-001".into(),
            user: emr_core::DemoAuthProvider::new().users()[0].clone(),
        };
        let res = LoginRes::from(session);
        assert_eq!(res.user.role, "admin");
        assert_eq!(res.default_route, "/app/admin/dashboard");
        assert_eq!(res.navigation.len(), 4);
    }

    #[test]
    fn compose_req_defaults() {
        let req: ComposeBundleReq = serde_json::from_value(serde_json::json!({
            "patientId": "123",
            "diagnoses": [{ "code": "AYU003" }]
        }))
        .unwrap();
        let form = EncounterForm::from(req);
        assert!(form.encounter_date.is_none());
        assert!(form.diagnoses[0].include_target_codes);
        assert!(form.prescriptions.is_empty());
    }
}
