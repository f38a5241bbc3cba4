//! FHIR-shaped encounter bundle: wire model and composer.
//!
//! A submission is a `collection` Bundle holding one `Encounter`, one `Condition` per diagnosis
//! and one `MedicationRequest` per prescription. Field names are FHIR camelCase.
//!
//! Responsibilities:
//! - Define the wire model for serialisation/deserialisation
//! - Compose a bundle from domain-level encounter, diagnosis and medication inputs
//! - Parse uploaded bundles strictly, reporting the failing field path
//!
//! The composer assumes validated input and never fails. The bundle timestamp is supplied by the
//! caller so that composition is deterministic under test.

use crate::{FhirError, FhirResult};
use chrono::{DateTime, NaiveDate, Utc};
use emr_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use terminology::{ConceptEntry, TargetCode};

/// Code system URI for NAMASTE source codes.
pub const NAMASTE_SYSTEM: &str = "https://namaste.ayush.gov.in/fhir/CodeSystem/namaste";

/// Code system URI for ICD-11 MMS (both TM2 and Biomedicine codes).
pub const ICD11_SYSTEM: &str = "http://id.who.int/icd/release/11/mms";

/// Code system URI for the encounter class.
pub const ACT_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";

// ============================================================================
// Composer inputs
// ============================================================================

/// Encounter-level metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncounterMeta {
    pub patient_id: NonEmptyText,
    pub date: NaiveDate,
    pub chief_complaint: Option<NonEmptyText>,
}

/// One diagnosis as it should appear in the bundle.
///
/// `targets` is empty when the clinician chose not to include mapped codes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosisEntry {
    pub source: ConceptEntry,
    pub targets: Vec<TargetCode>,
    pub note: Option<NonEmptyText>,
}

/// One medication order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MedicationOrder {
    pub medication: NonEmptyText,
    pub strength: Option<NonEmptyText>,
    pub form: Option<NonEmptyText>,
    pub dosage: Option<NonEmptyText>,
    pub frequency: Option<NonEmptyText>,
    pub duration: Option<NonEmptyText>,
    pub instructions: Option<NonEmptyText>,
    pub quantity: Option<u32>,
}

impl MedicationOrder {
    /// "Metformin 500mg tablet": name, then strength and form when present.
    pub fn medication_text(&self) -> String {
        join_present([
            Some(&self.medication),
            self.strength.as_ref(),
            self.form.as_ref(),
        ])
    }

    /// "Twice daily After meals for 30 days": dosage and frequency, then the duration.
    ///
    /// Returns `None` when none of the three fields is present.
    pub fn dosage_text(&self) -> Option<String> {
        let head = join_present([self.dosage.as_ref(), self.frequency.as_ref()]);
        let text = match (&self.duration, head.is_empty()) {
            (Some(duration), true) => format!("for {duration}"),
            (Some(duration), false) => format!("{head} for {duration}"),
            (None, _) => head,
        };
        (!text.is_empty()).then_some(text)
    }
}

fn join_present<'a>(parts: impl IntoIterator<Item = Option<&'a NonEmptyText>>) -> String {
    parts
        .into_iter()
        .flatten()
        .map(NonEmptyText::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Wire model
// ============================================================================

/// Marker for the `resourceType` of a bundle; rejects anything but `"Bundle"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleResourceType {
    Bundle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    Collection,
    Document,
    Message,
    Transaction,
    Batch,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: BundleResourceType,
    #[serde(rename = "type")]
    pub bundle_type: BundleType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub resource: Resource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Encounter(Encounter),
    Condition(Condition),
    MedicationRequest(MedicationRequest),
}

impl Resource {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Encounter(_) => "Encounter",
            Self::Condition(_) => "Condition",
            Self::MedicationRequest(_) => "MedicationRequest",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncounterStatus {
    Planned,
    Arrived,
    InProgress,
    Finished,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub status: EncounterStatus,
    pub class: Coding,
    pub subject: Reference,
    pub period: Period,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason_code: Vec<CodeableConcept>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub code: CodeableConcept,
    pub subject: Reference,
    pub onset_date_time: NaiveDate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationRequestStatus {
    Active,
    OnHold,
    Cancelled,
    Completed,
    Stopped,
    Draft,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationRequestIntent {
    Proposal,
    Plan,
    Order,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    pub status: MedicationRequestStatus,
    pub intent: MedicationRequestIntent,
    pub medication_codeable_concept: CodeableConcept,
    pub subject: Reference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_instruction: Vec<Dosage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispense_request: Option<DispenseRequest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    fn text(text: impl Into<String>) -> Self {
        Self {
            coding: Vec::new(),
            text: Some(text.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
}

impl Reference {
    pub fn patient(patient_id: &NonEmptyText) -> Self {
        Self {
            reference: format!("Patient/{patient_id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dosage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_instruction: Vec<CodeableConcept>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseRequest {
    pub quantity: Quantity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: u32,
}

// ============================================================================
// Public bundle operations
// ============================================================================

impl Bundle {
    /// Compose a submission bundle.
    ///
    /// Produces exactly `1 + diagnoses.len() + medications.len()` entries: the encounter first,
    /// then conditions and medication requests in input order.
    pub fn compose(
        meta: &EncounterMeta,
        diagnoses: &[DiagnosisEntry],
        medications: &[MedicationOrder],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let subject = Reference::patient(&meta.patient_id);

        let mut entry = Vec::with_capacity(1 + diagnoses.len() + medications.len());
        entry.push(BundleEntry {
            resource: Resource::Encounter(encounter(meta, subject.clone())),
        });
        entry.extend(diagnoses.iter().map(|diagnosis| BundleEntry {
            resource: Resource::Condition(condition(diagnosis, meta.date, subject.clone())),
        }));
        entry.extend(medications.iter().map(|order| BundleEntry {
            resource: Resource::MedicationRequest(medication_request(order, subject.clone())),
        }));

        Self {
            resource_type: BundleResourceType::Bundle,
            bundle_type: BundleType::Collection,
            timestamp,
            entry,
        }
    }

    /// Parse a bundle from JSON text.
    ///
    /// Uses `serde_path_to_error` so that schema errors name the failing field, for example
    /// `entry[1].resource.onsetDateTime`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if the JSON is not a bundle of the supported resource
    /// kinds, or any field has an unexpected type.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        serde_path_to_error::deserialize::<_, Bundle>(&mut deserializer).map_err(schema_error)
    }

    /// Convert an already-decoded JSON value into a bundle, with the same error reporting as
    /// [`Bundle::parse`].
    pub fn from_value(value: serde_json::Value) -> FhirResult<Self> {
        serde_path_to_error::deserialize::<_, Bundle>(value).map_err(schema_error)
    }

    /// Render as pretty-printed JSON.
    pub fn render(&self) -> FhirResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise bundle: {e}")))
    }

    /// Number of entries of each resource kind, in (encounters, conditions, medications) order.
    pub fn resource_counts(&self) -> (usize, usize, usize) {
        self.entry
            .iter()
            .fold((0, 0, 0), |(e, c, m), entry| match entry.resource {
                Resource::Encounter(_) => (e + 1, c, m),
                Resource::Condition(_) => (e, c + 1, m),
                Resource::MedicationRequest(_) => (e, c, m + 1),
            })
    }
}

fn schema_error(err: serde_path_to_error::Error<serde_json::Error>) -> FhirError {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() || path == "." {
        "<root>"
    } else {
        path.as_str()
    };
    FhirError::Translation(format!("Bundle schema mismatch at {path}: {source}"))
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn encounter(meta: &EncounterMeta, subject: Reference) -> Encounter {
    Encounter {
        status: EncounterStatus::Finished,
        class: Coding {
            system: Some(ACT_CODE_SYSTEM.to_owned()),
            code: "AMB".to_owned(),
            display: Some("ambulatory".to_owned()),
        },
        subject,
        period: Period { start: meta.date },
        reason_code: meta
            .chief_complaint
            .iter()
            .map(|complaint| CodeableConcept::text(complaint.as_str()))
            .collect(),
    }
}

fn condition(diagnosis: &DiagnosisEntry, date: NaiveDate, subject: Reference) -> Condition {
    let source = &diagnosis.source;

    let mut coding = Vec::with_capacity(1 + diagnosis.targets.len());
    coding.push(Coding {
        system: Some(NAMASTE_SYSTEM.to_owned()),
        code: source.code.to_string(),
        display: Some(source.display.to_string()),
    });
    coding.extend(diagnosis.targets.iter().map(|target| Coding {
        system: Some(ICD11_SYSTEM.to_owned()),
        code: target.code.to_string(),
        display: Some(target.display.to_string()),
    }));

    Condition {
        code: CodeableConcept {
            coding,
            text: Some(source.display.to_string()),
        },
        subject,
        onset_date_time: date,
        note: diagnosis
            .note
            .iter()
            .map(|note| Annotation {
                text: note.to_string(),
            })
            .collect(),
    }
}

fn medication_request(order: &MedicationOrder, subject: Reference) -> MedicationRequest {
    let additional_instruction: Vec<CodeableConcept> = order
        .instructions
        .iter()
        .map(|text| CodeableConcept::text(text.as_str()))
        .collect();
    let text = order.dosage_text();

    let dosage_instruction = if text.is_none() && additional_instruction.is_empty() {
        Vec::new()
    } else {
        vec![Dosage {
            text,
            additional_instruction,
        }]
    };

    MedicationRequest {
        status: MedicationRequestStatus::Active,
        intent: MedicationRequestIntent::Order,
        medication_codeable_concept: CodeableConcept::text(order.medication_text()),
        subject,
        dosage_instruction,
        dispense_request: order.quantity.map(|value| DispenseRequest {
            quantity: Quantity { value },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use terminology::ConceptTables;

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    fn fixed_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap()
    }

    fn meta() -> EncounterMeta {
        EncounterMeta {
            patient_id: text("123"),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            chief_complaint: Some(text("Increased thirst")),
        }
    }

    fn prameha(include_targets: bool) -> DiagnosisEntry {
        let tables = ConceptTables::embedded().unwrap();
        DiagnosisEntry {
            source: tables.concept("AYU003").unwrap().clone(),
            targets: if include_targets {
                tables.resolve_targets("AYU003")
            } else {
                Vec::new()
            },
            note: Some(text("Responding to diet change")),
        }
    }

    fn metformin() -> MedicationOrder {
        MedicationOrder {
            medication: text("Metformin"),
            strength: Some(text("500mg")),
            form: Some(text("tablet")),
            dosage: Some(text("Twice daily")),
            frequency: Some(text("After meals")),
            duration: Some(text("30 days")),
            instructions: Some(text("Take with food")),
            quantity: Some(60),
        }
    }

    #[test]
    fn encounter_only_bundle_has_one_entry() {
        let bundle = Bundle::compose(&meta(), &[], &[], fixed_timestamp());
        assert_eq!(bundle.entry.len(), 1);
        assert_eq!(bundle.entry[0].resource.resource_type(), "Encounter");
    }

    #[test]
    fn entry_count_is_one_plus_inputs() {
        let diagnoses = vec![prameha(true), prameha(false)];
        let medications = vec![metformin(); 3];
        let bundle = Bundle::compose(&meta(), &diagnoses, &medications, fixed_timestamp());

        assert_eq!(bundle.entry.len(), 1 + diagnoses.len() + medications.len());
        assert_eq!(bundle.resource_counts(), (1, 2, 3));
    }

    #[test]
    fn composition_is_deterministic_for_a_fixed_timestamp() {
        let first = Bundle::compose(&meta(), &[prameha(true)], &[metformin()], fixed_timestamp());
        let second = Bundle::compose(&meta(), &[prameha(true)], &[metformin()], fixed_timestamp());
        assert_eq!(first, second);
        assert_eq!(first.render().unwrap(), second.render().unwrap());
    }

    #[test]
    fn renders_expected_json_shape() {
        let bundle = Bundle::compose(&meta(), &[prameha(true)], &[metformin()], fixed_timestamp());
        let json: serde_json::Value = serde_json::to_value(&bundle).unwrap();

        assert_eq!(json["resourceType"], "Bundle");
        assert_eq!(json["type"], "collection");
        assert_eq!(json["timestamp"], "2026-01-11T14:35:22Z");

        let encounter = &json["entry"][0]["resource"];
        assert_eq!(encounter["resourceType"], "Encounter");
        assert_eq!(encounter["status"], "finished");
        assert_eq!(encounter["class"]["code"], "AMB");
        assert_eq!(encounter["subject"]["reference"], "Patient/123");
        assert_eq!(encounter["period"]["start"], "2024-01-10");
        assert_eq!(encounter["reasonCode"][0]["text"], "Increased thirst");

        let condition = &json["entry"][1]["resource"];
        assert_eq!(condition["resourceType"], "Condition");
        assert_eq!(condition["code"]["text"], "Prameha");
        assert_eq!(condition["code"]["coding"][0]["system"], NAMASTE_SYSTEM);
        assert_eq!(condition["code"]["coding"][0]["code"], "AYU003");
        assert_eq!(condition["code"]["coding"][1]["code"], "TM2-125");
        assert_eq!(condition["code"]["coding"][2]["code"], "E14.9");
        assert_eq!(condition["onsetDateTime"], "2024-01-10");
        assert_eq!(condition["note"][0]["text"], "Responding to diet change");

        let request = &json["entry"][2]["resource"];
        assert_eq!(request["resourceType"], "MedicationRequest");
        assert_eq!(request["status"], "active");
        assert_eq!(request["intent"], "order");
        assert_eq!(
            request["medicationCodeableConcept"]["text"],
            "Metformin 500mg tablet"
        );
        assert_eq!(
            request["dosageInstruction"][0]["text"],
            "Twice daily After meals for 30 days"
        );
        assert_eq!(
            request["dosageInstruction"][0]["additionalInstruction"][0]["text"],
            "Take with food"
        );
        assert_eq!(request["dispenseRequest"]["quantity"]["value"], 60);
    }

    #[test]
    fn excluded_targets_leave_only_the_source_coding() {
        let bundle = Bundle::compose(&meta(), &[prameha(false)], &[], fixed_timestamp());
        match &bundle.entry[1].resource {
            Resource::Condition(condition) => {
                assert_eq!(condition.code.coding.len(), 1);
                assert_eq!(condition.code.coding[0].code, "AYU003");
            }
            other => panic!("expected Condition, got {other:?}"),
        }
    }

    #[test]
    fn dosage_text_handles_missing_parts() {
        let mut order = metformin();
        order.frequency = None;
        assert_eq!(order.dosage_text().as_deref(), Some("Twice daily for 30 days"));

        order.dosage = None;
        assert_eq!(order.dosage_text().as_deref(), Some("for 30 days"));

        order.duration = None;
        assert_eq!(order.dosage_text(), None);

        order.instructions = None;
        let request = medication_request(&order, Reference::patient(&text("1")));
        assert!(request.dosage_instruction.is_empty());
    }

    #[test]
    fn parses_rendered_bundle_and_rejects_other_resource_types() {
        let bundle = Bundle::compose(&meta(), &[prameha(true)], &[metformin()], fixed_timestamp());
        let parsed = Bundle::parse(&bundle.render().unwrap()).expect("parse rendered bundle");
        assert_eq!(parsed, bundle);

        let err = Bundle::parse(r#"{"resourceType":"Patient","type":"collection","timestamp":"2026-01-11T14:35:22Z"}"#)
            .expect_err("should reject non-bundle");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("resourceType"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn schema_errors_name_the_failing_entry() {
        let input = r#"{
  "resourceType": "Bundle",
  "type": "collection",
  "timestamp": "2026-01-11T14:35:22Z",
  "entry": [
    {"resource": {"resourceType": "Condition",
                  "code": {"text": "Kasa"},
                  "subject": {"reference": "Patient/1"},
                  "onsetDateTime": "yesterday"}}
  ]
}"#;
        let err = Bundle::parse(input).expect_err("should reject bad date");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("entry[0]"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }
}
