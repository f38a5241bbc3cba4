//! Encounter validation.
//!
//! Validation runs before composition and reports every failing field at once, keyed by the
//! form field name (`patientId`, `chiefComplaint`, `clinicalNotes`, `diagnoses`,
//! `prescriptions[i].medication`).

use crate::diagnosis::Prescription;
use serde::Serialize;
use std::fmt;

/// One failing field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All failing fields of one validation run, in form order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Message for `field`, if it failed.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// The parts of an encounter that validation looks at.
#[derive(Clone, Copy, Debug)]
pub struct EncounterFields<'a> {
    pub patient_id: &'a str,
    pub chief_complaint: &'a str,
    pub clinical_notes: &'a str,
    pub diagnosis_count: usize,
    pub prescriptions: &'a [Prescription],
}

/// Validate an encounter before composition.
///
/// # Errors
///
/// Returns every failing field; the draft itself is never modified.
pub fn validate_encounter(fields: &EncounterFields<'_>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if fields.patient_id.trim().is_empty() {
        errors.push("patientId", "Patient ID is required");
    }
    if fields.chief_complaint.trim().is_empty() {
        errors.push("chiefComplaint", "Chief complaint is required");
    }
    if fields.clinical_notes.trim().is_empty() {
        errors.push("clinicalNotes", "Clinical notes are required");
    }
    if fields.diagnosis_count == 0 {
        errors.push("diagnoses", "At least one diagnosis is required");
    }
    for (i, prescription) in fields.prescriptions.iter().enumerate() {
        if prescription.medication.trim().is_empty() {
            errors.push(
                format!("prescriptions[{i}].medication"),
                "Medication name is required",
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete<'a>(prescriptions: &'a [Prescription]) -> EncounterFields<'a> {
        EncounterFields {
            patient_id: "123",
            chief_complaint: "Increased thirst",
            clinical_notes: "Polyuria for three weeks",
            diagnosis_count: 1,
            prescriptions,
        }
    }

    #[test]
    fn test_complete_encounter_passes() {
        assert!(validate_encounter(&complete(&[])).is_ok());
    }

    #[test]
    fn test_blank_encounter_reports_every_required_field() {
        let fields = EncounterFields {
            patient_id: "",
            chief_complaint: "  ",
            clinical_notes: "",
            diagnosis_count: 0,
            prescriptions: &[],
        };
        let errors = validate_encounter(&fields).unwrap_err();

        let keys: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            keys,
            vec!["patientId", "chiefComplaint", "clinicalNotes", "diagnoses"]
        );
        assert_eq!(errors.get("patientId"), Some("Patient ID is required"));
        assert!(errors.to_string().starts_with("patientId: Patient ID is required; "));
    }

    #[test]
    fn test_prescription_rows_need_a_medication() {
        let mut named = Prescription::new();
        named.medication = "Ashwagandha".into();
        let blank = Prescription::new();
        let rows = vec![named, blank];

        let errors = validate_encounter(&complete(&rows)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get("prescriptions[1].medication"),
            Some("Medication name is required")
        );
    }
}
