//! Session-scoped diagnosis and prescription rows.
//!
//! Both live only inside an [`EncounterDraft`](crate::encounter::EncounterDraft) and are
//! identified by a random UUID so that edits and removals do not depend on list positions.

use crate::constants::DEFAULT_PRESCRIPTION_FORM;
use crate::{EmrError, EmrResult};
use emr_types::NonEmptyText;
use fhir::{DiagnosisEntry, MedicationOrder};
use serde::{Deserialize, Serialize};
use terminology::{ConceptEntry, TargetCode};
use uuid::Uuid;

/// A confirmed diagnosis: the chosen source concept plus its resolved ICD-11 targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisSelection {
    id: Uuid,
    source: ConceptEntry,
    notes: String,
    include_target_codes: bool,
    resolved_targets: Vec<TargetCode>,
}

impl DiagnosisSelection {
    pub(crate) fn new(source: ConceptEntry, resolved_targets: Vec<TargetCode>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            notes: String::new(),
            include_target_codes: true,
            resolved_targets,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &ConceptEntry {
        &self.source
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn include_target_codes(&self) -> bool {
        self.include_target_codes
    }

    pub fn resolved_targets(&self) -> &[TargetCode] {
        &self.resolved_targets
    }

    pub(crate) fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub(crate) fn set_include_target_codes(&mut self, include: bool) {
        self.include_target_codes = include;
    }

    /// Bundle input for this diagnosis. Targets are dropped when the toggle is off.
    pub fn to_entry(&self) -> DiagnosisEntry {
        DiagnosisEntry {
            source: self.source.clone(),
            targets: if self.include_target_codes {
                self.resolved_targets.clone()
            } else {
                Vec::new()
            },
            note: NonEmptyText::optional(&self.notes),
        }
    }
}

/// Editable prescription fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrescriptionField {
    Medication,
    Strength,
    Form,
    Dosage,
    Frequency,
    Duration,
    Instructions,
    Quantity,
}

impl PrescriptionField {
    pub const ALL: [Self; 8] = [
        Self::Medication,
        Self::Strength,
        Self::Form,
        Self::Dosage,
        Self::Frequency,
        Self::Duration,
        Self::Instructions,
        Self::Quantity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Medication => "medication",
            Self::Strength => "strength",
            Self::Form => "form",
            Self::Dosage => "dosage",
            Self::Frequency => "frequency",
            Self::Duration => "duration",
            Self::Instructions => "instructions",
            Self::Quantity => "quantity",
        }
    }
}

impl std::str::FromStr for PrescriptionField {
    type Err = EmrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| EmrError::InvalidInput(format!("unknown prescription field: {s}")))
    }
}

/// One prescription row. All fields are free text except `quantity`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    id: Uuid,
    pub medication: String,
    pub strength: String,
    pub form: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
    pub quantity: Option<u32>,
}

impl Default for Prescription {
    fn default() -> Self {
        Self::new()
    }
}

impl Prescription {
    /// A blank row with the default dosage form.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            medication: String::new(),
            strength: String::new(),
            form: DEFAULT_PRESCRIPTION_FORM.to_owned(),
            dosage: String::new(),
            frequency: String::new(),
            duration: String::new(),
            instructions: String::new(),
            quantity: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Set one field from its text form.
    ///
    /// `quantity` accepts a positive integer or blank (clears it).
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::InvalidInput`] for a quantity that is not a positive integer.
    pub fn set(&mut self, field: PrescriptionField, value: &str) -> EmrResult<()> {
        let slot = match field {
            PrescriptionField::Medication => &mut self.medication,
            PrescriptionField::Strength => &mut self.strength,
            PrescriptionField::Form => &mut self.form,
            PrescriptionField::Dosage => &mut self.dosage,
            PrescriptionField::Frequency => &mut self.frequency,
            PrescriptionField::Duration => &mut self.duration,
            PrescriptionField::Instructions => &mut self.instructions,
            PrescriptionField::Quantity => {
                self.quantity = parse_quantity(value)?;
                return Ok(());
            }
        };
        *slot = value.to_owned();
        Ok(())
    }

    /// Bundle input for this row, or `None` when no medication name has been entered.
    pub fn to_order(&self) -> Option<MedicationOrder> {
        Some(MedicationOrder {
            medication: NonEmptyText::optional(&self.medication)?,
            strength: NonEmptyText::optional(&self.strength),
            form: NonEmptyText::optional(&self.form),
            dosage: NonEmptyText::optional(&self.dosage),
            frequency: NonEmptyText::optional(&self.frequency),
            duration: NonEmptyText::optional(&self.duration),
            instructions: NonEmptyText::optional(&self.instructions),
            quantity: self.quantity,
        })
    }
}

fn parse_quantity(value: &str) -> EmrResult<Option<u32>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<u32>() {
        Ok(0) | Err(_) => Err(EmrError::InvalidInput(format!(
            "quantity must be a positive integer, got {value:?}"
        ))),
        Ok(n) => Ok(Some(n)),
    }
}
