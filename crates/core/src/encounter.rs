//! In-progress encounter: diagnosis list, prescriptions and submission.
//!
//! An [`EncounterDraft`] is owned by the single session that created it. It uses a type-state
//! parameter to enforce the submission lifecycle at compile time:
//!
//! - [`Editing`]: searching, selecting and confirming diagnoses; editing prescriptions and
//!   encounter details
//! - [`ReadyToSubmit`]: validated; can be submitted or sent back to editing
//!
//! Inside `Editing`, the diagnosis search follows [`SearchState`]:
//! `Empty -> Searching -> ResultSelected -> (confirm) -> Searching`.
//!
//! Operations that move between states consume the draft. When they fail, the draft comes back
//! unchanged inside [`DraftRejected`] so nothing the clinician entered is lost.

use crate::clock::Clock;
use crate::diagnosis::{DiagnosisSelection, Prescription, PrescriptionField};
use crate::submission::{BundleSubmitter, SubmissionReceipt};
use crate::validation::{validate_encounter, EncounterFields};
use crate::{EmrError, EmrResult};
use chrono::NaiveDate;
use emr_types::NonEmptyText;
use fhir::{Bundle, EncounterMeta, MedicationOrder};
use serde::Deserialize;
use std::sync::Arc;
use terminology::{ConceptEntry, ConceptTables, TargetCode};
use uuid::Uuid;

// ============================================================================
// TYPE-STATE MARKERS
// ============================================================================

/// Marker type: the draft is being edited.
#[derive(Clone, Debug, Default)]
pub struct Editing {
    search: SearchState,
}

/// Marker type: the draft passed validation and can be submitted.
#[derive(Clone, Copy, Debug)]
pub struct ReadyToSubmit;

/// Diagnosis search sub-state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SearchState {
    #[default]
    Empty,
    Searching {
        query: String,
        results: Vec<ConceptEntry>,
    },
    ResultSelected {
        query: String,
        results: Vec<ConceptEntry>,
        entry: ConceptEntry,
        targets: Vec<TargetCode>,
    },
}

impl SearchState {
    pub fn results(&self) -> &[ConceptEntry] {
        match self {
            Self::Empty => &[],
            Self::Searching { results, .. } | Self::ResultSelected { results, .. } => results,
        }
    }
}

/// Free-text encounter details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncounterDetails {
    pub patient_id: String,
    pub date: NaiveDate,
    pub chief_complaint: String,
    pub clinical_notes: String,
}

/// A state transition that failed. Carries the error and the draft as it was before the call.
#[derive(Debug)]
pub struct DraftRejected<S> {
    pub error: EmrError,
    pub draft: EncounterDraft<S>,
}

/// Outcome of a successful submission. The draft no longer exists.
#[derive(Clone, Debug)]
pub struct Submitted {
    pub receipt: SubmissionReceipt,
    pub bundle: Bundle,
}

// ============================================================================
// ENCOUNTER DRAFT
// ============================================================================

#[derive(Clone, Debug)]
pub struct EncounterDraft<S> {
    tables: Arc<ConceptTables>,
    details: EncounterDetails,
    diagnoses: Vec<DiagnosisSelection>,
    prescriptions: Vec<Prescription>,
    state: S,
}

impl EncounterDraft<Editing> {
    /// Start a draft for `patient_id` on `date` with no diagnoses or prescriptions.
    pub fn new(tables: Arc<ConceptTables>, patient_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            tables,
            details: EncounterDetails {
                patient_id: patient_id.into(),
                date,
                chief_complaint: String::new(),
                clinical_notes: String::new(),
            },
            diagnoses: Vec::new(),
            prescriptions: Vec::new(),
            state: Editing::default(),
        }
    }

    /// Build a draft from a submitted encounter form.
    ///
    /// Diagnoses are added by code without going through search.
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::NotFound`] for a diagnosis code that is not in the source table, or
    /// [`EmrError::InvalidInput`] for a prescription quantity of zero.
    pub fn from_form(
        tables: Arc<ConceptTables>,
        form: EncounterForm,
        today: NaiveDate,
    ) -> EmrResult<Self> {
        let mut draft = Self::new(tables, form.patient_id, form.encounter_date.unwrap_or(today));
        draft.set_chief_complaint(form.chief_complaint);
        draft.set_clinical_notes(form.clinical_notes);

        for diagnosis in form.diagnoses {
            let id = draft.add_diagnosis(&diagnosis.code)?;
            draft.update_notes(id, diagnosis.notes)?;
            if !diagnosis.include_target_codes {
                draft.toggle_target_codes(id)?;
            }
        }

        for row in form.prescriptions {
            let id = draft.add_prescription();
            for (field, value) in row.fields() {
                if let Some(value) = value {
                    draft.update_prescription(id, field, value)?;
                }
            }
            if let Some(quantity) = row.quantity {
                draft.update_prescription(id, PrescriptionField::Quantity, &quantity.to_string())?;
            }
        }

        Ok(draft)
    }

    pub fn search_state(&self) -> &SearchState {
        &self.state.search
    }

    pub fn set_patient_id(&mut self, patient_id: impl Into<String>) {
        self.details.patient_id = patient_id.into();
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.details.date = date;
    }

    pub fn set_chief_complaint(&mut self, text: impl Into<String>) {
        self.details.chief_complaint = text.into();
    }

    pub fn set_clinical_notes(&mut self, text: impl Into<String>) {
        self.details.clinical_notes = text.into();
    }

    /// Run a search and make its results current. Any selection is discarded.
    pub fn search(&mut self, query: &str) -> &[ConceptEntry] {
        let results = self.tables.search(query).into_iter().cloned().collect();
        self.state.search = SearchState::Searching {
            query: query.to_owned(),
            results,
        };
        self.state.search.results()
    }

    /// Select one of the current results and resolve its targets.
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::NotInResults`] if `code` is not in the current result set.
    pub fn select(&mut self, code: &str) -> EmrResult<Vec<TargetCode>> {
        let Some(entry) = self
            .state
            .search
            .results()
            .iter()
            .find(|e| e.code.as_str() == code)
            .cloned()
        else {
            return Err(EmrError::NotInResults(code.to_owned()));
        };

        let (query, results) = match std::mem::take(&mut self.state.search) {
            SearchState::Empty => (String::new(), Vec::new()),
            SearchState::Searching { query, results }
            | SearchState::ResultSelected { query, results, .. } => (query, results),
        };

        let targets = self.tables.resolve_targets(code);
        self.state.search = SearchState::ResultSelected {
            query,
            results,
            entry,
            targets: targets.clone(),
        };
        Ok(targets)
    }

    /// Add the selected result to the diagnosis list and reset the search.
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::NoSelection`] if nothing is selected.
    pub fn confirm(&mut self) -> EmrResult<Uuid> {
        let (entry, targets) = match std::mem::take(&mut self.state.search) {
            SearchState::ResultSelected { entry, targets, .. } => (entry, targets),
            other => {
                self.state.search = other;
                return Err(EmrError::NoSelection);
            }
        };

        let selection = DiagnosisSelection::new(entry, targets);
        let id = selection.id();
        tracing::debug!(code = %selection.source().code, %id, "diagnosis added");
        self.diagnoses.push(selection);
        self.state.search = SearchState::Searching {
            query: String::new(),
            results: Vec::new(),
        };
        Ok(id)
    }

    /// Add a diagnosis directly by source code.
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::NotFound`] if the code is not in the source table.
    pub fn add_diagnosis(&mut self, code: &str) -> EmrResult<Uuid> {
        let entry = self
            .tables
            .concept(code)
            .cloned()
            .ok_or_else(|| EmrError::NotFound(format!("concept {code}")))?;
        let selection = DiagnosisSelection::new(entry, self.tables.resolve_targets(code));
        let id = selection.id();
        self.diagnoses.push(selection);
        Ok(id)
    }

    /// Append a blank prescription row.
    pub fn add_prescription(&mut self) -> Uuid {
        let row = Prescription::new();
        let id = row.id();
        self.prescriptions.push(row);
        id
    }

    pub fn update_prescription(
        &mut self,
        id: Uuid,
        field: PrescriptionField,
        value: &str,
    ) -> EmrResult<()> {
        self.prescriptions
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or(EmrError::UnknownPrescription(id))?
            .set(field, value)
    }

    pub fn remove_prescription(&mut self, id: Uuid) -> EmrResult<()> {
        let before = self.prescriptions.len();
        self.prescriptions.retain(|p| p.id() != id);
        if self.prescriptions.len() == before {
            return Err(EmrError::UnknownPrescription(id));
        }
        Ok(())
    }

    /// Validate and move to [`ReadyToSubmit`].
    ///
    /// # Errors
    ///
    /// On validation failure the draft is returned unchanged together with
    /// [`EmrError::Validation`].
    #[allow(clippy::result_large_err)]
    pub fn finalise(self) -> Result<EncounterDraft<ReadyToSubmit>, DraftRejected<Editing>> {
        let validation = validate_encounter(&self.fields());
        if let Err(errors) = validation {
            return Err(DraftRejected {
                error: EmrError::Validation(errors),
                draft: self,
            });
        }

        Ok(EncounterDraft {
            tables: self.tables,
            details: self.details,
            diagnoses: self.diagnoses,
            prescriptions: self.prescriptions,
            state: ReadyToSubmit,
        })
    }
}

impl EncounterDraft<ReadyToSubmit> {
    /// Compose the submission bundle with the timestamp taken from `clock`.
    pub fn compose(&self, clock: &dyn Clock) -> EmrResult<Bundle> {
        compose_bundle(
            &self.details,
            &self.diagnoses,
            &self.prescriptions,
            clock,
        )
    }

    /// Re-validate, compose and hand the bundle to `submitter`.
    ///
    /// # Errors
    ///
    /// On any failure the draft comes back in the `ReadyToSubmit` state with all entered data.
    #[allow(clippy::result_large_err)]
    pub async fn submit(
        self,
        submitter: &dyn BundleSubmitter,
        clock: &dyn Clock,
    ) -> Result<Submitted, DraftRejected<ReadyToSubmit>> {
        let validation = validate_encounter(&self.fields());
        if let Err(errors) = validation {
            return Err(DraftRejected {
                error: EmrError::Validation(errors),
                draft: self,
            });
        }

        let bundle = match self.compose(clock) {
            Ok(bundle) => bundle,
            Err(error) => return Err(DraftRejected { error, draft: self }),
        };

        match submitter.submit(&bundle).await {
            Ok(receipt) => {
                tracing::info!(
                    patient_id = %self.details.patient_id,
                    entries = bundle.entry.len(),
                    "encounter submitted"
                );
                Ok(Submitted { receipt, bundle })
            }
            Err(error) => {
                tracing::error!(%error, "encounter submission failed");
                Err(DraftRejected { error, draft: self })
            }
        }
    }

    /// Go back to editing. The search starts empty.
    pub fn edit(self) -> EncounterDraft<Editing> {
        EncounterDraft {
            tables: self.tables,
            details: self.details,
            diagnoses: self.diagnoses,
            prescriptions: self.prescriptions,
            state: Editing::default(),
        }
    }
}

// ============================================================================
// SHARED OPERATIONS (AVAILABLE IN EVERY STATE)
// ============================================================================

impl<S> EncounterDraft<S> {
    pub fn details(&self) -> &EncounterDetails {
        &self.details
    }

    pub fn diagnoses(&self) -> &[DiagnosisSelection] {
        &self.diagnoses
    }

    pub fn prescriptions(&self) -> &[Prescription] {
        &self.prescriptions
    }

    pub fn remove_diagnosis(&mut self, id: Uuid) -> EmrResult<()> {
        let before = self.diagnoses.len();
        self.diagnoses.retain(|d| d.id() != id);
        if self.diagnoses.len() == before {
            return Err(EmrError::UnknownDiagnosis(id));
        }
        Ok(())
    }

    pub fn update_notes(&mut self, id: Uuid, notes: impl Into<String>) -> EmrResult<()> {
        self.diagnosis_mut(id)?.set_notes(notes);
        Ok(())
    }

    /// Flip whether the diagnosis carries its ICD-11 codings. Returns the new value.
    pub fn toggle_target_codes(&mut self, id: Uuid) -> EmrResult<bool> {
        let diagnosis = self.diagnosis_mut(id)?;
        let include = !diagnosis.include_target_codes();
        diagnosis.set_include_target_codes(include);
        Ok(include)
    }

    fn diagnosis_mut(&mut self, id: Uuid) -> EmrResult<&mut DiagnosisSelection> {
        self.diagnoses
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or(EmrError::UnknownDiagnosis(id))
    }

    fn fields(&self) -> EncounterFields<'_> {
        EncounterFields {
            patient_id: &self.details.patient_id,
            chief_complaint: &self.details.chief_complaint,
            clinical_notes: &self.details.clinical_notes,
            diagnosis_count: self.diagnoses.len(),
            prescriptions: &self.prescriptions,
        }
    }
}

/// Compose a bundle from encounter parts without validating them.
///
/// # Errors
///
/// Returns [`EmrError::InvalidInput`] if the patient id is blank.
pub fn compose_bundle(
    details: &EncounterDetails,
    diagnoses: &[DiagnosisSelection],
    prescriptions: &[Prescription],
    clock: &dyn Clock,
) -> EmrResult<Bundle> {
    let meta = EncounterMeta {
        patient_id: NonEmptyText::new(&details.patient_id)
            .map_err(|e| EmrError::InvalidInput(format!("patientId: {e}")))?,
        date: details.date,
        chief_complaint: NonEmptyText::optional(&details.chief_complaint),
    };
    let entries: Vec<_> = diagnoses.iter().map(DiagnosisSelection::to_entry).collect();
    let orders: Vec<MedicationOrder> = prescriptions
        .iter()
        .filter_map(Prescription::to_order)
        .collect();

    Ok(Bundle::compose(&meta, &entries, &orders, clock.now()))
}

// ============================================================================
// FORM INPUT
// ============================================================================

/// A complete encounter as submitted in one request (REST or CLI).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterForm {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub encounter_date: Option<NaiveDate>,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub clinical_notes: String,
    #[serde(default)]
    pub diagnoses: Vec<DiagnosisForm>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionForm>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisForm {
    pub code: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub include_target_codes: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionForm {
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

impl PrescriptionForm {
    fn fields(&self) -> [(PrescriptionField, Option<&str>); 7] {
        [
            (PrescriptionField::Medication, self.medication.as_deref()),
            (PrescriptionField::Strength, self.strength.as_deref()),
            (PrescriptionField::Form, self.form.as_deref()),
            (PrescriptionField::Dosage, self.dosage.as_deref()),
            (PrescriptionField::Frequency, self.frequency.as_deref()),
            (PrescriptionField::Duration, self.duration.as_deref()),
            (PrescriptionField::Instructions, self.instructions.as_deref()),
        ]
    }
}
