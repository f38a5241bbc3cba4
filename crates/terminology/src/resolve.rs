//! Mapping resolution from source concepts to ICD-11 target codes.
//!
//! Resolution policy per edge:
//! - `ICD-11-TM2` targets come from the target table (presence is guaranteed at load time).
//! - `ICD-11-Biomedicine` targets come from the target table, or are synthesised with the
//!   placeholder display [`PLACEHOLDER_BIOMEDICAL_DISPLAY`] when the table has no entry.
//! - Edges into other systems (SNOMED CT) are not resolved; they are visible through
//!   [`ConceptTables::mappings_for`] and [`ConceptTables::translate`].
//!
//! Results are de-duplicated by `(target system, code)`, first occurrence wins.

use crate::model::{ConceptEntry, ConceptMapping, TargetCode, TargetModule};
use crate::tables::ConceptTables;
use serde::Serialize;
use std::collections::HashSet;

/// Display used for Biomedicine targets that are mapped but missing from the target table.
pub const PLACEHOLDER_BIOMEDICAL_DISPLAY: &str = "Biomedical Code";

/// Resolved targets split by ICD-11 module.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroups {
    pub tm2: Vec<TargetCode>,
    pub biomedicine: Vec<TargetCode>,
}

impl TargetGroups {
    pub fn is_empty(&self) -> bool {
        self.tm2.is_empty() && self.biomedicine.is_empty()
    }
}

impl FromIterator<TargetCode> for TargetGroups {
    fn from_iter<I: IntoIterator<Item = TargetCode>>(iter: I) -> Self {
        let mut groups = TargetGroups::default();
        for target in iter {
            match target.module {
                TargetModule::Tm2 => groups.tm2.push(target),
                TargetModule::Biomedicine => groups.biomedicine.push(target),
            }
        }
        groups
    }
}

/// Everything known about one source code: the entry, its resolved ICD-11 targets, and the raw
/// mapping edges (including edges into systems without a local table).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub source: Option<ConceptEntry>,
    pub targets: Vec<TargetCode>,
    pub mappings: Vec<ConceptMapping>,
}

impl ConceptTables {
    /// Resolve a source code to its ICD-11 target codes.
    ///
    /// Unknown and unmapped codes yield an empty vector.
    pub fn resolve_targets(&self, source_code: &str) -> Vec<TargetCode> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for mapping in self.mappings_for(source_code) {
            let Some(module) = mapping.target_system.module() else {
                continue;
            };
            if !seen.insert((module, mapping.target_code.clone())) {
                continue;
            }

            match self.target(&mapping.target_code) {
                Some(target) => resolved.push(target.clone()),
                None if module == TargetModule::Biomedicine => {
                    resolved.push(TargetCode {
                        code: mapping.target_code.clone(),
                        display: self.placeholder_display().clone(),
                        module: TargetModule::Biomedicine,
                        description: None,
                    });
                }
                // Integrity checks at load time make unlisted TM2 targets unreachable.
                None => {
                    tracing::warn!(
                        code = %mapping.target_code,
                        "skipping unlisted ICD-11-TM2 target"
                    );
                }
            }
        }

        tracing::debug!(source_code, targets = resolved.len(), "resolved mapping targets");
        resolved
    }

    /// Like [`ConceptTables::resolve_targets`], grouped by module.
    pub fn resolve_grouped(&self, source_code: &str) -> TargetGroups {
        self.resolve_targets(source_code).into_iter().collect()
    }

    /// Translate a source code: entry, resolved targets and raw edges.
    pub fn translate(&self, source_code: &str) -> Translation {
        Translation {
            source: self.concept(source_code).cloned(),
            targets: self.resolve_targets(source_code),
            mappings: self
                .mappings_for(source_code)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Equivalence, TargetSystem};
    use emr_types::{Code, NonEmptyText};

    fn code_list(targets: &[TargetCode]) -> Vec<&str> {
        targets.iter().map(|t| t.code.as_str()).collect()
    }

    fn concept(code: &str) -> ConceptEntry {
        ConceptEntry {
            code: Code::new(code).unwrap(),
            display: NonEmptyText::new(format!("{code} display")).unwrap(),
            system: NonEmptyText::new("Ayurveda").unwrap(),
            description: String::new(),
        }
    }

    fn edge(source: &str, target: &str, system: TargetSystem) -> ConceptMapping {
        ConceptMapping {
            source_code: Code::new(source).unwrap(),
            source_system: NonEmptyText::new("NAMASTE").unwrap(),
            target_code: Code::new(target).unwrap(),
            target_system: system,
            equivalence: Equivalence::Equivalent,
        }
    }

    #[test]
    fn resolves_prameha_to_tm2_and_biomedicine() {
        let tables = ConceptTables::embedded().unwrap();
        let targets = tables.resolve_targets("AYU003");
        assert_eq!(code_list(&targets), vec!["TM2-125", "E14.9"]);
        assert_eq!(
            targets[1].display.as_str(),
            "Unspecified diabetes mellitus without complications"
        );
    }

    #[test]
    fn unknown_codes_resolve_to_nothing() {
        let tables = ConceptTables::embedded().unwrap();
        assert!(tables.resolve_targets("NONEXISTENT-CODE").is_empty());
        assert!(tables.resolve_targets("").is_empty());
        assert!(tables.resolve_targets("  two words  ").is_empty());
        assert!(tables.resolve_targets("\u{0}").is_empty());
    }

    #[test]
    fn unlisted_biomedicine_targets_get_a_placeholder() {
        let tables = ConceptTables::embedded().unwrap();
        let groups = tables.resolve_grouped("AYU004");

        assert_eq!(code_list(&groups.tm2), vec!["TM2-126"]);
        assert_eq!(code_list(&groups.biomedicine), vec!["R05"]);
        assert_eq!(
            groups.biomedicine[0].display.as_str(),
            PLACEHOLDER_BIOMEDICAL_DISPLAY
        );
    }

    #[test]
    fn snomed_edges_are_kept_out_of_resolved_targets() {
        let tables = ConceptTables::embedded().unwrap();
        let translation = tables.translate("AYU001");

        assert_eq!(translation.source.unwrap().display.as_str(), "Amavata");
        assert_eq!(code_list(&translation.targets), vec!["TM2-123", "M06.9"]);
        assert_eq!(translation.mappings.len(), 3);
        assert!(translation
            .mappings
            .iter()
            .any(|m| m.target_system.as_str() == "SNOMED-CT" && m.target_code.as_str() == "69896004"));
    }

    #[test]
    fn grouping_translated_targets_matches_resolve_grouped() {
        let tables = ConceptTables::embedded().unwrap();
        for entry in tables.concepts() {
            let code = entry.code.as_str();
            let grouped: TargetGroups = tables.translate(code).targets.into_iter().collect();
            assert_eq!(grouped, tables.resolve_grouped(code), "{code}");
        }
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let tables = ConceptTables::new(
            vec![concept("AYU001")],
            vec![],
            vec![
                edge("AYU001", "M06.9", TargetSystem::Icd11Biomedicine),
                edge("AYU001", "M06.9", TargetSystem::Icd11Biomedicine),
                edge("AYU001", "M05.9", TargetSystem::Icd11Biomedicine),
            ],
        )
        .unwrap();

        assert_eq!(
            code_list(&tables.resolve_targets("AYU001")),
            vec!["M06.9", "M05.9"]
        );
    }

    #[test]
    fn translate_unknown_code_is_empty() {
        let tables = ConceptTables::embedded().unwrap();
        let translation = tables.translate("XYZ");
        assert!(translation.source.is_none());
        assert!(translation.targets.is_empty());
        assert!(translation.mappings.is_empty());
        assert!(tables.resolve_grouped("XYZ").is_empty());
    }
}
