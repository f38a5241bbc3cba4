//! Concept table store.
//!
//! The three reference tables (concepts, targets, mappings) are parsed from YAML, checked for
//! referential integrity and indexed once. After construction a [`ConceptTables`] is immutable
//! and is shared between callers behind an `Arc`.

use crate::model::{
    ConceptEntry, ConceptMapping, Equivalence, TargetCode, TargetModule, TargetSystem,
};
use crate::resolve::PLACEHOLDER_BIOMEDICAL_DISPLAY;
use crate::{TerminologyError, TerminologyResult};
use emr_types::{Code, NonEmptyText};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Reference tables shipped with the crate.
const EMBEDDED_TABLES: &str = include_str!("../data/terminology.yaml");

/// Indexed, integrity-checked reference tables.
#[derive(Clone, Debug)]
pub struct ConceptTables {
    concepts: Vec<ConceptEntry>,
    targets: Vec<TargetCode>,
    mappings: Vec<ConceptMapping>,
    concept_index: HashMap<Code, usize>,
    target_index: HashMap<Code, usize>,
    edges_by_source: HashMap<Code, Vec<usize>>,
    placeholder_display: NonEmptyText,
}

impl ConceptTables {
    /// Build the tables, enforcing referential integrity.
    ///
    /// # Errors
    ///
    /// Returns [`TerminologyError`] if:
    /// - a concept code or target code appears twice,
    /// - a mapping references a source code that is not in the concept table,
    /// - a mapping into `ICD-11-TM2` references a code that is not in the target table,
    /// - a target code listed under one module is referenced through the other module's system.
    ///
    /// Biomedicine targets may be absent from the target table; the resolver synthesises them.
    pub fn new(
        concepts: Vec<ConceptEntry>,
        targets: Vec<TargetCode>,
        mappings: Vec<ConceptMapping>,
    ) -> TerminologyResult<Self> {
        let mut concept_index = HashMap::with_capacity(concepts.len());
        for (idx, entry) in concepts.iter().enumerate() {
            if concept_index.insert(entry.code.clone(), idx).is_some() {
                return Err(TerminologyError::DuplicateConcept(entry.code.to_string()));
            }
        }

        let mut target_index = HashMap::with_capacity(targets.len());
        for (idx, target) in targets.iter().enumerate() {
            if target_index.insert(target.code.clone(), idx).is_some() {
                return Err(TerminologyError::DuplicateTarget(target.code.to_string()));
            }
        }

        let mut edges_by_source: HashMap<Code, Vec<usize>> = HashMap::new();
        for (idx, mapping) in mappings.iter().enumerate() {
            if !concept_index.contains_key(&mapping.source_code) {
                return Err(TerminologyError::UnknownSourceCode {
                    index: idx,
                    code: mapping.source_code.to_string(),
                });
            }

            let listed = target_index.get(&mapping.target_code).map(|&i| &targets[i]);
            match (&mapping.target_system, listed) {
                (TargetSystem::Icd11Tm2, None) => {
                    return Err(TerminologyError::UnknownTargetCode {
                        index: idx,
                        code: mapping.target_code.to_string(),
                    });
                }
                (system, Some(target)) if system.module().is_some_and(|m| m != target.module) => {
                    return Err(TerminologyError::ModuleMismatch {
                        index: idx,
                        code: mapping.target_code.to_string(),
                        module: target.module.as_str(),
                    });
                }
                _ => {}
            }

            edges_by_source
                .entry(mapping.source_code.clone())
                .or_default()
                .push(idx);
        }

        let placeholder_display = NonEmptyText::new(PLACEHOLDER_BIOMEDICAL_DISPLAY)
            .map_err(|e| TerminologyError::InvalidInput(format!("placeholder display: {e}")))?;

        Ok(Self {
            concepts,
            targets,
            mappings,
            concept_index,
            target_index,
            edges_by_source,
            placeholder_display,
        })
    }

    /// Parse and validate tables from YAML text.
    ///
    /// Schema errors carry the path of the failing field (for example
    /// `mappings[2].equivalence`), resolved through `serde_path_to_error`.
    pub fn parse(yaml_text: &str) -> TerminologyResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, TablesDocument>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(TerminologyError::Schema(format!(
                    "Terminology tables schema mismatch at {path}: {source}"
                )));
            }
        };

        let tables = Self::new(
            wire.concepts.into_iter().map(Into::into).collect(),
            wire.targets.into_iter().map(Into::into).collect(),
            wire.mappings.into_iter().map(Into::into).collect(),
        )?;

        tracing::info!(
            concepts = tables.concepts.len(),
            targets = tables.targets.len(),
            mappings = tables.mappings.len(),
            "loaded terminology tables"
        );

        Ok(tables)
    }

    /// The reference tables embedded in this crate.
    pub fn embedded() -> TerminologyResult<Self> {
        Self::parse(EMBEDDED_TABLES)
    }

    /// Load tables from a YAML file on disk.
    pub fn load(path: &Path) -> TerminologyResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| TerminologyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Load from `path` when given, otherwise fall back to the embedded tables.
    pub fn load_or_embedded(path: Option<&Path>) -> TerminologyResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::embedded(),
        }
    }

    /// Source concepts in insertion order.
    pub fn concepts(&self) -> &[ConceptEntry] {
        &self.concepts
    }

    pub fn targets(&self) -> &[TargetCode] {
        &self.targets
    }

    pub fn mappings(&self) -> &[ConceptMapping] {
        &self.mappings
    }

    pub fn concept(&self, code: &str) -> Option<&ConceptEntry> {
        let code = Code::new(code).ok()?;
        self.concept_index.get(&code).map(|&i| &self.concepts[i])
    }

    pub(crate) fn placeholder_display(&self) -> &NonEmptyText {
        &self.placeholder_display
    }

    pub fn target(&self, code: &Code) -> Option<&TargetCode> {
        self.target_index.get(code).map(|&i| &self.targets[i])
    }

    /// Raw mapping edges for a source code, in table order. Unknown codes yield an empty list.
    pub fn mappings_for(&self, source_code: &str) -> Vec<&ConceptMapping> {
        let Ok(code) = Code::new(source_code) else {
            return Vec::new();
        };
        self.edges_by_source
            .get(&code)
            .map(|edges| edges.iter().map(|&i| &self.mappings[i]).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TablesDocument {
    #[serde(default)]
    concepts: Vec<WireConcept>,
    #[serde(default)]
    targets: Vec<WireTarget>,
    #[serde(default)]
    mappings: Vec<WireMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireConcept {
    code: Code,
    display: NonEmptyText,
    system: NonEmptyText,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireTarget {
    code: Code,
    display: NonEmptyText,
    module: TargetModule,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireMapping {
    source_code: Code,
    source_system: NonEmptyText,
    target_code: Code,
    target_system: TargetSystem,
    equivalence: Equivalence,
}

impl From<WireConcept> for ConceptEntry {
    fn from(wire: WireConcept) -> Self {
        Self {
            code: wire.code,
            display: wire.display,
            system: wire.system,
            description: wire.description.trim().to_owned(),
        }
    }
}

impl From<WireTarget> for TargetCode {
    fn from(wire: WireTarget) -> Self {
        Self {
            code: wire.code,
            display: wire.display,
            module: wire.module,
            description: wire
                .description
                .map(|d| d.trim().to_owned())
                .filter(|d| !d.is_empty()),
        }
    }
}

impl From<WireMapping> for ConceptMapping {
    fn from(wire: WireMapping) -> Self {
        Self {
            source_code: wire.source_code,
            source_system: wire.source_system,
            target_code: wire.target_code,
            target_system: wire.target_system,
            equivalence: wire.equivalence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"concepts:
  - code: AYU001
    display: Amavata
    system: Ayurveda
    description: Rheumatoid arthritis in Ayurvedic terminology
targets:
  - code: TM2-123
    display: Amavata (Traditional Medicine)
    module: TM2
mappings:
  - sourceCode: AYU001
    sourceSystem: NAMASTE
    targetCode: TM2-123
    targetSystem: ICD-11-TM2
    equivalence: equivalent
"#;

    #[test]
    fn embedded_tables_satisfy_referential_integrity() {
        let tables = ConceptTables::embedded().expect("embedded tables should load");

        assert_eq!(tables.concepts().len(), 9);
        for mapping in tables.mappings() {
            assert!(
                tables.concept(mapping.source_code.as_str()).is_some(),
                "source {} should exist",
                mapping.source_code
            );
            if mapping.target_system == TargetSystem::Icd11Tm2 {
                let target = tables
                    .target(&mapping.target_code)
                    .expect("TM2 target should exist");
                assert_eq!(target.module, TargetModule::Tm2);
            }
        }
    }

    #[test]
    fn parses_minimal_tables() {
        let tables = ConceptTables::parse(MINIMAL).expect("should parse minimal tables");
        assert_eq!(tables.concepts().len(), 1);
        assert_eq!(tables.mappings_for("AYU001").len(), 1);
        assert!(tables.mappings_for("AYU999").is_empty());
        assert!(tables.mappings_for("not a code").is_empty());
    }

    #[test]
    fn rejects_mapping_from_unknown_source() {
        let input = MINIMAL.replace("sourceCode: AYU001", "sourceCode: TM2-123");
        let err = ConceptTables::parse(&input).expect_err("should reject unknown source");
        match err {
            TerminologyError::UnknownSourceCode { index, code } => {
                assert_eq!(index, 0);
                assert_eq!(code, "TM2-123");
            }
            other => panic!("expected UnknownSourceCode, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_tm2_target_but_allows_missing_biomedicine_target() {
        let missing_tm2 = MINIMAL.replace("targetCode: TM2-123", "targetCode: TM2-999");
        assert!(matches!(
            ConceptTables::parse(&missing_tm2),
            Err(TerminologyError::UnknownTargetCode { .. })
        ));

        let biomedicine = MINIMAL
            .replace("targetCode: TM2-123", "targetCode: M06.9")
            .replace("targetSystem: ICD-11-TM2", "targetSystem: ICD-11-Biomedicine");
        ConceptTables::parse(&biomedicine).expect("unlisted biomedicine targets are allowed");
    }

    #[test]
    fn rejects_target_referenced_through_wrong_module() {
        let input = MINIMAL.replace(
            "targetSystem: ICD-11-TM2",
            "targetSystem: ICD-11-Biomedicine",
        );
        assert!(matches!(
            ConceptTables::parse(&input),
            Err(TerminologyError::ModuleMismatch { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_concept_codes() {
        let input = MINIMAL.replace(
            "targets:",
            "  - code: AYU001\n    display: Again\n    system: Ayurveda\ntargets:",
        );
        match ConceptTables::parse(&input) {
            Err(TerminologyError::DuplicateConcept(code)) => assert_eq!(code, "AYU001"),
            other => panic!("expected DuplicateConcept, got {other:?}"),
        }
    }

    #[test]
    fn schema_errors_report_the_failing_path() {
        let input = MINIMAL.replace("equivalence: equivalent", "equivalence: sameish");
        match ConceptTables::parse(&input) {
            Err(TerminologyError::Schema(msg)) => {
                assert!(msg.contains("mappings[0].equivalence"), "{msg}");
            }
            other => panic!("expected Schema error, got {other:?}"),
        }

        let unknown_key = format!("{MINIMAL}extra: true\n");
        match ConceptTables::parse(&unknown_key) {
            Err(TerminologyError::Schema(msg)) => assert!(msg.contains("extra"), "{msg}"),
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn loads_tables_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(MINIMAL.as_bytes()).expect("write tables");

        let tables = ConceptTables::load(file.path()).expect("load from file");
        assert_eq!(tables.targets().len(), 1);

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            ConceptTables::load_or_embedded(Some(&missing)),
            Err(TerminologyError::Read { .. })
        ));
        assert!(ConceptTables::load_or_embedded(None).is_ok());
    }
}
