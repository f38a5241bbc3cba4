//! Domain types for the concept tables.
//!
//! Source concepts are traditional-medicine terms (NAMASTE codes for Ayurveda, Siddha and Unani).
//! Target codes live in the two ICD-11 modules: Traditional Medicine Module 2 and Biomedicine.
//! Mapping edges connect the two and may also point into systems that have no local target
//! table (SNOMED CT).

use crate::TerminologyError;
use emr_types::{Code, NonEmptyText};
use serde::{Deserialize, Serialize};

/// A source-system term.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptEntry {
    pub code: Code,
    pub display: NonEmptyText,
    /// Tradition the term belongs to, e.g. "Ayurveda".
    pub system: NonEmptyText,
    pub description: String,
}

/// ICD-11 module a [`TargetCode`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetModule {
    #[serde(rename = "TM2")]
    Tm2,
    Biomedicine,
}

impl TargetModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tm2 => "TM2",
            Self::Biomedicine => "Biomedicine",
        }
    }

    /// The mapping target system that resolves into this module.
    pub fn system(&self) -> TargetSystem {
        match self {
            Self::Tm2 => TargetSystem::Icd11Tm2,
            Self::Biomedicine => TargetSystem::Icd11Biomedicine,
        }
    }
}

/// A target-system code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCode {
    pub code: Code,
    pub display: NonEmptyText,
    pub module: TargetModule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Target system named by a mapping edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetSystem {
    Icd11Tm2,
    Icd11Biomedicine,
    /// Any system without a local target table, e.g. `SNOMED-CT`.
    Other(Code),
}

impl TargetSystem {
    pub const ICD11_TM2: &'static str = "ICD-11-TM2";
    pub const ICD11_BIOMEDICINE: &'static str = "ICD-11-Biomedicine";

    pub fn parse(s: &str) -> Result<Self, TerminologyError> {
        match s.trim() {
            Self::ICD11_TM2 => Ok(Self::Icd11Tm2),
            Self::ICD11_BIOMEDICINE => Ok(Self::Icd11Biomedicine),
            other => Code::new(other).map(Self::Other).map_err(|e| {
                TerminologyError::InvalidInput(format!("Invalid target system {other:?}: {e}"))
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Icd11Tm2 => Self::ICD11_TM2,
            Self::Icd11Biomedicine => Self::ICD11_BIOMEDICINE,
            Self::Other(code) => code.as_str(),
        }
    }

    /// ICD-11 module for this system, or `None` for systems outside ICD-11.
    pub fn module(&self) -> Option<TargetModule> {
        match self {
            Self::Icd11Tm2 => Some(TargetModule::Tm2),
            Self::Icd11Biomedicine => Some(TargetModule::Biomedicine),
            Self::Other(_) => None,
        }
    }
}

impl std::fmt::Display for TargetSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TargetSystem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TargetSystem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TargetSystem::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// FHIR ConceptMap equivalence of a mapping edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Equivalence {
    Relatedto,
    Equivalent,
    Equal,
    Wider,
    Subsumes,
    Narrower,
    Specializes,
    Inexact,
    Unmatched,
    Disjoint,
}

impl Equivalence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relatedto => "relatedto",
            Self::Equivalent => "equivalent",
            Self::Equal => "equal",
            Self::Wider => "wider",
            Self::Subsumes => "subsumes",
            Self::Narrower => "narrower",
            Self::Specializes => "specializes",
            Self::Inexact => "inexact",
            Self::Unmatched => "unmatched",
            Self::Disjoint => "disjoint",
        }
    }
}

/// A directed mapping edge from a source concept to a target code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMapping {
    pub source_code: Code,
    pub source_system: NonEmptyText,
    pub target_code: Code,
    pub target_system: TargetSystem,
    pub equivalence: Equivalence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_system_parses_known_and_other_systems() {
        assert_eq!(
            TargetSystem::parse("ICD-11-TM2").unwrap(),
            TargetSystem::Icd11Tm2
        );
        assert_eq!(
            TargetSystem::parse("ICD-11-Biomedicine").unwrap().module(),
            Some(TargetModule::Biomedicine)
        );

        let snomed = TargetSystem::parse("SNOMED-CT").unwrap();
        assert_eq!(snomed.as_str(), "SNOMED-CT");
        assert_eq!(snomed.module(), None);

        assert!(TargetSystem::parse("  ").is_err());
    }

    #[test]
    fn module_and_system_agree() {
        for module in [TargetModule::Tm2, TargetModule::Biomedicine] {
            assert_eq!(module.system().module(), Some(module));
        }
    }

    #[test]
    fn wire_names_match_reference_data() {
        assert_eq!(
            serde_json::to_string(&TargetModule::Tm2).unwrap(),
            "\"TM2\""
        );
        assert_eq!(
            serde_json::to_string(&Equivalence::Equivalent).unwrap(),
            "\"equivalent\""
        );
        assert_eq!(
            serde_json::to_string(&TargetSystem::Icd11Biomedicine).unwrap(),
            "\"ICD-11-Biomedicine\""
        );
    }
}
