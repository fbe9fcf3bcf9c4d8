//! Non-fatal findings collected while testing a citation scheme.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

/// Kind of a [`Warning`], usable for filtering and machine-readable output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UnboundPrefix,
    NoPrefix,
    MissingNamespace,
    WrongNamespace,
    RefStateMismatch,
    RefStateCount,
}

/// How serious a warning is for the usability of the citation scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found in a citation mapping or in the document it points at.
///
/// The `Display` output is the human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A path segment uses a prefix that the namespace mapping does not bind.
    #[error("{path} has namespaces shortcuts with no bindings")]
    UnboundPrefix { path: String, prefixes: Vec<String> },

    /// A path segment names an element without any prefix.
    #[error("{path} has no namespaces shortcuts like '{expected}'")]
    NoPrefix { path: String, expected: String },

    #[error("No namespace uri found in this document")]
    MissingNamespace,

    #[error("Wrong namespace URI found")]
    WrongNamespace { found: String },

    #[error("Citation Mapping ({level}) has label {label}, while refState[{level}] has unit {unit}")]
    RefStateMismatch {
        level: usize,
        label: String,
        unit: String,
    },

    #[error("Citation Mapping has {levels} levels, while refsDecl has {states} refState")]
    RefStateCount { levels: usize, states: usize },
}

impl Warning {
    pub fn kind(&self) -> WarningKind {
        match self {
            Warning::UnboundPrefix { .. } => WarningKind::UnboundPrefix,
            Warning::NoPrefix { .. } => WarningKind::NoPrefix,
            Warning::MissingNamespace => WarningKind::MissingNamespace,
            Warning::WrongNamespace { .. } => WarningKind::WrongNamespace,
            Warning::RefStateMismatch { .. } => WarningKind::RefStateMismatch,
            Warning::RefStateCount { .. } => WarningKind::RefStateCount,
        }
    }

    /// Namespace URI problems make every level unresolvable, the rest are advisory.
    pub fn severity(&self) -> Severity {
        match self {
            Warning::MissingNamespace | Warning::WrongNamespace { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl Serialize for Warning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Warning", 3)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("severity", &self.severity())?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let unbound = Warning::UnboundPrefix {
            path: "/google:TEI.2/tei:text".to_string(),
            prefixes: vec!["google:".to_string()],
        };
        assert_eq!(
            unbound.to_string(),
            "/google:TEI.2/tei:text has namespaces shortcuts with no bindings"
        );

        let no_prefix = Warning::NoPrefix {
            path: "/TEI.2/tei:text".to_string(),
            expected: "tei:".to_string(),
        };
        assert_eq!(
            no_prefix.to_string(),
            "/TEI.2/tei:text has no namespaces shortcuts like 'tei:'"
        );

        assert_eq!(
            Warning::MissingNamespace.to_string(),
            "No namespace uri found in this document"
        );
        assert_eq!(
            Warning::WrongNamespace {
                found: "http://google.fr".to_string()
            }
            .to_string(),
            "Wrong namespace URI found"
        );
        assert_eq!(
            Warning::RefStateMismatch {
                level: 2,
                label: "chapter".to_string(),
                unit: "error_creator".to_string(),
            }
            .to_string(),
            "Citation Mapping (2) has label chapter, while refState[2] has unit error_creator"
        );
    }

    #[test]
    fn test_kind_and_severity() {
        assert_eq!(Warning::MissingNamespace.kind(), WarningKind::MissingNamespace);
        assert_eq!(Warning::MissingNamespace.severity(), Severity::Error);

        let count = Warning::RefStateCount {
            levels: 3,
            states: 2,
        };
        assert_eq!(count.kind(), WarningKind::RefStateCount);
        assert_eq!(count.severity(), Severity::Warning);
    }

    #[test]
    fn test_serialize_includes_message() {
        let json = serde_json::to_value(Warning::WrongNamespace {
            found: "http://google.fr".to_string(),
        })
        .unwrap();

        assert_eq!(json["kind"], "wrong_namespace");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["message"], "Wrong namespace URI found");
    }
}
