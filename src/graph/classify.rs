//! Edge Classification
//!
//! Decides how a structural `$ref` between two schemas is read, from the
//! domain roles declared on both ends.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::SchemaRole;

// =============================================================================
// Dependency Kind
// =============================================================================

/// How two schemas relate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyKind {
    /// The target is part of the source
    Contains,
    /// The source points at an independently owned target
    References,
    /// The target is an enumeration
    Enum,
    /// The source is an interface and the target one of its implementations
    IsImplementedBy,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::References => "REFERENCES",
            Self::Enum => "ENUM",
            Self::IsImplementedBy => "IS_IMPLEMENTED_BY",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Role Table
// =============================================================================

/// Result of classifying a cross-schema `$ref`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: DependencyKind,
    /// The target is embedded where a semantic reference was expected
    pub unusual: bool,
}

impl Classification {
    const fn usual(kind: DependencyKind) -> Self {
        Self { kind, unusual: false }
    }

    const fn unusual(kind: DependencyKind) -> Self {
        Self { kind, unusual: true }
    }
}

/// Classify a `$ref` from a schema with role `from` to one with role `to`
pub fn classify_reference(from: SchemaRole, to: SchemaRole) -> Classification {
    use DependencyKind::*;
    use SchemaRole::*;

    match (from, to) {
        (Other, _) | (_, Other) => Classification::usual(References),
        (_, Aggregate | ReferenceData) => Classification::unusual(References),
        (_, ValueObject) => Classification::usual(Contains),
        (ValueObject | ReferenceData, Entity) => Classification::unusual(References),
        (_, Entity) => Classification::usual(Contains),
    }
}
