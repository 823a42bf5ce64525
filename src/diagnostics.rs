//! Diagnostics
//!
//! Structured findings produced by the validator, normalizer, resolver,
//! example verifier and dependency analyzer. Warnings travel in the same
//! records as errors so callers can assert on them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Diagnostic Kinds
// =============================================================================

/// Category of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    // === Shape ===
    /// A mandatory keyword is absent
    MissingRequiredProperty,
    /// A keyword carries a value outside the supported set
    NotSupportedValue,
    /// A keyword is not permitted on this node
    NotSupportedProperty,
    /// A node declares more than one of enum/oneOf/properties
    AmbiguousKind,

    // === Consistency ===
    /// `$ref` or `x-references` target does not exist
    DanglingReference,
    /// Two documents declare the same id
    DuplicateId,
    /// `x-enum-description` keys differ from the enum values
    EnumDocumentationMismatch,
    /// `required` names a property that is not declared
    UndefinedRequiredProperty,
    /// Two hoisted shapes synthesize the same definition name
    DuplicateDefinitionName,
    /// An example does not satisfy its schema
    InvalidExample,

    // === Warnings ===
    /// Property without a usable type, degraded to string
    UntypedProperty,
    /// Structural embedding of a schema that should be referenced
    UnusualReference,
    /// Aggregate or reference data schema without examples
    MissingExample,
    /// `x-enum-description` on a node that is not an enum
    StrayEnumDocumentation,
    /// Unsupported keyword dropped because strict checking is off
    IgnoredKeyword,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequiredProperty => "MISSING_REQUIRED_PROPERTY",
            Self::NotSupportedValue => "NOT_SUPPORTED_VALUE",
            Self::NotSupportedProperty => "NOT_SUPPORTED_PROPERTY",
            Self::AmbiguousKind => "AMBIGUOUS_KIND",
            Self::DanglingReference => "DANGLING_REFERENCE",
            Self::DuplicateId => "DUPLICATE_ID",
            Self::EnumDocumentationMismatch => "ENUM_DOCUMENTATION_MISMATCH",
            Self::UndefinedRequiredProperty => "UNDEFINED_REQUIRED_PROPERTY",
            Self::DuplicateDefinitionName => "DUPLICATE_DEFINITION_NAME",
            Self::InvalidExample => "INVALID_EXAMPLE",
            Self::UntypedProperty => "UNTYPED_PROPERTY",
            Self::UnusualReference => "UNUSUAL_REFERENCE",
            Self::MissingExample => "MISSING_EXAMPLE",
            Self::StrayEnumDocumentation => "STRAY_ENUM_DOCUMENTATION",
            Self::IgnoredKeyword => "IGNORED_KEYWORD",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingRequiredProperty
            | Self::NotSupportedValue
            | Self::NotSupportedProperty
            | Self::AmbiguousKind
            | Self::DanglingReference
            | Self::DuplicateId
            | Self::EnumDocumentationMismatch
            | Self::UndefinedRequiredProperty
            | Self::DuplicateDefinitionName
            | Self::InvalidExample => Severity::Error,

            Self::UntypedProperty
            | Self::UnusualReference
            | Self::MissingExample
            | Self::StrayEnumDocumentation
            | Self::IgnoredKeyword => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A single finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// File location or schema id the finding belongs to
    pub origin: String,
    /// Keyword path inside the document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Offending value, when there is one worth showing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Diagnostic {
    pub fn new(origin: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            path: Vec::new(),
            kind,
            message: message.into(),
            value: None,
        }
    }

    pub fn at<S: AsRef<str>>(mut self, path: &[S]) -> Self {
        self.path = path.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Dotted form of `path`, `<root>` when empty
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.join(".")
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({} at {})",
            self.kind,
            self.severity(),
            self.message,
            self.origin,
            self.path_string()
        )?;
        if let Some(value) = &self.value {
            write!(f, "\n  - value: {}", value)?;
        }
        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic, logging warnings as they arrive
    pub fn push(&mut self, item: Diagnostic) {
        if item.severity() == Severity::Warning {
            tracing::warn!(kind = %item.kind, origin = %item.origin, path = %item.path_string(), "{}", item.message);
        }
        self.items.push(item);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items of one kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Merge another collection into this one without re-logging it
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Split into (errors, warnings)
    pub fn partition(self) -> (Diagnostics, Diagnostics) {
        let (errors, warnings) = self
            .items
            .into_iter()
            .partition(|i| i.severity() == Severity::Error);
        (Diagnostics { items: errors }, Diagnostics { items: warnings })
    }

    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_severity() {
        assert_eq!(DiagnosticKind::AmbiguousKind.severity(), Severity::Error);
        assert_eq!(DiagnosticKind::UntypedProperty.severity(), Severity::Warning);
        assert_eq!(DiagnosticKind::DanglingReference.as_str(), "DANGLING_REFERENCE");
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let value = serde_json::to_value(DiagnosticKind::EnumDocumentationMismatch).unwrap();
        assert_eq!(value, json!("ENUM_DOCUMENTATION_MISMATCH"));
    }

    #[test]
    fn test_collection_counts_and_partition() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new("/M/S.yaml", DiagnosticKind::DanglingReference, "missing"));
        diags.push(
            Diagnostic::new("/M/S.yaml", DiagnosticKind::UntypedProperty, "untyped")
                .at(&["properties", "foo"]),
        );

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());

        let (errors, warnings) = diags.partition();
        assert_eq!(errors.len(), 1);
        assert_eq!(warnings.iter().next().unwrap().path_string(), "properties.foo");
    }

    #[test]
    fn test_display_includes_kind_and_value() {
        let diag = Diagnostic::new("/M/S.yaml", DiagnosticKind::NotSupportedValue, "bad type")
            .at(&["type"])
            .with_value(json!("date"));
        let text = diag.to_string();
        assert!(text.contains("NOT_SUPPORTED_VALUE"));
        assert!(text.contains("\"date\""));
        assert!(text.contains("at type"));
    }
}
