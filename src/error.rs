//! Error types for the domain model pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model pipeline errors
///
/// Each phase either succeeds completely or fails with one of these; no
/// partially built model is ever returned.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid document {location}:\n{diagnostics}")]
    InvalidDocument {
        location: String,
        diagnostics: Diagnostics,
    },

    #[error("Id mismatch in {location}: expected '{expected}', found '{actual}'")]
    IdMismatch {
        location: String,
        expected: String,
        actual: String,
    },

    #[error("Cannot normalize schema {schema_id}: {diagnostic}")]
    Normalization {
        schema_id: String,
        diagnostic: Box<Diagnostic>,
    },

    #[error("Unresolved references:\n{diagnostics}")]
    Resolution { diagnostics: Diagnostics },

    #[error("Invalid examples:\n{diagnostics}")]
    InvalidExamples { diagnostics: Diagnostics },

    #[error("No application document was provided")]
    MissingApplication,

    #[error("A second application document was provided: {location}")]
    DuplicateApplication { location: String },

    #[error("Schema not found: {id}")]
    SchemaNotFound { id: String },

    #[error("Unexpected file in document tree: {}", path.display())]
    UnexpectedFile { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error in {location}: {source}")]
    Yaml {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl ModelError {
    /// Diagnostics carried by this error, if any
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        match self {
            Self::InvalidDocument { diagnostics, .. }
            | Self::Resolution { diagnostics }
            | Self::InvalidExamples { diagnostics } => diagnostics.iter().collect(),
            Self::Normalization { diagnostic, .. } => vec![diagnostic.as_ref()],
            _ => Vec::new(),
        }
    }
}
