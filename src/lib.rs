//! Domain Model Schemas
//!
//! Turns a hierarchy of loosely written schema documents (one application,
//! its modules and their schemas) into a canonical, fully resolved model.
//!
//! ## Pipeline
//!
//! ```text
//! raw document ──► DocumentValidator ──► normalize_schema ──┐
//!                   (per document)       (per document)     │
//!                                                           ▼
//!                              Model ◄── examples ◄── ReferenceResolver
//!                                │                    (whole document set)
//!                                ▼
//!                     analyze_dependencies / DependencyGraph
//! ```
//!
//! - **Normalization** hoists every inline object, enum and interface into
//!   a flat per-schema `definitions` map under a synthesized name.
//! - **Resolution** checks every `$ref` and `x-references` across the whole
//!   document set and reports all dangling references at once.
//! - **Dependency analysis** classifies each reference as `CONTAINS`,
//!   `REFERENCES`, `ENUM` or `IS_IMPLEMENTED_BY` using the domain roles
//!   declared through `x-schema-type`.
//!
//! ## Example
//!
//! ```no_run
//! use domain_schemas::{load_directory, ModelConfig};
//!
//! let config = ModelConfig::load()?;
//! let output = load_directory("model".as_ref(), &config)?;
//! for schema in output.model.schemas() {
//!     println!("{} ({})", schema.id, schema.role);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod examples;
pub mod graph;
pub mod loader;
pub mod normalize;
pub mod resolve;
pub mod schema;
pub mod validate;

pub use builder::{BuildOutput, ModelBuilder};
pub use config::{AdditionalPropertiesPolicy, ModelConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{ModelError, Result};
pub use examples::ExampleVerifier;
pub use graph::{analyze_dependencies, Dependency, DependencyAnalysis, DependencyGraph, DependencyKind};
pub use loader::load_directory;
pub use normalize::{normalize_schema, Normalized};
pub use resolve::ReferenceResolver;
pub use schema::{
    Annotations, Application, Definition, Model, Module, Property, Schema, SchemaRole, Target,
};
pub use validate::DocumentValidator;
