//! Dependency Analysis
//!
//! Enumerates the typed edges one normalized schema participates in. The
//! analysis is derived data: the schema and model are never touched.

use serde::{Deserialize, Serialize};

use super::classify::{classify_reference, DependencyKind};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{ModelError, Result};
use crate::schema::{AdditionalProperties, Definition, Model, Property, Schema, Target};

/// A directed edge between two (schema, definition) endpoints
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub from_schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_definition_name: Option<String>,
    pub to_schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_definition_name: Option<String>,
    pub kind: DependencyKind,
    /// Property the edge was found on; `None` for `oneOf` entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    pub is_array: bool,
}

/// Edges of one schema plus the unusual-reference warnings raised on the way
#[derive(Debug, Clone, Default)]
pub struct DependencyAnalysis {
    pub dependencies: Vec<Dependency>,
    pub diagnostics: Diagnostics,
}

/// Enumerate the edges of `schema`, root definition first
pub fn analyze_dependencies(model: &Model, schema: &Schema) -> Result<DependencyAnalysis> {
    let mut analyzer = Analyzer {
        model,
        schema,
        analysis: DependencyAnalysis::default(),
    };

    for (name, definition) in schema.all_definitions() {
        analyzer.definition(name, definition)?;
    }

    tracing::debug!(
        schema = %schema.id,
        dependencies = analyzer.analysis.dependencies.len(),
        "analyzed dependencies"
    );
    Ok(analyzer.analysis)
}

/// How a reference string was written
#[derive(Clone, Copy)]
enum Via {
    Ref,
    XReferences,
}

struct Analyzer<'m> {
    model: &'m Model,
    schema: &'m Schema,
    analysis: DependencyAnalysis,
}

impl<'m> Analyzer<'m> {
    fn definition(&mut self, from: Option<&str>, definition: &'m Definition) -> Result<()> {
        match definition {
            Definition::Enum(_) => Ok(()),
            Definition::Object(object) => {
                for (name, property) in object.properties.iter() {
                    self.property(from, name, property, false)?;
                }
                if let Some(AdditionalProperties::Property(values)) = &object.additional_properties {
                    self.property(from, "additionalProperties", values, false)?;
                }
                Ok(())
            }
            Definition::Interface(interface) => {
                for branch in &interface.one_of {
                    let target = self.target(&branch.target)?;
                    self.push(from, &target, DependencyKind::IsImplementedBy, None, false);
                }
                Ok(())
            }
        }
    }

    fn property(&mut self, from: Option<&str>, name: &str, property: &'m Property, in_array: bool) -> Result<()> {
        let (inner, is_array) = property.unwrap_array();
        let is_array = in_array || is_array;
        match inner {
            Property::Ref(r) => self.reference(from, name, &r.target, Via::Ref, is_array),
            Property::Basic(basic) => {
                for reference in &basic.references {
                    self.reference(from, name, reference, Via::XReferences, is_array)?;
                }
                Ok(())
            }
            Property::Map(map) => match &map.values {
                AdditionalProperties::Property(values) => self.property(from, name, values, is_array),
                AdditionalProperties::Allowed(_) => Ok(()),
            },
            Property::Array(_) => Ok(()),
        }
    }

    fn reference(&mut self, from: Option<&str>, name: &str, text: &str, via: Via, is_array: bool) -> Result<()> {
        let target = self.target(text)?;
        let kind = if target.definition.is_enum() {
            DependencyKind::Enum
        } else if let Via::XReferences = via {
            DependencyKind::References
        } else if target.schema.id == self.schema.id {
            DependencyKind::Contains
        } else {
            let classification = classify_reference(self.schema.role, target.schema.role);
            if classification.unusual {
                self.analysis.diagnostics.push(
                    Diagnostic::new(
                        &self.schema.id,
                        DiagnosticKind::UnusualReference,
                        format!(
                            "{} {} is included in {} using $ref; reference it with x-references instead",
                            target.schema.role, target.schema.id, self.schema.id
                        ),
                    )
                    .at(&["properties", name])
                    .with_value(text.into()),
                );
            }
            classification.kind
        };
        self.push(from, &target, kind, Some(name), is_array);
        Ok(())
    }

    fn target(&self, text: &str) -> Result<Target<'m>> {
        self.model.resolve_reference(self.schema, text).ok_or_else(|| ModelError::Resolution {
            diagnostics: std::iter::once(
                Diagnostic::new(
                    &self.schema.id,
                    DiagnosticKind::DanglingReference,
                    format!("Invalid reference '{}' in schema {}", text, self.schema.id),
                )
                .with_value(text.into()),
            )
            .collect(),
        })
    }

    fn push(&mut self, from: Option<&str>, target: &Target<'_>, kind: DependencyKind, property: Option<&str>, is_array: bool) {
        let dependency = Dependency {
            from_schema: self.schema.id.clone(),
            from_definition_name: from.map(str::to_string),
            to_schema: target.schema.id.clone(),
            to_definition_name: target.definition_name.map(str::to_string),
            kind,
            property_name: property.map(str::to_string),
            is_array,
        };
        if !self.analysis.dependencies.contains(&dependency) {
            self.analysis.dependencies.push(dependency);
        }
    }
}
