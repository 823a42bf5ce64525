//! Reference Resolution
//!
//! Whole-model pass run once every schema is normalized. Every `$ref` and
//! `x-references` value in every schema (and every reference inside module
//! `operations`) must point at a known schema id or local definition. All
//! failures are collected before the run aborts.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{ModelError, Result};
use crate::schema::{AdditionalProperties, Definition, Module, Property, Schema};

const LOCAL_PREFIX: &str = "#/definitions/";

/// A parsed reference string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `#`
    SelfRef,
    /// `#/definitions/<name>`
    Local(&'a str),
    /// Another schema, already resolved to an absolute id
    External(String),
}

impl<'a> Reference<'a> {
    /// Parse `text` as written in the schema with id `from_id`
    pub fn parse(from_id: &str, text: &'a str) -> Self {
        if text == "#" {
            Reference::SelfRef
        } else if let Some(name) = text.strip_prefix(LOCAL_PREFIX) {
            Reference::Local(name)
        } else {
            Reference::External(resolve_relative_id(from_id, text))
        }
    }
}

/// Resolve `reference` against the directory of `from_id`
pub fn resolve_relative_id(from_id: &str, reference: &str) -> String {
    let parent = Path::new(from_id).parent().unwrap_or(Path::new("/"));
    resolve_against(&parent.to_string_lossy(), reference)
}

/// Resolve `reference` against the directory `base_dir`, collapsing `.` and `..`
pub fn resolve_against(base_dir: &str, reference: &str) -> String {
    let resolved = Path::new(base_dir).join(reference);

    let mut components = Vec::new();
    for component in resolved.components() {
        match component {
            Component::ParentDir => {
                components.pop();
            }
            Component::Normal(s) => {
                components.push(s.to_string_lossy().to_string());
            }
            _ => {}
        }
    }

    format!("/{}", components.join("/"))
}

/// Every reference string a definition holds, with the keyword path it sits at
pub fn definition_references(definition: &Definition) -> Vec<(Vec<String>, &str)> {
    let mut found = Vec::new();
    match definition {
        Definition::Enum(_) => {}
        Definition::Object(object) => {
            for (name, property) in object.properties.iter() {
                let path = vec!["properties".to_string(), name.to_string()];
                property_references(property, path, &mut found);
            }
            if let Some(AdditionalProperties::Property(property)) = &object.additional_properties {
                property_references(property, vec!["additionalProperties".to_string()], &mut found);
            }
        }
        Definition::Interface(interface) => {
            for (i, branch) in interface.one_of.iter().enumerate() {
                found.push((vec!["oneOf".to_string(), i.to_string()], branch.target.as_str()));
            }
        }
    }
    found
}

fn property_references<'a>(property: &'a Property, path: Vec<String>, found: &mut Vec<(Vec<String>, &'a str)>) {
    match property {
        Property::Ref(r) => found.push((with(&path, "$ref"), r.target.as_str())),
        Property::Array(array) => property_references(&array.items, with(&path, "items"), found),
        Property::Map(map) => {
            if let AdditionalProperties::Property(values) = &map.values {
                property_references(values, with(&path, "additionalProperties"), found);
            }
        }
        Property::Basic(basic) => {
            for reference in &basic.references {
                found.push((with(&path, "x-references"), reference.as_str()));
            }
        }
    }
}

fn with(path: &[String], segment: &str) -> Vec<String> {
    let mut next = path.to_vec();
    next.push(segment.to_string());
    next
}

/// Checks a complete set of normalized documents
pub struct ReferenceResolver<'a> {
    schemas: HashMap<&'a str, &'a Schema>,
    diagnostics: Diagnostics,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(schemas: &'a [Schema]) -> Self {
        let mut diagnostics = Diagnostics::new();
        let mut index = HashMap::with_capacity(schemas.len());
        for schema in schemas {
            if index.insert(schema.id.as_str(), schema).is_some() {
                diagnostics.push(
                    Diagnostic::new(&schema.id, DiagnosticKind::DuplicateId, format!("Schema id '{}' is declared more than once", schema.id))
                        .at(&["$id"]),
                );
            }
        }
        Self {
            schemas: index,
            diagnostics,
        }
    }

    /// Check every reference of every schema and module, failing with all findings
    pub fn resolve(mut self, schemas: &'a [Schema], modules: &[Module]) -> Result<()> {
        let mut module_ids = HashSet::new();
        for module in modules {
            if !module_ids.insert(module.id.as_str()) {
                self.diagnostics.push(
                    Diagnostic::new(&module.id, DiagnosticKind::DuplicateId, format!("Module id '{}' is declared more than once", module.id))
                        .at(&["$id"]),
                );
            }
        }

        for schema in schemas {
            self.check_schema(schema);
        }
        for module in modules {
            if let Some(operations) = &module.operations {
                self.check_operations(module, operations, &mut vec!["operations".to_string()]);
            }
        }

        if self.diagnostics.has_errors() {
            tracing::debug!(count = self.diagnostics.error_count(), "reference resolution failed");
            return Err(ModelError::Resolution {
                diagnostics: self.diagnostics,
            });
        }
        Ok(())
    }

    fn check_schema(&mut self, schema: &'a Schema) {
        for (name, definition) in schema.all_definitions() {
            let prefix: Vec<String> = match name {
                Some(n) => vec!["definitions".to_string(), n.to_string()],
                None => Vec::new(),
            };
            for (path, text) in definition_references(definition) {
                let is_branch = path.first().map(String::as_str) == Some("oneOf");
                let mut full = prefix.clone();
                full.extend(path);

                match self.lookup(schema, text) {
                    None => self.dangling(&schema.id, &full, text),
                    Some(target) if is_branch && target.is_enum() => {
                        self.diagnostics.push(
                            Diagnostic::new(
                                &schema.id,
                                DiagnosticKind::NotSupportedValue,
                                format!("oneOf entry '{}' targets an enum; only objects and interfaces can implement an interface", text),
                            )
                            .at(&full)
                            .with_value(Value::String(text.to_string())),
                        );
                    }
                    Some(_) => {}
                }
            }
        }
    }

    fn lookup(&self, schema: &'a Schema, text: &str) -> Option<&'a Definition> {
        match Reference::parse(&schema.id, text) {
            Reference::SelfRef => Some(&schema.root),
            Reference::Local(name) => schema.definitions.get(name),
            Reference::External(id) => self.schemas.get(id.as_str()).copied().map(|s| &s.root),
        }
    }

    fn check_operations(&mut self, module: &Module, value: &Value, path: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    path.push(key.clone());
                    match (key.as_str(), child) {
                        ("$ref", Value::String(text)) => self.check_module_reference(module, text, path),
                        ("x-references", Value::String(text)) => self.check_module_reference(module, text, path),
                        ("x-references", Value::Array(items)) => {
                            for text in items.iter().filter_map(Value::as_str) {
                                self.check_module_reference(module, text, path);
                            }
                        }
                        _ => self.check_operations(module, child, path),
                    }
                    path.pop();
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    path.push(i.to_string());
                    self.check_operations(module, child, path);
                    path.pop();
                }
            }
            _ => {}
        }
    }

    fn check_module_reference(&mut self, module: &Module, text: &str, path: &[String]) {
        // Local references have no meaning inside a module document
        if text.starts_with('#') {
            return;
        }
        let id = resolve_against(&module.id, text);
        if !self.schemas.contains_key(id.as_str()) {
            self.dangling(&module.id, path, text);
        }
    }

    fn dangling(&mut self, origin: &str, path: &[String], text: &str) {
        self.diagnostics.push(
            Diagnostic::new(origin, DiagnosticKind::DanglingReference, format!("Invalid reference '{}' in '{}'", text, origin))
                .at(path)
                .with_value(Value::String(text.to_string())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::normalize::{normalize_module, normalize_schema};
    use serde_json::json;

    fn schema(id: &str, body: Value) -> Schema {
        let mut raw = json!({"$id": id, "title": "T", "x-schema-type": "Entity"});
        for (k, v) in body.as_object().unwrap() {
            raw[k] = v.clone();
        }
        normalize_schema(&raw, &ModelConfig::default()).unwrap().schema
    }

    fn resolve(schemas: &[Schema], modules: &[Module]) -> Vec<Diagnostic> {
        match ReferenceResolver::new(schemas).resolve(schemas, modules) {
            Ok(()) => Vec::new(),
            Err(ModelError::Resolution { diagnostics }) => diagnostics.iter().cloned().collect(),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_dangling_references_collected() {
        let schemas = vec![
            schema("/M/A.yaml", json!({"type": "object", "properties": {
                "b": {"$ref": "./B.yaml"},
                "gone": {"$ref": "./Gone.yaml"},
                "local": {"$ref": "#/definitions/Missing"}
            }})),
            schema("/M/B.yaml", json!({"type": "object", "properties": {
                "owner": {"type": "string", "x-references": ["./A.yaml", "../N/Nobody.yaml"]}
            }})),
        ];

        let diagnostics = resolve(&schemas, &[]);
        let texts: Vec<&str> = diagnostics
            .iter()
            .map(|d| d.value.as_ref().and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(texts, vec!["./Gone.yaml", "#/definitions/Missing", "../N/Nobody.yaml"]);
        assert!(diagnostics.iter().all(|d| d.kind == DiagnosticKind::DanglingReference));
        assert_eq!(diagnostics[2].origin, "/M/B.yaml");
        assert_eq!(diagnostics[2].path, vec!["properties", "owner", "x-references"]);
    }

    #[test]
    fn test_duplicate_schema_ids() {
        let schemas = vec![
            schema("/M/A.yaml", json!({"type": "string", "enum": ["X"]})),
            schema("/M/A.yaml", json!({"type": "string", "enum": ["Y"]})),
        ];
        let diagnostics = resolve(&schemas, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateId);
    }

    #[test]
    fn test_one_of_must_not_target_enum() {
        let schemas = vec![
            schema("/M/Shape.yaml", json!({"type": "object", "oneOf": [{"$ref": "./Kind.yaml"}]})),
            schema("/M/Kind.yaml", json!({"type": "string", "enum": ["A"]})),
        ];
        let diagnostics = resolve(&schemas, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::NotSupportedValue);
        assert_eq!(diagnostics[0].path, vec!["oneOf", "0"]);
    }

    #[test]
    fn test_module_operations_resolved() {
        let schemas = vec![schema("/Sales/Order.yaml", json!({"type": "object", "properties": {}}))];
        let module = normalize_module(&json!({
            "$id": "/Sales",
            "title": "Sales",
            "description": "d",
            "operations": {
                "create": {"input": {"$ref": "./Order.yaml"}, "output": {"x-references": ["Order.yaml", "./Receipt.yaml"]}},
                "self": {"$ref": "#/whatever"}
            }
        }))
        .unwrap();

        let diagnostics = resolve(&schemas, &[module]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].value, Some(json!("./Receipt.yaml")));
        assert_eq!(diagnostics[0].path, vec!["operations", "create", "output", "x-references"]);
    }

    #[test]
    fn test_parse_reference_forms() {
        assert_eq!(Reference::parse("/M/S.yaml", "#"), Reference::SelfRef);
        assert_eq!(Reference::parse("/M/S.yaml", "#/definitions/Deep"), Reference::Local("Deep"));
        assert_eq!(
            Reference::parse("/M/S.yaml", "./Other.yaml"),
            Reference::External("/M/Other.yaml".to_string())
        );
    }

    #[test]
    fn test_resolve_relative_id() {
        assert_eq!(resolve_relative_id("/M/S.yaml", "Other.yaml"), "/M/Other.yaml");
        assert_eq!(resolve_relative_id("/M/S.yaml", "../N/Other.yaml"), "/N/Other.yaml");
        assert_eq!(resolve_relative_id("/M/Sub/S.yaml", "../../N/O.yaml"), "/N/O.yaml");
        assert_eq!(resolve_relative_id("/M/S.yaml", "/N/O.yaml"), "/N/O.yaml");
    }

    #[test]
    fn test_resolve_against_module_dir() {
        assert_eq!(resolve_against("/Module2", "../Module/Schema.yaml"), "/Module/Schema.yaml");
        assert_eq!(resolve_against("/Module", "Schema.yaml"), "/Module/Schema.yaml");
    }
}
