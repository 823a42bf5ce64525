//! Document Validation
//!
//! Checks raw application, module and schema documents before anything is
//! normalized. Checks run in three phases and each phase reports everything
//! it finds before the document is rejected:
//!
//! 1. structure: required fields, keyword vocabulary, value shapes
//! 2. the declared id against the id expected from the document's location
//! 3. consistency: enum documentation, `required` names, constant types

pub mod keywords;

use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::config::ModelConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{ModelError, Result};
use crate::schema::{BasicType, ImplementationErrorKind, SchemaRole};

use keywords::{definition_kind, property_shape, Context, DefinitionKind, NodeKind, PropertyShape};

/// Validates raw documents against the restricted vocabulary
pub struct DocumentValidator<'c> {
    config: &'c ModelConfig,
}

impl<'c> DocumentValidator<'c> {
    pub fn new(config: &'c ModelConfig) -> Self {
        Self { config }
    }

    /// Validate an application document, returning its warnings
    pub fn validate_application(&self, raw: &Value, location: &str) -> Result<Diagnostics> {
        let mut run = Run::new(self.config, location);
        if let Some(map) = run.expect_object(raw, &[]) {
            run.check_header(map, &["title", "description"], &[]);
            run.check_annotations(map, "");
        }
        run.finish(None)
    }

    /// Validate a module document, returning its warnings
    pub fn validate_module(&self, raw: &Value, location: &str, expected_id: Option<&str>) -> Result<Diagnostics> {
        let mut run = Run::new(self.config, location);
        let mut declared = None;
        if let Some(map) = run.expect_object(raw, &[]) {
            run.check_header(map, &["$id", "title", "description"], &["operations"]);
            run.check_annotations(map, "");
            declared = map.get("$id").and_then(Value::as_str);
        }
        run.finish(expected_id.map(|e| (e, declared)))
    }

    /// Validate a schema document, returning its warnings
    pub fn validate_schema(&self, raw: &Value, location: &str, expected_id: Option<&str>) -> Result<Diagnostics> {
        let mut run = Run::new(self.config, location);
        let mut declared = None;
        if let Some(map) = run.expect_object(raw, &[]) {
            run.check_schema_root(map);
            declared = map.get("$id").and_then(Value::as_str);
            run.walk_definition(map, &mut Vec::new(), Context::Root);
        }
        run.finish(expected_id.map(|e| (e, declared)))
    }
}

/// State of one validation run
struct Run<'c> {
    config: &'c ModelConfig,
    location: String,
    structural: Diagnostics,
    semantic: Diagnostics,
}

impl<'c> Run<'c> {
    fn new(config: &'c ModelConfig, location: &str) -> Self {
        Self {
            config,
            location: location.to_string(),
            structural: Diagnostics::new(),
            semantic: Diagnostics::new(),
        }
    }

    fn finish(self, id_check: Option<(&str, Option<&str>)>) -> Result<Diagnostics> {
        let (structural_errors, mut warnings) = self.structural.partition();
        if !structural_errors.is_empty() {
            return Err(ModelError::InvalidDocument {
                location: self.location,
                diagnostics: structural_errors,
            });
        }

        if let Some((expected, Some(actual))) = id_check {
            if expected != actual {
                return Err(ModelError::IdMismatch {
                    location: self.location,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        let (semantic_errors, semantic_warnings) = self.semantic.partition();
        if !semantic_errors.is_empty() {
            return Err(ModelError::InvalidDocument {
                location: self.location,
                diagnostics: semantic_errors,
            });
        }
        warnings.merge(semantic_warnings);
        Ok(warnings)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    fn report(&mut self, path: &[String], kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(&self.location, kind, message).at(path);
        self.structural.push(diagnostic);
    }

    fn semantic(&mut self, diagnostic: Diagnostic) {
        self.semantic.push(diagnostic);
    }

    fn expect_object<'v>(&mut self, value: &'v Value, path: &[String]) -> Option<&'v Map<String, Value>> {
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.structural
                    .push(Diagnostic::new(&self.location, DiagnosticKind::NotSupportedValue, "Expected an object").at(path).with_value(value.clone()));
                None
            }
        }
    }

    fn expect_string(&mut self, map: &Map<String, Value>, key: &str, path: &[String], required: bool) {
        match map.get(key) {
            Some(Value::String(_)) => {}
            Some(other) => {
                let at = child(path, key);
                self.structural.push(
                    Diagnostic::new(&self.location, DiagnosticKind::NotSupportedValue, format!("'{}' must be a string", key))
                        .at(&at)
                        .with_value(other.clone()),
                );
            }
            None if required => self.report(path, DiagnosticKind::MissingRequiredProperty, format!("Missing required property '{}'", key)),
            None => {}
        }
    }

    fn check_unknown_keys(&mut self, map: &Map<String, Value>, path: &[String], accepted: impl Fn(&str) -> bool) {
        for key in map.keys() {
            if key == "const" || accepted(key.as_str()) || self.config.is_allowed_keyword(key) {
                continue;
            }
            let at = child(path, key);
            if self.config.validation.strict_keywords {
                self.report(&at, DiagnosticKind::NotSupportedProperty, format!("Keyword '{}' is not supported here", key));
            } else {
                self.report(&at, DiagnosticKind::IgnoredKeyword, format!("Keyword '{}' is not supported and is ignored", key));
            }
        }
    }

    // =========================================================================
    // Document headers
    // =========================================================================

    fn check_header(&mut self, map: &Map<String, Value>, required: &[&str], extra: &[&str]) {
        for key in required {
            self.expect_string(map, key, &[], true);
        }
        self.check_unknown_keys(map, &[], |k| {
            required.contains(&k) || extra.contains(&k) || ["$schema", "$comment"].contains(&k) || is_annotation(k, "")
        });
    }

    fn check_schema_root(&mut self, map: &Map<String, Value>) {
        self.expect_string(map, "$id", &[], true);
        self.expect_string(map, "title", &[], false);
        match map.get("x-schema-type") {
            None => self.report(&[], DiagnosticKind::MissingRequiredProperty, "Missing required property 'x-schema-type'"),
            Some(Value::String(role)) if SchemaRole::parse(role).is_some() => {}
            Some(other) => self.structural.push(
                Diagnostic::new(&self.location, DiagnosticKind::NotSupportedValue, "'x-schema-type' must be one of Aggregate, Entity, ValueObject, ReferenceData, Other")
                    .at(&["x-schema-type"])
                    .with_value(other.clone()),
            ),
        }
        if let Some(examples) = map.get("examples") {
            if !examples.is_array() {
                self.report(&["examples".to_string()], DiagnosticKind::NotSupportedValue, "'examples' must be a list");
            }
        }
        self.check_annotations(map, "x-");
    }

    fn check_annotations(&mut self, map: &Map<String, Value>, prefix: &str) {
        let key = |field: &str| format!("{}{}", prefix, field);

        if let Some(todos) = map.get(&key("todos")) {
            if !is_list_of(todos, Value::is_string) {
                self.report(&[key("todos")], DiagnosticKind::NotSupportedValue, "Todos must be a list of strings");
            }
        }
        if let Some(links) = map.get(&key("links")) {
            let valid = is_list_of(links, |l| {
                l.as_object()
                    .map(|o| o.len() == 2 && o.get("text").map_or(false, Value::is_string) && o.get("href").map_or(false, Value::is_string))
                    .unwrap_or(false)
            });
            if !valid {
                self.report(&[key("links")], DiagnosticKind::NotSupportedValue, "Links must be a list of {text, href}");
            }
        }
        if let Some(tags) = map.get(&key("tags")) {
            let valid = tags.as_object().map_or(false, |o| o.values().all(Value::is_string));
            if !valid {
                self.report(&[key("tags")], DiagnosticKind::NotSupportedValue, "Tags must map names to strings");
            }
        }
        if let Some(errors) = map.get(&key("errors")) {
            let valid = is_list_of(errors, |e| {
                serde_json::from_value::<ErrorShape>(e.clone()).is_ok()
            });
            if !valid {
                self.report(&[key("errors")], DiagnosticKind::NotSupportedValue, "Errors must be a list of {text, type}");
            }
        }
    }

    // =========================================================================
    // Schema bodies
    // =========================================================================

    fn walk_definition(&mut self, map: &Map<String, Value>, path: &mut Vec<String>, context: Context) {
        let kind = match definition_kind(map) {
            Ok(kind) => kind,
            Err(err) => {
                let at = match err.keyword {
                    Some(k) => child(path, k),
                    None => path.clone(),
                };
                self.report(&at, err.kind, err.message);
                return;
            }
        };

        let node = NodeKind::Definition(kind);
        self.check_unknown_keys(map, path, |k| keywords::is_supported(k, node, context));
        self.check_const(map, path, None);
        if kind != DefinitionKind::Enum {
            self.check_stray_enum_documentation(map, path);
        }

        match kind {
            DefinitionKind::Enum => self.check_enum(map, path),
            DefinitionKind::Object => self.check_object(map, path),
            DefinitionKind::Interface => self.check_interface(map, path),
        }

        if let Some(definitions) = map.get("definitions") {
            path.push("definitions".to_string());
            match definitions.as_object() {
                Some(entries) => {
                    for (name, definition) in entries {
                        path.push(name.clone());
                        if let Some(inner) = self.expect_object(definition, path) {
                            self.walk_definition(inner, path, Context::Definition);
                        }
                        path.pop();
                    }
                }
                None => self.report(path, DiagnosticKind::NotSupportedValue, "'definitions' must map names to definitions"),
            }
            path.pop();
        }
    }

    fn check_enum(&mut self, map: &Map<String, Value>, path: &[String]) {
        let at = child(path, "enum");
        let values = match map.get("enum").and_then(Value::as_array) {
            Some(values) => values,
            None => {
                self.report(&at, DiagnosticKind::NotSupportedValue, "'enum' must be a list of strings");
                return;
            }
        };
        if values.is_empty() {
            self.report(&at, DiagnosticKind::NotSupportedValue, "'enum' must not be empty");
        }

        let mut seen = HashSet::new();
        for value in values {
            match value.as_str() {
                Some(s) => {
                    if !seen.insert(s) {
                        self.structural.push(
                            Diagnostic::new(&self.location, DiagnosticKind::NotSupportedValue, format!("Enum value '{}' is listed twice", s))
                                .at(&at)
                                .with_value(value.clone()),
                        );
                    }
                }
                None => {
                    self.structural.push(
                        Diagnostic::new(&self.location, DiagnosticKind::NotSupportedValue, "Enum values must be strings")
                            .at(&at)
                            .with_value(value.clone()),
                    );
                }
            }
        }

        let docs_at = child(path, "x-enum-description");
        let documentation = match map.get("x-enum-description") {
            None | Some(Value::Null) => return,
            Some(Value::Object(docs)) if docs.values().all(Value::is_string) => docs,
            Some(_) => {
                self.report(&docs_at, DiagnosticKind::NotSupportedValue, "'x-enum-description' must map enum values to strings");
                return;
            }
        };

        for value in values.iter().filter_map(Value::as_str) {
            if !documentation.contains_key(value) {
                self.semantic(
                    Diagnostic::new(
                        &self.location,
                        DiagnosticKind::EnumDocumentationMismatch,
                        format!("Enum description is missing documentation for value '{}'", value),
                    )
                    .at(&docs_at)
                    .with_value(Value::String(value.to_string())),
                );
            }
        }
        for key in documentation.keys() {
            if !seen.contains(key.as_str()) {
                self.semantic(
                    Diagnostic::new(
                        &self.location,
                        DiagnosticKind::EnumDocumentationMismatch,
                        format!("Enum description documents '{}', which is not an enum value", key),
                    )
                    .at(&docs_at)
                    .with_value(Value::String(key.clone())),
                );
            }
        }
    }

    fn check_object(&mut self, map: &Map<String, Value>, path: &mut Vec<String>) {
        let properties = match map.get("properties") {
            None => None,
            Some(Value::Object(properties)) => Some(properties),
            Some(_) => {
                self.report(&child(path, "properties"), DiagnosticKind::NotSupportedValue, "'properties' must map names to properties");
                None
            }
        };

        if let Some(properties) = properties {
            path.push("properties".to_string());
            for (name, property) in properties {
                path.push(name.clone());
                self.walk_property(property, path);
                path.pop();
            }
            path.pop();
        }

        if let Some(required) = map.get("required") {
            let at = child(path, "required");
            match required.as_array() {
                Some(names) if names.iter().all(Value::is_string) => {
                    for name in names.iter().filter_map(Value::as_str) {
                        if !properties.map_or(false, |p| p.contains_key(name)) {
                            self.semantic(
                                Diagnostic::new(
                                    &self.location,
                                    DiagnosticKind::UndefinedRequiredProperty,
                                    format!("Required property '{}' is not defined", name),
                                )
                                .at(&at)
                                .with_value(Value::String(name.to_string())),
                            );
                        }
                    }
                }
                _ => self.report(&at, DiagnosticKind::NotSupportedValue, "'required' must be a list of property names"),
            }
        }

        self.check_additional_properties(map, path);
    }

    fn check_interface(&mut self, map: &Map<String, Value>, path: &mut Vec<String>) {
        let branches = match map.get("oneOf").and_then(Value::as_array) {
            Some(branches) if !branches.is_empty() => branches,
            _ => {
                self.report(&child(path, "oneOf"), DiagnosticKind::NotSupportedValue, "'oneOf' must be a non-empty list");
                return;
            }
        };

        path.push("oneOf".to_string());
        for (i, branch) in branches.iter().enumerate() {
            path.push(i.to_string());
            if let Some(inner) = self.expect_object(branch, path) {
                if inner.contains_key("$ref") {
                    self.walk_property(branch, path);
                } else {
                    self.walk_definition(inner, path, Context::Definition);
                }
            }
            path.pop();
        }
        path.pop();
    }

    fn check_additional_properties(&mut self, map: &Map<String, Value>, path: &mut Vec<String>) {
        match map.get("additionalProperties") {
            None | Some(Value::Bool(_)) => {}
            Some(value @ Value::Object(_)) => {
                path.push("additionalProperties".to_string());
                self.walk_property(value, path);
                path.pop();
            }
            Some(_) => self.report(
                &child(path, "additionalProperties"),
                DiagnosticKind::NotSupportedValue,
                "'additionalProperties' must be a boolean or a property",
            ),
        }
    }

    fn walk_property(&mut self, value: &Value, path: &mut Vec<String>) {
        let Some(map) = self.expect_object(value, path) else {
            return;
        };
        let shape = match property_shape(map) {
            Ok(shape) => shape,
            Err(err) => {
                let at = match err.keyword {
                    Some(k) => child(path, k),
                    None => path.clone(),
                };
                self.report(&at, err.kind, err.message);
                return;
            }
        };

        if let PropertyShape::Inline(_) = shape {
            self.walk_definition(map, path, Context::Property);
            return;
        }

        let node = NodeKind::of_property(&shape);
        self.check_unknown_keys(map, path, |k| keywords::is_supported(k, node, Context::Property));
        self.check_stray_enum_documentation(map, path);

        match &shape {
            PropertyShape::Ref => {
                if !map.get("$ref").map_or(false, Value::is_string) {
                    self.report(&child(path, "$ref"), DiagnosticKind::NotSupportedValue, "'$ref' must be a string");
                }
                self.check_const(map, path, None);
            }
            PropertyShape::Array => {
                self.check_const(map, path, None);
                match map.get("items") {
                    None => self.report(path, DiagnosticKind::MissingRequiredProperty, "An array must declare 'items'"),
                    Some(Value::Array(_)) => self.report(
                        &child(path, "items"),
                        DiagnosticKind::NotSupportedValue,
                        "An array must have exactly one item schema",
                    ),
                    Some(items) => {
                        path.push("items".to_string());
                        self.walk_property(items, path);
                        path.pop();
                    }
                }
            }
            PropertyShape::Map => {
                self.check_const(map, path, None);
                self.check_additional_properties(map, path);
            }
            PropertyShape::Basic(basic) => {
                self.check_const(map, path, Some(*basic));
                self.check_references(map, path);
                if *basic == BasicType::String {
                    self.check_pattern(map, path);
                }
            }
            PropertyShape::Untyped(_) => {
                self.check_const(map, path, None);
                self.check_references(map, path);
            }
            PropertyShape::Inline(_) => {}
        }
    }

    fn check_references(&mut self, map: &Map<String, Value>, path: &[String]) {
        match map.get("x-references") {
            None | Some(Value::String(_)) => {}
            Some(list) if is_list_of(list, Value::is_string) => {}
            Some(other) => self.structural.push(
                Diagnostic::new(&self.location, DiagnosticKind::NotSupportedValue, "'x-references' must be a string or a list of strings")
                    .at(&child(path, "x-references"))
                    .with_value(other.clone()),
            ),
        }
    }

    /// Patterns use the ECMA-262 dialect of the engine that checks examples
    fn check_pattern(&mut self, map: &Map<String, Value>, path: &[String]) {
        match map.get("pattern") {
            None => {}
            Some(Value::String(pattern)) => {
                let facet = json!({"type": "string", "pattern": pattern});
                if let Err(e) = JSONSchema::options().with_draft(Draft::Draft7).compile(&facet) {
                    self.structural.push(
                        Diagnostic::new(&self.location, DiagnosticKind::NotSupportedValue, format!("Invalid pattern: {}", e))
                            .at(&child(path, "pattern"))
                            .with_value(Value::String(pattern.clone())),
                    );
                }
            }
            Some(_) => self.report(&child(path, "pattern"), DiagnosticKind::NotSupportedValue, "'pattern' must be a string"),
        }
    }

    /// Constants are legal on basic properties only and must match the declared type
    fn check_const(&mut self, map: &Map<String, Value>, path: &[String], basic: Option<BasicType>) {
        let Some(constant) = map.get("const") else {
            return;
        };
        let at = child(path, "const");
        match basic {
            None => self.semantic(
                Diagnostic::new(&self.location, DiagnosticKind::NotSupportedProperty, format!("Invalid constant {}: constants are only supported for basic properties", constant))
                    .at(&at)
                    .with_value(constant.clone()),
            ),
            Some(t) if !t.accepts(constant) => self.semantic(
                Diagnostic::new(&self.location, DiagnosticKind::NotSupportedValue, format!("Invalid constant {}: it is not of type {}", constant, t.as_str()))
                    .at(&at)
                    .with_value(constant.clone()),
            ),
            Some(_) => {}
        }
    }

    fn check_stray_enum_documentation(&mut self, map: &Map<String, Value>, path: &[String]) {
        if map.contains_key("x-enum-description") {
            self.semantic(Diagnostic::new(
                &self.location,
                DiagnosticKind::StrayEnumDocumentation,
                "'x-enum-description' on a node that is not an enum is ignored",
            ).at(&child(path, "x-enum-description")));
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
struct ErrorShape {
    text: String,
    #[serde(rename = "type")]
    kind: ImplementationErrorKind,
}

fn is_annotation(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .map_or(false, |field| crate::schema::Annotations::FIELDS.contains(&field))
}

fn is_list_of(value: &Value, check: impl Fn(&Value) -> bool) -> bool {
    value.as_array().map_or(false, |items| items.iter().all(check))
}

fn child(path: &[String], key: &str) -> Vec<String> {
    let mut next = path.to_vec();
    next.push(key.to_string());
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(raw: Value) -> Result<Diagnostics> {
        let config = ModelConfig::default();
        DocumentValidator::new(&config).validate_schema(&raw, "Module/Schema.yaml", Some("/Module/Schema.yaml"))
    }

    fn schema(body: Value) -> Value {
        let mut raw = json!({
            "$id": "/Module/Schema.yaml",
            "title": "Schema",
            "x-schema-type": "Entity"
        });
        for (k, v) in body.as_object().unwrap() {
            raw[k] = v.clone();
        }
        raw
    }

    fn document_kinds(err: &ModelError) -> Vec<DiagnosticKind> {
        err.diagnostics().iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_valid_schema_passes() {
        let warnings = validate(schema(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "maxLength": 10},
                "tags": {"type": "array", "items": {"type": "string"}},
                "deep": {"type": "object", "properties": {"key": {"type": "string"}}, "required": ["key"]}
            },
            "required": ["name"]
        })))
        .unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_application_and_module() {
        let config = ModelConfig::default();
        let validator = DocumentValidator::new(&config);
        validator
            .validate_application(&json!({"title": "App", "description": "d", "todos": ["x"]}), "index.yaml")
            .unwrap();
        let err = validator
            .validate_application(&json!({"title": "App"}), "index.yaml")
            .unwrap_err();
        assert_eq!(document_kinds(&err), vec![DiagnosticKind::MissingRequiredProperty]);

        let err = validator
            .validate_module(&json!({"$id": "/Other", "title": "M", "description": "d"}), "Module/index.yaml", Some("/Module"))
            .unwrap_err();
        assert!(matches!(err, ModelError::IdMismatch { ref expected, ref actual, .. } if expected == "/Module" && actual == "/Other"));
    }

    #[test]
    fn test_id_mismatch_names_both_ids() {
        let config = ModelConfig::default();
        let err = DocumentValidator::new(&config)
            .validate_schema(
                &schema(json!({"type": "object", "properties": {}})),
                "Module/Schema.yaml",
                Some("/Module/Other.yaml"),
            )
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("/Module/Other.yaml"));
        assert!(text.contains("/Module/Schema.yaml"));
    }

    #[test]
    fn test_structural_errors_are_aggregated() {
        let err = validate(schema(json!({
            "type": "object",
            "properties": {
                "a": {"type": "string", "multipleOf": 2},
                "b": {"type": "array"},
                "c": {"type": "array", "items": [{"type": "string"}, {"type": "number"}]}
            }
        })))
        .unwrap_err();
        assert_eq!(
            document_kinds(&err),
            vec![
                DiagnosticKind::NotSupportedProperty,
                DiagnosticKind::MissingRequiredProperty,
                DiagnosticKind::NotSupportedValue
            ]
        );
    }

    #[test]
    fn test_missing_enum_documentation_named() {
        let err = validate(schema(json!({
            "type": "string",
            "enum": ["A", "B"],
            "x-enum-description": {"A": "first"}
        })))
        .unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::EnumDocumentationMismatch);
        assert_eq!(diagnostics[0].value, Some(json!("B")));
        assert!(diagnostics[0].message.contains("'B'"));
    }

    #[test]
    fn test_extra_enum_documentation_named() {
        let err = validate(schema(json!({
            "type": "string",
            "enum": ["A", "B"],
            "x-enum-description": {"A": "first", "B": "second", "C": "third"}
        })))
        .unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].value, Some(json!("C")));
    }

    #[test]
    fn test_nested_enum_documentation_checked() {
        let err = validate(schema(json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "enum": ["ON"], "x-enum-description": {"OFF": "?"}}
            }
        })))
        .unwrap_err();
        let kinds = document_kinds(&err);
        assert_eq!(kinds, vec![DiagnosticKind::EnumDocumentationMismatch, DiagnosticKind::EnumDocumentationMismatch]);
        assert_eq!(err.diagnostics()[0].path, vec!["properties", "status", "x-enum-description"]);
    }

    #[test]
    fn test_undefined_required_property() {
        let err = validate(schema(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "required": ["a", "b"]
        })))
        .unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UndefinedRequiredProperty);
        assert_eq!(diagnostics[0].value, Some(json!("b")));
    }

    #[test]
    fn test_constant_type_checked() {
        let err = validate(schema(json!({
            "type": "object",
            "properties": {
                "version": {"type": "integer", "const": "1"},
                "kind": {"type": "string", "const": "fixed"}
            }
        })))
        .unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, vec!["properties", "version", "const"]);
    }

    #[test]
    fn test_constant_on_object_rejected() {
        let err = validate(schema(json!({
            "type": "object",
            "properties": {"inner": {"type": "object", "const": {}}}
        })))
        .unwrap_err();
        assert_eq!(document_kinds(&err), vec![DiagnosticKind::NotSupportedProperty]);
    }

    #[test]
    fn test_structural_phase_runs_before_id_check() {
        let config = ModelConfig::default();
        let err = DocumentValidator::new(&config)
            .validate_schema(&json!({"$id": "/Wrong.yaml", "type": "object"}), "Module/Schema.yaml", Some("/Module/Schema.yaml"))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidDocument { .. }));
    }

    #[test]
    fn test_lenient_keywords_warn() {
        let mut config = ModelConfig::default();
        config.validation.strict_keywords = false;
        let warnings = DocumentValidator::new(&config)
            .validate_schema(
                &schema(json!({"type": "object", "properties": {"a": {"type": "string", "nullable": true}}})),
                "Module/Schema.yaml",
                None,
            )
            .unwrap();
        assert_eq!(warnings.of_kind(DiagnosticKind::IgnoredKeyword).count(), 1);
    }

    #[test]
    fn test_allow_listed_keyword_accepted() {
        let mut config = ModelConfig::default();
        config.validation.allowed_keywords.push("discriminator".to_string());
        DocumentValidator::new(&config)
            .validate_schema(
                &schema(json!({"type": "object", "oneOf": [{"$ref": "./A.yaml"}], "discriminator": {"propertyName": "kind"}})),
                "Module/Schema.yaml",
                None,
            )
            .unwrap();
    }

    #[test]
    fn test_stray_enum_documentation_warns() {
        let warnings = validate(schema(json!({
            "type": "object",
            "properties": {"a": {"type": "string", "x-enum-description": {"A": "?"}}}
        })))
        .unwrap();
        assert_eq!(warnings.of_kind(DiagnosticKind::StrayEnumDocumentation).count(), 1);
    }

    #[test]
    fn test_ambiguous_kind_rejected() {
        let err = validate(schema(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "oneOf": [{"$ref": "./A.yaml"}]
        })))
        .unwrap_err();
        assert_eq!(document_kinds(&err), vec![DiagnosticKind::AmbiguousKind]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = validate(schema(json!({
            "type": "object",
            "properties": {"code": {"type": "string", "pattern": "^[A-Z"}}
        })))
        .unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics[0].kind, DiagnosticKind::NotSupportedValue);
        assert_eq!(diagnostics[0].path, vec!["properties", "code", "pattern"]);
    }

    #[test]
    fn test_ecma_pattern_features_accepted() {
        validate(schema(json!({
            "type": "object",
            "properties": {
                "code": {"type": "string", "pattern": "^(?!tmp).*$"},
                "pair": {"type": "string", "pattern": "^(a)\\1$"},
                "digits": {"type": "string", "pattern": "^\\d{3}$"}
            }
        })))
        .unwrap();
    }

    #[test]
    fn test_schema_without_shape_rejected() {
        let err = validate(schema(json!({"type": "object"}))).unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingRequiredProperty);
        assert_eq!(diagnostics[0].path, vec!["properties"]);
    }
}
