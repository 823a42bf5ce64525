//! Example Verification
//!
//! After resolution, every schema's `examples` are validated against the
//! schema's canonical form with `jsonschema` (draft 7). Schemas reached
//! through `$ref` are copied into the validated document under reserved
//! `definitions` keys so validation never leaves memory.

use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::config::{AdditionalPropertiesPolicy, ModelConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{ModelError, Result};
use crate::resolve::Reference;
use crate::schema::{Definition, Model, Schema, SchemaRole};

/// Prefix of the `definitions` keys holding bundled schemas
pub const BUNDLE_PREFIX: &str = "_bundle_";

/// Keywords whose values are instance data, not schema
const DATA_KEYWORDS: &[&str] = &["examples", "default", "const", "enum"];

/// Validates the examples of every schema in a resolved model
pub struct ExampleVerifier<'a> {
    model: &'a Model,
    policy: AdditionalPropertiesPolicy,
}

impl<'a> ExampleVerifier<'a> {
    pub fn new(model: &'a Model, config: &ModelConfig) -> Self {
        Self {
            model,
            policy: config.validation.additional_properties_in_examples,
        }
    }

    /// Verify all schemas, returning warnings or every invalid example
    pub fn verify(&self) -> Result<Diagnostics> {
        let mut errors = Diagnostics::new();
        let mut warnings = Diagnostics::new();

        for schema in self.model.schemas() {
            match schema.examples.as_deref() {
                None | Some([]) => {
                    if matches!(schema.role, SchemaRole::Aggregate | SchemaRole::ReferenceData) {
                        warnings.push(Diagnostic::new(
                            &schema.id,
                            DiagnosticKind::MissingExample,
                            format!("Schema {} is an {} and should have at least one example", schema.id, schema.role),
                        ));
                    }
                }
                Some(examples) => self.verify_schema(schema, examples, &mut errors),
            }
        }

        if errors.is_empty() {
            Ok(warnings)
        } else {
            tracing::debug!(invalid = errors.len(), "example verification failed");
            Err(ModelError::InvalidExamples { diagnostics: errors })
        }
    }

    fn verify_schema(&self, schema: &Schema, examples: &[Value], errors: &mut Diagnostics) {
        let bundle = self.bundle(schema);
        let compiled = match JSONSchema::options().with_draft(Draft::Draft7).compile(&bundle) {
            Ok(compiled) => compiled,
            Err(e) => {
                errors.push(Diagnostic::new(
                    &schema.id,
                    DiagnosticKind::InvalidExample,
                    format!("Schema {} cannot be compiled for example verification: {}", schema.id, e),
                ));
                return;
            }
        };

        for (index, example) in examples.iter().enumerate() {
            if let Err(failures) = compiled.validate(example) {
                for failure in failures {
                    let at = failure.instance_path.to_string();
                    errors.push(
                        Diagnostic::new(
                            &schema.id,
                            DiagnosticKind::InvalidExample,
                            format!(
                                "Invalid example [{}] in schema {}: {} (at '{}')",
                                index,
                                schema.id,
                                failure,
                                if at.is_empty() { "/" } else { at.as_str() }
                            ),
                        )
                        .at(&["examples".to_string(), index.to_string()])
                        .with_value(example.clone()),
                    );
                }
            }
        }
        tracing::debug!(schema = %schema.id, examples = examples.len(), "verified examples");
    }

    /// Self-contained validation document for `schema`
    pub fn bundle(&self, schema: &Schema) -> Value {
        let mut root = self.prepare(schema);
        let mut queue = VecDeque::new();
        rewrite(&mut root, &Scope { root_id: &schema.id, from_id: &schema.id, key: None }, &mut queue);

        let mut seen = HashSet::from([schema.id.clone()]);
        let mut bundled = BTreeMap::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some(target) = self.model.schema(&id) else {
                continue;
            };
            let key = bundle_key(&id);
            let mut value = self.prepare(target);
            rewrite(&mut value, &Scope { root_id: &schema.id, from_id: &target.id, key: Some(&key) }, &mut queue);
            bundled.insert(key, value);
        }

        if let Some(definitions) = root.get_mut("definitions").and_then(Value::as_object_mut) {
            definitions.extend(bundled);
        }
        root
    }

    /// Canonical form with `$id`/`examples` removed and the example policy applied
    fn prepare(&self, schema: &Schema) -> Value {
        let mut value = schema.to_value();
        let Some(map) = value.as_object_mut() else {
            return value;
        };
        map.remove("$id");
        map.remove("examples");

        self.close(map, &schema.root);
        if let Some(definitions) = map.get_mut("definitions").and_then(Value::as_object_mut) {
            for (name, definition) in &schema.definitions {
                if let Some(target) = definitions.get_mut(name).and_then(Value::as_object_mut) {
                    self.close(target, definition);
                }
            }
        }
        value
    }

    /// Forbid undeclared keys where the policy asks for it
    fn close(&self, out: &mut Map<String, Value>, definition: &Definition) {
        let forbid = match (definition, self.policy) {
            (Definition::Enum(_), _) | (_, AdditionalPropertiesPolicy::Always) => false,
            (Definition::Object(object), _) => object.additional_properties.is_none(),
            (Definition::Interface(_), policy) => policy == AdditionalPropertiesPolicy::Never,
        };
        if forbid {
            out.entry("additionalProperties").or_insert(Value::Bool(false));
        }
    }
}

struct Scope<'s> {
    /// Schema whose examples are verified
    root_id: &'s str,
    /// Schema the value being rewritten came from
    from_id: &'s str,
    /// Bundle key of that schema; `None` for the root
    key: Option<&'s str>,
}

/// Point every `$ref` inside `value` at its place in the bundle
fn rewrite(value: &mut Value, scope: &Scope<'_>, queue: &mut VecDeque<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get_mut("$ref") {
                *text = bundled_ref(text, scope, queue);
            }
            for (key, child) in map.iter_mut() {
                match key.as_str() {
                    "$ref" => {}
                    "properties" | "definitions" => rewrite_named(child, scope, queue),
                    keyword if DATA_KEYWORDS.contains(&keyword) => {}
                    _ => rewrite(child, scope, queue),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite(item, scope, queue);
            }
        }
        _ => {}
    }
}

/// Entries of `properties` and `definitions` are schemas whatever they are named
fn rewrite_named(value: &mut Value, scope: &Scope<'_>, queue: &mut VecDeque<String>) {
    if let Value::Object(entries) = value {
        for child in entries.values_mut() {
            rewrite(child, scope, queue);
        }
    }
}

fn bundled_ref(text: &str, scope: &Scope<'_>, queue: &mut VecDeque<String>) -> String {
    match Reference::parse(scope.from_id, text) {
        Reference::SelfRef => match scope.key {
            Some(key) => format!("#/definitions/{}", key),
            None => "#".to_string(),
        },
        Reference::Local(name) => match scope.key {
            Some(key) => format!("#/definitions/{}/definitions/{}", key, name),
            None => format!("#/definitions/{}", name),
        },
        Reference::External(id) if id == scope.root_id => "#".to_string(),
        Reference::External(id) => {
            let target = format!("#/definitions/{}", bundle_key(&id));
            queue.push_back(id);
            target
        }
    }
}

fn bundle_key(id: &str) -> String {
    let sanitized: String = id
        .trim_start_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}{}", BUNDLE_PREFIX, sanitized)
}
