//! Schema Normalization
//!
//! Lowers one validated raw schema into a [`Schema`]. Every inline object,
//! enum or interface found under a property, an array's items, an
//! `additionalProperties` rule or a `oneOf` branch is hoisted into the flat
//! definitions map under a synthesized name and replaced by a local `$ref`.
//!
//! Hoisting uses a worklist: lowering a definition may queue more inline
//! shapes, which are lowered in turn until the queue is empty. Every call
//! starts from a fresh [`Lowering`], and the first shape error aborts it.

pub mod names;

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;

use crate::config::ModelConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{ModelError, Result};
use crate::schema::{
    AdditionalProperties, Annotations, Application, ArrayProperty, BasicProperty, BasicType, Definition,
    EnumDefinition, InterfaceDefinition, Keywords, MapProperty, Module, ObjectDefinition, Properties, Property,
    RefProperty, Schema, SchemaRole,
};
use crate::validate::keywords::{
    definition_kind, is_supported, property_shape, Context, DefinitionKind, NodeKind, PropertyShape, ShapeError, PROPERTY,
};

use names::Scope;

/// Root keywords that become typed `Schema` fields
const ROOT_FIELDS: &[&str] = &[
    "$id",
    "title",
    "x-schema-type",
    "examples",
    "x-todos",
    "x-links",
    "x-tags",
    "x-errors",
];

/// A normalized schema plus the warnings raised while lowering it
#[derive(Debug, Clone)]
pub struct Normalized {
    pub schema: Schema,
    pub warnings: Diagnostics,
}

/// Normalize one raw schema document
pub fn normalize_schema(raw: &Value, config: &ModelConfig) -> Result<Normalized> {
    let root = raw.as_object().ok_or_else(|| ModelError::Normalization {
        schema_id: "<unknown>".to_string(),
        diagnostic: Box::new(Diagnostic::new("<unknown>", DiagnosticKind::NotSupportedValue, "A schema must be an object")),
    })?;

    let id = match root.get("$id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            return Err(ModelError::Normalization {
                schema_id: "<unknown>".to_string(),
                diagnostic: Box::new(
                    Diagnostic::new("<unknown>", DiagnosticKind::MissingRequiredProperty, "A schema must declare '$id'")
                        .at(&["$id"]),
                ),
            })
        }
    };

    let mut lowering = Lowering::new(id, config);
    let schema = lowering.lower_schema(root)?;
    tracing::debug!(
        schema = %schema.id,
        definitions = schema.definitions.len(),
        "normalized schema"
    );
    Ok(Normalized {
        schema,
        warnings: lowering.warnings,
    })
}

/// Convert a validated application document
pub fn normalize_application(raw: &Value) -> Result<Application> {
    let map = document_map(raw, "<application>")?;
    Ok(Application {
        title: string_field(map, "title"),
        description: string_field(map, "description"),
        annotations: document_annotations(map, "", "<application>")?,
    })
}

/// Convert a validated module document
pub fn normalize_module(raw: &Value) -> Result<Module> {
    let map = document_map(raw, "<module>")?;
    let id = string_field(map, "$id");
    Ok(Module {
        annotations: document_annotations(map, "", &id)?,
        title: string_field(map, "title"),
        description: string_field(map, "description"),
        operations: map.get("operations").cloned(),
        id,
    })
}

fn document_map<'v>(raw: &'v Value, origin: &str) -> Result<&'v Map<String, Value>> {
    raw.as_object().ok_or_else(|| ModelError::InvalidDocument {
        location: origin.to_string(),
        diagnostics: std::iter::once(Diagnostic::new(origin, DiagnosticKind::NotSupportedValue, "Expected an object")).collect(),
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn document_annotations(map: &Map<String, Value>, prefix: &str, origin: &str) -> Result<Annotations> {
    Annotations::from_document(map, prefix).map_err(|e| ModelError::InvalidDocument {
        location: origin.to_string(),
        diagnostics: std::iter::once(Diagnostic::new(origin, DiagnosticKind::NotSupportedValue, format!("Invalid annotations: {}", e)))
            .collect(),
    })
}

// =============================================================================
// Lowering
// =============================================================================

/// An inline shape waiting to be lowered under its synthesized name
struct Pending<'a> {
    name: String,
    path: Vec<String>,
    raw: &'a Map<String, Value>,
}

/// Per-document lowering state; never shared between documents
struct Lowering<'a> {
    schema_id: String,
    config: &'a ModelConfig,
    worklist: VecDeque<Pending<'a>>,
    reserved: HashSet<String>,
    definitions: BTreeMap<String, Definition>,
    warnings: Diagnostics,
}

impl<'a> Lowering<'a> {
    fn new(schema_id: String, config: &'a ModelConfig) -> Self {
        Self {
            schema_id,
            config,
            worklist: VecDeque::new(),
            reserved: HashSet::new(),
            definitions: BTreeMap::new(),
            warnings: Diagnostics::new(),
        }
    }

    fn lower_schema(&mut self, root: &'a Map<String, Value>) -> Result<Schema> {
        let title = match root.get("title").and_then(Value::as_str) {
            Some(title) => title.to_string(),
            None => Path::new(&self.schema_id)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
        };
        let role = root
            .get("x-schema-type")
            .and_then(Value::as_str)
            .and_then(SchemaRole::parse)
            .unwrap_or(SchemaRole::Other);
        let examples = root.get("examples").and_then(Value::as_array).cloned();
        let annotations = Annotations::from_document(root, "x-").map_err(|e| {
            self.fail(&[], DiagnosticKind::NotSupportedValue, format!("Invalid annotations: {}", e), None)
        })?;

        let root_definition = self.lower_definition(root, Vec::new(), Scope::Root { title: &title }, Context::Root)?;

        while let Some(pending) = self.worklist.pop_front() {
            let definition = self.lower_definition(pending.raw, pending.path, Scope::Named(&pending.name), Context::Definition)?;
            self.definitions.insert(pending.name, definition);
        }

        Ok(Schema {
            id: self.schema_id.clone(),
            title,
            role,
            examples,
            root: root_definition,
            definitions: std::mem::take(&mut self.definitions),
            annotations,
        })
    }

    fn lower_definition(
        &mut self,
        raw: &'a Map<String, Value>,
        path: Vec<String>,
        scope: Scope<'_>,
        context: Context,
    ) -> Result<Definition> {
        let kind = definition_kind(raw).map_err(|e| self.shape_error(&path, e))?;

        if let Some(declared) = raw.get("definitions") {
            self.queue_declared(declared, &path)?;
        }

        let node = NodeKind::Definition(kind);
        let mut skip = vec!["type", "definitions"];
        if context == Context::Root {
            skip.extend_from_slice(ROOT_FIELDS);
        }

        match kind {
            DefinitionKind::Enum => {
                skip.extend(["enum"]);
                Ok(Definition::Enum(EnumDefinition {
                    values: self.enum_values(raw, &path)?,
                    documentation: enum_documentation(raw),
                    keywords: self.keywords(raw, node, context, &skip),
                }))
            }
            DefinitionKind::Object => {
                skip.extend(["properties", "required", "additionalProperties"]);
                let mut properties = Properties::new();
                if let Some(raw_properties) = raw.get("properties") {
                    let raw_properties = raw_properties.as_object().ok_or_else(|| {
                        self.fail(&child(&path, "properties"), DiagnosticKind::NotSupportedValue, "'properties' must be an object", None)
                    })?;
                    for (name, property) in raw_properties {
                        let at = descend(&path, &["properties", name]);
                        properties.insert(name.clone(), self.lower_property(property, at, scope.property(name))?);
                    }
                }
                let required = raw
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                let additional_properties =
                    self.lower_additional(raw.get("additionalProperties"), &path, scope.additional_properties())?;

                Ok(Definition::Object(ObjectDefinition {
                    properties,
                    required,
                    additional_properties,
                    keywords: self.keywords(raw, node, context, &skip),
                }))
            }
            DefinitionKind::Interface => {
                skip.extend(["oneOf"]);
                let branches = raw.get("oneOf").and_then(Value::as_array).ok_or_else(|| {
                    self.fail(&child(&path, "oneOf"), DiagnosticKind::NotSupportedValue, "'oneOf' must be a list", None)
                })?;
                let mut one_of = Vec::with_capacity(branches.len());
                for (i, branch) in branches.iter().enumerate() {
                    let at = descend(&path, &["oneOf", &i.to_string()]);
                    let branch = branch.as_object().ok_or_else(|| {
                        self.fail(&at, DiagnosticKind::NotSupportedValue, "A oneOf branch must be an object", Some(branch.clone()))
                    })?;
                    if branch.contains_key("$ref") {
                        one_of.push(self.lower_ref(branch, &at)?);
                    } else {
                        let name = scope.one_of(i);
                        self.hoist(&name, at, branch)?;
                        one_of.push(RefProperty::local(&name));
                    }
                }
                Ok(Definition::Interface(InterfaceDefinition {
                    one_of,
                    keywords: self.keywords(raw, node, context, &skip),
                }))
            }
        }
    }

    fn lower_property(&mut self, raw: &'a Value, path: Vec<String>, hint: String) -> Result<Property> {
        let map = raw.as_object().ok_or_else(|| {
            self.fail(&path, DiagnosticKind::NotSupportedValue, "A property must be an object", Some(raw.clone()))
        })?;
        let shape = property_shape(map).map_err(|e| self.shape_error(&path, e))?;
        let node = NodeKind::of_property(&shape);

        match shape {
            PropertyShape::Ref => Ok(Property::Ref(self.lower_ref(map, &path)?)),
            PropertyShape::Inline(_) => {
                self.hoist(&hint, path, map)?;
                let mut reference = RefProperty::local(&hint);
                for (key, value) in map.iter().filter(|(k, _)| PROPERTY.contains(&k.as_str())) {
                    reference.keywords.insert(key.clone(), value.clone());
                }
                Ok(Property::Ref(reference))
            }
            PropertyShape::Array => {
                let items = match map.get("items") {
                    Some(items @ Value::Object(_)) => items,
                    Some(Value::Array(_)) => {
                        return Err(self.fail(
                            &child(&path, "items"),
                            DiagnosticKind::NotSupportedValue,
                            "An array must have exactly one item schema",
                            map.get("items").cloned(),
                        ))
                    }
                    _ => {
                        return Err(self.fail(&path, DiagnosticKind::MissingRequiredProperty, "An array must declare 'items'", None))
                    }
                };
                let items = self.lower_property(items, child(&path, "items"), hint)?;
                Ok(Property::Array(ArrayProperty {
                    items: Box::new(items),
                    keywords: self.keywords(map, node, Context::Property, &["type", "items"]),
                }))
            }
            PropertyShape::Map => {
                let values = self
                    .lower_additional(map.get("additionalProperties"), &path, names::map_values(&hint))?
                    .unwrap_or(AdditionalProperties::Allowed(true));
                Ok(Property::Map(MapProperty {
                    values,
                    keywords: self.keywords(map, node, Context::Property, &["type", "additionalProperties"]),
                }))
            }
            PropertyShape::Basic(kind) => self.lower_basic(map, &path, kind, node),
            PropertyShape::Untyped(declared) => {
                let message = match declared {
                    Some(t) => format!("Unsupported type '{}', assuming string", t),
                    None => "Property has no type, assuming string".to_string(),
                };
                self.warnings.push(
                    Diagnostic::new(&self.schema_id, DiagnosticKind::UntypedProperty, message)
                        .at(&path)
                        .with_value(map.get("type").cloned().unwrap_or(Value::Null)),
                );
                self.lower_basic(map, &path, BasicType::String, node)
            }
        }
    }

    fn lower_basic(&mut self, map: &Map<String, Value>, path: &[String], kind: BasicType, node: NodeKind) -> Result<Property> {
        if let Some(constant) = map.get("const") {
            if !kind.accepts(constant) {
                return Err(self.fail(
                    &child(path, "const"),
                    DiagnosticKind::NotSupportedValue,
                    format!("Constant {} is not of type {}", constant, kind.as_str()),
                    Some(constant.clone()),
                ));
            }
        }
        let references = match map.get("x-references") {
            None => Vec::new(),
            Some(Value::String(single)) => vec![single.clone()],
            Some(Value::Array(list)) => list.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            Some(other) => {
                return Err(self.fail(
                    &child(path, "x-references"),
                    DiagnosticKind::NotSupportedValue,
                    "'x-references' must be a string or a list of strings",
                    Some(other.clone()),
                ))
            }
        };
        Ok(Property::Basic(BasicProperty {
            kind,
            references,
            keywords: self.keywords(map, node, Context::Property, &["type", "x-references"]),
        }))
    }

    fn lower_ref(&mut self, map: &Map<String, Value>, path: &[String]) -> Result<RefProperty> {
        let target = map.get("$ref").and_then(Value::as_str).ok_or_else(|| {
            self.fail(&child(path, "$ref"), DiagnosticKind::NotSupportedValue, "'$ref' must be a string", map.get("$ref").cloned())
        })?;
        Ok(RefProperty {
            target: target.to_string(),
            keywords: self.keywords(map, NodeKind::Ref, Context::Property, &["$ref", "type"]),
        })
    }

    fn lower_additional(
        &mut self,
        raw: Option<&'a Value>,
        path: &[String],
        name: String,
    ) -> Result<Option<AdditionalProperties>> {
        match raw {
            None => Ok(None),
            Some(Value::Bool(allowed)) => Ok(Some(AdditionalProperties::Allowed(*allowed))),
            Some(value @ Value::Object(_)) => {
                let property = self.lower_property(value, child(path, "additionalProperties"), name)?;
                Ok(Some(AdditionalProperties::Property(Box::new(property))))
            }
            Some(other) => Err(self.fail(
                &child(path, "additionalProperties"),
                DiagnosticKind::NotSupportedValue,
                "'additionalProperties' must be a boolean or a property",
                Some(other.clone()),
            )),
        }
    }

    fn enum_values(&self, raw: &Map<String, Value>, path: &[String]) -> Result<Vec<String>> {
        let at = child(path, "enum");
        let list = raw
            .get("enum")
            .and_then(Value::as_array)
            .filter(|list| !list.is_empty())
            .ok_or_else(|| self.fail(&at, DiagnosticKind::NotSupportedValue, "'enum' must be a non-empty list", raw.get("enum").cloned()))?;

        let mut values = Vec::with_capacity(list.len());
        for value in list {
            match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => {
                    return Err(self.fail(&at, DiagnosticKind::NotSupportedValue, format!("Enum value '{}' is listed twice", s), Some(value.clone())))
                }
                Some(s) => values.push(s.to_string()),
                None => return Err(self.fail(&at, DiagnosticKind::NotSupportedValue, "Enum values must be strings", Some(value.clone()))),
            }
        }
        Ok(values)
    }

    // =========================================================================
    // Definitions map
    // =========================================================================

    fn hoist(&mut self, name: &str, path: Vec<String>, raw: &'a Map<String, Value>) -> Result<()> {
        if !names::is_usable(name) {
            return Err(self.fail(
                &path,
                DiagnosticKind::NotSupportedValue,
                format!("Cannot derive a definition name for this shape ('{}' does not start with a letter)", name),
                Some(Value::String(name.to_string())),
            ));
        }
        self.reserve(name, &path)?;
        tracing::trace!(schema = %self.schema_id, name, "hoisting inline shape");
        self.worklist.push_back(Pending {
            name: name.to_string(),
            path,
            raw,
        });
        Ok(())
    }

    fn queue_declared(&mut self, declared: &'a Value, path: &[String]) -> Result<()> {
        let at = child(path, "definitions");
        let entries = declared.as_object().ok_or_else(|| {
            self.fail(&at, DiagnosticKind::NotSupportedValue, "'definitions' must be an object", None)
        })?;
        for (name, definition) in entries {
            let entry_path = child(&at, name);
            let raw = definition.as_object().ok_or_else(|| {
                self.fail(&entry_path, DiagnosticKind::NotSupportedValue, "A definition must be an object", Some(definition.clone()))
            })?;
            self.reserve(name, &entry_path)?;
            self.worklist.push_back(Pending {
                name: name.clone(),
                path: entry_path,
                raw,
            });
        }
        Ok(())
    }

    fn reserve(&mut self, name: &str, path: &[String]) -> Result<()> {
        if self.reserved.insert(name.to_string()) {
            return Ok(());
        }
        Err(self.fail(
            path,
            DiagnosticKind::DuplicateDefinitionName,
            format!("Definition name '{}' is produced more than once", name),
            Some(Value::String(name.to_string())),
        ))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Supported keywords of a node, minus those lowered into typed fields
    fn keywords(&self, raw: &Map<String, Value>, node: NodeKind, context: Context, skip: &[&str]) -> Keywords {
        let mut keywords = Keywords::new();
        for (key, value) in raw {
            if skip.contains(&key.as_str()) || key == "x-enum-description" {
                continue;
            }
            if key == "const" && !matches!(node, NodeKind::Basic(_)) {
                continue;
            }
            if is_supported(key, node, context) || self.config.is_allowed_keyword(key) {
                keywords.insert(key.clone(), value.clone());
            } else {
                tracing::debug!(schema = %self.schema_id, keyword = %key, "dropping unsupported keyword");
            }
        }
        keywords
    }

    fn shape_error(&self, path: &[String], err: ShapeError) -> ModelError {
        let at = match err.keyword {
            Some(keyword) => child(path, keyword),
            None => path.to_vec(),
        };
        self.fail(&at, err.kind, err.message, None)
    }

    fn fail(&self, path: &[String], kind: DiagnosticKind, message: impl Into<String>, value: Option<Value>) -> ModelError {
        let mut diagnostic = Diagnostic::new(&self.schema_id, kind, message).at(path);
        diagnostic.value = value;
        ModelError::Normalization {
            schema_id: self.schema_id.clone(),
            diagnostic: Box::new(diagnostic),
        }
    }
}

fn enum_documentation(raw: &Map<String, Value>) -> Option<BTreeMap<String, String>> {
    raw.get("x-enum-description").and_then(Value::as_object).map(|docs| {
        docs.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()
    })
}

fn child(path: &[String], key: &str) -> Vec<String> {
    descend(path, &[key])
}

fn descend(path: &[String], keys: &[&str]) -> Vec<String> {
    let mut next = path.to_vec();
    next.extend(keys.iter().map(|k| k.to_string()));
    next
}
