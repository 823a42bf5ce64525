//! Normalized model types
//!
//! The closed tagged unions here are the only shapes the rest of the crate
//! deals with. Every type renders back to the restricted JSON-Schema
//! vocabulary through `to_value`, and that canonical form normalizes to an
//! equal value again.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Keywords carried through verbatim (descriptions, facets, allow-listed extensions)
pub type Keywords = Map<String, Value>;

// =============================================================================
// Domain Role
// =============================================================================

/// Domain role declared through `x-schema-type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemaRole {
    Aggregate,
    Entity,
    ValueObject,
    ReferenceData,
    Other,
}

impl SchemaRole {
    pub const ALL: [SchemaRole; 5] = [
        SchemaRole::Aggregate,
        SchemaRole::Entity,
        SchemaRole::ValueObject,
        SchemaRole::ReferenceData,
        SchemaRole::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggregate => "Aggregate",
            Self::Entity => "Entity",
            Self::ValueObject => "ValueObject",
            Self::ReferenceData => "ReferenceData",
            Self::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for SchemaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Annotations
// =============================================================================

/// A documentation link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

/// Kind of a known divergence between model and implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplementationErrorKind {
    NotInDomainModel,
    MissingInImplementation,
    Wrong,
    Other,
}

/// A known divergence between model and implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationError {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ImplementationErrorKind,
}

/// Documentation annotations shared by applications, modules and schemas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub todos: Vec<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub errors: Vec<ImplementationError>,
}

impl Annotations {
    pub const FIELDS: [&'static str; 4] = ["todos", "links", "tags", "errors"];

    /// Read `<prefix>todos`, `<prefix>links`, ... from a raw document
    pub fn from_document(raw: &Map<String, Value>, prefix: &str) -> serde_json::Result<Self> {
        let mut stripped = Map::new();
        for field in Self::FIELDS {
            if let Some(value) = raw.get(&format!("{}{}", prefix, field)) {
                stripped.insert(field.to_string(), value.clone());
            }
        }
        serde_json::from_value(Value::Object(stripped))
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty() && self.links.is_empty() && self.tags.is_empty() && self.errors.is_empty()
    }

    /// Write the non-empty annotation fields under `prefix`
    pub fn write_to(&self, out: &mut Map<String, Value>, prefix: &str) {
        let key = |field: &str| format!("{}{}", prefix, field);
        if !self.todos.is_empty() {
            out.insert(key("todos"), json_of(&self.todos));
        }
        if !self.links.is_empty() {
            out.insert(key("links"), json_of(&self.links));
        }
        if !self.tags.is_empty() {
            out.insert(key("tags"), json_of(&self.tags));
        }
        if !self.errors.is_empty() {
            out.insert(key("errors"), json_of(&self.errors));
        }
    }
}

fn json_of<T: Serialize>(value: &T) -> Value {
    // Plain data types with string keys never fail to serialize.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// =============================================================================
// Properties
// =============================================================================

/// Basic (scalar) property types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    String,
    Number,
    Integer,
    Boolean,
}

impl BasicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Whether a JSON value is an instance of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// Reference to another schema or definition
#[derive(Debug, Clone, PartialEq)]
pub struct RefProperty {
    pub target: String,
    pub keywords: Keywords,
}

impl RefProperty {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            keywords: Keywords::new(),
        }
    }

    /// Reference to a definition of the same schema
    pub fn local(name: &str) -> Self {
        Self::new(format!("#/definitions/{}", name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayProperty {
    pub items: Box<Property>,
    pub keywords: Keywords,
}

/// Object used as a dictionary: only `additionalProperties` describes its values
#[derive(Debug, Clone, PartialEq)]
pub struct MapProperty {
    pub values: AdditionalProperties,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicProperty {
    pub kind: BasicType,
    /// Semantic cross references (`x-references`)
    pub references: Vec<String>,
    pub keywords: Keywords,
}

impl BasicProperty {
    pub fn new(kind: BasicType) -> Self {
        Self {
            kind,
            references: Vec::new(),
            keywords: Keywords::new(),
        }
    }

    pub fn format(&self) -> Option<&str> {
        self.keywords.get("format").and_then(Value::as_str)
    }

    pub fn const_value(&self) -> Option<&Value> {
        self.keywords.get("const")
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.keywords.get("default")
    }
}

/// A property shape
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Ref(RefProperty),
    Array(ArrayProperty),
    Map(MapProperty),
    Basic(BasicProperty),
}

impl Property {
    /// Innermost property, looking through arrays
    pub fn unwrap_array(&self) -> (&Property, bool) {
        match self {
            Property::Array(array) => (array.items.unwrap_array().0, true),
            other => (other, false),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Property::Ref(r) => {
                let mut out = Map::new();
                out.insert("$ref".into(), Value::String(r.target.clone()));
                extend(&mut out, &r.keywords);
                Value::Object(out)
            }
            Property::Array(a) => {
                let mut out = Map::new();
                out.insert("type".into(), "array".into());
                out.insert("items".into(), a.items.to_value());
                extend(&mut out, &a.keywords);
                Value::Object(out)
            }
            Property::Map(m) => {
                let mut out = Map::new();
                out.insert("type".into(), "object".into());
                out.insert("additionalProperties".into(), m.values.to_value());
                extend(&mut out, &m.keywords);
                Value::Object(out)
            }
            Property::Basic(b) => {
                let mut out = Map::new();
                out.insert("type".into(), b.kind.as_str().into());
                match b.references.as_slice() {
                    [] => {}
                    [single] => {
                        out.insert("x-references".into(), Value::String(single.clone()));
                    }
                    many => {
                        out.insert("x-references".into(), json_of(&many));
                    }
                }
                extend(&mut out, &b.keywords);
                Value::Object(out)
            }
        }
    }
}

/// `additionalProperties` rule
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed(bool),
    Property(Box<Property>),
}

impl AdditionalProperties {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Allowed(b) => Value::Bool(*b),
            Self::Property(p) => p.to_value(),
        }
    }
}

/// Ordered property map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, Property)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, keeping the first position of an existing name
    pub fn insert(&mut self, name: impl Into<String>, property: Property) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = property,
            None => self.0.push((name, property)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.0.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(n, p)| (n.clone(), p.to_value()))
                .collect(),
        )
    }
}

// =============================================================================
// Definitions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    pub values: Vec<String>,
    /// `x-enum-description`, keyed by enum value
    pub documentation: Option<BTreeMap<String, String>>,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDefinition {
    pub properties: Properties,
    pub required: Vec<String>,
    pub additional_properties: Option<AdditionalProperties>,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDefinition {
    /// Implementations, always references after normalization
    pub one_of: Vec<RefProperty>,
    pub keywords: Keywords,
}

/// Canonical shape of a schema or a hoisted nested type
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Enum(EnumDefinition),
    Object(ObjectDefinition),
    Interface(InterfaceDefinition),
}

impl Definition {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Definition::Enum(_) => "enum",
            Definition::Object(_) => "object",
            Definition::Interface(_) => "interface",
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Definition::Enum(_))
    }

    pub fn keywords(&self) -> &Keywords {
        match self {
            Definition::Enum(d) => &d.keywords,
            Definition::Object(d) => &d.keywords,
            Definition::Interface(d) => &d.keywords,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.keywords().get("description").and_then(Value::as_str)
    }

    /// Properties of an object definition, empty otherwise
    pub fn properties(&self) -> Option<&Properties> {
        match self {
            Definition::Object(d) => Some(&d.properties),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    fn to_map(&self) -> Map<String, Value> {
        let mut out = Map::new();
        match self {
            Definition::Enum(d) => {
                out.insert("type".into(), "string".into());
                out.insert("enum".into(), json_of(&d.values));
                if let Some(docs) = &d.documentation {
                    out.insert("x-enum-description".into(), json_of(docs));
                }
                extend(&mut out, &d.keywords);
            }
            Definition::Object(d) => {
                out.insert("type".into(), "object".into());
                out.insert("properties".into(), d.properties.to_value());
                out.insert("required".into(), json_of(&d.required));
                if let Some(additional) = &d.additional_properties {
                    out.insert("additionalProperties".into(), additional.to_value());
                }
                extend(&mut out, &d.keywords);
            }
            Definition::Interface(d) => {
                out.insert("type".into(), "object".into());
                out.insert(
                    "oneOf".into(),
                    Value::Array(
                        d.one_of
                            .iter()
                            .map(|r| Property::Ref(r.clone()).to_value())
                            .collect(),
                    ),
                );
                extend(&mut out, &d.keywords);
            }
        }
        out
    }
}

fn extend(out: &mut Map<String, Value>, keywords: &Keywords) {
    for (k, v) in keywords {
        out.insert(k.clone(), v.clone());
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A fully normalized schema document
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub id: String,
    pub title: String,
    pub role: SchemaRole,
    pub examples: Option<Vec<Value>>,
    pub root: Definition,
    /// Flat arena of hoisted and declared definitions
    pub definitions: BTreeMap<String, Definition>,
    pub annotations: Annotations,
}

impl Schema {
    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Root first (without a name), then every named definition
    pub fn all_definitions(&self) -> impl Iterator<Item = (Option<&str>, &Definition)> {
        std::iter::once((None, &self.root))
            .chain(self.definitions.iter().map(|(n, d)| (Some(n.as_str()), d)))
    }

    /// Owning module id, the directory portion of the schema id
    pub fn module_id(&self) -> &str {
        module_id_of(&self.id)
    }

    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("$id".into(), Value::String(self.id.clone()));
        out.insert("title".into(), Value::String(self.title.clone()));
        out.insert("x-schema-type".into(), self.role.as_str().into());
        out.extend(self.root.to_map());
        if let Some(examples) = &self.examples {
            out.insert("examples".into(), Value::Array(examples.clone()));
        }
        out.insert(
            "definitions".into(),
            Value::Object(
                self.definitions
                    .iter()
                    .map(|(n, d)| (n.clone(), d.to_value()))
                    .collect(),
            ),
        );
        self.annotations.write_to(&mut out, "x-");
        Value::Object(out)
    }
}

/// Directory portion of a path-shaped id
pub fn module_id_of(schema_id: &str) -> &str {
    match schema_id.rfind('/') {
        Some(0) => "/",
        Some(idx) => &schema_id[..idx],
        None => ".",
    }
}

/// Application root metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub title: String,
    pub description: String,
    pub annotations: Annotations,
}

impl Application {
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("title".into(), Value::String(self.title.clone()));
        out.insert("description".into(), Value::String(self.description.clone()));
        self.annotations.write_to(&mut out, "");
        Value::Object(out)
    }
}

/// A named group of schemas
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Opaque operation description; its references are still resolved
    pub operations: Option<Value>,
    pub annotations: Annotations,
}

impl Module {
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("$id".into(), Value::String(self.id.clone()));
        out.insert("title".into(), Value::String(self.title.clone()));
        out.insert("description".into(), Value::String(self.description.clone()));
        if let Some(operations) = &self.operations {
            out.insert("operations".into(), operations.clone());
        }
        self.annotations.write_to(&mut out, "");
        Value::Object(out)
    }
}

macro_rules! serialize_via_value {
    ($($ty:ty),*) => {
        $(impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.to_value().serialize(serializer)
            }
        })*
    };
}

serialize_via_value!(Property, AdditionalProperties, Definition, Schema, Application, Module);

// =============================================================================
// Model
// =============================================================================

/// Target of a resolved reference
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub schema: &'a Schema,
    /// `None` for the schema's root definition
    pub definition_name: Option<&'a str>,
    pub definition: &'a Definition,
}

/// The immutable result of a successful build
///
/// Only [`crate::builder::ModelBuilder`] constructs one, after every
/// reference has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    application: Application,
    modules: Vec<Module>,
    schemas: Vec<Schema>,
}

impl Model {
    pub(crate) fn new(application: Application, modules: Vec<Module>, schemas: Vec<Schema>) -> Self {
        Self {
            application,
            modules,
            schemas,
        }
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn schema(&self, id: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.id == id)
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Schemas whose id lies below the module id
    pub fn schemas_for_module<'a>(&'a self, module_id: &'a str) -> impl Iterator<Item = &'a Schema> + 'a {
        self.schemas.iter().filter(move |s| {
            s.id.strip_prefix(module_id)
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false)
        })
    }

    pub fn schemas_for_module_with_role<'a>(
        &'a self,
        module_id: &'a str,
        role: SchemaRole,
    ) -> impl Iterator<Item = &'a Schema> + 'a {
        self.schemas_for_module(module_id).filter(move |s| s.role == role)
    }

    pub fn module_for_schema(&self, schema_id: &str) -> Option<&Module> {
        self.module(module_id_of(schema_id))
    }

    /// Resolve a `$ref`/`x-references` text written in `from`
    pub fn resolve_reference<'a>(&'a self, from: &'a Schema, reference: &str) -> Option<Target<'a>> {
        use crate::resolve::Reference;

        match Reference::parse(&from.id, reference) {
            Reference::SelfRef => Some(Target {
                schema: from,
                definition_name: None,
                definition: &from.root,
            }),
            Reference::Local(name) => from.definitions.get_key_value(name).map(|(n, d)| Target {
                schema: from,
                definition_name: Some(n.as_str()),
                definition: d,
            }),
            Reference::External(id) => self.schema(&id).map(|schema| Target {
                schema,
                definition_name: None,
                definition: &schema.root,
            }),
        }
    }

    /// A copy of this model with every schema's annotations replaced
    pub fn with_annotations<F>(&self, mut annotate: F) -> Model
    where
        F: FnMut(&Schema) -> Annotations,
    {
        let schemas = self
            .schemas
            .iter()
            .map(|s| Schema {
                annotations: annotate(s),
                ..s.clone()
            })
            .collect();
        Model {
            application: self.application.clone(),
            modules: self.modules.clone(),
            schemas,
        }
    }
}
