//! Keyword vocabulary and raw shape detection
//!
//! Shared by the validator (which reports unsupported keywords) and the
//! normalizer (which keeps only supported ones), so both always agree on
//! what a raw node is.

use serde_json::{Map, Value};

use crate::diagnostics::DiagnosticKind;
use crate::schema::BasicType;

/// Accepted on every node; `x-enum-description` outside an enum is only warned about
const ALWAYS: &[&str] = &[
    "$schema",
    "$comment",
    "type",
    "title",
    "description",
    "examples",
    "x-enum-description",
];

/// Only on a schema document's root
const ROOT: &[&str] = &["$id", "x-schema-type", "x-todos", "x-links", "x-tags", "x-errors"];

/// Any node sitting in a property position; they stay at the use site when
/// an inline shape is hoisted
pub const PROPERTY: &[&str] = &["readOnly", "writeOnly"];

const ENUM: &[&str] = &["enum", "default", "definitions"];
const OBJECT: &[&str] = &[
    "properties",
    "required",
    "additionalProperties",
    "maxProperties",
    "minProperties",
    "definitions",
];
const INTERFACE: &[&str] = &["oneOf", "definitions"];
const REF: &[&str] = &["$ref"];
const ARRAY: &[&str] = &["items", "maxItems", "minItems", "uniqueItems"];
const MAP: &[&str] = &["additionalProperties", "maxProperties", "minProperties"];
const STRING: &[&str] = &[
    "default",
    "const",
    "maxLength",
    "minLength",
    "pattern",
    "contentMediaType",
    "contentEncoding",
    "format",
    "x-references",
];
const NUMBER: &[&str] = &[
    "default",
    "const",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "format",
    "x-references",
];
const BOOLEAN: &[&str] = &["default", "const", "format", "x-references"];

/// Keywords that mark a node as a definition shape
pub const SHAPE_MARKERS: [&str; 3] = ["enum", "oneOf", "properties"];

/// Where a node sits in its document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Root,
    Definition,
    Property,
}

/// Definition shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Enum,
    Object,
    Interface,
}

/// Property shapes as written in a raw document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyShape {
    Ref,
    /// Anonymous definition that gets hoisted
    Inline(DefinitionKind),
    Array,
    Map,
    Basic(BasicType),
    /// No usable type; carries the unsupported type name if one was given
    Untyped(Option<String>),
}

/// Node kinds that own a keyword table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Definition(DefinitionKind),
    Ref,
    Array,
    Map,
    Basic(BasicType),
}

impl NodeKind {
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Definition(DefinitionKind::Enum) => ENUM,
            NodeKind::Definition(DefinitionKind::Object) => OBJECT,
            NodeKind::Definition(DefinitionKind::Interface) => INTERFACE,
            NodeKind::Ref => REF,
            NodeKind::Array => ARRAY,
            NodeKind::Map => MAP,
            NodeKind::Basic(BasicType::String) => STRING,
            NodeKind::Basic(BasicType::Number | BasicType::Integer) => NUMBER,
            NodeKind::Basic(BasicType::Boolean) => BOOLEAN,
        }
    }

    /// Keyword table of a property shape; untyped nodes are read as strings
    pub fn of_property(shape: &PropertyShape) -> Self {
        match shape {
            PropertyShape::Ref => NodeKind::Ref,
            PropertyShape::Inline(kind) => NodeKind::Definition(*kind),
            PropertyShape::Array => NodeKind::Array,
            PropertyShape::Map => NodeKind::Map,
            PropertyShape::Basic(t) => NodeKind::Basic(*t),
            PropertyShape::Untyped(_) => NodeKind::Basic(BasicType::String),
        }
    }
}

/// Whether the built-in vocabulary accepts `keyword` on this node
pub fn is_supported(keyword: &str, kind: NodeKind, context: Context) -> bool {
    ALWAYS.contains(&keyword)
        || kind.keywords().contains(&keyword)
        || (context == Context::Root && ROOT.contains(&keyword))
        || (context == Context::Property && PROPERTY.contains(&keyword))
}

/// A shape problem: the diagnostic kind, a message, and the keyword at fault
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeError {
    pub kind: DiagnosticKind,
    pub message: String,
    pub keyword: Option<&'static str>,
}

impl ShapeError {
    fn new(kind: DiagnosticKind, message: impl Into<String>, keyword: Option<&'static str>) -> Self {
        Self {
            kind,
            message: message.into(),
            keyword,
        }
    }
}

fn type_name(node: &Map<String, Value>) -> Result<Option<&str>, ShapeError> {
    match node.get("type") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ShapeError::new(
            DiagnosticKind::NotSupportedValue,
            "'type' must be a single type name",
            Some("type"),
        )),
    }
}

/// Decide which definition a node describes
///
/// Exactly one of `enum`, `oneOf` and `properties` must be present. A
/// string node without one is missing its `enum`, any other node its
/// `properties`.
pub fn definition_kind(node: &Map<String, Value>) -> Result<DefinitionKind, ShapeError> {
    let markers: Vec<&str> = SHAPE_MARKERS
        .iter()
        .copied()
        .filter(|k| node.contains_key(*k))
        .collect();
    if markers.len() > 1 {
        return Err(ShapeError::new(
            DiagnosticKind::AmbiguousKind,
            format!("Node declares {} at the same time", markers.join(" and ")),
            None,
        ));
    }

    let declared = type_name(node)?;
    match (markers.first().copied(), declared) {
        (Some("enum"), Some("object")) => Err(ShapeError::new(
            DiagnosticKind::AmbiguousKind,
            "Node is both an enum and an object",
            Some("type"),
        )),
        (Some("enum"), None | Some("string")) => Ok(DefinitionKind::Enum),
        (Some("oneOf"), None | Some("object")) => Ok(DefinitionKind::Interface),
        (Some("properties"), None | Some("object")) => Ok(DefinitionKind::Object),
        (Some(marker), Some(other)) => Err(ShapeError::new(
            DiagnosticKind::NotSupportedValue,
            format!("'{}' cannot be combined with type '{}'", marker, other),
            Some("type"),
        )),
        (None, Some("string")) => Err(ShapeError::new(
            DiagnosticKind::MissingRequiredProperty,
            "A string definition must declare 'enum'",
            Some("enum"),
        )),
        (None, None | Some("object")) => Err(ShapeError::new(
            DiagnosticKind::MissingRequiredProperty,
            "A definition must declare one of 'enum', 'oneOf' or 'properties'",
            Some("properties"),
        )),
        (None, Some(other)) => Err(ShapeError::new(
            DiagnosticKind::NotSupportedValue,
            format!("A definition must be of type object or string, not '{}'", other),
            Some("type"),
        )),
        (Some(_), None) => Ok(DefinitionKind::Object),
    }
}

/// Decide which property a node in property position describes
pub fn property_shape(node: &Map<String, Value>) -> Result<PropertyShape, ShapeError> {
    if node.contains_key("$ref") {
        return Ok(PropertyShape::Ref);
    }
    if SHAPE_MARKERS.iter().any(|k| node.contains_key(*k)) {
        return definition_kind(node).map(PropertyShape::Inline);
    }
    match type_name(node)? {
        Some("array") => Ok(PropertyShape::Array),
        Some("object") => Ok(PropertyShape::Map),
        Some(other) => Ok(match BasicType::parse(other) {
            Some(basic) => PropertyShape::Basic(basic),
            None => PropertyShape::Untyped(Some(other.to_string())),
        }),
        None if node.contains_key("additionalProperties") => Ok(PropertyShape::Map),
        None => Ok(PropertyShape::Untyped(None)),
    }
}
