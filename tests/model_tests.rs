//! Model tests
//!
//! Build the `shop` fixture tree end to end and check the normalized model,
//! its dependency edges and how problems in the documents are reported.

use std::fs;
use std::path::{Path, PathBuf};

use domain_schemas::{
    analyze_dependencies, load_directory, normalize_schema, Definition, DependencyGraph, DependencyKind,
    DiagnosticKind, ModelBuilder, ModelConfig, ModelError, Property, SchemaRole,
};
use serde_json::{json, Value};

fn shop_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/shop")
}

fn load_shop() -> domain_schemas::BuildOutput {
    load_directory(&shop_dir(), &ModelConfig::default()).expect("shop fixture should build")
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_shop_loads() {
    let output = load_shop();
    let model = &output.model;

    assert_eq!(model.application().title, "Shop");
    assert_eq!(model.application().annotations.links.len(), 1);
    assert_eq!(model.application().annotations.tags.get("owner").map(String::as_str), Some("commerce"));

    let mut modules: Vec<&str> = model.modules().iter().map(|m| m.id.as_str()).collect();
    modules.sort();
    assert_eq!(modules, vec!["/Catalog", "/Customers", "/Sales"]);
    assert_eq!(model.schemas().len(), 7);
    assert!(output.warnings.is_empty(), "unexpected warnings:\n{}", output.warnings.format_all());

    let order = model.schema("/Sales/Order.yaml").unwrap();
    assert_eq!(order.role, SchemaRole::Aggregate);
    assert_eq!(order.annotations.todos, vec!["Add discounts".to_string()]);
    assert_eq!(model.module_for_schema(&order.id).map(|m| m.title.as_str()), Some("Sales"));
}

#[test]
fn test_module_queries() {
    let output = load_shop();
    let model = &output.model;

    let mut sales: Vec<&str> = model.schemas_for_module("/Sales").map(|s| s.title.as_str()).collect();
    sales.sort();
    assert_eq!(sales, vec!["Address", "Card", "Order", "Payment"]);

    let reference_data: Vec<&str> = model
        .schemas_for_module_with_role("/Catalog", SchemaRole::ReferenceData)
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(reference_data, vec!["/Catalog/Country.yaml"]);
}

#[test]
fn test_inline_shapes_are_hoisted() {
    let output = load_shop();
    let order = output.model.schema("/Sales/Order.yaml").unwrap();

    assert!(matches!(order.definition("Status"), Some(Definition::Enum(_))));
    assert!(matches!(order.definition("Lines"), Some(Definition::Object(_))));

    let properties = order.root.properties().unwrap();
    match properties.get("lines").unwrap().unwrap_array() {
        (Property::Ref(r), true) => assert_eq!(r.target, "#/definitions/Lines"),
        other => panic!("lines should be an array of refs, got {:?}", other),
    }

    let payment = output.model.schema("/Sales/Payment.yaml").unwrap();
    match &payment.root {
        Definition::Interface(interface) => {
            let targets: Vec<&str> = interface.one_of.iter().map(|r| r.target.as_str()).collect();
            assert_eq!(targets, vec!["./Card.yaml", "#/definitions/Payment2"]);
        }
        other => panic!("payment should be an interface, got {}", other.kind_name()),
    }
}

#[test]
fn test_normalized_schemas_are_stable() {
    let config = ModelConfig::default();
    let output = load_shop();
    for schema in output.model.schemas() {
        let again = normalize_schema(&schema.to_value(), &config).unwrap();
        assert_eq!(&again.schema, schema, "{} changed on a second pass", schema.id);
    }
}

#[test]
fn test_references_resolve_across_modules() {
    let output = load_shop();
    let model = &output.model;
    let order = model.schema("/Sales/Order.yaml").unwrap();

    let product = model.resolve_reference(order, "../Catalog/Product.yaml").unwrap();
    assert_eq!(product.schema.id, "/Catalog/Product.yaml");
    assert!(product.definition_name.is_none());

    let status = model.resolve_reference(order, "#/definitions/Status").unwrap();
    assert!(status.definition.is_enum());
    assert!(model.resolve_reference(order, "./Missing.yaml").is_none());
}

// =============================================================================
// Dependencies
// =============================================================================

#[test]
fn test_order_dependencies() {
    let output = load_shop();
    let model = &output.model;
    let order = model.schema("/Sales/Order.yaml").unwrap();
    let analysis = analyze_dependencies(model, order).unwrap();

    let kind_of = |property: &str| {
        analysis
            .dependencies
            .iter()
            .find(|d| d.property_name.as_deref() == Some(property))
            .map(|d| d.kind)
    };
    assert_eq!(kind_of("shipping"), Some(DependencyKind::Contains));
    assert_eq!(kind_of("payment"), Some(DependencyKind::Contains));
    assert_eq!(kind_of("customer"), Some(DependencyKind::References));
    assert_eq!(kind_of("status"), Some(DependencyKind::Enum));
    assert_eq!(kind_of("product"), Some(DependencyKind::References));

    let lines = analysis
        .dependencies
        .iter()
        .find(|d| d.property_name.as_deref() == Some("lines"))
        .unwrap();
    assert_eq!(lines.kind, DependencyKind::Contains);
    assert!(lines.is_array);
    assert_eq!(lines.to_definition_name.as_deref(), Some("Lines"));

    let product = analysis
        .dependencies
        .iter()
        .find(|d| d.property_name.as_deref() == Some("product"))
        .unwrap();
    assert_eq!(product.from_definition_name.as_deref(), Some("Lines"));

    // Aggregate embedded with $ref
    let unusual: Vec<_> = analysis.diagnostics.of_kind(DiagnosticKind::UnusualReference).collect();
    assert_eq!(unusual.len(), 1);
    assert_eq!(unusual[0].value, Some(json!("../Catalog/Product.yaml")));
}

#[test]
fn test_interface_and_enum_edges() {
    let output = load_shop();
    let model = &output.model;

    let payment = analyze_dependencies(model, model.schema("/Sales/Payment.yaml").unwrap()).unwrap();
    assert_eq!(payment.dependencies.len(), 2);
    assert!(payment
        .dependencies
        .iter()
        .all(|d| d.kind == DependencyKind::IsImplementedBy && d.property_name.is_none()));

    let address = analyze_dependencies(model, model.schema("/Sales/Address.yaml").unwrap()).unwrap();
    assert_eq!(address.dependencies.len(), 1);
    assert_eq!(address.dependencies[0].kind, DependencyKind::Enum);
    assert_eq!(address.dependencies[0].to_schema, "/Catalog/Country.yaml");
}

#[test]
fn test_shop_graph() {
    let output = load_shop();
    let graph = DependencyGraph::from_model(&output.model).unwrap();

    let mut dependents: Vec<&str> = graph
        .dependents_of("/Sales/Address.yaml")
        .iter()
        .map(|d| d.from_schema.as_str())
        .collect();
    dependents.dedup();
    assert_eq!(dependents, vec!["/Customers/Customer.yaml", "/Sales/Order.yaml"]);
    assert!(graph.containment_cycles().is_empty());
    assert_eq!(graph.diagnostics().warning_count(), 1);
}

// =============================================================================
// Failures
// =============================================================================

fn copy_tree(from: &Path, to: &Path) {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.unwrap();
        let target = to.join(entry.path().strip_prefix(from).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

#[test]
fn test_dangling_references_reported_together() {
    let dir = tempfile::tempdir().unwrap();
    copy_tree(&shop_dir(), dir.path());
    fs::remove_file(dir.path().join("Catalog/Product.yaml")).unwrap();
    fs::remove_file(dir.path().join("Customers/Customer.yaml")).unwrap();

    let err = load_directory(dir.path(), &ModelConfig::default()).unwrap_err();
    assert!(matches!(err, ModelError::Resolution { .. }));

    let mut texts: Vec<String> = err
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::DanglingReference)
        .filter_map(|d| d.value.as_ref().and_then(Value::as_str).map(str::to_string))
        .collect();
    texts.sort();
    assert_eq!(texts, vec!["../Catalog/Product.yaml", "../Customers/Customer.yaml"]);
}

#[test]
fn test_missing_application() {
    let dir = tempfile::tempdir().unwrap();
    copy_tree(&shop_dir(), dir.path());
    fs::remove_file(dir.path().join("index.yaml")).unwrap();

    let err = load_directory(dir.path(), &ModelConfig::default()).unwrap_err();
    assert!(matches!(err, ModelError::MissingApplication));
}

#[test]
fn test_invalid_example_fails_build() {
    let dir = tempfile::tempdir().unwrap();
    copy_tree(&shop_dir(), dir.path());
    fs::write(
        dir.path().join("Catalog/Product.yaml"),
        "$id: /Catalog/Product.yaml\ntitle: Product\nx-schema-type: Aggregate\ntype: object\n\
         properties:\n  sku: {type: string}\n  name: {type: string}\nrequired: [sku, name]\n\
         examples:\n  - {sku: P-1}\n",
    )
    .unwrap();

    let err = load_directory(dir.path(), &ModelConfig::default()).unwrap_err();
    let diagnostics = err.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::InvalidExample);
    assert_eq!(diagnostics[0].origin, "/Catalog/Product.yaml");
}

#[test]
fn test_enum_documentation_mismatch_named() {
    let config = ModelConfig::default();
    let mut builder = ModelBuilder::new(&config);
    builder
        .add_application(&json!({"title": "App", "description": "d"}), "index.yaml")
        .unwrap();

    let err = builder
        .add_schema(
            &json!({
                "$id": "/M/Level.yaml",
                "title": "Level",
                "x-schema-type": "ValueObject",
                "type": "string",
                "enum": ["A", "B"],
                "x-enum-description": {"A": "first", "C": "third"}
            }),
            "M/Level.yaml",
            Some("/M/Level.yaml"),
        )
        .unwrap_err();

    let mut named: Vec<Value> = err
        .diagnostics()
        .iter()
        .inspect(|d| assert_eq!(d.kind, DiagnosticKind::EnumDocumentationMismatch))
        .filter_map(|d| d.value.clone())
        .collect();
    named.sort_by_key(|v| v.to_string());
    assert_eq!(named, vec![json!("B"), json!("C")]);
}

// =============================================================================
// Normalization through the public API
// =============================================================================

#[test]
fn test_nested_object_hoisted() {
    let normalized = normalize_schema(
        &json!({
            "$id": "/M/S.yaml",
            "title": "S",
            "x-schema-type": "Entity",
            "type": "object",
            "properties": {"deep": {"type": "object", "properties": {"key": {"type": "string"}}}}
        }),
        &ModelConfig::default(),
    )
    .unwrap();

    let value = normalized.schema.to_value();
    assert_eq!(value["properties"]["deep"], json!({"$ref": "#/definitions/Deep"}));
    assert_eq!(value["definitions"]["Deep"]["properties"]["key"], json!({"type": "string"}));
    assert_eq!(value["definitions"]["Deep"]["required"], json!([]));
}

#[test]
fn test_inline_one_of_branch_hoisted() {
    let normalized = normalize_schema(
        &json!({
            "$id": "/M/Schema.yaml",
            "title": "Schema",
            "x-schema-type": "ValueObject",
            "type": "object",
            "oneOf": [{"type": "object", "properties": {"key": {"type": "string"}}}]
        }),
        &ModelConfig::default(),
    )
    .unwrap();

    let value = normalized.schema.to_value();
    assert_eq!(value["oneOf"], json!([{"$ref": "#/definitions/Schema1"}]));
    assert_eq!(value["definitions"]["Schema1"]["properties"]["key"], json!({"type": "string"}));
}
