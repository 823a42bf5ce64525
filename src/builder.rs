//! Model Building
//!
//! One `ModelBuilder` per run. Documents are validated and normalized as
//! they are added; `build` consumes the builder, resolves references across
//! the whole document set, verifies examples and only then hands out a
//! [`Model`].

use serde_json::Value;

use crate::config::ModelConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{ModelError, Result};
use crate::examples::ExampleVerifier;
use crate::normalize::{normalize_application, normalize_module, normalize_schema};
use crate::resolve::ReferenceResolver;
use crate::schema::{Application, Model, Module, Schema};
use crate::validate::DocumentValidator;

/// A finished model and every warning raised while building it
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub model: Model,
    pub warnings: Diagnostics,
}

/// Collects documents for a single model build
pub struct ModelBuilder<'c> {
    config: &'c ModelConfig,
    validator: DocumentValidator<'c>,
    application: Option<(String, Application)>,
    modules: Vec<Module>,
    schemas: Vec<Schema>,
    warnings: Diagnostics,
}

impl<'c> ModelBuilder<'c> {
    pub fn new(config: &'c ModelConfig) -> Self {
        Self {
            config,
            validator: DocumentValidator::new(config),
            application: None,
            modules: Vec::new(),
            schemas: Vec::new(),
            warnings: Diagnostics::new(),
        }
    }

    /// Add the application document; there must be exactly one
    pub fn add_application(&mut self, raw: &Value, location: &str) -> Result<()> {
        if self.application.is_some() {
            return Err(ModelError::DuplicateApplication {
                location: location.to_string(),
            });
        }
        self.warnings.merge(self.validator.validate_application(raw, location)?);
        self.application = Some((location.to_string(), normalize_application(raw)?));
        tracing::debug!(location, "added application");
        Ok(())
    }

    pub fn add_module(&mut self, raw: &Value, location: &str, expected_id: Option<&str>) -> Result<()> {
        self.warnings.merge(self.validator.validate_module(raw, location, expected_id)?);
        let module = normalize_module(raw)?;
        tracing::debug!(location, module = %module.id, "added module");
        self.modules.push(module);
        Ok(())
    }

    pub fn add_schema(&mut self, raw: &Value, location: &str, expected_id: Option<&str>) -> Result<()> {
        self.warnings.merge(self.validator.validate_schema(raw, location, expected_id)?);
        let normalized = normalize_schema(raw, self.config)?;
        self.warnings.merge(normalized.warnings);
        tracing::debug!(location, schema = %normalized.schema.id, "added schema");
        self.schemas.push(normalized.schema);
        Ok(())
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Resolve the collected documents into a model
    pub fn build(self) -> Result<BuildOutput> {
        let Some((_, application)) = self.application else {
            return Err(ModelError::MissingApplication);
        };

        ReferenceResolver::new(&self.schemas).resolve(&self.schemas, &self.modules)?;

        let model = Model::new(application, self.modules, self.schemas);
        let mut warnings = self.warnings;
        if self.config.validation.verify_examples {
            warnings.merge(ExampleVerifier::new(&model, self.config).verify()?);
        }

        tracing::info!(
            modules = model.modules().len(),
            schemas = model.schemas().len(),
            warnings = warnings.len(),
            "model built"
        );
        Ok(BuildOutput { model, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use serde_json::json;

    fn application() -> Value {
        json!({"title": "Shop", "description": "A shop"})
    }

    fn module() -> Value {
        json!({"$id": "/Sales", "title": "Sales", "description": "Selling"})
    }

    fn order(customer_ref: &str) -> Value {
        json!({
            "$id": "/Sales/Order.yaml",
            "title": "Order",
            "x-schema-type": "Aggregate",
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "customer": {"$ref": customer_ref}
            },
            "required": ["id"],
            "examples": [{"id": "o-1", "customer": {"name": "Ann"}}]
        })
    }

    fn customer() -> Value {
        json!({
            "$id": "/Sales/Customer.yaml",
            "title": "Customer",
            "x-schema-type": "Entity",
            "type": "object",
            "properties": {"name": {"type": "string"}}
        })
    }

    #[test]
    fn test_build_model() {
        let config = ModelConfig::default();
        let mut builder = ModelBuilder::new(&config);
        builder.add_application(&application(), "index.yaml").unwrap();
        builder.add_module(&module(), "Sales/index.yaml", Some("/Sales")).unwrap();
        builder.add_schema(&order("./Customer.yaml"), "Sales/Order.yaml", Some("/Sales/Order.yaml")).unwrap();
        builder.add_schema(&customer(), "Sales/Customer.yaml", Some("/Sales/Customer.yaml")).unwrap();

        let output = builder.build().unwrap();
        assert_eq!(output.model.schemas().len(), 2);
        assert_eq!(output.model.schemas_for_module("/Sales").count(), 2);
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_missing_application() {
        let config = ModelConfig::default();
        let builder = ModelBuilder::new(&config);
        assert!(matches!(builder.build(), Err(ModelError::MissingApplication)));
    }

    #[test]
    fn test_second_application_rejected() {
        let config = ModelConfig::default();
        let mut builder = ModelBuilder::new(&config);
        builder.add_application(&application(), "index.yaml").unwrap();
        let err = builder.add_application(&application(), "other/index.yaml").unwrap_err();
        assert!(matches!(err, ModelError::DuplicateApplication { .. }));
    }

    #[test]
    fn test_dangling_reference_fails_build() {
        let config = ModelConfig::default();
        let mut builder = ModelBuilder::new(&config);
        builder.add_application(&application(), "index.yaml").unwrap();
        builder.add_schema(&order("./Client.yaml"), "Sales/Order.yaml", None).unwrap();

        let err = builder.build().unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DanglingReference);
        assert!(diagnostics[0].message.contains("'./Client.yaml'"));
    }

    #[test]
    fn test_example_verification_can_be_disabled() {
        let mut config = ModelConfig::default();
        let mut invalid = order("./Customer.yaml");
        invalid["examples"] = json!([{"id": 1}]);

        let mut builder = ModelBuilder::new(&config);
        builder.add_application(&application(), "index.yaml").unwrap();
        builder.add_schema(&invalid, "Sales/Order.yaml", None).unwrap();
        builder.add_schema(&customer(), "Sales/Customer.yaml", None).unwrap();
        assert!(matches!(builder.build(), Err(ModelError::InvalidExamples { .. })));

        config.validation.verify_examples = false;
        let mut builder = ModelBuilder::new(&config);
        builder.add_application(&application(), "index.yaml").unwrap();
        builder.add_schema(&invalid, "Sales/Order.yaml", None).unwrap();
        builder.add_schema(&customer(), "Sales/Customer.yaml", None).unwrap();
        assert!(builder.build().is_ok());
    }
}
