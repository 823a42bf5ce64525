//! Configuration management for the domain model pipeline
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (domain-model.toml)
//! - Environment variables (DOMAIN_MODEL__*)
//!
//! ## Example config file (domain-model.toml):
//! ```toml
//! [validation]
//! allowed_keywords = ["discriminator"]
//! strict_keywords = true
//! additional_properties_in_examples = "INTERFACE"
//! verify_examples = true
//!
//! [loader]
//! index_file = "index.yaml"
//! extensions = ["yaml", "yml", "json"]
//! skip_prefixes = ["drafts/"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Directory loader settings
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// How examples treat objects that do not declare `additionalProperties`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdditionalPropertiesPolicy {
    /// Extra keys are always accepted
    Always,
    /// Extra keys are never accepted
    Never,
    /// Extra keys are rejected except on interfaces, where `oneOf`
    /// branches cannot see each other's properties
    #[default]
    Interface,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Extra keywords accepted on every node and kept verbatim
    #[serde(default)]
    pub allowed_keywords: Vec<String>,

    /// Reject unsupported keywords (otherwise drop them with a warning)
    #[serde(default = "default_true")]
    pub strict_keywords: bool,

    #[serde(default)]
    pub additional_properties_in_examples: AdditionalPropertiesPolicy,

    /// Validate schema examples after resolution
    #[serde(default = "default_true")]
    pub verify_examples: bool,
}

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// File name marking application (root) and module (subdirectory) documents
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Extensions of schema documents
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Skip files whose relative path starts with one of these
    #[serde(default)]
    pub skip_prefixes: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_index_file() -> String {
    "index.yaml".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["yaml".to_string(), "yml".to_string(), "json".to_string()]
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_keywords: Vec::new(),
            strict_keywords: true,
            additional_properties_in_examples: AdditionalPropertiesPolicy::default(),
            verify_examples: true,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            index_file: default_index_file(),
            extensions: default_extensions(),
            skip_prefixes: Vec::new(),
        }
    }
}

impl ModelConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, with an explicit file taking precedence over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "domain-model.toml",
            ".domain-model.toml",
            "config/domain-model.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "domain-model", "domain-model") {
            let xdg_config = config_dir.config_dir().join("domain-model.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // DOMAIN_MODEL__VALIDATION__STRICT_KEYWORDS=false
        builder = builder.add_source(
            Environment::with_prefix("DOMAIN_MODEL")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Whether a keyword outside the built-in vocabulary is accepted
    pub fn is_allowed_keyword(&self, keyword: &str) -> bool {
        self.validation.allowed_keywords.iter().any(|k| k == keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert!(config.validation.strict_keywords);
        assert!(config.validation.verify_examples);
        assert_eq!(
            config.validation.additional_properties_in_examples,
            AdditionalPropertiesPolicy::Interface
        );
        assert_eq!(config.loader.index_file, "index.yaml");
    }

    #[test]
    fn test_serialize_config() {
        let config = ModelConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("[loader]"));
        assert!(toml_str.contains("additional_properties_in_examples = \"INTERFACE\""));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[validation]\nallowed_keywords = [\"discriminator\"]\nstrict_keywords = false\n",
        )
        .unwrap();

        let config = ModelConfig::load_from(path.to_str()).unwrap();
        assert!(config.is_allowed_keyword("discriminator"));
        assert!(!config.validation.strict_keywords);
        assert_eq!(config.loader.extensions.len(), 3);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = ModelConfig::default();
        config.validation.additional_properties_in_examples = AdditionalPropertiesPolicy::Never;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = ModelConfig::load_from(path.to_str()).unwrap();
        assert_eq!(
            loaded.validation.additional_properties_in_examples,
            AdditionalPropertiesPolicy::Never
        );
    }
}
