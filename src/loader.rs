//! Directory Loading
//!
//! Reads a document tree from disk and feeds it through a [`ModelBuilder`]:
//!
//! - `<root>/index.yaml` is the application
//! - `<root>/<dir>/index.yaml` is the module with id `/<dir>`
//! - any other file with a configured extension is a schema with id `/<relative path>`
//! - anything else is rejected

use serde_json::Value;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::builder::{BuildOutput, ModelBuilder};
use crate::config::ModelConfig;
use crate::error::{ModelError, Result};

/// Load and build the model stored under `root`
pub fn load_directory(root: &Path, config: &ModelConfig) -> Result<BuildOutput> {
    let loader = &config.loader;
    let mut builder = ModelBuilder::new(config);

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if loader.skip_prefixes.iter().any(|p| relative.starts_with(p.as_str())) {
            tracing::debug!(path = %relative, "skipping file");
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if file_name == loader.index_file.as_str() {
            let raw = read_document(path, &relative)?;
            match relative.rsplit_once('/') {
                None => builder.add_application(&raw, &relative)?,
                Some((dir, _)) => builder.add_module(&raw, &relative, Some(&format!("/{}", dir)))?,
            }
        } else if has_extension(path, &loader.extensions) {
            let raw = read_document(path, &relative)?;
            builder.add_schema(&raw, &relative, Some(&format!("/{}", relative)))?;
        } else {
            return Err(ModelError::UnexpectedFile { path: path.to_path_buf() });
        }
    }

    tracing::info!(root = %root.display(), schemas = builder.schema_count(), "loaded document tree");
    builder.build()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map_or(false, |ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
}

/// Parse a YAML (or JSON, which YAML accepts) file into a JSON value
fn read_document(path: &Path, location: &str) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|source| ModelError::Yaml {
        location: location.to_string(),
        source,
    })
}
