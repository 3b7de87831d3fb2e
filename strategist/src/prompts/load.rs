//! Load prompts from a YAML file layered over the embedded defaults.
//!
//! **Canonical source**: default text lives in `strategist/prompts/strategist.yaml`; it is
//! embedded at compile time and used when no override file is configured.

use std::path::Path;

use serde_yaml::Value;

use super::Prompts;

const EMBED_DEFAULT: &str = include_str!("../../prompts/strategist.yaml");

/// Error when loading an override file (unreadable file, invalid YAML).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

/// Returns the prompts parsed from the embedded YAML.
pub fn default_from_embedded() -> Prompts {
    serde_yaml::from_str(EMBED_DEFAULT).unwrap_or_default()
}

/// Reads `path` and layers its keys over the embedded defaults.
///
/// Mappings merge key by key; any other value in the file replaces the default.
pub fn load(path: &Path) -> Result<Prompts, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::ReadFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let parse_err = |e: serde_yaml::Error| LoadError::ParseYaml {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let overrides: Value = serde_yaml::from_str(&content).map_err(parse_err)?;
    let mut base: Value = serde_yaml::from_str(EMBED_DEFAULT).map_err(parse_err)?;
    merge(&mut base, overrides);
    serde_yaml::from_value(base).map_err(parse_err)
}

/// Loads `path` when given, falling back to the embedded defaults on any error.
pub fn load_or_default(path: Option<&Path>) -> Prompts {
    let Some(path) = path else {
        return default_from_embedded();
    };
    load(path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using embedded prompts");
        default_from_embedded()
    })
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Mapping(base), Value::Mapping(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        // empty file
        (_, Value::Null) => {}
        (slot, value) => *slot = value,
    }
}
