//! Link configuration.
//!
//! Every field has a default, so an empty object (or no configuration at
//! all) yields the stock virtual-document URI scheme.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kinds::{KindRegistry, ResourceKind};

/// Errors that can occur while loading a [`LinkConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// How targets are addressed and how much is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkConfig {
    /// Scheme of resource view URIs
    pub resource_scheme: String,
    pub resource_authority: String,
    /// Scheme of Helm release view URIs
    pub helm_scheme: String,
    pub helm_authority: String,
    /// File extension of resource views (`yaml` or `json`)
    pub output_format: String,
    /// Upper bound on cached parses; unbounded when absent
    pub max_cached_documents: Option<usize>,
    /// Custom resource kinds, consulted before the built-in ones
    pub extra_kinds: Vec<ResourceKind>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            resource_scheme: "k8smsx".to_string(),
            resource_authority: "loadkubernetescore".to_string(),
            helm_scheme: "helmget".to_string(),
            helm_authority: "helmget".to_string(),
            output_format: "yaml".to_string(),
            max_cached_documents: None,
            extra_kinds: Vec::new(),
        }
    }
}

impl LinkConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read from an already-decoded JSON value, such as LSP
    /// `initializationOptions`. `null` means defaults.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Load a config file. `.json` files are read as JSON, anything else as
    /// YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    /// Built-in kinds plus [`LinkConfig::extra_kinds`].
    pub fn kind_registry(&self) -> KindRegistry {
        KindRegistry::builtin().with_extra(self.extra_kinds.iter().cloned())
    }
}
