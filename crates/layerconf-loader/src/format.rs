//! Supported file formats and parsing into configuration trees.

use std::path::Path;

use layerconf_core::{ConfigError, ConfigObject, ConfigResult, ConfigValue};
use tracing::debug;

use crate::properties;

/// Supported extensions, in lookup order.
pub const EXTENSIONS: [&str; 6] = ["json", "json5", "yml", "yaml", "properties", "toml"];

/// A configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// JSON5 (`.json`, `.json5`). Plain JSON is a subset.
    Json,
    /// YAML (`.yml`, `.yaml`).
    Yaml,
    /// Java properties (`.properties`).
    Properties,
    /// TOML (`.toml`).
    Toml,
}

impl ConfigFormat {
    /// The format for a bare extension (without the dot), if supported.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" | "json5" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            "properties" => Some(Self::Properties),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// The format for `path`, falling back to JSON for unknown extensions.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::Json)
    }

    /// Parse `content` into a tree. `origin` names the source in errors.
    ///
    /// Empty or whitespace-only content yields an empty object, as does a
    /// YAML document that is entirely null.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if the content is malformed or
    /// its top level is not a mapping.
    pub fn parse(self, content: &str, origin: &str) -> ConfigResult<ConfigObject> {
        if content.trim().is_empty() {
            debug!(origin, "empty configuration content");
            return Ok(ConfigObject::new());
        }

        let value = match self {
            Self::Json => {
                json5::from_str::<ConfigValue>(content).map_err(|e| ConfigError::parse(origin, e))?
            },
            Self::Yaml => serde_yaml::from_str::<ConfigValue>(content)
                .map_err(|e| ConfigError::parse(origin, e))?,
            Self::Toml => {
                toml::from_str::<ConfigValue>(content).map_err(|e| ConfigError::parse(origin, e))?
            },
            Self::Properties => return properties::parse(content, origin),
        };

        match value {
            ConfigValue::Object(map) => Ok(map),
            ConfigValue::Null if self == Self::Yaml => Ok(ConfigObject::new()),
            other => Err(ConfigError::parse(
                origin,
                format!("expected a mapping at the top level, found {}", other.type_name()),
            )),
        }
    }
}

/// Whether `path` carries one of the supported extensions.
#[must_use]
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext))
}
