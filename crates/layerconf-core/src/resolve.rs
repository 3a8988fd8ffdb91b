//! Resolution pipeline: override, environment substitution, local
//! substitution, freeze.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::env::{apply_overrides, env_values};
use crate::error::{ConfigError, ConfigResult};
use crate::expression::replace_variables;
use crate::options::ResolveOptions;
use crate::path::{PathSegments, get};
use crate::value::{ConfigObject, ConfigValue, serialize_object};

/// Run the resolution stages over a merged tree.
///
/// Stages run in a fixed order, each skipped when its option is disabled:
/// overrides from `env_vars`, environment substitution against `env_vars`,
/// local substitution against the tree as it stands after the previous
/// stages, and finally freezing.
///
/// # Errors
///
/// - A validation error if `options` violate their contract.
/// - [`ConfigError::EnvResolution`] or [`ConfigError::LocalResolution`]
///   wrapping the failure of a substitution pass.
pub fn resolve<S: BuildHasher>(
    mut tree: ConfigObject,
    options: &ResolveOptions,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    options.validate()?;

    if let Some(marker) = options.override_marker() {
        let applied = apply_overrides(&mut tree, marker, env_vars);
        debug!(marker, applied, "overrides applied");
    }

    if let Some(marker) = options.replace_env.as_deref() {
        let values = env_values(env_vars);
        tree = replace_variables(marker, &tree, &values, options.skip_unresolved).map_err(|e| {
            ConfigError::EnvResolution {
                source: Box::new(e),
            }
        })?;
        debug!(marker, "environment substitution complete");
    }

    if let Some(marker) = options.replace_local.as_deref() {
        tree = replace_variables(marker, &tree, &tree, options.skip_unresolved).map_err(|e| {
            ConfigError::LocalResolution {
                source: Box::new(e),
            }
        })?;
        debug!(marker, "local substitution complete");
    }

    info!(keys = tree.len(), frozen = options.freeze, "configuration resolved");

    Ok(if options.freeze {
        ResolvedConfig::Frozen(FrozenConfig::new(tree))
    } else {
        ResolvedConfig::Mutable(tree)
    })
}

/// A fully resolved configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedConfig {
    /// Owned by the caller and free to modify.
    Mutable(ConfigObject),
    /// Shared and read-only.
    Frozen(FrozenConfig),
}

impl ResolvedConfig {
    /// The resolved tree.
    #[must_use]
    pub fn tree(&self) -> &ConfigObject {
        match self {
            Self::Mutable(tree) => tree,
            Self::Frozen(frozen) => frozen.0.as_ref(),
        }
    }

    /// Mutable access, unless frozen.
    #[must_use]
    pub fn tree_mut(&mut self) -> Option<&mut ConfigObject> {
        match self {
            Self::Mutable(tree) => Some(tree),
            Self::Frozen(_) => None,
        }
    }

    /// Whether the tree is frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen(_))
    }

    /// The value at `path`, if present.
    #[must_use]
    pub fn get<P: PathSegments + ?Sized>(&self, path: &P) -> Option<&ConfigValue> {
        get(self.tree(), path)
    }

    /// Take an owned tree, copying a frozen one if it is still shared.
    #[must_use]
    pub fn into_tree(self) -> ConfigObject {
        match self {
            Self::Mutable(tree) => tree,
            Self::Frozen(frozen) => Arc::unwrap_or_clone(frozen.0),
        }
    }

    /// Extract a typed view of the tree.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the tree does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        deserialize_tree(self)
    }
}

impl Serialize for ResolvedConfig {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serialize_object(self.tree(), serializer)
    }
}

/// A resolved tree that can only be read.
///
/// Clones share the same tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenConfig(Arc<ConfigObject>);

impl FrozenConfig {
    /// Freeze `tree`.
    #[must_use]
    pub fn new(tree: ConfigObject) -> Self {
        Self(Arc::new(tree))
    }

    /// The value at `path`, if present.
    #[must_use]
    pub fn get<P: PathSegments + ?Sized>(&self, path: &P) -> Option<&ConfigValue> {
        get(&self.0, path)
    }

    /// Extract a typed view of the tree.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the tree does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        deserialize_tree(self)
    }
}

impl Serialize for FrozenConfig {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serialize_object(&self.0, serializer)
    }
}

impl Deref for FrozenConfig {
    type Target = ConfigObject;

    fn deref(&self) -> &ConfigObject {
        &self.0
    }
}

fn deserialize_tree<T: DeserializeOwned, V: Serialize>(tree: &V) -> ConfigResult<T> {
    serde_json::to_value(tree)
        .and_then(serde_json::from_value)
        .map_err(|e| ConfigError::validation("config", e.to_string()))
}
