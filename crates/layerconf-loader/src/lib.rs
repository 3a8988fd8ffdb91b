#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! File loading for layered configuration.
//!
//! Locates configuration files by reference, parses them (JSON5, YAML,
//! TOML and Java properties), follows parent chains on disk and runs the [`layerconf_core`] pipeline over the merged result.
//!
//! # Usage
//!
//! ```rust,no_run
//! use layerconf_loader::{ReadOptions, read_config};
//!
//! // Finds ./config/app.{json,json5,yml,yaml,properties,toml}.
//! let options = ReadOptions::default().with_basedir("config");
//! let resolved = read_config(&["app"], &options).unwrap();
//! println!("{:?}", resolved.get("server.port"));
//! ```
//!
//! [`read_config`] blocks; [`read_config_async`] resolves each source's
//! parent chain on a blocking task and joins them before merging. Both
//! produce the same tree.

/// Format detection and parsing.
pub mod format;
mod properties;
/// Path search with extension fallback.
pub mod search;
/// File reading and the filesystem parent lookup.
pub mod source;

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::PathBuf;
use std::sync::Arc;

use layerconf_core::{
    ConfigError, ConfigObject, ConfigResult, ParentResolver, ResolveOptions, ResolvedConfig,
    collect_env_vars, merge_configs, resolve, resolve_sources,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use format::{ConfigFormat, EXTENSIONS};
pub use search::resolve_path;
pub use source::{FileLookup, MAX_CONFIG_FILE_SIZE, read_file, read_source};

/// Options for reading configuration from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadOptions {
    /// Directories searched for relative references. Empty means the
    /// working directory.
    pub basedirs: Vec<PathBuf>,
    /// Resolution pipeline options.
    #[serde(flatten)]
    pub resolve: ResolveOptions,
}

impl ReadOptions {
    /// Create options around a set of resolution options.
    #[must_use]
    pub fn new(resolve: ResolveOptions) -> Self {
        Self {
            basedirs: Vec::new(),
            resolve,
        }
    }

    /// Add a base directory.
    #[must_use]
    pub fn with_basedir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.basedirs.push(dir.into());
        self
    }

    /// Check the option contract for a read of `paths`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `paths` is empty, a base directory
    /// does not exist, or the resolution options are invalid.
    pub fn validate<S: AsRef<str>>(&self, paths: &[S]) -> ConfigResult<()> {
        if paths.is_empty() {
            return Err(ConfigError::validation(
                "paths",
                "at least one configuration path is required",
            ));
        }

        for dir in &self.basedirs {
            if !dir.is_dir() {
                return Err(ConfigError::validation(
                    "basedir",
                    format!("base directory does not exist: {}", dir.display()),
                ));
            }
        }

        self.resolve.validate()
    }
}

/// Read, merge and resolve `paths` against the live process environment.
///
/// # Errors
///
/// See [`read_config_with_env`].
pub fn read_config<S: AsRef<str>>(paths: &[S], options: &ReadOptions) -> ConfigResult<ResolvedConfig> {
    read_config_with_env(paths, options, &collect_env_vars())
}

/// Read, merge and resolve `paths` against an environment snapshot.
///
/// Each path is resolved through its parent chain in order, the results
/// are merged left to right, and the resolution pipeline runs over the
/// merged tree.
///
/// # Errors
///
/// - A validation error for invalid options (before any file is read).
/// - [`ConfigError::FileNotFound`] / [`ConfigError::ParentNotFound`] for
///   missing required sources.
/// - [`ConfigError::ParseError`] for unreadable or malformed files.
/// - Any error raised by [`layerconf_core::resolve`].
pub fn read_config_with_env<S, H>(
    paths: &[S],
    options: &ReadOptions,
    env_vars: &HashMap<String, String, H>,
) -> ConfigResult<ResolvedConfig>
where
    S: AsRef<str>,
    H: BuildHasher,
{
    options.validate(paths)?;
    let lookup = FileLookup::new(options.basedirs.clone())?;
    let optional = options.resolve.optional_patterns()?;

    let merged = resolve_sources(&lookup, paths, options.resolve.parent_field(), &optional)?;
    info!(sources = paths.len(), "configuration sources merged");

    resolve(merged, &options.resolve, env_vars)
}

/// Async variant of [`read_config`].
///
/// # Errors
///
/// See [`read_config_with_env`].
pub async fn read_config_async<S: AsRef<str>>(
    paths: &[S],
    options: &ReadOptions,
) -> ConfigResult<ResolvedConfig> {
    read_config_async_with_env(paths, options, &collect_env_vars()).await
}

/// Async variant of [`read_config_with_env`].
///
/// Every source's parent chain is resolved on its own blocking task; all
/// tasks are joined before the results are merged in source order.
///
/// # Errors
///
/// See [`read_config_with_env`]. A task that fails to complete is reported
/// as a parse error for its source.
pub async fn read_config_async_with_env<S, H>(
    paths: &[S],
    options: &ReadOptions,
    env_vars: &HashMap<String, String, H>,
) -> ConfigResult<ResolvedConfig>
where
    S: AsRef<str>,
    H: BuildHasher,
{
    options.validate(paths)?;
    let lookup = Arc::new(FileLookup::new(options.basedirs.clone())?);
    let optional = Arc::new(options.resolve.optional_patterns()?);
    let parent_field: Option<Arc<str>> = options.resolve.parent_field().map(Arc::from);

    let handles = paths.iter().map(|path| {
        let reference = path.as_ref().to_owned();
        let lookup = Arc::clone(&lookup);
        let optional = Arc::clone(&optional);
        let parent_field = parent_field.clone();
        async move {
            let task = tokio::task::spawn_blocking({
                let reference = reference.clone();
                move || -> ConfigResult<ConfigObject> {
                    ParentResolver::new(lookup.as_ref(), parent_field.as_deref(), optional.as_ref())
                        .resolve_source(&reference)
                }
            });
            match task.await {
                Ok(result) => result,
                Err(e) => Err(ConfigError::parse(reference, e)),
            }
        }
    });

    let trees = futures::future::join_all(handles)
        .await
        .into_iter()
        .collect::<ConfigResult<Vec<_>>>()?;
    debug!(sources = trees.len(), "all source chains resolved");

    resolve(merge_configs(&trees), &options.resolve, env_vars)
}
