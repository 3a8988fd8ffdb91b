#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Resolution engine for layered configuration trees.
//!
//! This crate takes already-parsed configuration trees and produces one
//! resolved tree:
//!
//! 1. **Parent chains** ([`parents`]): a source naming a parent under the
//!    parent field (default `__parent`) inherits from it, child values
//!    winning.
//! 2. **Merge** ([`merge`]): sources merge left to right. Objects merge
//!    per key; arrays replace wholesale.
//! 3. **Overrides** ([`env`]): `PREFIX_a_b=value` environment variables are
//!    coerced and written at path `a.b`.
//! 4. **Substitution** ([`expression`]): `%{VAR}` expressions resolve
//!    against the environment, then `@{path}` expressions against the tree
//!    itself, with `path|default` fallbacks and `./`/`../` relative paths.
//! 5. **Freeze** ([`resolve`]): the result is optionally handed back as a
//!    shared, read-only tree.
//!
//! # Usage
//!
//! ```rust
//! use layerconf_core::{ConfigValue, ResolveOptions, collect_env_vars, resolve};
//!
//! let tree = match ConfigValue::from(serde_json::json!({
//!     "host": "localhost",
//!     "url": "http://@{host}:8080",
//! })) {
//!     ConfigValue::Object(map) => map,
//!     _ => unreachable!(),
//! };
//!
//! let resolved = resolve(tree, &ResolveOptions::default(), &collect_env_vars()).unwrap();
//! assert_eq!(resolved.get("url").and_then(ConfigValue::as_str), Some("http://localhost:8080"));
//! ```
//!
//! # Design
//!
//! Everything here is synchronous and operates on in-memory trees. Reading
//! files, locating parents and running work concurrently belong to the
//! loader layer, which plugs in through [`ParentLookup`]. The process
//! environment is never read implicitly: callers pass a snapshot.

/// String-to-value coercion.
pub mod coerce;
/// Environment snapshots and overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Expression substitution.
pub mod expression;
/// Deep merge with array replacement.
pub mod merge;
/// Resolution options.
pub mod options;
/// Parent-chain inheritance.
pub mod parents;
/// Deep path access.
pub mod path;
/// The resolution pipeline and its result.
pub mod resolve;
/// The configuration value model.
pub mod value;

pub use env::{apply_overrides, collect_env_vars};
pub use error::{ConfigError, ConfigResult, ErrorKind};
pub use expression::replace_variables;
pub use merge::{deep_merge, merge_configs};
pub use options::ResolveOptions;
pub use parents::{OptionalPatterns, ParentLookup, ParentResolver, Source, resolve_sources};
pub use path::{PathSegments, Pick, get, pick, put, remove};
pub use resolve::{FrozenConfig, ResolvedConfig, resolve};
pub use value::{ConfigArray, ConfigObject, ConfigValue};
