//! Environment snapshots and `MARKER_path_segments` overrides.
//!
//! The process environment is never read implicitly by the resolution
//! pipeline; callers pass a snapshot taken with [`collect_env_vars`].

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::coerce::coerce_override;
use crate::path::put;
use crate::value::{ConfigObject, ConfigValue};

/// Separator between the marker and each path segment of an override name.
pub const OVERRIDE_SEPARATOR: char = '_';

/// Apply `MARKER_a_b=value` overrides from `env_vars` to `tree`.
///
/// Every variable named `{marker}_...` (and longer than that prefix) is
/// split on `_` into path segments, its value coerced with
/// [`coerce_override`], and written with [`put`]. Variables are applied in
/// name order so overlapping paths resolve deterministically.
///
/// Returns the number of overrides applied. An empty marker disables the
/// stage.
pub fn apply_overrides<S: BuildHasher>(
    tree: &mut ConfigObject,
    marker: &str,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    if marker.is_empty() {
        return 0;
    }

    let prefix = format!("{marker}{OVERRIDE_SEPARATOR}");
    let mut names: Vec<&String> = env_vars
        .keys()
        .filter(|name| name.len() > prefix.len() && name.starts_with(&prefix))
        .collect();
    names.sort();

    let mut count: usize = 0;
    for name in names {
        let Some(raw) = env_vars.get(name) else {
            continue;
        };
        let segments: Vec<&str> = name[prefix.len()..].split(OVERRIDE_SEPARATOR).collect();
        let value = coerce_override(raw);

        debug!(var = %name, path = %segments.join("."), kind = value.type_name(), "applying override");
        put(tree, &segments, value);
        count = count.saturating_add(1);
    }

    count
}

/// Convert an environment snapshot into a flat values tree for expression
/// lookups.
#[must_use]
pub fn env_values<S: BuildHasher>(env_vars: &HashMap<String, String, S>) -> ConfigObject {
    env_vars
        .iter()
        .map(|(key, value)| (key.clone(), ConfigValue::String(value.clone())))
        .collect()
}

/// Collect all current environment variables into a map.
///
/// Variables whose name or value is not valid UTF-8 are skipped.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::path::get;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn tree(value: serde_json::Value) -> ConfigObject {
        match ConfigValue::from(value) {
            ConfigValue::Object(map) => map,
            other => panic!("expected object, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_override_coercion_table() {
        let mut config = ConfigObject::new();
        let env = make_env(&[
            ("CONFIG_debug", "true"),
            ("CONFIG_int", "42"),
            ("CONFIG_obj", r#"{"a":1}"#),
            ("CONFIG_a", "null"),
            ("CONFIG_invalid", "{invalid json}"),
        ]);

        let count = apply_overrides(&mut config, "CONFIG", &env);

        assert_eq!(count, 5);
        assert_eq!(config["debug"], ConfigValue::Bool(true));
        assert_eq!(config["int"], ConfigValue::Integer(42));
        assert_eq!(config["obj"], ConfigValue::from(json!({"a": 1})));
        assert_eq!(config["a"], ConfigValue::Null);
        assert_eq!(config["invalid"], ConfigValue::from("{invalid json}"));
    }

    #[test]
    fn test_override_nested_path() {
        let mut config = tree(json!({"database": {"host": "localhost", "port": 5432}}));
        let env = make_env(&[("CONFIG_database_host", "db.internal")]);

        apply_overrides(&mut config, "CONFIG", &env);

        assert_eq!(get(&config, "database.host").unwrap().as_str(), Some("db.internal"));
        assert_eq!(get(&config, "database.port"), Some(&ConfigValue::Integer(5432)));
    }

    #[test]
    fn test_override_replaces_scalar_intermediate() {
        let mut config = tree(json!({"cache": "disabled"}));
        let env = make_env(&[("CONFIG_cache_ttl", "30")]);

        apply_overrides(&mut config, "CONFIG", &env);

        assert_eq!(config, tree(json!({"cache": {"ttl": 30}})));
    }

    #[test]
    fn test_override_ignores_unprefixed_and_bare_marker() {
        let mut config = tree(json!({"a": 1}));
        let env = make_env(&[
            ("CONFIG_", "x"),
            ("CONFIG", "y"),
            ("OTHER_a", "2"),
            ("CONFIGa", "3"),
        ]);

        let count = apply_overrides(&mut config, "CONFIG", &env);

        assert_eq!(count, 0);
        assert_eq!(config, tree(json!({"a": 1})));
    }

    #[test]
    fn test_override_undefined_writes_absent() {
        let mut config = tree(json!({"a": 1}));
        let env = make_env(&[("CONFIG_a", "undefined")]);

        apply_overrides(&mut config, "CONFIG", &env);

        assert!(config["a"].is_absent());
        assert!(get(&config, "a").is_none());
    }

    #[test]
    fn test_override_disabled_by_empty_marker() {
        let mut config = tree(json!({"a": 1}));
        let env = make_env(&[("_a", "2")]);
        assert_eq!(apply_overrides(&mut config, "", &env), 0);
        assert_eq!(config["a"], ConfigValue::Integer(1));
    }

    #[test]
    fn test_env_values_are_strings() {
        let env = make_env(&[("PORT", "8080")]);
        let values = env_values(&env);
        assert_eq!(values["PORT"], ConfigValue::from("8080"));
    }
}
