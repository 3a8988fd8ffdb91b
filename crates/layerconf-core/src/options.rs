//! Resolution options.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::parents::OptionalPatterns;

/// Default name of the inheritance-pointer key.
pub const DEFAULT_PARENT_FIELD: &str = "__parent";
/// Default marker for environment substitution.
pub const DEFAULT_ENV_MARKER: &str = "%";
/// Default marker for local substitution.
pub const DEFAULT_LOCAL_MARKER: &str = "@";

/// Options for one resolve call.
///
/// `None` disables the corresponding stage. Deserializing `null` or `false`
/// for a marker disables it; omitting it keeps the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Key naming a parent source to inherit from.
    #[serde(deserialize_with = "marker_or_disabled")]
    pub parent_field: Option<String>,
    /// Marker for `MARKER{...}` expressions resolved against the environment.
    #[serde(deserialize_with = "marker_or_disabled")]
    pub replace_env: Option<String>,
    /// Marker for `MARKER{...}` expressions resolved against the tree itself.
    #[serde(deserialize_with = "marker_or_disabled")]
    pub replace_local: Option<String>,
    /// Prefix of `PREFIX_path_segments` environment overrides.
    #[serde(rename = "override", deserialize_with = "marker_or_disabled")]
    pub override_marker: Option<String>,
    /// Leave a `NOTFOUND: path` placeholder instead of failing on an
    /// unresolved expression.
    pub skip_unresolved: bool,
    /// Return the result as a shared, read-only tree.
    pub freeze: bool,
    /// Sources and parents that may be missing (exact names or globs).
    pub optional: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            parent_field: Some(DEFAULT_PARENT_FIELD.to_owned()),
            replace_env: Some(DEFAULT_ENV_MARKER.to_owned()),
            replace_local: Some(DEFAULT_LOCAL_MARKER.to_owned()),
            override_marker: None,
            skip_unresolved: false,
            freeze: false,
            optional: Vec::new(),
        }
    }
}

impl ResolveOptions {
    /// Set (or disable) the parent field.
    #[must_use]
    pub fn with_parent_field(mut self, field: Option<&str>) -> Self {
        self.parent_field = field.map(str::to_owned);
        self
    }

    /// Set (or disable) the environment substitution marker.
    #[must_use]
    pub fn with_replace_env(mut self, marker: Option<&str>) -> Self {
        self.replace_env = marker.map(str::to_owned);
        self
    }

    /// Set (or disable) the local substitution marker.
    #[must_use]
    pub fn with_replace_local(mut self, marker: Option<&str>) -> Self {
        self.replace_local = marker.map(str::to_owned);
        self
    }

    /// Set (or disable) the override prefix.
    #[must_use]
    pub fn with_override(mut self, marker: Option<&str>) -> Self {
        self.override_marker = marker.map(str::to_owned);
        self
    }

    /// Set whether unresolved expressions become placeholders.
    #[must_use]
    pub fn with_skip_unresolved(mut self, skip: bool) -> Self {
        self.skip_unresolved = skip;
        self
    }

    /// Set whether the result is frozen.
    #[must_use]
    pub fn with_freeze(mut self, freeze: bool) -> Self {
        self.freeze = freeze;
        self
    }

    /// Add an optional source pattern.
    #[must_use]
    pub fn with_optional(mut self, pattern: impl Into<String>) -> Self {
        self.optional.push(pattern.into());
        self
    }

    /// The parent field, if inheritance is enabled.
    #[must_use]
    pub fn parent_field(&self) -> Option<&str> {
        self.parent_field.as_deref().filter(|field| !field.is_empty())
    }

    /// The override prefix, if overrides are enabled.
    #[must_use]
    pub fn override_marker(&self) -> Option<&str> {
        self.override_marker.as_deref().filter(|marker| !marker.is_empty())
    }

    /// Compile the optional patterns.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a glob does not compile.
    pub fn optional_patterns(&self) -> ConfigResult<OptionalPatterns> {
        OptionalPatterns::new(&self.optional)
    }

    /// Check the option contract.
    ///
    /// # Errors
    ///
    /// Returns a validation error if an enabled substitution marker is empty
    /// or if both substitution markers are enabled and equal.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, marker) in [
            ("replaceEnv", &self.replace_env),
            ("replaceLocal", &self.replace_local),
        ] {
            if marker.as_deref().is_some_and(str::is_empty) {
                return Err(ConfigError::validation(
                    field,
                    "substitution marker must not be empty",
                ));
            }
        }

        if let (Some(env), Some(local)) = (&self.replace_env, &self.replace_local)
            && env == local
        {
            return Err(ConfigError::validation(
                "replaceLocal",
                format!("environment and local substitution markers must differ (both '{env}')"),
            ));
        }

        Ok(())
    }
}

/// A marker string, or `null` / `false` for a disabled stage.
fn marker_or_disabled<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Marker {
        Name(String),
        Enabled(bool),
    }

    match Option::<Marker>::deserialize(deserializer)? {
        Some(Marker::Name(name)) => Ok(Some(name)),
        Some(Marker::Enabled(false)) | None => Ok(None),
        Some(Marker::Enabled(true)) => Err(de::Error::custom(
            "expected a marker string, or false/null to disable",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let options = ResolveOptions::default();
        assert_eq!(options.parent_field(), Some("__parent"));
        assert_eq!(options.replace_env.as_deref(), Some("%"));
        assert_eq!(options.replace_local.as_deref(), Some("@"));
        assert_eq!(options.override_marker(), None);
        assert!(!options.skip_unresolved);
        assert!(!options.freeze);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_same_markers_rejected() {
        let options = ResolveOptions::default().with_replace_local(Some("%"));
        let err = options.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Disabling one side lifts the constraint.
        let options = options.with_replace_env(None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_marker_rejected() {
        let options = ResolveOptions::default().with_replace_env(Some(""));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_empty_parent_field_disables() {
        let options = ResolveOptions::default().with_parent_field(Some(""));
        assert_eq!(options.parent_field(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: ResolveOptions = serde_json::from_str(
            r#"{"override": "CONFIG", "replaceEnv": null, "optional": ["local.*"]}"#,
        )
        .unwrap();

        assert_eq!(options.override_marker(), Some("CONFIG"));
        assert_eq!(options.replace_env, None);
        assert_eq!(options.replace_local.as_deref(), Some("@"));
        assert_eq!(options.parent_field(), Some("__parent"));
        assert!(options.optional_patterns().unwrap().matches("local.json"));
    }

    #[test]
    fn test_deserialize_false_disables() {
        let options: ResolveOptions = serde_json::from_str(
            r#"{"parentField": false, "replaceEnv": false, "replaceLocal": "$", "override": false}"#,
        )
        .unwrap();

        assert_eq!(options.parent_field(), None);
        assert_eq!(options.replace_env, None);
        assert_eq!(options.replace_local.as_deref(), Some("$"));
        assert_eq!(options.override_marker(), None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_deserialize_true_marker_rejected() {
        let result = serde_json::from_str::<ResolveOptions>(r#"{"replaceEnv": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let options = ResolveOptions::default()
            .with_override(Some("APP"))
            .with_freeze(true)
            .with_optional("secrets/**");

        let text = toml::to_string(&options).unwrap();
        let back: ResolveOptions = toml::from_str(&text).unwrap();

        assert_eq!(back, options);
    }
}
