//! `MARKER{ path | default }` variable substitution.
//!
//! A string that is exactly one expression site (surrounding whitespace
//! allowed) is replaced by the resolved value with its own type. Sites
//! embedded in a larger string are replaced by the value's display form.
//! Substitution repeats on the result until no site remains, bounded by
//! [`MAX_SUBSTITUTION_PASSES`].

use regex::Regex;
use tracing::{debug, warn};

use crate::coerce::coerce_default;
use crate::error::{ConfigError, ConfigResult};
use crate::path::pick;
use crate::value::{ConfigObject, ConfigValue};

/// Upper bound on re-substitution passes for a single string value.
pub const MAX_SUBSTITUTION_PASSES: usize = 32;

/// Prefix of the placeholder left for unresolved expressions when
/// unresolved expressions are skipped.
pub const NOT_FOUND_PREFIX: &str = "NOTFOUND: ";

/// Compiled expression grammar for one marker.
#[derive(Debug, Clone)]
pub struct ExpressionPattern {
    marker: String,
    full: Regex,
    partial: Regex,
}

impl ExpressionPattern {
    /// Compile the grammar for `marker`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the marker is empty.
    pub fn new(marker: &str) -> ConfigResult<Self> {
        if marker.is_empty() {
            return Err(ConfigError::validation(
                "marker",
                "substitution marker must not be empty",
            ));
        }

        let escaped = regex::escape(marker);
        // The expression body may not contain any marker character or `}`.
        let excluded: String = marker
            .chars()
            .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
            .collect();
        let site = format!(r"{escaped}\{{\s*([^{excluded}}}]+?)\s*\}}");

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ConfigError::validation("marker", e.to_string()))
        };

        Ok(Self {
            marker: marker.to_owned(),
            full: compile(&format!(r"^\s*{site}\s*$"))?,
            partial: compile(&site)?,
        })
    }

    /// The marker this grammar was compiled for.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Whether `text` contains at least one expression site.
    #[must_use]
    pub fn contains_expression(&self, text: &str) -> bool {
        self.partial.is_match(text)
    }
}

/// A substitution pass over one values tree.
#[derive(Debug, Clone)]
pub struct Substitution<'a> {
    pattern: ExpressionPattern,
    values: &'a ConfigObject,
    skip_unresolved: bool,
}

impl<'a> Substitution<'a> {
    /// Prepare a pass resolving `marker` expressions against `values`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the marker is empty.
    pub fn new(marker: &str, values: &'a ConfigObject, skip_unresolved: bool) -> ConfigResult<Self> {
        Ok(Self {
            pattern: ExpressionPattern::new(marker)?,
            values,
            skip_unresolved,
        })
    }

    /// Resolve every string in `tree`, depth first, into a fresh tree.
    ///
    /// # Errors
    ///
    /// Returns the first resolution failure; no partial result is produced.
    pub fn replace_tree(&self, tree: &ConfigObject) -> ConfigResult<ConfigObject> {
        self.replace_object("", tree)
    }

    fn replace_object(&self, prefix: &str, map: &ConfigObject) -> ConfigResult<ConfigObject> {
        map.iter()
            .map(|(key, value)| -> ConfigResult<(String, ConfigValue)> {
                let path = child_path(prefix, key);
                Ok((key.clone(), self.replace_value(&path, value)?))
            })
            .collect()
    }

    fn replace_value(&self, path: &str, value: &ConfigValue) -> ConfigResult<ConfigValue> {
        match value {
            ConfigValue::String(text) => self.resolve_value(path, text),
            ConfigValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| self.replace_value(&child_path(path, &idx.to_string()), item))
                .collect::<ConfigResult<Vec<_>>>()
                .map(ConfigValue::Array),
            ConfigValue::Object(map) => self.replace_object(path, map).map(ConfigValue::Object),
            other => Ok(other.clone()),
        }
    }

    /// Resolve the string `value` held by the field at dot-path `field`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unresolved`] for a missing path without a
    /// default (unless unresolved expressions are skipped), or
    /// [`ConfigError::SubstitutionLimit`] if the value never settles.
    pub fn resolve_value(&self, field: &str, value: &str) -> ConfigResult<ConfigValue> {
        let mut text = value.to_owned();

        for _ in 0..MAX_SUBSTITUTION_PASSES {
            if !self.pattern.contains_expression(&text) {
                return Ok(ConfigValue::String(text));
            }

            let full_field = self
                .pattern
                .full
                .captures(&text)
                .and_then(|captures| captures.get(1))
                .map(|m| m.as_str().to_owned());

            if let Some(expression) = full_field {
                match self.resolve_expression(field, &expression)? {
                    ConfigValue::String(next) => text = next,
                    other => return Ok(other),
                }
            } else {
                text = self.substitute_partial(field, &text)?;
            }
        }

        if self.pattern.contains_expression(&text) {
            return Err(ConfigError::SubstitutionLimit {
                field: field.to_owned(),
                limit: MAX_SUBSTITUTION_PASSES,
            });
        }
        Ok(ConfigValue::String(text))
    }

    fn substitute_partial(&self, field: &str, text: &str) -> ConfigResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for captures in self.pattern.partial.captures_iter(text) {
            let (Some(site), Some(expression)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            out.push_str(&text[last..site.start()]);
            out.push_str(
                &self
                    .resolve_expression(field, expression.as_str())?
                    .to_display_string(),
            );
            last = site.end();
        }

        out.push_str(&text[last..]);
        Ok(out)
    }

    fn resolve_expression(&self, field: &str, expression: &str) -> ConfigResult<ConfigValue> {
        let (raw_path, default) = match expression.split_once('|') {
            Some((path, default)) => (path, Some(default.trim()).filter(|d| !d.is_empty())),
            None => (expression, None),
        };
        let path = resolve_relative(field, raw_path.trim());

        if let Some(found) = pick(self.values, path.as_str()) {
            return Ok(found.value.clone());
        }

        if let Some(default) = default {
            debug!(field, path = %path, default, "expression path not found; using default");
            return Ok(coerce_default(default));
        }

        if self.skip_unresolved {
            warn!(field, path = %path, marker = self.pattern.marker(), "unresolved expression left as placeholder");
            return Ok(ConfigValue::String(format!("{NOT_FOUND_PREFIX}{path}")));
        }

        Err(ConfigError::Unresolved {
            expression: expression.trim().to_owned(),
            path,
        })
    }
}

/// Resolve every `marker` expression in `tree` against `values`.
///
/// # Errors
///
/// See [`Substitution::resolve_value`].
pub fn replace_variables(
    marker: &str,
    tree: &ConfigObject,
    values: &ConfigObject,
    skip_unresolved: bool,
) -> ConfigResult<ConfigObject> {
    Substitution::new(marker, values, skip_unresolved)?.replace_tree(tree)
}

/// Interpret `expr_path` relative to the dot-path of the field holding it.
///
/// Paths starting with `./` address siblings of the field, `../` the
/// siblings of its parent, and so on. Anything else is returned unchanged
/// as an absolute path.
#[must_use]
pub fn resolve_relative(field: &str, expr_path: &str) -> String {
    if !expr_path.starts_with("./") && !expr_path.starts_with("../") {
        return expr_path.to_owned();
    }

    let mut segments: Vec<&str> = field.split('.').filter(|s| !s.is_empty()).collect();
    // The field itself is the first segment dropped.
    for part in std::iter::once("..").chain(expr_path.split('/')) {
        match part {
            "" | "." => {},
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            },
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return ".".to_owned();
    }
    segments.join(".")
}

fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}
