//! String-to-value coercion shared by overrides and expression defaults.

use tracing::debug;

use crate::value::ConfigValue;

/// Coerce an override value.
///
/// Precedence: `true`/`false` (any case), `null`, `undefined`, integer,
/// decimal, then a `{...}` or `[...]` literal parsed as JSON. Anything else,
/// including malformed JSON, is kept as the raw (untrimmed) string.
#[must_use]
pub fn coerce_override(raw: &str) -> ConfigValue {
    let trimmed = raw.trim();
    if let Some(value) = coerce_scalar(trimmed) {
        return value;
    }

    if is_json_literal(trimmed) {
        match serde_json::from_str::<ConfigValue>(trimmed) {
            Ok(value) => return value,
            Err(e) => debug!(value = raw, error = %e, "override value is not valid JSON; keeping string"),
        }
    }

    ConfigValue::String(raw.to_owned())
}

/// Coerce an expression default. Same as [`coerce_override`] without the
/// JSON literal step.
#[must_use]
pub fn coerce_default(raw: &str) -> ConfigValue {
    coerce_scalar(raw.trim()).unwrap_or_else(|| ConfigValue::String(raw.to_owned()))
}

/// Classify an already-trimmed string as a boolean, null, absent or number.
pub(crate) fn coerce_scalar(trimmed: &str) -> Option<ConfigValue> {
    if trimmed.eq_ignore_ascii_case("true") {
        return Some(ConfigValue::Bool(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(ConfigValue::Bool(false));
    }
    match trimmed {
        "null" => return Some(ConfigValue::Null),
        "undefined" => return Some(ConfigValue::Absent),
        _ => {},
    }

    if is_integer_literal(trimmed) {
        // Out-of-range integers degrade to a float rather than failing.
        return Some(
            trimmed
                .parse::<i64>()
                .map(ConfigValue::Integer)
                .or_else(|_| trimmed.parse::<f64>().map(ConfigValue::Float))
                .ok()?,
        );
    }
    if is_decimal_literal(trimmed) {
        return trimmed.parse::<f64>().ok().map(ConfigValue::Float);
    }
    None
}

/// `-?[0-9]+`
fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `-?[0-9]*\.[0-9]+`
fn is_decimal_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let Some((whole, fraction)) = unsigned.split_once('.') else {
        return false;
    };
    whole.bytes().all(|b| b.is_ascii_digit())
        && !fraction.is_empty()
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

fn is_json_literal(s: &str) -> bool {
    (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']'))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_coerce_booleans_any_case() {
        assert_eq!(coerce_override("true"), ConfigValue::Bool(true));
        assert_eq!(coerce_override("TRUE"), ConfigValue::Bool(true));
        assert_eq!(coerce_override(" False "), ConfigValue::Bool(false));
    }

    #[test]
    fn test_coerce_null_and_undefined() {
        assert_eq!(coerce_override("null"), ConfigValue::Null);
        assert_eq!(coerce_override("undefined"), ConfigValue::Absent);
        // Case-sensitive, unlike booleans.
        assert_eq!(coerce_override("NULL"), ConfigValue::from("NULL"));
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce_override("42"), ConfigValue::Integer(42));
        assert_eq!(coerce_override("-7"), ConfigValue::Integer(-7));
        assert_eq!(coerce_override("2.75"), ConfigValue::Float(2.75));
        assert_eq!(coerce_override("-.5"), ConfigValue::Float(-0.5));
        assert_eq!(coerce_override("1.2.3"), ConfigValue::from("1.2.3"));
        assert_eq!(coerce_override("1."), ConfigValue::from("1."));
        assert_eq!(coerce_override("-"), ConfigValue::from("-"));
    }

    #[test]
    fn test_coerce_integer_overflow_becomes_float() {
        let value = coerce_override("99999999999999999999");
        assert!(matches!(value, ConfigValue::Float(f) if f > 9.0e19));
    }

    #[test]
    fn test_coerce_json_literals() {
        assert_eq!(coerce_override(r#"{"a":1}"#), ConfigValue::from(json!({"a": 1})));
        assert_eq!(coerce_override("[1, 2]"), ConfigValue::from(json!([1, 2])));
    }

    #[test]
    fn test_coerce_malformed_json_passthrough() {
        assert_eq!(coerce_override("{invalid json}"), ConfigValue::from("{invalid json}"));
    }

    #[test]
    fn test_coerce_string_keeps_whitespace() {
        assert_eq!(coerce_override("  spaced  "), ConfigValue::from("  spaced  "));
    }

    #[test]
    fn test_default_skips_json() {
        assert_eq!(coerce_default("42"), ConfigValue::Integer(42));
        assert_eq!(coerce_default("true"), ConfigValue::Bool(true));
        assert_eq!(coerce_default("null"), ConfigValue::Null);
        assert_eq!(coerce_default("undefined"), ConfigValue::Absent);
        assert_eq!(coerce_default(r#"{"a":1}"#), ConfigValue::from(r#"{"a":1}"#));
    }
}
