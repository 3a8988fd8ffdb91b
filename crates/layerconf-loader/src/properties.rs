//! Java `.properties` parsing.
//!
//! Keys stay flat (`a.b=1` yields the key `"a.b"`, not a nested object).
//! Empty values become `null`; `true`, `false` and plain numeric literals
//! are coerced; everything else is a string.

use layerconf_core::{ConfigError, ConfigObject, ConfigResult, ConfigValue};

/// Parse properties `content` into a flat tree. Later duplicates win.
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] if the content is not valid
/// properties syntax.
pub(crate) fn parse(content: &str, origin: &str) -> ConfigResult<ConfigObject> {
    let entries = java_properties::read(content.as_bytes())
        .map_err(|e| ConfigError::parse(origin, e.to_string()))?;
    Ok(entries
        .into_iter()
        .map(|(key, value)| (key, coerce(&value)))
        .collect())
}

fn coerce(value: &str) -> ConfigValue {
    match value {
        "" => ConfigValue::Null,
        "true" => ConfigValue::Bool(true),
        "false" => ConfigValue::Bool(false),
        _ if is_numeric(value) => value
            .parse::<i64>()
            .map(ConfigValue::Integer)
            .or_else(|_| value.parse::<f64>().map(ConfigValue::Float))
            .unwrap_or_else(|_| ConfigValue::String(value.to_owned())),
        _ => ConfigValue::String(value.to_owned()),
    }
}

/// `-?digits` or `-?digits.digits`
fn is_numeric(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "0"));
    !whole.is_empty()
        && !fraction.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(content: &str) -> ConfigObject {
        parse(content, "inline.properties").unwrap()
    }

    #[test]
    fn test_separators() {
        let tree = parse_ok("a=1\nb: two\nc three\nd = spaced value \n");
        assert_eq!(tree["a"], ConfigValue::Integer(1));
        assert_eq!(tree["b"].as_str(), Some("two"));
        assert_eq!(tree["c"].as_str(), Some("three"));
        assert_eq!(tree["d"].as_str(), Some("spaced value "));
    }

    #[test]
    fn test_comments_and_blanks() {
        let tree = parse_ok("# comment\n! also comment\n\n   \nkey=value\n");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree["key"].as_str(), Some("value"));
    }

    #[test]
    fn test_flat_keys() {
        let tree = parse_ok("server.host=localhost\nserver.port=8080\n");
        assert_eq!(tree["server.host"].as_str(), Some("localhost"));
        assert_eq!(tree["server.port"], ConfigValue::Integer(8080));
        assert!(!tree.contains_key("server"));
    }

    #[test]
    fn test_value_coercion() {
        let tree = parse_ok("empty=\nyes=true\nno=false\nneg=-3\nratio=0.5\nver=1.2.3\nupper=TRUE\n");
        assert_eq!(tree["empty"], ConfigValue::Null);
        assert_eq!(tree["yes"], ConfigValue::Bool(true));
        assert_eq!(tree["no"], ConfigValue::Bool(false));
        assert_eq!(tree["neg"], ConfigValue::Integer(-3));
        assert_eq!(tree["ratio"], ConfigValue::Float(0.5));
        assert_eq!(tree["ver"].as_str(), Some("1.2.3"));
        assert_eq!(tree["upper"].as_str(), Some("TRUE"));
    }

    #[test]
    fn test_line_continuation() {
        let tree = parse_ok("list=a,\\\n    b,\\\n    c\nnext=1\n");
        assert_eq!(tree["list"].as_str(), Some("a,b,c"));
        assert_eq!(tree["next"], ConfigValue::Integer(1));
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let tree = parse_ok("path=C:\\\\dir\\\\\nnext=1\n");
        assert_eq!(tree["path"].as_str(), Some("C:\\dir\\"));
        assert_eq!(tree["next"], ConfigValue::Integer(1));
    }

    #[test]
    fn test_escapes() {
        let tree = parse_ok("tab=a\\tb\nuni=\\u00e9t\\u00e9\nkey\\ with\\ spaces=v\nsep\\=key=v2\n");
        assert_eq!(tree["tab"].as_str(), Some("a\tb"));
        assert_eq!(tree["uni"].as_str(), Some("été"));
        assert_eq!(tree["key with spaces"].as_str(), Some("v"));
        assert_eq!(tree["sep=key"].as_str(), Some("v2"));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let tree = parse_ok("a=1\na=2\n");
        assert_eq!(tree["a"], ConfigValue::Integer(2));
    }
}
