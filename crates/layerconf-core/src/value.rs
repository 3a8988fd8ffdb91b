//! The configuration value model.
//!
//! Every parser deserializes into [`ConfigValue`] and every stage of the
//! resolution pipeline operates on it, so merge, pick/put and coercion are
//! exhaustive matches over one tagged type.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered mapping from key to value.
pub type ConfigObject = BTreeMap<String, ConfigValue>;

/// Ordered sequence of values. Merged as an opaque unit.
pub type ConfigArray = Vec<ConfigValue>;

/// Key the `toml` deserializer uses to smuggle datetimes through serde.
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

/// A single node of a configuration tree.
///
/// `Absent` is distinct from `Null`: a key holding `Absent` behaves as if it
/// were missing for lookups, while `Null` is a present value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigValue {
    /// No value (a missing or explicitly undefined entry).
    #[default]
    Absent,
    /// An explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integral number.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// An array.
    Array(ConfigArray),
    /// A nested object.
    Object(ConfigObject),
}

impl ConfigValue {
    /// Whether this value is [`ConfigValue::Absent`].
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Whether this value is [`ConfigValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value is a non-array object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Loose truthiness: absent, null, `false`, zero, NaN and the empty
    /// string are falsy; everything else (including empty containers) is
    /// truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Absent | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// Returns the string slice if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as a float if this is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the array if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&ConfigArray> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the object if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&ConfigObject> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the object mutably if this is an object.
    pub fn as_object_mut(&mut self) -> Option<&mut ConfigObject> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Render the value for embedding inside a larger string.
    ///
    /// Absent and null render as the empty string; arrays and objects render
    /// as compact JSON.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Absent | Self::Null => String::new(),
            Self::String(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Array(_) | Self::Object(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ConfigArray> for ConfigValue {
    fn from(value: ConfigArray) -> Self {
        Self::Array(value)
    }
}

impl From<ConfigObject> for ConfigValue {
    fn from(value: ConfigObject) -> Self {
        Self::Object(value)
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            },
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent | Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => serializer.collect_seq(items),
            Self::Object(map) => serialize_object(map, serializer),
        }
    }
}

/// Serialize `map`, leaving out absent entries.
///
/// # Errors
///
/// Returns any error raised by `serializer`.
pub fn serialize_object<S: Serializer>(map: &ConfigObject, serializer: S) -> Result<S::Ok, S::Error> {
    let present = map.values().filter(|v| !v.is_absent()).count();
    let mut out = serializer.serialize_map(Some(present))?;
    for (key, value) in map {
        if !value.is_absent() {
            out.serialize_entry(key, value)?;
        }
    }
    out.end()
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = ConfigValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(ConfigValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ConfigValue::Integer(v))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(i64::try_from(v).map_or(ConfigValue::Float(v as f64), ConfigValue::Integer))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(ConfigValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ConfigValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(ConfigValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ConfigValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ConfigValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        ConfigValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ConfigValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut object = ConfigObject::new();
        while let Some(MapKey(key)) = map.next_key()? {
            let value: ConfigValue = map.next_value()?;
            object.insert(key, value);
        }

        // TOML datetimes arrive as a single-entry map; keep their text form.
        if object.len() == 1
            && let Some(ConfigValue::String(datetime)) = object.get(TOML_DATETIME_KEY)
        {
            return Ok(ConfigValue::String(datetime.clone()));
        }

        Ok(ConfigValue::Object(object))
    }
}

/// Map key that accepts scalar keys (YAML allows non-string keys) and
/// stringifies them.
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MapKeyVisitor)
    }
}

struct MapKeyVisitor;

impl Visitor<'_> for MapKeyVisitor {
    type Value = MapKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar map key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(MapKey(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(MapKey(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(MapKey("null".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_json_keeps_number_shape() {
        let value = ConfigValue::from(json!({"port": 8080, "ratio": 0.5, "name": "svc"}));
        let map = value.as_object().unwrap();
        assert_eq!(map["port"], ConfigValue::Integer(8080));
        assert_eq!(map["ratio"], ConfigValue::Float(0.5));
        assert_eq!(map["name"].as_str(), Some("svc"));
    }

    #[test]
    fn test_serialize_skips_absent_entries() {
        let mut map = ConfigObject::new();
        map.insert("kept".to_owned(), ConfigValue::Null);
        map.insert("gone".to_owned(), ConfigValue::Absent);
        map.insert(
            "list".to_owned(),
            ConfigValue::Array(vec![ConfigValue::Integer(1), ConfigValue::Absent]),
        );

        let out = serde_json::to_string(&ConfigValue::Object(map)).unwrap();
        assert_eq!(out, r#"{"kept":null,"list":[1,null]}"#);
    }

    #[test]
    fn test_deserialize_from_json_text() {
        let value: ConfigValue =
            serde_json::from_str(r#"{"a": [1, 2.5, null, true], "b": {"c": "d"}}"#).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(
            map["a"],
            ConfigValue::Array(vec![
                ConfigValue::Integer(1),
                ConfigValue::Float(2.5),
                ConfigValue::Null,
                ConfigValue::Bool(true),
            ])
        );
        assert_eq!(map["b"].as_object().unwrap()["c"].as_str(), Some("d"));
    }

    #[test]
    fn test_deserialize_toml_datetime_as_string() {
        let value: ConfigValue = toml::from_str("started = 1979-05-27T07:32:00Z").unwrap();
        assert_eq!(
            value.as_object().unwrap()["started"].as_str(),
            Some("1979-05-27T07:32:00Z")
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!ConfigValue::Absent.is_truthy());
        assert!(!ConfigValue::Null.is_truthy());
        assert!(!ConfigValue::from("").is_truthy());
        assert!(!ConfigValue::Integer(0).is_truthy());
        assert!(!ConfigValue::Bool(false).is_truthy());
        assert!(ConfigValue::from("base.json").is_truthy());
        assert!(ConfigValue::Object(ConfigObject::new()).is_truthy());
    }

    #[test]
    fn test_display_string() {
        assert_eq!(ConfigValue::Null.to_display_string(), "");
        assert_eq!(ConfigValue::Absent.to_display_string(), "");
        assert_eq!(ConfigValue::Float(5000.0).to_display_string(), "5000");
        assert_eq!(ConfigValue::Float(1.5).to_display_string(), "1.5");
        assert_eq!(
            ConfigValue::from(json!({"a": [1, 2]})).to_display_string(),
            r#"{"a":[1,2]}"#
        );
    }
}
