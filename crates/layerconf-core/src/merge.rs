//! Deep merge of configuration trees.
//!
//! - Objects merge recursively per key, later trees winning on conflict.
//! - Arrays are atomic: an array on either side replaces the other value
//!   wholesale, with no element-wise merge.
//! - Scalars, nulls and mismatched types take the later value.
//! - An `Absent` value never overwrites a key that is already present.

use crate::value::{ConfigObject, ConfigValue};

/// Merge `trees` left to right into a fresh object.
///
/// An empty input yields an empty object. The inputs are not modified.
#[must_use]
pub fn merge_configs<'a, I>(trees: I) -> ConfigObject
where
    I: IntoIterator<Item = &'a ConfigObject>,
{
    let mut merged = ConfigObject::new();
    for tree in trees {
        deep_merge(&mut merged, tree);
    }
    merged
}

/// Recursively deep-merge `overlay` into `base`.
pub fn deep_merge(base: &mut ConfigObject, overlay: &ConfigObject) {
    for (key, overlay_val) in overlay {
        if let Some(base_val) = base.get_mut(key) {
            merge_value(base_val, overlay_val);
        } else {
            base.insert(key.clone(), overlay_val.clone());
        }
    }
}

fn merge_value(base: &mut ConfigValue, overlay: &ConfigValue) {
    match (base, overlay) {
        (_, ConfigValue::Absent) => {},
        (ConfigValue::Object(base_map), ConfigValue::Object(overlay_map)) => {
            deep_merge(base_map, overlay_map);
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}
