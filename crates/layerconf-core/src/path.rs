//! Deep access into a configuration tree by dotted path or segment list.
//!
//! Writes through [`put`] are destructive by contract: an intermediate node
//! that is absent, a scalar or an array is replaced with a fresh empty
//! object so the write can proceed. Whatever was stored there is discarded.

use crate::value::{ConfigObject, ConfigValue};

/// Separator between segments of a dotted path.
pub const PATH_SEPARATOR: char = '.';

/// Anything that can be split into path segments.
///
/// Strings are split on [`PATH_SEPARATOR`]; slices and vectors are used
/// segment-for-segment.
pub trait PathSegments {
    /// The ordered segments of this path.
    fn segments(&self) -> Vec<&str>;
}

impl PathSegments for str {
    fn segments(&self) -> Vec<&str> {
        self.split(PATH_SEPARATOR).collect()
    }
}

impl PathSegments for String {
    fn segments(&self) -> Vec<&str> {
        self.as_str().segments()
    }
}

impl PathSegments for [&str] {
    fn segments(&self) -> Vec<&str> {
        self.to_vec()
    }
}

impl<const N: usize> PathSegments for [&str; N] {
    fn segments(&self) -> Vec<&str> {
        self.to_vec()
    }
}

impl PathSegments for [String] {
    fn segments(&self) -> Vec<&str> {
        self.iter().map(String::as_str).collect()
    }
}

impl PathSegments for Vec<String> {
    fn segments(&self) -> Vec<&str> {
        self.as_slice().segments()
    }
}

impl PathSegments for Vec<&str> {
    fn segments(&self) -> Vec<&str> {
        self.clone()
    }
}

impl<T: PathSegments + ?Sized> PathSegments for &T {
    fn segments(&self) -> Vec<&str> {
        (**self).segments()
    }
}

/// A successful deep read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pick<'a> {
    /// The object directly containing the value.
    pub container: &'a ConfigObject,
    /// The final path segment.
    pub key: &'a str,
    /// The value found. Never [`ConfigValue::Absent`]; may be `Null`.
    pub value: &'a ConfigValue,
}

/// Read the value at `path`.
///
/// Every intermediate node must be an object. Traversal through a scalar,
/// array, null or missing node yields `None`, as does an absent final value.
/// A present `null` is found.
#[must_use]
pub fn pick<'a, P: PathSegments + ?Sized>(tree: &'a ConfigObject, path: &P) -> Option<Pick<'a>> {
    let segments = path.segments();
    let (last, parents) = segments.split_last()?;
    if segments.first().is_some_and(|first| first.is_empty()) {
        return None;
    }

    let mut container = tree;
    for segment in parents {
        container = container.get(*segment)?.as_object()?;
    }

    let (key, value) = container.get_key_value(*last)?;
    if value.is_absent() {
        return None;
    }

    Some(Pick {
        container,
        key: key.as_str(),
        value,
    })
}

/// Shorthand for `pick(tree, path).map(|p| p.value)`.
#[must_use]
pub fn get<'a, P: PathSegments + ?Sized>(tree: &'a ConfigObject, path: &P) -> Option<&'a ConfigValue> {
    pick(tree, path).map(|found| found.value)
}

/// Write `value` at `path`, creating (or replacing) intermediate objects.
///
/// The terminal segment is set verbatim, `Null` and `Absent` included. An
/// empty path (or one whose first segment is empty) leaves the tree
/// untouched.
pub fn put<P: PathSegments + ?Sized>(tree: &mut ConfigObject, path: &P, value: ConfigValue) {
    let segments = path.segments();
    if segments.first().is_none_or(|first| first.is_empty()) {
        return;
    }
    put_segments(tree, &segments, value);
}

fn put_segments(container: &mut ConfigObject, segments: &[&str], value: ConfigValue) {
    match segments {
        [] => {},
        [last] => {
            container.insert((*last).to_owned(), value);
        },
        [head, rest @ ..] => {
            let slot = container.entry((*head).to_owned()).or_default();
            if let ConfigValue::Object(child) = slot {
                put_segments(child, rest, value);
            } else {
                let mut child = ConfigObject::new();
                put_segments(&mut child, rest, value);
                *slot = ConfigValue::Object(child);
            }
        },
    }
}

/// Remove and return the value at `path`, if the path leads to one.
pub fn remove<P: PathSegments + ?Sized>(tree: &mut ConfigObject, path: &P) -> Option<ConfigValue> {
    let segments = path.segments();
    let (last, parents) = segments.split_last()?;

    let mut container = tree;
    for segment in parents {
        container = container.get_mut(*segment)?.as_object_mut()?;
    }
    container.remove(*last)
}
