//! Parent-chain inheritance.
//!
//! A source whose parent field names another source inherits from it: the
//! parent's own chain is resolved first, then the child is merged on top and
//! the parent field is removed. Locating sources is delegated to a
//! [`ParentLookup`]; the walk itself is iterative and guarded by a visited
//! set, so a chain that revisits a source fails with
//! [`ConfigError::ParentCycle`].

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use regex::Regex;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::merge_configs;
use crate::value::{ConfigObject, ConfigValue};

/// A located configuration source.
#[derive(Debug, Clone, PartialEq)]
pub struct Source<I> {
    /// Stable identity, used for cycle detection and error messages.
    pub id: I,
    /// The raw, parsed tree.
    pub tree: ConfigObject,
}

impl<I> Source<I> {
    /// Create a new source.
    pub fn new(id: I, tree: ConfigObject) -> Self {
        Self { id, tree }
    }
}

/// Locates configuration sources by reference.
pub trait ParentLookup {
    /// Identity of a located source.
    type Id: Clone + Eq + Hash + fmt::Display;

    /// Locate a top-level source.
    ///
    /// Returns `Ok(None)` if nothing matches `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if a matching source exists but cannot be loaded.
    fn load(&self, reference: &str) -> ConfigResult<Option<Source<Self::Id>>>;

    /// Locate the parent named by `reference`, declared in source `from`.
    ///
    /// Returns `Ok(None)` if nothing matches `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if a matching source exists but cannot be loaded.
    fn load_parent(&self, from: &Self::Id, reference: &str)
    -> ConfigResult<Option<Source<Self::Id>>>;
}

/// References that may be missing without failing resolution.
///
/// A pattern matches on string equality, or, if it contains `*`, as an
/// unanchored glob where `*` stays within one `/`-separated component and
/// `**` crosses components.
#[derive(Debug, Clone, Default)]
pub struct OptionalPatterns {
    exact: Vec<String>,
    globs: Vec<Regex>,
}

impl OptionalPatterns {
    /// Compile `patterns`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a glob does not compile.
    pub fn new<I, S>(patterns: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.contains('*') {
                let regex = Regex::new(&glob_to_regex(pattern))
                    .map_err(|e| ConfigError::validation("optional", e.to_string()))?;
                compiled.globs.push(regex);
            }
            compiled.exact.push(pattern.to_owned());
        }
        Ok(compiled)
    }

    /// Whether `reference` is optional.
    #[must_use]
    pub fn matches(&self, reference: &str) -> bool {
        self.exact.iter().any(|p| p == reference)
            || self.globs.iter().any(|re| re.is_match(reference))
    }

    /// Whether no patterns were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

fn glob_to_regex(pattern: &str) -> String {
    pattern
        .split("**")
        .map(|part| {
            part.split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join("[^/]*")
        })
        .collect::<Vec<_>>()
        .join(".*")
}

/// Resolves sources through their parent chains.
#[derive(Debug)]
pub struct ParentResolver<'a, L: ?Sized> {
    lookup: &'a L,
    parent_field: Option<&'a str>,
    optional: &'a OptionalPatterns,
}

impl<'a, L: ParentLookup + ?Sized> ParentResolver<'a, L> {
    /// Create a resolver. A `None` or empty `parent_field` disables
    /// inheritance.
    pub fn new(lookup: &'a L, parent_field: Option<&'a str>, optional: &'a OptionalPatterns) -> Self {
        Self {
            lookup,
            parent_field: parent_field.filter(|field| !field.is_empty()),
            optional,
        }
    }

    /// Locate `reference` and resolve its parent chain.
    ///
    /// A missing optional source resolves to an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] for a missing required source,
    /// plus any error of [`Self::resolve_chain`].
    pub fn resolve_source(&self, reference: &str) -> ConfigResult<ConfigObject> {
        match self.lookup.load(reference)? {
            Some(source) => self.resolve_chain(source),
            None if self.optional.matches(reference) => {
                debug!(reference, "optional configuration source not found");
                Ok(ConfigObject::new())
            },
            None => Err(ConfigError::FileNotFound {
                path: reference.to_owned(),
            }),
        }
    }

    /// Fold `source` with its ancestors, parent before child.
    ///
    /// A source without a parent reference (or with a falsy one) is returned
    /// as-is. Every merged level has the parent field removed.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ParentNotFound`] for a missing required parent.
    /// - [`ConfigError::ParentCycle`] if the chain revisits a source.
    /// - A validation error for a non-string parent reference.
    /// - Any error raised by the lookup.
    pub fn resolve_chain(&self, source: Source<L::Id>) -> ConfigResult<ConfigObject> {
        let Some(field) = self.parent_field else {
            return Ok(source.tree);
        };

        let mut visited: HashSet<L::Id> = HashSet::new();
        let mut chain: Vec<String> = Vec::new();
        // Child first; the flag marks levels that declared a parent.
        let mut levels: Vec<(ConfigObject, bool)> = Vec::new();
        let mut current = source;

        loop {
            chain.push(current.id.to_string());
            if !visited.insert(current.id.clone()) {
                return Err(ConfigError::ParentCycle { chain });
            }

            let Some(reference) = parent_reference(&current, field)? else {
                levels.push((current.tree, false));
                break;
            };

            let parent = self.lookup.load_parent(&current.id, &reference)?;
            let Source { id, tree } = current;
            levels.push((tree, true));

            match parent {
                Some(found) => {
                    debug!(source = %id, parent = %found.id, "following parent reference");
                    current = found;
                },
                None if self.optional.matches(&reference) => {
                    debug!(source = %id, parent = %reference, "optional parent not found");
                    break;
                },
                None => {
                    return Err(ConfigError::ParentNotFound {
                        parent: reference,
                        source_id: id.to_string(),
                    });
                },
            }
        }

        let depth = levels.len();
        let mut resolved: Option<ConfigObject> = None;
        for (tree, has_parent) in levels.into_iter().rev() {
            resolved = Some(if has_parent {
                let base = resolved.take().unwrap_or_default();
                let mut merged = merge_configs([&base, &tree]);
                merged.remove(field);
                merged
            } else {
                tree
            });
        }

        debug!(depth, "parent chain resolved");
        Ok(resolved.unwrap_or_default())
    }
}

fn parent_reference<I: fmt::Display>(source: &Source<I>, field: &str) -> ConfigResult<Option<String>> {
    match source.tree.get(field) {
        Some(ConfigValue::String(reference)) if !reference.is_empty() => Ok(Some(reference.clone())),
        Some(value) if value.is_truthy() => Err(ConfigError::validation(
            field,
            format!(
                "parent reference in {} must be a string, got {}",
                source.id,
                value.type_name()
            ),
        )),
        _ => Ok(None),
    }
}

/// Resolve every reference through its parent chain and merge the results
/// left to right.
///
/// # Errors
///
/// Returns the first failure of [`ParentResolver::resolve_source`].
pub fn resolve_sources<L, S>(
    lookup: &L,
    references: &[S],
    parent_field: Option<&str>,
    optional: &OptionalPatterns,
) -> ConfigResult<ConfigObject>
where
    L: ParentLookup + ?Sized,
    S: AsRef<str>,
{
    let resolver = ParentResolver::new(lookup, parent_field, optional);
    let trees = references
        .iter()
        .map(|reference| resolver.resolve_source(reference.as_ref()))
        .collect::<ConfigResult<Vec<_>>>()?;
    Ok(merge_configs(&trees))
}
