//! Locating configuration files by reference.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::format::{EXTENSIONS, has_supported_extension};

/// Candidate paths for `reference`, in lookup order.
///
/// A reference with a supported extension is taken as-is; otherwise each
/// supported extension is appended in turn. Absolute references ignore
/// `basedirs`; relative ones are joined with each base directory.
#[must_use]
pub fn candidates(reference: &str, basedirs: &[PathBuf]) -> Vec<PathBuf> {
    if reference.is_empty() {
        return Vec::new();
    }

    let variations: Vec<PathBuf> = if has_supported_extension(Path::new(reference)) {
        vec![PathBuf::from(reference)]
    } else {
        EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{reference}.{ext}")))
            .collect()
    };

    if Path::new(reference).is_absolute() {
        return variations;
    }

    basedirs
        .iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| variations.iter().map(move |variation| dir.join(variation)))
        .collect()
}

/// The first existing file among the [`candidates`] for `reference`.
#[must_use]
pub fn resolve_path(reference: &str, basedirs: &[PathBuf]) -> Option<PathBuf> {
    let found = candidates(reference, basedirs)
        .into_iter()
        .find(|candidate| candidate.is_file());
    match &found {
        Some(path) => debug!(reference, path = %path.display(), "resolved configuration path"),
        None => debug!(reference, "no configuration file matched"),
    }
    found
}
