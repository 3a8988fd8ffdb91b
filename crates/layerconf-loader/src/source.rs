//! Reading configuration files and locating parents on disk.

use std::io;
use std::path::{Path, PathBuf};

use layerconf_core::{ConfigError, ConfigResult, ParentLookup, Source};
use tracing::{debug, info};

use crate::format::ConfigFormat;
use crate::search::resolve_path;

/// Maximum allowed config file size (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Read a file's contents, enforcing [`MAX_CONFIG_FILE_SIZE`].
///
/// # Errors
///
/// - [`ConfigError::FileNotFound`] if the file does not exist.
/// - [`ConfigError::ParseError`] for any other read failure.
/// - A validation error if the file exceeds the size limit.
pub fn read_file(path: &Path) -> ConfigResult<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        },
        Err(e) => return Err(ConfigError::parse(path.display().to_string(), e)),
    };

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::validation(
            path.display().to_string(),
            format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        ));
    }

    Ok(content)
}

/// Read and parse the file at `path` into a [`Source`].
///
/// The source identity is the canonical path when it can be determined.
///
/// # Errors
///
/// See [`read_file`] and [`ConfigFormat::parse`].
pub fn read_source(path: &Path) -> ConfigResult<Source<String>> {
    let id = std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string();
    let content = read_file(path)?;
    let tree = ConfigFormat::from_path(path).parse(&content, &id)?;
    info!(path = %id, keys = tree.len(), "loaded configuration file");
    Ok(Source::new(id, tree))
}

/// Filesystem-backed [`ParentLookup`].
///
/// Top-level references are searched in the base directories (the working
/// directory if none are configured). Parent references are searched in
/// the directory of the declaring file, then the working directory, then
/// the base directories.
#[derive(Debug, Clone)]
pub struct FileLookup {
    basedirs: Vec<PathBuf>,
    cwd: PathBuf,
}

impl FileLookup {
    /// Create a lookup, capturing the current working directory.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the working directory is unavailable.
    pub fn new(basedirs: Vec<PathBuf>) -> ConfigResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::validation("cwd", e.to_string()))?;
        Ok(Self::with_cwd(basedirs, cwd))
    }

    /// Create a lookup with an explicit working directory.
    #[must_use]
    pub fn with_cwd(basedirs: Vec<PathBuf>, cwd: PathBuf) -> Self {
        Self { basedirs, cwd }
    }

    /// Directories searched for top-level references.
    #[must_use]
    pub fn source_dirs(&self) -> Vec<PathBuf> {
        if self.basedirs.is_empty() {
            vec![self.cwd.clone()]
        } else {
            self.basedirs.clone()
        }
    }

    /// Directories searched for a parent declared in the file `from`.
    #[must_use]
    pub fn parent_dirs(&self, from: &Path) -> Vec<PathBuf> {
        from.parent()
            .map(Path::to_path_buf)
            .into_iter()
            .chain(std::iter::once(self.cwd.clone()))
            .chain(self.basedirs.iter().cloned())
            .collect()
    }
}

impl ParentLookup for FileLookup {
    type Id = String;

    fn load(&self, reference: &str) -> ConfigResult<Option<Source<String>>> {
        resolve_path(reference, &self.source_dirs())
            .map(|path| read_source(&path))
            .transpose()
    }

    fn load_parent(&self, from: &String, reference: &str) -> ConfigResult<Option<Source<String>>> {
        let dirs = self.parent_dirs(Path::new(from));
        debug!(from = %from, reference, "searching for parent configuration");
        resolve_path(reference, &dirs)
            .map(|path| read_source(&path))
            .transpose()
    }
}
