use std::fmt;

use thiserror::Error;

/// Boxed cause attached to parse failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration source could not be located.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// The reference that was searched for.
        path: String,
    },

    /// A declared, non-optional parent could not be located.
    #[error("Parent config file not found '{parent}' for {source_id}")]
    ParentNotFound {
        /// The raw parent reference.
        parent: String,
        /// Identity of the source that declared the parent.
        source_id: String,
    },

    /// A configuration source could not be read or parsed.
    #[error("Failed to parse configuration file: {path}")]
    ParseError {
        /// Path (or pseudo-path) of the source.
        path: String,
        /// Underlying parser or I/O error.
        #[source]
        source: BoxError,
    },

    /// An option or argument violated its contract.
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// Field or option that failed validation.
        field: String,
        /// Validation failure description.
        message: String,
    },

    /// A parent chain refers back to a source already in the chain.
    #[error("Parent chain cycle detected: {}", chain.join(" -> "))]
    ParentCycle {
        /// Source identities from the starting source to the repeated one.
        chain: Vec<String>,
    },

    /// An expression path was not found and had no default.
    #[error("Unresolved configuration variable: {expression}")]
    Unresolved {
        /// The raw expression between the braces.
        expression: String,
        /// The dot-path the expression resolved to.
        path: String,
    },

    /// A string kept producing expression syntax after the pass limit.
    #[error("Substitution in field '{field}' did not settle after {limit} passes")]
    SubstitutionLimit {
        /// Dot-path of the field being resolved.
        field: String,
        /// Number of passes attempted.
        limit: usize,
    },

    /// The environment substitution pass failed.
    #[error("Could not resolve environment variable. {source}")]
    EnvResolution {
        /// The failure raised inside the pass.
        #[source]
        source: Box<ConfigError>,
    },

    /// The local substitution pass failed.
    #[error("Could not resolve local variable. {source}")]
    LocalResolution {
        /// The failure raised inside the pass.
        #[source]
        source: Box<ConfigError>,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error taxonomy code reported for a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `FILE_NOT_FOUND`
    FileNotFound,
    /// `PARENT_NOT_FOUND`
    ParentNotFound,
    /// `PARSE_ERROR`
    Parse,
    /// `VALIDATION_ERROR`
    Validation,
    /// `RESOLUTION_ERROR`
    Resolution,
    /// `ENV_RESOLUTION_ERROR`
    EnvResolution,
    /// `LOCAL_RESOLUTION_ERROR`
    LocalResolution,
}

impl ErrorKind {
    /// The stable code string for this kind.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::ParentNotFound => "PARENT_NOT_FOUND",
            Self::Parse => "PARSE_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Resolution => "RESOLUTION_ERROR",
            Self::EnvResolution => "ENV_RESOLUTION_ERROR",
            Self::LocalResolution => "LOCAL_RESOLUTION_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl ConfigError {
    /// Shorthand for a [`ConfigError::ValidationError`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`ConfigError::ParseError`].
    pub fn parse(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ParseError {
            path: path.into(),
            source: source.into(),
        }
    }

    /// The taxonomy code for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::ParentNotFound { .. } => ErrorKind::ParentNotFound,
            Self::ParseError { .. } => ErrorKind::Parse,
            Self::ValidationError { .. } | Self::ParentCycle { .. } => ErrorKind::Validation,
            Self::Unresolved { .. } | Self::SubstitutionLimit { .. } => ErrorKind::Resolution,
            Self::EnvResolution { .. } => ErrorKind::EnvResolution,
            Self::LocalResolution { .. } => ErrorKind::LocalResolution,
        }
    }

    /// The file or field path this error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::FileNotFound { path }
            | Self::ParseError { path, .. }
            | Self::Unresolved { path, .. } => Some(path.as_str()),
            Self::ParentNotFound { source_id, .. } => Some(source_id.as_str()),
            Self::ValidationError { field, .. } | Self::SubstitutionLimit { field, .. } => {
                Some(field.as_str())
            },
            Self::ParentCycle { chain } => chain.last().map(String::as_str),
            Self::EnvResolution { source } | Self::LocalResolution { source } => source.path(),
        }
    }
}
