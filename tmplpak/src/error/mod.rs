//! Error types and error handling
//!
//! Lookup failures are reported as [`LoadError`]. Callers that only care about
//! *what kind* of failure happened should match on [`LoadError::kind`] rather
//! than on message text.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error produced by a custom template source
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned when a named template cannot be produced
///
/// The type is `Clone` so a remembered failure can be handed out again; every
/// underlying error is kept behind an [`Arc`].
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// No template config is registered under this name
    #[error("template not found: {0}")]
    NotFound(String),

    /// The config for this name lists no files
    #[error("template '{0}' has no files configured")]
    NoFiles(String),

    /// A template file could not be read
    #[error("failed to read template file '{}': {source}", path.display())]
    Read {
        /// Fully resolved file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The template engine rejected the template source
    #[error("failed to compile template '{name}': {source}")]
    Compile {
        /// Logical template name
        name: String,
        /// Underlying engine error
        #[source]
        source: Arc<minijinja::Error>,
    },

    /// A custom template source failed
    #[error("template source failed: {0}")]
    Source(#[source] Arc<dyn std::error::Error + Send + Sync + 'static>),
}

/// Coarse classification of a [`LoadError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    /// The name is not registered with the loader
    NotFound,
    /// The name is registered but compiling it failed
    Compile,
}

impl LoadError {
    /// Wrap an arbitrary error raised by a custom template source
    pub fn custom(err: impl Into<BoxError>) -> Self {
        Self::Source(Arc::from(err.into()))
    }

    pub(crate) fn read(path: PathBuf, err: std::io::Error) -> Self {
        Self::Read {
            path,
            source: Arc::new(err),
        }
    }

    pub(crate) fn compile(name: &str, err: minijinja::Error) -> Self {
        Self::Compile {
            name: name.to_string(),
            source: Arc::new(err),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> LoadErrorKind {
        match self {
            Self::NotFound(_) => LoadErrorKind::NotFound,
            Self::NoFiles(_) | Self::Read { .. } | Self::Compile { .. } | Self::Source(_) => {
                LoadErrorKind::Compile
            }
        }
    }

    /// True when the name was never registered
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), LoadErrorKind::NotFound)
    }
}

/// Errors raised while executing a compiled template
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template engine failed during evaluation
    #[error("template render error: {0}")]
    Template(#[from] minijinja::Error),

    /// Writing the output failed
    #[error("failed to write template output: {0}")]
    Io(#[from] std::io::Error),

    /// No sub-template or block with this name exists
    #[error("sub-template not found: {0}")]
    MissingSubTemplate(String),
}
