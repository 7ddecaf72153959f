//! Error types for loading and executing templates.
//!
//! [`Error`] covers the four failure families of the cache:
//!
//! - Source errors: enumeration or read failures and logical name collisions.
//! - Syntax errors: malformed directives, cycles, unparsable template bodies.
//! - Lookup errors: executing a key the current generation does not contain.
//! - Execution errors: failures while rendering against caller data.
//!
//! Everything raised during [`Cache::load`](crate::Cache::load) aborts that
//! load and leaves the previous generation in place.

use std::path::PathBuf;

use tessera_directive::DirectiveError;
use thiserror::Error;

use crate::source::Locator;

/// Error type for all tessera operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Enumerating or reading a template source failed.
    #[error("failed to read {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two physical sources resolve to the same logical name or key.
    #[error("template collision for \"{name}\": {existing} and {conflicting}")]
    Collision {
        name: String,
        existing: Locator,
        conflicting: Locator,
    },

    /// A regular expression filter for a directory source is invalid.
    #[error("invalid template pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A directive references a name the source does not provide.
    #[error("template \"{referenced_by}\" depends on unknown template \"{name}\"")]
    MissingDependency { name: String, referenced_by: String },

    /// A directive statement in a template is malformed.
    #[error("template \"{name}\": {source}")]
    Directive {
        name: String,
        #[source]
        source: DirectiveError,
    },

    /// A template source is not valid UTF-8.
    #[error("template \"{name}\" is not valid UTF-8")]
    Encoding {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The extend/include graph loops back on itself.
    #[error("template dependency cycle: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// The rendering engine rejected a template body.
    #[error("template \"{name}\" failed to parse: {source}")]
    Syntax {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// No template is cached under the requested key.
    #[error("template {0} not found")]
    NotFound(String),

    /// Rendering a cached template failed.
    #[error("failed to execute template \"{key}\": {source}")]
    Render {
        key: String,
        #[source]
        source: minijinja::Error,
    },

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

/// Result type for tessera operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Source {
            path: path.into(),
            source,
        }
    }

    /// Returns true for lookup failures, which never affect cache validity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
