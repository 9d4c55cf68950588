//! Error taxonomy for the feedstock tools.
//!
//! Lookup and parse failures carry the names they searched for; filesystem
//! failures carry the path that produced them. Messages are written for CI
//! logs, where the operator fixing the recipe sees nothing else.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the feedstock maintenance tools.
#[derive(Debug, Error)]
pub enum FeedstockError {
    /// No output block matched the requested name in the recipe.
    #[error("could not find the '{output}' output block in the recipe")]
    OutputBlockNotFound { output: String },

    /// More than one declaration line matched the requested output name.
    #[error("found {count} output blocks matching '{output}' in the recipe, expected exactly one")]
    OutputBlockAmbiguous { output: String, count: usize },

    /// The output block carries no recognizable skip selector.
    #[error("could not find a skip selector comparing {key} in the output block")]
    SkipSelectorNotFound { key: String },

    /// The selected version appears in no rendered CI config.
    #[error(
        "no CI config uses {key}={selected}; '{output}' would not build. \
         Update the selector. Available {key} values: {available:?}"
    )]
    SelectorUnsatisfied {
        key: String,
        output: String,
        selected: String,
        available: Vec<String>,
    },

    /// The module source carries no static version assignment.
    #[error("could not parse GMSH_API_VERSION from {path:?}")]
    ApiVersionNotFound { path: PathBuf },

    /// The metadata template references a placeholder this tool does not know.
    #[error(
        "unsupported substitution in template {template:?}: {placeholder}. \
         This likely means a new template variable was added upstream and \
         should be implemented here."
    )]
    UnsupportedPlaceholder {
        template: PathBuf,
        placeholder: String,
    },

    /// The metadata template contains a dangling or unterminated placeholder.
    #[error("invalid placeholder in template {template:?} at line {line}, column {column}")]
    MalformedTemplate {
        template: PathBuf,
        line: usize,
        column: usize,
    },

    /// No target site-packages directory was supplied.
    #[error(
        "the target site-packages directory is not set. Run under conda-build \
         or point SP_DIR (or --site-packages) at the site-packages directory"
    )]
    SitePackagesUnset,

    /// Destination bytes differ from the staged source.
    #[error("digest mismatch after staging {path:?}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A rendered CI config failed to parse as YAML.
    #[error("failed to parse CI config {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Filesystem failure, tagged with the path involved.
    #[error("{path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FeedstockError {
    /// Tag an I/O error with the path that produced it.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for feedstock operations.
pub type Result<T> = std::result::Result<T, FeedstockError>;
