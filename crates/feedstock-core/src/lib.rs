//! Maintenance tooling for the conda-forge gmsh feedstock.
//!
//! Two build-time utilities back the `feedstock` binary:
//!
//! - a selector gate that keeps the `python-gmsh` output's occt skip
//!   selector aligned with the rendered CI build matrix, so the recipe
//!   never silently skips the Python bindings on every config,
//! - a staging step that installs the single-module Python binding and its
//!   wheel metadata into the conda-build site-packages tree.
//!
//! The recipe side works on raw text (selectors live in YAML comments); the
//! CI configs are parsed as YAML; staging is plain filesystem work with a
//! digest check on the copied module.

pub mod digest;
pub mod error;
pub mod matrix;
pub mod metadata;
pub mod recipe;
pub mod staging;
pub mod telemetry;

// Re-export key types
pub use digest::Digest;
pub use error::{FeedstockError, Result};
pub use matrix::MatrixScan;
pub use metadata::MetadataSubstitutions;
pub use recipe::{find_output_block, find_skip_selector, SkipSelector};
pub use staging::{StagePaths, StageReport};
pub use telemetry::init_tracing;
