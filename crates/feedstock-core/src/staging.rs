//! Staging of the gmsh Python bindings into a conda site-packages tree.
//!
//! Replays what `pip install gmsh` would leave behind, minus the wheel:
//! the single-module binding copied verbatim plus a `gmsh-<version>.dist-info`
//! directory holding a rendered `METADATA`, so pip and importlib.metadata
//! recognize the install.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::digest::Digest;
use crate::error::{FeedstockError, Result};
use crate::metadata::{self, MetadataSubstitutions};

/// Pattern for the static version assignment inside `api/gmsh.py`.
const API_VERSION_PATTERN: &str = r#"(?m)^\s*GMSH_API_VERSION\s*=\s*"([^"]+)""#;

/// Filesystem locations the stager reads from and writes to.
///
/// Every path is a pure function of the checkout root and the target
/// site-packages directory; nothing here touches the environment.
#[derive(Debug, Clone)]
pub struct StagePaths {
    repo_root: PathBuf,
    site_packages: PathBuf,
}

impl StagePaths {
    /// Build paths from an explicit checkout root and site-packages dir.
    pub fn new(repo_root: impl AsRef<Path>, site_packages: impl AsRef<Path>) -> Self {
        Self {
            repo_root: repo_root.as_ref().to_path_buf(),
            site_packages: site_packages.as_ref().to_path_buf(),
        }
    }

    /// The single-module Python binding, `api/gmsh.py`.
    pub fn src_module(&self) -> PathBuf {
        self.repo_root.join("api").join("gmsh.py")
    }

    /// The PyPI long description, `utils/pypi/README.gmsh.rst`.
    pub fn src_readme(&self) -> PathBuf {
        self.repo_root.join("utils").join("pypi").join("README.gmsh.rst")
    }

    /// The metadata template, `utils/pypi/METADATA.in`.
    pub fn src_metadata_template(&self) -> PathBuf {
        self.repo_root.join("utils").join("pypi").join("METADATA.in")
    }

    /// Where the module lands: `<site-packages>/gmsh.py`.
    pub fn dest_module(&self) -> PathBuf {
        self.site_packages.join("gmsh.py")
    }

    /// The version-named metadata directory, `gmsh-<version>.dist-info`.
    pub fn dist_info(&self, version: &str) -> PathBuf {
        self.site_packages.join(format!("gmsh-{version}.dist-info"))
    }

    /// Where the rendered metadata lands: `gmsh-<version>.dist-info/METADATA`.
    pub fn dest_metadata(&self, version: &str) -> PathBuf {
        self.dist_info(version).join("METADATA")
    }

    fn check_repo_root(&self) {
        if !self.repo_root.join(".git").is_dir() {
            warn!(
                root = ?self.repo_root,
                "no .git directory here; expected a gmsh checkout root. \
                 Pass --repo-root or change into the checkout before staging"
            );
        }
    }
}

/// Everything `stage-module` produced, for reporting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageReport {
    /// Version extracted from the module source.
    pub version: String,

    /// Hex SHA-256 of the staged module bytes.
    pub module_digest: String,

    /// Where the module was copied.
    pub dest_module: PathBuf,

    /// Where the rendered METADATA was written.
    pub dest_metadata: PathBuf,
}

/// Extract the static `GMSH_API_VERSION` assignment from the module text.
///
/// `module_path` only labels the error when no assignment is present.
pub fn extract_api_version(module_text: &str, module_path: &Path) -> Result<String> {
    let pattern = Regex::new(API_VERSION_PATTERN).expect("version pattern is valid");
    pattern
        .captures(module_text)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| FeedstockError::ApiVersionNotFound {
            path: module_path.to_path_buf(),
        })
}

/// Stage the Python module and its metadata into the site-packages tree.
///
/// Steps, each fatal on failure, none rolled back:
/// 1. extract the version from the module source,
/// 2. create the version-named dist-info directory (idempotent),
/// 3. copy the module bytes verbatim and verify the destination digest,
/// 4. render METADATA from the template and write it UTF-8.
pub fn stage_module(paths: &StagePaths) -> Result<StageReport> {
    paths.check_repo_root();

    let src_module = paths.src_module();
    let module_bytes = fs::read(&src_module).map_err(|e| FeedstockError::io(&src_module, e))?;
    let module_text = String::from_utf8_lossy(&module_bytes);
    let version = extract_api_version(&module_text, &src_module)?;
    info!(version = %version, module = ?src_module, "extracted API version");

    let dist_info = paths.dist_info(&version);
    fs::create_dir_all(&dist_info).map_err(|e| FeedstockError::io(&dist_info, e))?;
    info!(dist_info = ?dist_info, "metadata directory ready");

    // Copy byte-for-byte; a decode/encode round trip could drift the contents.
    let dest_module = paths.dest_module();
    fs::write(&dest_module, &module_bytes).map_err(|e| FeedstockError::io(&dest_module, e))?;
    let digest = Digest::compute(&module_bytes);
    verify_copy(&dest_module, &digest)?;
    info!(dest = ?dest_module, digest = %digest, "copied module");

    let readme_path = paths.src_readme();
    let long_description =
        fs::read_to_string(&readme_path).map_err(|e| FeedstockError::io(&readme_path, e))?;
    let template_path = paths.src_metadata_template();
    let template =
        fs::read_to_string(&template_path).map_err(|e| FeedstockError::io(&template_path, e))?;
    let subs = MetadataSubstitutions {
        version: version.clone(),
        long_description,
    };
    let rendered = metadata::render(&template, &template_path, &subs)?;

    let dest_metadata = paths.dest_metadata(&version);
    fs::write(&dest_metadata, rendered).map_err(|e| FeedstockError::io(&dest_metadata, e))?;
    info!(dest = ?dest_metadata, "wrote METADATA");

    Ok(StageReport {
        version,
        module_digest: digest.to_hex(),
        dest_module,
        dest_metadata,
    })
}

/// Read the destination back and check it matches the staged digest.
fn verify_copy(dest: &Path, expected: &Digest) -> Result<()> {
    let written = fs::read(dest).map_err(|e| FeedstockError::io(dest, e))?;
    let actual = Digest::compute(&written);
    if actual != *expected {
        return Err(FeedstockError::DigestMismatch {
            path: dest.to_path_buf(),
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(())
}
