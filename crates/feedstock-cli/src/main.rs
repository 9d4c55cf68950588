//! feedstock - maintenance commands for the conda-forge gmsh feedstock
//!
//! ## Commands
//!
//! - `ensure-selector`: verify the python-gmsh skip selector still matches
//!   an occt version in the rendered CI configs
//! - `stage-module`: copy api/gmsh.py into site-packages and render the
//!   wheel METADATA next to it
//!
//! `ensure-selector` runs as a CI gate from the feedstock root;
//! `stage-module` runs inside conda-build from the gmsh checkout root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use feedstock_core::{
    find_output_block, find_skip_selector, init_tracing, matrix, staging, FeedstockError,
    StagePaths,
};

#[derive(Parser)]
#[command(name = "feedstock")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Maintenance commands for the conda-forge gmsh feedstock", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the selected occt version still appears in the CI build matrix
    EnsureSelector {
        /// Path to the recipe document
        #[arg(long, default_value = "recipe/meta.yaml")]
        recipe: PathBuf,

        /// Directory holding the rendered CI configs
        #[arg(long, default_value = ".ci_support")]
        configs_dir: PathBuf,

        /// Filename prefix of the configs to scan
        #[arg(long, default_value = "linux_64")]
        config_prefix: String,

        /// Recipe output guarded by the skip selector
        #[arg(long, default_value = "python-gmsh")]
        output: String,

        /// Build-matrix key the selector compares against
        #[arg(long, default_value = "occt")]
        key: String,

        /// Print the result as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Stage api/gmsh.py and its wheel metadata into site-packages
    StageModule {
        /// Path to the gmsh checkout root
        #[arg(long, default_value = ".")]
        repo_root: PathBuf,

        /// Target site-packages directory (conda-build sets SP_DIR)
        #[arg(long, env = "SP_DIR")]
        site_packages: Option<PathBuf>,

        /// Print the result as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.log_json, level);

    match cli.command {
        Commands::EnsureSelector {
            recipe,
            configs_dir,
            config_prefix,
            output,
            key,
            json,
        } => cmd_ensure_selector(&recipe, &configs_dir, &config_prefix, &output, &key, json),
        Commands::StageModule {
            repo_root,
            site_packages,
            json,
        } => cmd_stage_module(&repo_root, site_packages, json),
    }
}

/// What `ensure-selector` learned, for `--json` output.
#[derive(Debug, Clone, Serialize)]
struct SelectorReport {
    output: String,
    key: String,
    selected: String,
    found_in: Option<PathBuf>,
    values_seen: Vec<String>,
}

/// Check that the recipe's skip selector matches the rendered CI matrix
fn cmd_ensure_selector(
    recipe: &Path,
    configs_dir: &Path,
    config_prefix: &str,
    output: &str,
    key: &str,
    json: bool,
) -> Result<()> {
    let recipe_text = fs::read_to_string(recipe)
        .with_context(|| format!("Failed to read recipe: {:?}", recipe))?;

    let block = find_output_block(&recipe_text, output)
        .with_context(|| format!("while scanning {:?}", recipe))?;
    if !json {
        println!("{} output block:\n{}\n", output, block);
    }

    let selector = find_skip_selector(&block, key)
        .with_context(|| format!("while scanning {:?}", recipe))?;
    if !json {
        println!("Detected skip line:\n{}\n", selector.line);
        println!("Selected {} for {}: {}\n", key, output, selector.version);
    }
    info!(key = %key, selected = %selector.version, "extracted skip selector");

    let scan = matrix::scan_for_version(configs_dir, config_prefix, key, &selector.version)?;

    let report = SelectorReport {
        output: output.to_string(),
        key: key.to_string(),
        selected: selector.version.clone(),
        found_in: scan.found_in.clone(),
        values_seen: scan.values_seen.clone(),
    };

    match &scan.found_in {
        Some(path) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Found {}={} in {:?}\n", key, selector.version, path);
                println!(
                    "OK: CI includes the selected {}; {} will be built.",
                    key, output
                );
            }
            Ok(())
        }
        None => Err(FeedstockError::SelectorUnsatisfied {
            key: key.to_string(),
            output: output.to_string(),
            selected: selector.version,
            available: scan.available(),
        }
        .into()),
    }
}

/// Stage the Python module and its wheel metadata into site-packages
fn cmd_stage_module(repo_root: &Path, site_packages: Option<PathBuf>, json: bool) -> Result<()> {
    let site_packages = site_packages.ok_or(FeedstockError::SitePackagesUnset)?;
    let paths = StagePaths::new(repo_root, &site_packages);

    if !json {
        println!("Staging the Python module into the site-packages directory...");
    }

    let report = staging::stage_module(&paths)
        .with_context(|| format!("Failed to stage from {:?}", repo_root))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Extracted version {} from {:?}.",
            report.version,
            paths.src_module()
        );
        println!("Copied {:?} to {:?}", paths.src_module(), report.dest_module);
        println!("Wrote METADATA to {:?}", report.dest_metadata);
        println!("Module digest: {}", report.module_digest);
        println!("Successfully staged the module into the site-packages directory.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const META_YAML: &str = r#"outputs:
  - name: gmsh
    build:
      script: build_gmsh.sh

  - name: python-gmsh
    build:
      skip: true  # [occt != "7.8.1"]
    requirements:
      run:
        - gmsh
"#;

    fn feedstock(config_body: &str) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let recipe_dir = dir.path().join("recipe");
        fs::create_dir_all(&recipe_dir).unwrap();
        let recipe = recipe_dir.join("meta.yaml");
        fs::write(&recipe, META_YAML).unwrap();

        let ci_support = dir.path().join(".ci_support");
        fs::create_dir_all(&ci_support).unwrap();
        fs::write(ci_support.join("linux_64_.yaml"), config_body).unwrap();

        (dir, recipe, ci_support)
    }

    #[test]
    fn test_ensure_selector_passes_with_matching_config() {
        let (_dir, recipe, ci_support) = feedstock("occt:\n- 7.8.1\n");
        let result = cmd_ensure_selector(
            &recipe,
            &ci_support,
            "linux_64",
            "python-gmsh",
            "occt",
            false,
        );
        assert!(result.is_ok(), "gate should pass: {result:?}");
    }

    #[test]
    fn test_ensure_selector_reports_alternatives_on_miss() {
        let (_dir, recipe, ci_support) = feedstock("occt:\n- 7.7.2\n");
        let err = cmd_ensure_selector(
            &recipe,
            &ci_support,
            "linux_64",
            "python-gmsh",
            "occt",
            false,
        )
        .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("occt=7.8.1"));
        assert!(msg.contains("Update the selector"));
        assert!(msg.contains("7.7.2"));
    }

    #[test]
    fn test_ensure_selector_misses_on_empty_matrix_dir() {
        let (dir, recipe, _ci_support) = feedstock("occt:\n- 7.8.1\n");
        let err = cmd_ensure_selector(
            &recipe,
            &dir.path().join("no_such_dir"),
            "linux_64",
            "python-gmsh",
            "occt",
            false,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("no CI config uses occt=7.8.1"));
    }

    #[test]
    fn test_stage_module_requires_site_packages() {
        let err = cmd_stage_module(Path::new("."), None, false).unwrap_err();
        assert!(format!("{err:#}").contains("SP_DIR"));
    }

    #[test]
    fn test_stage_module_end_to_end() {
        let checkout = tempfile::tempdir().unwrap();
        let api = checkout.path().join("api");
        fs::create_dir_all(&api).unwrap();
        fs::write(api.join("gmsh.py"), "GMSH_API_VERSION = \"4.13.1\"\n").unwrap();
        let pypi = checkout.path().join("utils").join("pypi");
        fs::create_dir_all(&pypi).unwrap();
        fs::write(pypi.join("README.gmsh.rst"), "Gmsh mesh generator\n").unwrap();
        fs::write(
            pypi.join("METADATA.in"),
            "Version: $GMSH_PYTHON_VERSION\n\n$GMSH_LONG_DESCRIPTION\n",
        )
        .unwrap();
        let site_packages = tempfile::tempdir().unwrap();

        cmd_stage_module(
            checkout.path(),
            Some(site_packages.path().to_path_buf()),
            true,
        )
        .unwrap();

        assert!(site_packages.path().join("gmsh.py").is_file());
        let metadata = fs::read_to_string(
            site_packages
                .path()
                .join("gmsh-4.13.1.dist-info")
                .join("METADATA"),
        )
        .unwrap();
        assert!(metadata.contains("Version: 4.13.1"));
        assert!(metadata.contains("Gmsh mesh generator"));
    }

    #[test]
    fn test_selector_report_json_output_stability() {
        let report = SelectorReport {
            output: "python-gmsh".to_string(),
            key: "occt".to_string(),
            selected: "7.8.1".to_string(),
            found_in: Some(PathBuf::from(".ci_support/linux_64_.yaml")),
            values_seen: vec!["7.8.1".to_string()],
        };
        let json = serde_json::to_string_pretty(&report).unwrap();
        let expected = r#"{
  "output": "python-gmsh",
  "key": "occt",
  "selected": "7.8.1",
  "found_in": ".ci_support/linux_64_.yaml",
  "values_seen": [
    "7.8.1"
  ]
}"#;
        assert_eq!(json, expected);
    }
}
