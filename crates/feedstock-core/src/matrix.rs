//! Build-matrix membership checks over rendered CI configs.
//!
//! conda-smithy renders one YAML file per CI job under `.ci_support/`; each
//! file lists the pinned versions for that job as `key: [values]` entries.
//! The scan asks a single question: does any matching config still carry the
//! version the recipe selector expects?

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FeedstockError, Result};

/// Outcome of scanning the rendered CI configs for a matrix value.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixScan {
    /// First config (in sorted filename order) whose matrix lists the
    /// target value, if any.
    pub found_in: Option<PathBuf>,

    /// Every value observed under the key across the scanned configs, in
    /// file order, duplicates kept.
    pub values_seen: Vec<String>,
}

impl MatrixScan {
    /// Sorted, deduplicated view of the observed values, for error messages.
    pub fn available(&self) -> Vec<String> {
        let mut values = self.values_seen.clone();
        values.sort();
        values.dedup();
        values
    }
}

/// List the rendered configs under `dir` whose filenames match
/// `<prefix>*.yaml`, in sorted order.
///
/// A missing directory is an empty matrix, not an error: feedstock branches
/// mid-rerender legitimately have no `.ci_support/` yet.
pub fn list_config_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| FeedstockError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| FeedstockError::io(dir, e))?;
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name.starts_with(prefix) && name.ends_with(".yaml") && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Scan the rendered configs for `target` under `key`.
///
/// Values from every scanned file accumulate into `values_seen` whether or
/// not they match; the scan stops at the first file whose matrix contains
/// the target, so later files go unread on success.
pub fn scan_for_version(dir: &Path, prefix: &str, key: &str, target: &str) -> Result<MatrixScan> {
    let mut values_seen = Vec::new();

    for path in list_config_files(dir, prefix)? {
        let text = fs::read_to_string(&path).map_err(|e| FeedstockError::io(&path, e))?;
        let doc: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| {
            FeedstockError::Yaml {
                path: path.clone(),
                source: e,
            }
        })?;

        let values = key_values(&doc, key);
        debug!(config = ?path, count = values.len(), "scanned matrix values");
        let hit = values.iter().any(|v| v == target);
        values_seen.extend(values);

        if hit {
            return Ok(MatrixScan {
                found_in: Some(path),
                values_seen,
            });
        }
    }

    Ok(MatrixScan {
        found_in: None,
        values_seen,
    })
}

/// Collect the string forms of the values under `key` in a parsed config.
///
/// A bare scalar counts as a single-element list. Null entries are skipped.
fn key_values(doc: &serde_yaml::Value, key: &str) -> Vec<String> {
    let value = match doc.get(key) {
        Some(value) => value,
        None => return Vec::new(),
    };

    let items: Vec<&serde_yaml::Value> = match value {
        serde_yaml::Value::Sequence(seq) => seq.iter().collect(),
        other => vec![other],
    };

    items.into_iter().filter_map(scalar_to_string).collect()
}

/// String form of a single matrix entry; `None` for null.
fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => None,
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        other => serde_yaml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    #[test]
    fn test_finds_target_in_single_config() {
        let dir = config_dir(&[(
            "linux_64_.yaml",
            "occt:\n- '7.8.1'\nzlib:\n- '1.3'\n",
        )]);
        let scan = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert_eq!(
            scan.found_in,
            Some(dir.path().join("linux_64_.yaml"))
        );
        assert_eq!(scan.values_seen, vec!["7.8.1"]);
    }

    #[test]
    fn test_accumulates_values_across_files_until_hit() {
        let dir = config_dir(&[
            ("linux_64_occt7.7.2.yaml", "occt:\n- '7.7.2'\n"),
            ("linux_64_occt7.8.1.yaml", "occt:\n- '7.8.1'\n"),
        ]);
        let scan = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert_eq!(
            scan.found_in,
            Some(dir.path().join("linux_64_occt7.8.1.yaml"))
        );
        assert_eq!(scan.values_seen, vec!["7.7.2", "7.8.1"]);
    }

    #[test]
    fn test_miss_reports_sorted_deduplicated_alternatives() {
        let dir = config_dir(&[
            ("linux_64_a.yaml", "occt:\n- '7.7.2'\n"),
            ("linux_64_b.yaml", "occt:\n- '7.7.2'\n- '7.6.0'\n"),
        ]);
        let scan = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert_eq!(scan.found_in, None);
        assert_eq!(scan.values_seen, vec!["7.7.2", "7.7.2", "7.6.0"]);
        assert_eq!(scan.available(), vec!["7.6.0", "7.7.2"]);
    }

    #[test]
    fn test_bare_scalar_counts_as_single_value() {
        let dir = config_dir(&[("linux_64_.yaml", "occt: '7.8.1'\n")]);
        let scan = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert!(scan.found_in.is_some());
        assert_eq!(scan.values_seen, vec!["7.8.1"]);
    }

    #[test]
    fn test_null_entries_are_skipped() {
        let dir = config_dir(&[("linux_64_.yaml", "occt:\n- null\n- '7.8.1'\n")]);
        let scan = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert_eq!(scan.values_seen, vec!["7.8.1"]);
    }

    #[test]
    fn test_unquoted_entries_match_by_string_form() {
        // conda-smithy quotes nothing; 7.8.1 parses as a string, 1.3 as a
        // number, and both must compare by their printed form.
        let dir = config_dir(&[("linux_64_.yaml", "occt:\n- 7.8.1\nzlib:\n- 1.3\n")]);
        let occt = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert!(occt.found_in.is_some());
        let zlib = scan_for_version(dir.path(), "linux_64", "zlib", "1.3").unwrap();
        assert!(zlib.found_in.is_some());
    }

    #[test]
    fn test_missing_key_yields_no_values() {
        let dir = config_dir(&[("linux_64_.yaml", "zlib:\n- '1.3'\n")]);
        let scan = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert_eq!(scan.found_in, None);
        assert!(scan.values_seen.is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_empty_scan() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(".ci_support");
        let scan = scan_for_version(&missing, "linux_64", "occt", "7.8.1").unwrap();
        assert_eq!(scan.found_in, None);
        assert!(scan.values_seen.is_empty());
    }

    #[test]
    fn test_prefix_filters_other_platforms() {
        let dir = config_dir(&[
            ("osx_64_.yaml", "occt:\n- '7.8.1'\n"),
            ("linux_64_.yaml", "occt:\n- '7.7.2'\n"),
            ("linux_64_notes.txt", "occt 7.8.1"),
        ]);
        let scan = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert_eq!(scan.found_in, None);
        assert_eq!(scan.values_seen, vec!["7.7.2"]);
    }

    #[test]
    fn test_files_scan_in_sorted_order() {
        let dir = config_dir(&[
            ("linux_64_b.yaml", "occt:\n- '7.8.1'\n"),
            ("linux_64_a.yaml", "occt:\n- '7.8.1'\n"),
        ]);
        let scan = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap();
        assert_eq!(
            scan.found_in,
            Some(dir.path().join("linux_64_a.yaml"))
        );
    }

    #[test]
    fn test_unparseable_config_is_fatal() {
        let dir = config_dir(&[("linux_64_.yaml", "occt: [unclosed\n")]);
        let err = scan_for_version(dir.path(), "linux_64", "occt", "7.8.1").unwrap_err();
        assert!(matches!(err, FeedstockError::Yaml { .. }));
        assert!(err.to_string().contains("linux_64_.yaml"));
    }
}
