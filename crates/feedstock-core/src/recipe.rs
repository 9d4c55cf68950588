//! Raw-text scanning of recipe output blocks and skip selectors.
//!
//! The recipe is deliberately not parsed as YAML: the selector lives in a
//! trailing `# [...]` comment, which a structured parse would discard.
//! Extraction tracks line indentation over the raw text instead.

use regex::Regex;

use crate::error::{FeedstockError, Result};

/// A `skip: true  # [<key> != "<version>"]` constraint found in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipSelector {
    /// The version the selector pins (right operand of the `!=`).
    pub version: String,

    /// The full selector line, kept for diagnostics.
    pub line: String,
}

/// Extract the named output's block from the recipe text.
///
/// The block starts after the `- name:` line declaring the output and runs
/// until the next non-blank line at the declaration's indentation or
/// shallower. Blank lines never terminate a block; end of input does. The
/// declaration line itself is not part of the block.
pub fn find_output_block(recipe_text: &str, output: &str) -> Result<String> {
    let lines: Vec<&str> = recipe_text.lines().collect();

    let declarations: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains("- name:") && line.contains(output))
        .map(|(i, _)| i)
        .collect();

    let start = match declarations.as_slice() {
        [] => {
            return Err(FeedstockError::OutputBlockNotFound {
                output: output.to_string(),
            })
        }
        [single] => *single,
        multiple => {
            return Err(FeedstockError::OutputBlockAmbiguous {
                output: output.to_string(),
                count: multiple.len(),
            })
        }
    };

    let indent = leading_whitespace(lines[start]);
    let mut block = Vec::new();
    for line in &lines[start + 1..] {
        if !line.trim().is_empty() && leading_whitespace(line) <= indent {
            break; // back at the declaration's nesting level
        }
        block.push(*line);
    }

    Ok(block.join("\n"))
}

/// Extract the version pinned by the block's skip selector.
///
/// Matches the first line containing `skip:` together with a
/// `<key> != "<version>"` comparison. Whitespace around the `!=` varies
/// between recipe revisions and is tolerated.
pub fn find_skip_selector(block_text: &str, key: &str) -> Result<SkipSelector> {
    let pattern = Regex::new(&format!(r#"{}\s*!=\s*"([^"]+)""#, regex::escape(key)))
        .expect("escaped key always forms a valid pattern");

    for line in block_text.lines() {
        if !line.contains("skip:") {
            continue;
        }
        if let Some(caps) = pattern.captures(line) {
            return Ok(SkipSelector {
                version: caps[1].to_string(),
                line: line.to_string(),
            });
        }
    }

    Err(FeedstockError::SkipSelectorNotFound {
        key: key.to_string(),
    })
}

fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start().len()
}
