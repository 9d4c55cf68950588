//! Rendering of the wheel `METADATA` file from its upstream template.
//!
//! `utils/pypi/METADATA.in` uses `$NAME` / `${NAME}` placeholders with `$$`
//! as the escape, and this renderer keeps those exact semantics so the
//! template stays shared with upstream's own packaging scripts. Only the two
//! names below are recognized; anything else is a hard error, because a new
//! upstream variable silently rendered as empty would ship a broken wheel.

use std::path::Path;

use crate::error::{FeedstockError, Result};

/// Placeholder for the version extracted from `api/gmsh.py`.
pub const VERSION_PLACEHOLDER: &str = "GMSH_PYTHON_VERSION";

/// Placeholder for the long description read from `README.gmsh.rst`.
pub const LONG_DESCRIPTION_PLACEHOLDER: &str = "GMSH_LONG_DESCRIPTION";

/// The two values `METADATA.in` may reference.
#[derive(Debug, Clone)]
pub struct MetadataSubstitutions {
    /// Replaces [`VERSION_PLACEHOLDER`].
    pub version: String,

    /// Replaces [`LONG_DESCRIPTION_PLACEHOLDER`].
    pub long_description: String,
}

impl MetadataSubstitutions {
    fn get(&self, name: &str) -> Option<&str> {
        match name {
            VERSION_PLACEHOLDER => Some(&self.version),
            LONG_DESCRIPTION_PLACEHOLDER => Some(&self.long_description),
            _ => None,
        }
    }
}

/// Render `template`, replacing every placeholder occurrence.
///
/// Substituted values are inserted verbatim, never rescanned, so a `$` in
/// the README cannot trigger a second substitution pass. `template_path`
/// only labels errors.
pub fn render(
    template: &str,
    template_path: &Path,
    subs: &MetadataSubstitutions,
) -> Result<String> {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < bytes.len() {
        // Copy everything up to the next '$' verbatim.
        match bytes[i..].iter().position(|&b| b == b'$') {
            None => {
                out.push_str(&template[i..]);
                break;
            }
            Some(offset) => {
                out.push_str(&template[i..i + offset]);
                i += offset;
            }
        }

        let dollar = i;
        i += 1;

        match bytes.get(i) {
            Some(b'$') => {
                out.push('$');
                i += 1;
            }
            Some(b'{') => {
                let start = i + 1;
                let end = scan_identifier(bytes, start);
                if end > start && bytes.get(end) == Some(&b'}') {
                    out.push_str(lookup(template_path, &template[start..end], subs)?);
                    i = end + 1;
                } else {
                    return Err(malformed(template, template_path, dollar));
                }
            }
            Some(&b) if is_ident_start(b) => {
                let end = scan_identifier(bytes, i);
                out.push_str(lookup(template_path, &template[i..end], subs)?);
                i = end;
            }
            _ => return Err(malformed(template, template_path, dollar)),
        }
    }

    Ok(out)
}

fn lookup<'a>(
    template_path: &Path,
    name: &str,
    subs: &'a MetadataSubstitutions,
) -> Result<&'a str> {
    subs.get(name)
        .ok_or_else(|| FeedstockError::UnsupportedPlaceholder {
            template: template_path.to_path_buf(),
            placeholder: name.to_string(),
        })
}

fn malformed(template: &str, template_path: &Path, offset: usize) -> FeedstockError {
    let (line, column) = line_column(template, offset);
    FeedstockError::MalformedTemplate {
        template: template_path.to_path_buf(),
        line,
        column,
    }
}

/// Advance past an identifier (`[A-Za-z_][A-Za-z0-9_]*`) starting at `start`.
fn scan_identifier(bytes: &[u8], start: usize) -> usize {
    match bytes.get(start) {
        Some(&b) if is_ident_start(b) => {}
        _ => return start,
    }
    let mut end = start + 1;
    while end < bytes.len() && is_ident_continue(bytes[end]) {
        end += 1;
    }
    end
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_ident_continue(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// 1-based line and column of a byte offset.
fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    match before.rfind('\n') {
        Some(newline) => (before.matches('\n').count() + 1, offset - newline),
        None => (1, offset + 1),
    }
}
