//! Textual deltas between two full texts.
//!
//! [`diff`] renders a line-based unified diff and [`apply`] replays one
//! against a base text. Both are pure. Applying is strict: any context that
//! does not match the base exactly is an error, never skipped.

mod myers;
mod unified;

use unified::LineKind;

/// Errors from applying a patch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("malformed patch at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("hunk {hunk} does not match the base text at line {line}")]
    ContextMismatch { hunk: usize, line: usize },

    #[error("hunk {hunk} reaches outside the base text")]
    OutOfRange { hunk: usize },
}

/// Computes the patch turning `base` into `target`.
///
/// `name` only labels the `---`/`+++` header. Identical texts yield a
/// header-only patch whose application changes nothing.
pub fn diff(name: &str, base: &str, target: &str) -> String {
    let old: Vec<&str> = base.split_inclusive('\n').collect();
    let new: Vec<&str> = target.split_inclusive('\n').collect();
    let ops = myers::edit_script(&old, &new);
    unified::render(name, &old, &new, &ops)
}

/// Applies `patch` to `base`, returning the patched text.
pub fn apply(base: &str, patch: &str) -> Result<String, PatchError> {
    let hunks = unified::parse(patch)?;
    let base_lines: Vec<&str> = base.split_inclusive('\n').collect();

    let mut out = String::with_capacity(base.len());
    let mut written = 0;
    let mut cursor = 0;

    for (index, hunk) in hunks.iter().enumerate() {
        let number = index + 1;
        let anchor = hunk.anchor();
        if anchor < cursor || anchor > base_lines.len() {
            return Err(PatchError::OutOfRange { hunk: number });
        }

        for line in &base_lines[cursor..anchor] {
            out.push_str(line);
        }
        written += anchor - cursor;

        let expected_written = if hunk.new_len == 0 {
            hunk.new_start
        } else {
            hunk.new_start.saturating_sub(1)
        };
        if expected_written != written {
            return Err(PatchError::Malformed {
                line: 0,
                reason: format!("hunk {number} new range does not line up"),
            });
        }

        let mut at = anchor;
        for line in &hunk.lines {
            match line.kind {
                LineKind::Context | LineKind::Remove => {
                    let Some(base_line) = base_lines.get(at) else {
                        return Err(PatchError::OutOfRange { hunk: number });
                    };
                    if *base_line != line.text {
                        return Err(PatchError::ContextMismatch {
                            hunk: number,
                            line: at + 1,
                        });
                    }
                    if line.kind == LineKind::Context {
                        out.push_str(base_line);
                        written += 1;
                    }
                    at += 1;
                }
                LineKind::Add => {
                    out.push_str(&line.text);
                    written += 1;
                }
            }
        }
        cursor = at;
    }

    for line in &base_lines[cursor..] {
        out.push_str(line);
    }

    Ok(out)
}
