//! Unified diff text: rendering an edit script and parsing it back.
//!
//! ```text
//! --- a/<name>
//! +++ b/<name>
//! @@ -<old_start>,<old_len> +<new_start>,<new_len> @@
//!  context
//! -removed
//! +added
//! \ No newline at end of file
//! ```
//!
//! Lines carry their terminator. A line without one is followed by the
//! `\ No newline at end of file` marker, so "a" and "a\n" stay distinct.

use std::fmt::Write;

use super::PatchError;
use super::myers::Op;

/// Lines of unchanged context kept around each change.
const CONTEXT: usize = 3;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// What a hunk line does to the base text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LineKind {
    Context,
    Remove,
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct HunkLine<'p> {
    pub kind: LineKind,
    /// Line text including its terminator, if it has one.
    pub text: std::borrow::Cow<'p, str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Hunk<'p> {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<HunkLine<'p>>,
}

impl Hunk<'_> {
    /// Zero-based index of the first base line this hunk touches.
    ///
    /// A hunk that removes nothing inserts *after* line `old_start`.
    pub(super) fn anchor(&self) -> usize {
        if self.old_len == 0 {
            self.old_start
        } else {
            self.old_start - 1
        }
    }
}

/// Renders a unified diff for `ops` over the given line slices.
pub(super) fn render(name: &str, old: &[&str], new: &[&str], ops: &[Op]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- a/{name}");
    let _ = writeln!(out, "+++ b/{name}");

    // Position in each text before op `i`.
    let mut positions = Vec::with_capacity(ops.len() + 1);
    let (mut old_pos, mut new_pos) = (0, 0);
    for op in ops {
        positions.push((old_pos, new_pos));
        match op {
            Op::Equal { .. } => {
                old_pos += 1;
                new_pos += 1;
            }
            Op::Delete { .. } => old_pos += 1,
            Op::Insert { .. } => new_pos += 1,
        }
    }

    for (start, stop) in group(ops) {
        let slice = &ops[start..stop];
        let old_len = slice.iter().filter(|op| !matches!(op, Op::Insert { .. })).count();
        let new_len = slice.iter().filter(|op| !matches!(op, Op::Delete { .. })).count();
        let (old_before, new_before) = positions[start];
        let old_start = if old_len == 0 { old_before } else { old_before + 1 };
        let new_start = if new_len == 0 { new_before } else { new_before + 1 };
        let _ = writeln!(out, "@@ -{old_start},{old_len} +{new_start},{new_len} @@");

        for op in slice {
            let (prefix, line) = match *op {
                Op::Equal { old: i, .. } => (' ', old[i]),
                Op::Delete { old: i } => ('-', old[i]),
                Op::Insert { new: i } => ('+', new[i]),
            };
            out.push(prefix);
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push('\n');
                out.push_str(NO_NEWLINE_MARKER);
                out.push('\n');
            }
        }
    }

    out
}

/// Splits an edit script into hunk ranges `[start, stop)`.
///
/// Changes separated by at most `2 * CONTEXT` unchanged lines share a hunk.
fn group(ops: &[Op]) -> Vec<(usize, usize)> {
    let mut hunks = Vec::new();
    let mut from = 0;

    while let Some(first_change) = next_change(ops, from) {
        let start = first_change.saturating_sub(CONTEXT).max(from);
        let mut cursor = first_change;
        let end = loop {
            while cursor < ops.len() && !ops[cursor].is_equal() {
                cursor += 1;
            }
            match next_change(ops, cursor) {
                Some(next) if next - cursor <= 2 * CONTEXT => cursor = next,
                _ => break cursor,
            }
        };
        let stop = (end + CONTEXT).min(ops.len());
        hunks.push((start, stop));
        from = stop;
    }

    hunks
}

fn next_change(ops: &[Op], from: usize) -> Option<usize> {
    ops.get(from..)?
        .iter()
        .position(|op| !op.is_equal())
        .map(|offset| from + offset)
}

/// Parses unified diff text into hunks.
///
/// An empty patch text is accepted and has no hunks.
pub(super) fn parse(patch: &str) -> Result<Vec<Hunk<'_>>, PatchError> {
    let lines: Vec<&str> = patch.split_inclusive('\n').collect();
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let mut at = 0;
    expect_header(&lines, &mut at, "--- ")?;
    expect_header(&lines, &mut at, "+++ ")?;

    let mut hunks = Vec::new();
    while at < lines.len() {
        let header_line = at + 1;
        let (old_start, old_len, new_start, new_len) = parse_range_header(lines[at])
            .ok_or_else(|| malformed(header_line, "expected hunk header"))?;
        if old_len > 0 && old_start == 0 {
            return Err(malformed(header_line, "old range starts at line 0"));
        }
        at += 1;

        let mut hunk = Hunk {
            old_start,
            old_len,
            new_start,
            new_len,
            lines: Vec::new(),
        };
        let (mut old_left, mut new_left) = (old_len, new_len);

        while old_left > 0 || new_left > 0 {
            let Some(&raw) = lines.get(at) else {
                return Err(malformed(at + 1, "hunk ends early"));
            };
            let (kind, text) = match raw.as_bytes().first() {
                Some(b' ') => (LineKind::Context, &raw[1..]),
                Some(b'-') => (LineKind::Remove, &raw[1..]),
                Some(b'+') => (LineKind::Add, &raw[1..]),
                // Some tools strip the space from empty context lines.
                Some(b'\n') => (LineKind::Context, raw),
                _ => return Err(malformed(at + 1, "unexpected line in hunk")),
            };
            match kind {
                LineKind::Context => {
                    old_left = old_left
                        .checked_sub(1)
                        .ok_or_else(|| malformed(at + 1, "too many old lines"))?;
                    new_left = new_left
                        .checked_sub(1)
                        .ok_or_else(|| malformed(at + 1, "too many new lines"))?;
                }
                LineKind::Remove => {
                    old_left = old_left
                        .checked_sub(1)
                        .ok_or_else(|| malformed(at + 1, "too many old lines"))?;
                }
                LineKind::Add => {
                    new_left = new_left
                        .checked_sub(1)
                        .ok_or_else(|| malformed(at + 1, "too many new lines"))?;
                }
            }
            at += 1;

            let mut text = std::borrow::Cow::Borrowed(text);
            if lines
                .get(at)
                .is_some_and(|next| next.trim_end_matches('\n') == NO_NEWLINE_MARKER)
            {
                let Some(stripped) = text.strip_suffix('\n') else {
                    return Err(malformed(at + 1, "marker after unterminated line"));
                };
                text = std::borrow::Cow::Owned(stripped.to_string());
                at += 1;
            }
            hunk.lines.push(HunkLine { kind, text });
        }

        hunks.push(hunk);
    }

    Ok(hunks)
}

fn expect_header(lines: &[&str], at: &mut usize, prefix: &str) -> Result<(), PatchError> {
    match lines.get(*at) {
        Some(line) if line.starts_with(prefix) => {
            *at += 1;
            Ok(())
        }
        _ => Err(malformed(*at + 1, &format!("expected `{}` header", prefix.trim_end()))),
    }
}

/// Parses `@@ -a,b +c,d @@`. A missing length means 1.
fn parse_range_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let body = line.trim_end().strip_prefix("@@ -")?;
    let (ranges, _) = body.split_once(" @@")?;
    let (old, new) = ranges.split_once(" +")?;
    let (old_start, old_len) = parse_range(old)?;
    let (new_start, new_len) = parse_range(new)?;
    Some((old_start, old_len, new_start, new_len))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

fn malformed(line: usize, reason: &str) -> PatchError {
    PatchError::Malformed {
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_without_lengths() {
        assert_eq!(parse_range_header("@@ -3 +4 @@\n"), Some((3, 1, 4, 1)));
        assert_eq!(
            parse_range_header("@@ -0,0 +1,2 @@ fn main\n"),
            Some((0, 0, 1, 2))
        );
        assert_eq!(parse_range_header("@@ nonsense"), None);
    }

    #[test]
    fn empty_patch_has_no_hunks() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn header_only_patch_has_no_hunks() {
        assert!(parse("--- a/x\n+++ b/x\n").unwrap().is_empty());
    }

    #[test]
    fn missing_header_is_malformed() {
        let err = parse("@@ -1,1 +1,1 @@\n-a\n+b\n").unwrap_err();
        assert!(matches!(err, PatchError::Malformed { line: 1, .. }));
    }

    #[test]
    fn truncated_hunk_is_malformed() {
        let err = parse("--- a/x\n+++ b/x\n@@ -1,2 +1,2 @@\n a\n").unwrap_err();
        assert!(matches!(err, PatchError::Malformed { .. }));
    }

    #[test]
    fn marker_strips_terminator() {
        let hunks = parse("--- a/x\n+++ b/x\n@@ -0,0 +1,1 @@\n+a\n\\ No newline at end of file\n")
            .unwrap();
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines[0].text, "a");
        assert_eq!(hunks[0].lines[0].kind, LineKind::Add);
    }

    #[test]
    fn distant_changes_get_separate_hunks() {
        let ops: Vec<Op> = (0..20)
            .map(|i| {
                if i == 1 || i == 18 {
                    Op::Delete { old: i }
                } else {
                    Op::Equal { old: i, new: i }
                }
            })
            .collect();
        assert_eq!(group(&ops), vec![(0, 5), (15, 20)]);
    }

    #[test]
    fn nearby_changes_share_a_hunk() {
        let ops: Vec<Op> = (0..12)
            .map(|i| {
                if i == 2 || i == 8 {
                    Op::Delete { old: i }
                } else {
                    Op::Equal { old: i, new: i }
                }
            })
            .collect();
        assert_eq!(group(&ops), vec![(0, 12)]);
    }
}
