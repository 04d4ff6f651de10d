//! Myers shortest edit script over two slices, in linear space.
//!
//! Common prefixes and suffixes are peeled off first. What remains is split
//! at the middle snake of a bidirectional search and each half is solved
//! recursively, so memory stays `O(N + M)` however large the edit distance.

use std::ops::{Index, IndexMut};

/// One step of an edit script, carrying indices into the old and new slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Op {
    Equal { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

impl Op {
    pub(super) fn is_equal(self) -> bool {
        matches!(self, Self::Equal { .. })
    }
}

/// Furthest x reached on each diagonal `k`, addressed by signed `k`.
struct Frontier {
    offset: isize,
    v: Vec<isize>,
}

impl Frontier {
    fn new(max_d: isize) -> Self {
        Self {
            offset: max_d,
            v: vec![0; (2 * max_d + 1) as usize],
        }
    }
}

impl Index<isize> for Frontier {
    type Output = isize;

    fn index(&self, k: isize) -> &isize {
        &self.v[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for Frontier {
    fn index_mut(&mut self, k: isize) -> &mut isize {
        &mut self.v[(k + self.offset) as usize]
    }
}

fn max_d(n: usize, m: usize) -> isize {
    ((n + m + 1) / 2 + 1) as isize
}

/// Computes a shortest edit script turning `a` into `b`.
///
/// Deterministic: within each run of changes, deletions come before
/// insertions, so the same inputs always produce the same script.
pub(super) fn edit_script<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Op> {
    let max_d = max_d(a.len(), b.len());
    let mut forward = Frontier::new(max_d);
    let mut backward = Frontier::new(max_d);
    let mut ops = Vec::with_capacity(a.len().max(b.len()));
    conquer(a, 0, b, 0, &mut forward, &mut backward, &mut ops);
    group_changes(&mut ops);
    ops
}

fn conquer<T: PartialEq>(
    a: &[T],
    a_off: usize,
    b: &[T],
    b_off: usize,
    forward: &mut Frontier,
    backward: &mut Frontier,
    ops: &mut Vec<Op>,
) {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    for i in 0..prefix {
        ops.push(Op::Equal {
            old: a_off + i,
            new: b_off + i,
        });
    }
    let (a, b) = (&a[prefix..], &b[prefix..]);
    let (a_off, b_off) = (a_off + prefix, b_off + prefix);

    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    if a.is_empty() {
        ops.extend((0..b.len()).map(|i| Op::Insert { new: b_off + i }));
    } else if b.is_empty() {
        ops.extend((0..a.len()).map(|i| Op::Delete { old: a_off + i }));
    } else {
        match middle_snake(a, b, forward, backward) {
            Some((x, y))
                if x <= a.len()
                    && y <= b.len()
                    && (x, y) != (0, 0)
                    && (x, y) != (a.len(), b.len()) =>
            {
                conquer(&a[..x], a_off, &b[..y], b_off, forward, backward, ops);
                conquer(&a[x..], a_off + x, &b[y..], b_off + y, forward, backward, ops);
            }
            // Unreachable for a shortest path; replace the block wholesale.
            _ => {
                ops.extend((0..a.len()).map(|i| Op::Delete { old: a_off + i }));
                ops.extend((0..b.len()).map(|i| Op::Insert { new: b_off + i }));
            }
        }
    }

    for i in 0..suffix {
        ops.push(Op::Equal {
            old: a_off + a.len() + i,
            new: b_off + b.len() + i,
        });
    }
}

/// Finds a point on a shortest path through the middle of the edit graph.
///
/// Expects non-empty inputs with no common prefix or suffix.
fn middle_snake<T: PartialEq>(
    a: &[T],
    b: &[T],
    forward: &mut Frontier,
    backward: &mut Frontier,
) -> Option<(usize, usize)> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let delta = n - m;
    let odd = delta & 1 == 1;
    forward[1] = 0;
    backward[1] = 0;

    for d in 0..max_d(a.len(), b.len()) {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && forward[k - 1] < forward[k + 1]) {
                forward[k + 1]
            } else {
                forward[k - 1] + 1
            };
            let mut y = x - k;
            let (x0, y0) = (x, y);
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            forward[k] = x;
            if odd && (k - delta).abs() < d && forward[k] + backward[delta - k] >= n {
                return Some((x0 as usize, y0 as usize));
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && backward[k - 1] < backward[k + 1]) {
                backward[k + 1]
            } else {
                backward[k - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[(n - x - 1) as usize] == b[(m - y - 1) as usize] {
                x += 1;
                y += 1;
            }
            backward[k] = x;
            if !odd && (k - delta).abs() <= d && backward[k] + forward[delta - k] >= n {
                return Some(((n - x) as usize, (m - y) as usize));
            }
        }
    }

    None
}

/// Reorders each run of changes so its deletions precede its insertions.
fn group_changes(ops: &mut [Op]) {
    for run in ops.split_mut(|op| op.is_equal()) {
        run.sort_by_key(|op| match *op {
            Op::Delete { old } => (0, old),
            Op::Insert { new } => (1, new),
            Op::Equal { .. } => (2, 0),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    /// Replays a script and checks it rebuilds `b` from `a`.
    fn replay(a: &[char], b: &[char], ops: &[Op]) -> Vec<char> {
        let mut out = Vec::new();
        let (mut next_old, mut next_new) = (0, 0);
        for op in ops {
            match *op {
                Op::Equal { old, new } => {
                    assert_eq!((old, new), (next_old, next_new));
                    assert_eq!(a[old], b[new]);
                    out.push(a[old]);
                    next_old += 1;
                    next_new += 1;
                }
                Op::Delete { old } => {
                    assert_eq!(old, next_old);
                    next_old += 1;
                }
                Op::Insert { new } => {
                    assert_eq!(new, next_new);
                    out.push(b[new]);
                    next_new += 1;
                }
            }
        }
        assert_eq!((next_old, next_new), (a.len(), b.len()));
        out
    }

    /// Edit distance from the longest common subsequence, by table.
    fn shortest_distance(a: &[char], b: &[char]) -> usize {
        let mut table = vec![vec![0_usize; b.len() + 1]; a.len() + 1];
        for i in (0..a.len()).rev() {
            for j in (0..b.len()).rev() {
                table[i][j] = if a[i] == b[j] {
                    table[i + 1][j + 1] + 1
                } else {
                    table[i + 1][j].max(table[i][j + 1])
                };
            }
        }
        a.len() + b.len() - 2 * table[0][0]
    }

    fn edits(ops: &[Op]) -> usize {
        ops.iter().filter(|op| !op.is_equal()).count()
    }

    #[test]
    fn empty_inputs_produce_empty_script() {
        assert!(edit_script::<char>(&[], &[]).is_empty());
    }

    #[test]
    fn insert_only_from_empty() {
        let b = chars("abc");
        let ops = edit_script(&[], &b);
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| matches!(op, Op::Insert { .. })));
    }

    #[test]
    fn delete_only_to_empty() {
        let a = chars("abc");
        let ops = edit_script(&a, &[]);
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| matches!(op, Op::Delete { .. })));
    }

    #[test]
    fn classic_example_is_shortest() {
        // The example from Myers' paper: D = 5.
        let a = chars("ABCABBA");
        let b = chars("CBABAC");
        let ops = edit_script(&a, &b);
        assert_eq!(edits(&ops), 5);
        assert_eq!(replay(&a, &b, &ops), b);
    }

    #[test]
    fn identical_inputs_are_all_equal() {
        let a = chars("same");
        let ops = edit_script(&a, &a);
        assert!(ops.iter().all(|op| op.is_equal()));
        assert_eq!(ops.len(), 4);
    }

    #[test]
    fn script_is_deterministic() {
        let a = chars("the quick brown fox");
        let b = chars("the quack brown box");
        assert_eq!(edit_script(&a, &b), edit_script(&a, &b));
    }

    #[test]
    fn deletions_precede_insertions_within_a_change() {
        let a = chars("xaby");
        let b = chars("xcdy");
        let ops = edit_script(&a, &b);
        assert_eq!(
            ops,
            vec![
                Op::Equal { old: 0, new: 0 },
                Op::Delete { old: 1 },
                Op::Delete { old: 2 },
                Op::Insert { new: 1 },
                Op::Insert { new: 2 },
                Op::Equal { old: 3, new: 3 },
            ]
        );
    }

    #[test]
    fn matches_table_distance_on_generated_inputs() {
        // Small alphabet so the inputs share plenty of structure.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move |bound: u64| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed % bound
        };
        for _ in 0..200 {
            let a: Vec<char> = (0..next(24)).map(|_| (b'a' + next(4) as u8) as char).collect();
            let b: Vec<char> = (0..next(24)).map(|_| (b'a' + next(4) as u8) as char).collect();
            let ops = edit_script(&a, &b);
            assert_eq!(replay(&a, &b, &ops), b);
            assert_eq!(edits(&ops), shortest_distance(&a, &b), "{a:?} -> {b:?}");
        }
    }

    #[test]
    fn full_rewrite_of_large_input() {
        let a: Vec<String> = (0..4_000).map(|i| format!("old {i}")).collect();
        let b: Vec<String> = (0..4_000).map(|i| format!("new {i}")).collect();
        let ops = edit_script(&a, &b);
        assert_eq!(edits(&ops), 8_000);
        assert!(ops[..4_000].iter().all(|op| matches!(op, Op::Delete { .. })));
    }
}
