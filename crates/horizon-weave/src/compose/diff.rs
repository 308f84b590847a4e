//! Computing change operations between two flattened sequences.
//!
//! Items are matched by identity using Myers' algorithm (the linear-space
//! variant, O((N+M)D) time). Items left unmatched on both sides with the
//! same identity can then be paired into moves. From the matched pairs an
//! edit script is produced that, applied in order to the old sequence,
//! yields the new one:
//!
//! 1. removals, back to front
//! 2. moves, in new-sequence order
//! 3. insertions, front to back
//! 4. content changes, at their final positions
//!
//! Identity, content equality and payloads are decided by [`DiffItem`]; for
//! flattened items that delegates to the owning provider.
//!
//! Move pairing and move emission scan linearly for each unmatched item, so
//! they are quadratic in the number of unmatched items in the worst case.
//! The matching pass itself keeps the Myers bound.

use std::ops::Range;

use horizon_weave_core::logging::{span_names, targets};
use horizon_weave_core::PerfSpan;

use super::view::Payload;

/// One edit operation used to patch a rendered list incrementally.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOp {
    /// `count` items were inserted so the first one is at `position`.
    Insert { position: usize, count: usize },
    /// `count` items starting at `position` were removed.
    Remove { position: usize, count: usize },
    /// The item at `from` was removed and reinserted so it sits at `to`.
    Move { from: usize, to: usize },
    /// `count` items starting at `position` changed in place.
    Change {
        position: usize,
        count: usize,
        payload: Option<Payload>,
    },
}

impl ChangeOp {
    /// Returns this operation with every position moved by `offset`.
    pub fn shifted(&self, offset: usize) -> ChangeOp {
        match self {
            Self::Insert { position, count } => Self::Insert {
                position: position + offset,
                count: *count,
            },
            Self::Remove { position, count } => Self::Remove {
                position: position + offset,
                count: *count,
            },
            Self::Move { from, to } => Self::Move {
                from: from + offset,
                to: to + offset,
            },
            Self::Change {
                position,
                count,
                payload,
            } => Self::Change {
                position: position + offset,
                count: *count,
                payload: payload.clone(),
            },
        }
    }
}

/// Identity and equality decisions the diff engine delegates to items.
pub trait DiffItem {
    /// Returns `true` if `self` (old) and `new` are the same logical item.
    fn same_item(&self, new: &Self) -> bool;

    /// Returns `true` if the contents are equal. Only asked for same items.
    fn same_content(&self, new: &Self) -> bool;

    /// Describes the change between two versions of the same item.
    fn change_payload(&self, _new: &Self) -> Option<Payload> {
        None
    }
}

/// Computes change operations between two sequences.
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    detect_moves: bool,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffEngine {
    /// Creates an engine that detects moves.
    pub fn new() -> Self {
        Self { detect_moves: true }
    }

    /// Enables or disables pairing removed and inserted items into moves.
    pub fn with_detect_moves(mut self, detect_moves: bool) -> Self {
        self.detect_moves = detect_moves;
        self
    }

    /// Returns `true` if moves are detected.
    pub fn detect_moves(&self) -> bool {
        self.detect_moves
    }

    /// Computes the operations turning `old` into `new`.
    pub fn diff<T: DiffItem>(&self, old: &[T], new: &[T]) -> Vec<ChangeOp> {
        let _span = PerfSpan::new(span_names::DIFF);

        let same = |i: usize, j: usize| old[i].same_item(&new[j]);
        let mut pairs = Vec::new();
        let mut forward = Diagonals::new(old.len() + new.len());
        let mut backward = Diagonals::new(old.len() + new.len());
        conquer(
            &same,
            0..old.len(),
            0..new.len(),
            &mut forward,
            &mut backward,
            &mut pairs,
        );

        let mut old_partner: Vec<Option<usize>> = vec![None; old.len()];
        let mut new_partner: Vec<Option<usize>> = vec![None; new.len()];
        for &(i, j) in &pairs {
            old_partner[i] = Some(j);
            new_partner[j] = Some(i);
        }

        let mut moved = Vec::new();
        if self.detect_moves {
            for j in 0..new.len() {
                if new_partner[j].is_some() {
                    continue;
                }
                let candidate = (0..old.len()).find(|&i| old_partner[i].is_none() && same(i, j));
                if let Some(i) = candidate {
                    old_partner[i] = Some(j);
                    new_partner[j] = Some(i);
                    moved.push(j);
                }
            }
        }

        let mut ops = Vec::new();
        emit_removals(&old_partner, &mut ops);
        emit_moves(&old_partner, &new_partner, &moved, &mut ops);
        emit_insertions(&new_partner, &mut ops);
        emit_changes(old, new, &new_partner, &mut ops);

        tracing::debug!(
            target: targets::DIFF,
            old_len = old.len(),
            new_len = new.len(),
            matched = pairs.len(),
            moves = moved.len(),
            ops = ops.len(),
            "diff computed"
        );
        ops
    }
}

/// Computes the operations turning `old` into `new`, detecting moves.
pub fn diff<T: DiffItem>(old: &[T], new: &[T]) -> Vec<ChangeOp> {
    DiffEngine::new().diff(old, new)
}

/// Applies `ops` to `list` in order.
///
/// `fetch` returns the new value for a final position; it is used for
/// inserted and changed items. Operations that do not fit the list are
/// ignored.
pub fn apply_ops<T, F>(list: &mut Vec<T>, ops: &[ChangeOp], mut fetch: F)
where
    F: FnMut(usize) -> T,
{
    for op in ops {
        match *op {
            ChangeOp::Insert { position, count } => {
                if position > list.len() {
                    continue;
                }
                let values: Vec<T> = (position..position + count).map(&mut fetch).collect();
                list.splice(position..position, values);
            }
            ChangeOp::Remove { position, count } => {
                if position + count > list.len() {
                    continue;
                }
                list.drain(position..position + count);
            }
            ChangeOp::Move { from, to } => {
                if from >= list.len() || to >= list.len() {
                    continue;
                }
                let item = list.remove(from);
                list.insert(to, item);
            }
            ChangeOp::Change {
                position, count, ..
            } => {
                for index in position..(position + count).min(list.len()) {
                    list[index] = fetch(index);
                }
            }
        }
    }
}

fn emit_removals(old_partner: &[Option<usize>], ops: &mut Vec<ChangeOp>) {
    let mut end = old_partner.len();
    while end > 0 {
        if old_partner[end - 1].is_some() {
            end -= 1;
            continue;
        }
        let mut start = end - 1;
        while start > 0 && old_partner[start - 1].is_none() {
            start -= 1;
        }
        ops.push(ChangeOp::Remove {
            position: start,
            count: end - start,
        });
        end = start;
    }
}

/// Places every moved item directly after its predecessor in the new order.
///
/// Processing in new order means each predecessor is already final, and
/// matched items never reorder among themselves, so the working list ends up
/// equal to the new sequence minus insertions.
fn emit_moves(
    old_partner: &[Option<usize>],
    new_partner: &[Option<usize>],
    moved: &[usize],
    ops: &mut Vec<ChangeOp>,
) {
    if moved.is_empty() {
        return;
    }

    // Working list of surviving old indices, in current host order.
    let mut working: Vec<usize> = (0..old_partner.len())
        .filter(|&i| old_partner[i].is_some())
        .collect();

    for &j in moved {
        let Some(old_index) = new_partner[j] else {
            continue;
        };
        let Some(from) = working.iter().position(|&i| i == old_index) else {
            continue;
        };
        working.remove(from);

        let predecessor = new_partner[..j].iter().rev().find_map(|p| *p);
        let to = match predecessor {
            Some(pred) => working
                .iter()
                .position(|&i| i == pred)
                .map_or(0, |q| q + 1),
            None => 0,
        };
        working.insert(to, old_index);

        if from != to {
            ops.push(ChangeOp::Move { from, to });
        }
    }
}

fn emit_insertions(new_partner: &[Option<usize>], ops: &mut Vec<ChangeOp>) {
    let mut j = 0;
    while j < new_partner.len() {
        if new_partner[j].is_some() {
            j += 1;
            continue;
        }
        let start = j;
        while j < new_partner.len() && new_partner[j].is_none() {
            j += 1;
        }
        ops.push(ChangeOp::Insert {
            position: start,
            count: j - start,
        });
    }
}

fn emit_changes<T: DiffItem>(
    old: &[T],
    new: &[T],
    new_partner: &[Option<usize>],
    ops: &mut Vec<ChangeOp>,
) {
    let mut pending: Option<(usize, usize)> = None;
    for (j, partner) in new_partner.iter().enumerate() {
        let Some(i) = *partner else {
            continue;
        };
        if old[i].same_content(&new[j]) {
            continue;
        }
        match old[i].change_payload(&new[j]) {
            Some(payload) => {
                flush_changes(&mut pending, ops);
                ops.push(ChangeOp::Change {
                    position: j,
                    count: 1,
                    payload: Some(payload),
                });
            }
            None => match pending {
                Some((start, count)) if start + count == j => pending = Some((start, count + 1)),
                _ => {
                    flush_changes(&mut pending, ops);
                    pending = Some((j, 1));
                }
            },
        }
    }
    flush_changes(&mut pending, ops);
}

fn flush_changes(pending: &mut Option<(usize, usize)>, ops: &mut Vec<ChangeOp>) {
    if let Some((position, count)) = pending.take() {
        ops.push(ChangeOp::Change {
            position,
            count,
            payload: None,
        });
    }
}

/// Furthest-reaching x per diagonal, indexed by signed diagonal number.
struct Diagonals {
    offset: isize,
    values: Vec<usize>,
}

impl Diagonals {
    fn new(total: usize) -> Self {
        let max_d = total / 2 + 2;
        Self {
            offset: max_d as isize,
            values: vec![0; 2 * max_d + 1],
        }
    }

    fn get(&self, k: isize) -> usize {
        self.values[(k + self.offset) as usize]
    }

    fn set(&mut self, k: isize, x: usize) {
        self.values[(k + self.offset) as usize] = x;
    }
}

fn common_prefix<F>(same: &F, old: Range<usize>, new: Range<usize>) -> usize
where
    F: Fn(usize, usize) -> bool,
{
    old.zip(new).take_while(|&(i, j)| same(i, j)).count()
}

fn common_suffix<F>(same: &F, old: Range<usize>, new: Range<usize>) -> usize
where
    F: Fn(usize, usize) -> bool,
{
    old.rev()
        .zip(new.rev())
        .take_while(|&(i, j)| same(i, j))
        .count()
}

/// Finds the start of a snake on an optimal path through the edit graph.
///
/// Both ranges are non-empty and share no common prefix or suffix.
fn middle_snake<F>(
    same: &F,
    old: Range<usize>,
    new: Range<usize>,
    forward: &mut Diagonals,
    backward: &mut Diagonals,
) -> Option<(usize, usize)>
where
    F: Fn(usize, usize) -> bool,
{
    let n = old.len();
    let m = new.len();
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;
    let d_max = ((n + m + 1) / 2 + 1) as isize;

    forward.set(1, 0);
    backward.set(1, 0);

    for d in 0..d_max {
        let mut k = d;
        while k >= -d {
            let mut x = if k == -d || (k != d && forward.get(k - 1) < forward.get(k + 1)) {
                forward.get(k + 1)
            } else {
                forward.get(k - 1) + 1
            };
            let y = (x as isize - k) as usize;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix(same, old.start + x..old.end, new.start + y..new.end);
            }
            forward.set(k, x);
            if odd && (k - delta).abs() <= d - 1 && x + backward.get(delta - k) >= n {
                return Some((old.start + x0, new.start + y0));
            }
            k -= 2;
        }

        let mut k = d;
        while k >= -d {
            let mut x = if k == -d || (k != d && backward.get(k - 1) < backward.get(k + 1)) {
                backward.get(k + 1)
            } else {
                backward.get(k - 1) + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let advance =
                    common_suffix(same, old.start..old.end - x, new.start..new.end - y);
                x += advance;
                y += advance;
            }
            backward.set(k, x);
            if !odd && (k - delta).abs() <= d && x + forward.get(delta - k) >= n {
                return Some((old.end - x, new.end - y));
            }
            k -= 2;
        }
    }

    None
}

fn conquer<F>(
    same: &F,
    mut old: Range<usize>,
    mut new: Range<usize>,
    forward: &mut Diagonals,
    backward: &mut Diagonals,
    pairs: &mut Vec<(usize, usize)>,
) where
    F: Fn(usize, usize) -> bool,
{
    let prefix = common_prefix(same, old.clone(), new.clone());
    pairs.extend((0..prefix).map(|offset| (old.start + offset, new.start + offset)));
    old.start += prefix;
    new.start += prefix;

    let suffix = common_suffix(same, old.clone(), new.clone());
    old.end -= suffix;
    new.end -= suffix;

    if !old.is_empty() && !new.is_empty() {
        if let Some((x, y)) = middle_snake(same, old.clone(), new.clone(), forward, backward) {
            conquer(same, old.start..x, new.start..y, forward, backward, pairs);
            conquer(same, x..old.end, y..new.end, forward, backward, pairs);
        }
    }

    pairs.extend((0..suffix).map(|offset| (old.end + offset, new.end + offset)));
}
