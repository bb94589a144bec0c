//! Reachability records: a tree interval per block plus its future covering set.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open interval `[start, end)` of tree labels. Empty when `start == end`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// The interval handed to the tree root. The top label is kept free so `end` never overflows.
    pub fn maximal() -> Self {
        Self::new(1, u64::MAX - 1)
    }

    pub fn empty_at(start: u64) -> Self {
        Self::new(start, start)
    }

    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `self` nests `other` (or they are equal)
    pub fn contains(&self, other: Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// `self` strictly nests `other`
    pub fn strictly_contains(&self, other: Interval) -> bool {
        self.contains(other) && *self != other
    }

    /// Splits off the left half of the interval; the second value is the remainder
    pub fn split_half(&self) -> (Interval, Interval) {
        let left = self.size().div_ceil(2);
        (Interval::new(self.start, self.start + left), Interval::new(self.start + left, self.end))
    }

    /// Splits into consecutive intervals proportional to `sizes`, each at least `sizes[i]` long.
    /// Callers guarantee `sum(sizes) <= self.size()`.
    pub fn split_proportional(&self, sizes: &[u64]) -> Vec<Interval> {
        let total: u128 = sizes.iter().map(|s| *s as u128).sum();
        let slack = (self.size() as u128).saturating_sub(total);
        let mut out = Vec::with_capacity(sizes.len());
        let mut start = self.start;
        let mut slack_used: u128 = 0;
        for (i, size) in sizes.iter().enumerate() {
            // distribute slack proportionally to the requested size; the last one takes the rest
            let extra = if i + 1 == sizes.len() {
                slack - slack_used
            } else if total == 0 {
                0
            } else {
                slack * (*size as u128) / total
            };
            slack_used += extra;
            let end = start + *size + extra as u64;
            out.push(Interval::new(start, end));
            start = end;
        }
        out
    }
}

/// Per-block reachability state. Relations are stored as hashes into the block arena.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityData {
    /// Tree parent (the selected parent); `ZERO_HASH` for the tree root
    pub parent: Hash,
    /// Tree children in insertion order; their intervals are ordered the same way
    pub children: Vec<Hash>,
    pub interval: Interval,
    /// Depth in the selected-parent tree
    pub height: u64,
    /// Blocks in this block's future that are not in its tree subtree, minimal and
    /// sorted by interval start
    pub future_covering_set: Vec<Hash>,
}

impl ReachabilityData {
    pub fn new(parent: Hash, interval: Interval, height: u64) -> Self {
        Self { parent, children: Vec::new(), interval, height, future_covering_set: Vec::new() }
    }
}
