//! Per-search bookkeeping shared by the label-setting routers.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::graph::{StreetNetwork, WaypointId};
use crate::path::{Path, PathPoint};

use super::SearchStats;

/// Mutable state of one search. Reset before each query.
#[derive(Debug, Default)]
pub(super) struct SearchState {
    distances: HashMap<WaypointId, f64>,
    visited: HashSet<WaypointId>,
    predecessors: HashMap<WaypointId, WaypointId>,
    queue: BinaryHeap<QueueEntry>,
    steps: usize,
}

impl SearchState {
    pub(super) fn reset(&mut self) {
        self.distances.clear();
        self.visited.clear();
        self.predecessors.clear();
        self.queue.clear();
        self.steps = 0;
    }

    /// Seed the search with `start` at distance zero.
    pub(super) fn begin(&mut self, start: WaypointId, key: f64) {
        self.distances.insert(start, 0.0);
        self.queue.push(QueueEntry::new(start, key));
    }

    /// Pop the unvisited waypoint with the smallest key and mark it visited.
    ///
    /// Entries superseded by a later improvement are skipped.
    pub(super) fn settle_next(&mut self) -> Option<(WaypointId, f64)> {
        while let Some(entry) = self.queue.pop() {
            if !self.visited.insert(entry.node) {
                continue;
            }
            self.steps += 1;
            if let Some(&distance) = self.distances.get(&entry.node) {
                return Some((entry.node, distance));
            }
        }
        None
    }

    /// Record `candidate` as the tentative distance of `to` if it improves on
    /// the current one. Returns whether `to` should be (re)queued.
    pub(super) fn relax(&mut self, from: WaypointId, to: WaypointId, candidate: f64) -> bool {
        if self.visited.contains(&to) {
            return false;
        }
        if let Some(&current) = self.distances.get(&to) {
            if current <= candidate {
                return false;
            }
        }
        self.distances.insert(to, candidate);
        self.predecessors.insert(to, from);
        true
    }

    pub(super) fn push(&mut self, node: WaypointId, key: f64) {
        self.queue.push(QueueEntry::new(node, key));
    }

    pub(super) fn limit_exceeded(&self, limit: Option<usize>) -> bool {
        limit.is_some_and(|limit| self.steps > limit)
    }

    /// Walk predecessor links back from `goal` and return the path in travel order.
    pub(super) fn reconstruct(
        &self,
        network: &StreetNetwork,
        start: WaypointId,
        goal: WaypointId,
    ) -> Option<Path> {
        let mut points = Vec::new();
        let mut current = goal;
        loop {
            points.push(PathPoint::from(network.waypoint(current)?));
            if current == start {
                break;
            }
            current = *self.predecessors.get(&current)?;
        }
        points.reverse();
        Some(Path::new(points))
    }

    pub(super) fn stats(&self) -> SearchStats {
        SearchStats {
            steps: self.steps,
            visited: self.visited.len(),
            inspected: self.distances.len(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: WaypointId,
    key: FloatOrd,
}

impl QueueEntry {
    fn new(node: WaypointId, key: f64) -> Self {
        Self {
            node,
            key: FloatOrd(key),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by key.
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_pops_smallest_key_first() {
        let mut state = SearchState::default();
        state.begin(1, 0.0);
        state.relax(1, 2, 5.0);
        state.push(2, 5.0);
        state.relax(1, 3, 2.0);
        state.push(3, 2.0);

        assert_eq!(state.settle_next(), Some((1, 0.0)));
        assert_eq!(state.settle_next(), Some((3, 2.0)));
        assert_eq!(state.settle_next(), Some((2, 5.0)));
        assert_eq!(state.settle_next(), None);
    }

    #[test]
    fn stale_entries_are_skipped() {
        let mut state = SearchState::default();
        state.begin(1, 0.0);
        assert!(state.relax(1, 2, 9.0));
        state.push(2, 9.0);
        assert!(state.relax(1, 2, 4.0));
        state.push(2, 4.0);
        assert!(!state.relax(1, 2, 6.0), "worse candidate must not replace");

        state.settle_next();
        assert_eq!(state.settle_next(), Some((2, 4.0)));
        assert_eq!(state.settle_next(), None);
        assert_eq!(state.stats().visited, 2);
        assert_eq!(state.stats().steps, 2);
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = SearchState::default();
        state.begin(1, 0.0);
        state.settle_next();
        state.reset();
        assert_eq!(state.stats(), SearchStats::default());
        assert_eq!(state.settle_next(), None);
    }
}
