//! Ranked, deduplicated container of scored items.
//!
//! `Recommendations` is the result type every engine produces and every
//! post-processor mutates. Items are unique: adding an item that is already
//! present merges the scores instead of creating a second entry.
//!
//! ## Ordering
//! Entries are kept in insertion order until something asks for the ranked
//! order (`sort`, `top`, `truncate`, `into_sorted_vec`). The ranking is
//! descending by total score; ties keep insertion order. Any mutation that
//! can change a total drops the cached order.

use crate::types::{Item, PartialScore};
use serde::Serialize;
use std::collections::HashMap;

/// A single item together with its accumulated score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation<I> {
    item: I,
    score: PartialScore,
    #[serde(skip)]
    sequence: u64,
}

impl<I> Recommendation<I> {
    pub fn item(&self) -> &I {
        &self.item
    }

    pub fn score(&self) -> &PartialScore {
        &self.score
    }

    pub fn total(&self) -> f32 {
        self.score.total()
    }
}

/// Ordered, deduplicated collection of recommendations keyed by item.
#[derive(Debug, Clone)]
pub struct Recommendations<I: Item> {
    entries: Vec<Recommendation<I>>,
    /// Position of each item in `entries`
    positions: HashMap<I, usize>,
    next_sequence: u64,
    sorted: bool,
}

impl<I: Item> Recommendations<I> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            next_sequence: 0,
            sorted: true,
        }
    }

    /// Add an item with a partial score, merging with any existing entry.
    pub fn add(&mut self, item: I, score: PartialScore) {
        match self.positions.get(&item) {
            Some(&position) => self.entries[position].score.merge(score),
            None => {
                self.positions.insert(item.clone(), self.entries.len());
                self.entries.push(Recommendation {
                    item,
                    score,
                    sequence: self.next_sequence,
                });
                self.next_sequence += 1;
            }
        }
        self.sorted = false;
    }

    /// Add a single named score component to an item.
    pub fn add_score(&mut self, item: I, component: impl Into<String>, value: f32) {
        self.add(item, PartialScore::new(component, value));
    }

    /// Merge every entry of `other` into this container.
    ///
    /// Items new to this container are appended in `other`'s current order.
    pub fn add_all(&mut self, other: Recommendations<I>) {
        for entry in other.entries {
            self.add(entry.item, entry.score);
        }
    }

    /// Sort by descending total score, ties in insertion order.
    pub fn sort(&mut self) {
        if self.sorted {
            return;
        }
        // Adding 0.0 folds -0.0 into 0.0 so equal totals tie
        self.entries.sort_by(|a, b| {
            (b.total() + 0.0)
                .total_cmp(&(a.total() + 0.0))
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        self.reindex_from(0);
        self.sorted = true;
    }

    /// The `n` best entries (fewer if the container is smaller).
    pub fn top(&mut self, n: usize) -> &[Recommendation<I>] {
        self.sort();
        let n = n.min(self.entries.len());
        &self.entries[..n]
    }

    /// Keep only the `n` best entries.
    pub fn truncate(&mut self, n: usize) {
        self.sort();
        if n >= self.entries.len() {
            return;
        }
        for dropped in self.entries.drain(n..) {
            self.positions.remove(&dropped.item);
        }
    }

    /// Remove an item. Does nothing if the item is absent.
    pub fn remove(&mut self, item: &I) -> Option<PartialScore> {
        let position = self.positions.remove(item)?;
        let removed = self.entries.remove(position);
        self.reindex_from(position);
        Some(removed.score)
    }

    /// Score of an item, if present.
    pub fn get(&self, item: &I) -> Option<&PartialScore> {
        self.positions
            .get(item)
            .map(|&position| &self.entries[position].score)
    }

    pub fn contains(&self, item: &I) -> bool {
        self.positions.contains_key(item)
    }

    /// Number of distinct items.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the current order is the ranked order.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Entries in their current order (ranked only after `sort`).
    pub fn iter(&self) -> impl Iterator<Item = &Recommendation<I>> {
        self.entries.iter()
    }

    /// Items in their current order.
    pub fn items(&self) -> impl Iterator<Item = &I> {
        self.entries.iter().map(|entry| &entry.item)
    }

    /// Totals in their current order.
    pub fn scores(&self) -> Vec<f32> {
        self.entries.iter().map(Recommendation::total).collect()
    }

    /// Consume the container, returning entries in ranked order.
    pub fn into_sorted_vec(mut self) -> Vec<Recommendation<I>> {
        self.sort();
        self.entries
    }

    fn reindex_from(&mut self, start: usize) {
        for (position, entry) in self.entries.iter().enumerate().skip(start) {
            if let Some(slot) = self.positions.get_mut(&entry.item) {
                *slot = position;
            }
        }
    }
}

impl<I: Item> Default for Recommendations<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Item> FromIterator<(I, PartialScore)> for Recommendations<I> {
    fn from_iter<T: IntoIterator<Item = (I, PartialScore)>>(iter: T) -> Self {
        let mut recommendations = Recommendations::new();
        for (item, score) in iter {
            recommendations.add(item, score);
        }
        recommendations
    }
}
