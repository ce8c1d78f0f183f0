//! Core domain types shared by every engine and post-processor.
//!
//! - `Item`: anything that can be recommended
//! - `PartialScore`: a score broken down into named components

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

// =============================================================================
// Items
// =============================================================================

/// A candidate that can be recommended.
///
/// Items are compared by equality so that contributions from different
/// engines land on the same entry. Blanket-implemented for every type with
/// the right bounds, so `u32`, `String` or a domain newtype all work.
pub trait Item: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Item for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

// =============================================================================
// Scores
// =============================================================================

/// A score broken down into named components.
///
/// The total is the sum of all components. Merging two partial scores sums
/// like-named components and keeps distinct ones, so the origin of every
/// point of score stays visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartialScore {
    components: BTreeMap<String, f32>,
}

impl PartialScore {
    /// Create a score with a single named component.
    pub fn new(component: impl Into<String>, value: f32) -> Self {
        let mut components = BTreeMap::new();
        components.insert(component.into(), value);
        Self { components }
    }

    /// Add `value` to the named component, creating it if needed.
    pub fn add(&mut self, component: impl Into<String>, value: f32) {
        *self.components.entry(component.into()).or_insert(0.0) += value;
    }

    /// Builder form of [`PartialScore::add`].
    pub fn with(mut self, component: impl Into<String>, value: f32) -> Self {
        self.add(component, value);
        self
    }

    /// Merge another partial score into this one.
    pub fn merge(&mut self, other: PartialScore) {
        for (component, value) in other.components {
            *self.components.entry(component).or_insert(0.0) += value;
        }
    }

    /// Sum of all components.
    pub fn total(&self) -> f32 {
        self.components.values().sum()
    }

    /// Value of a single component, if present.
    pub fn get(&self, component: &str) -> Option<f32> {
        self.components.get(component).copied()
    }

    /// Components in name order.
    pub fn components(&self) -> impl Iterator<Item = (&str, f32)> {
        self.components.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Display for PartialScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.total())?;
        let mut first = true;
        for (name, value) in self.components() {
            let sep = if first { " (" } else { ", " };
            write!(f, "{}{}: {:.2}", sep, name, value)?;
            first = false;
        }
        if !first {
            write!(f, ")")?;
        }
        Ok(())
    }
}
