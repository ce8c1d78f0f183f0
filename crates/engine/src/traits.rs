//! Engine capability and the single-score engine shape.
//!
//! An `Engine` turns an input and a context into `Recommendations`. Most
//! concrete engines only compute one number per item; they implement
//! `SingleScoreEngine` instead and get wrapped in `SingleScore`, which takes
//! care of the time budget, item filtering and score attribution.

use anyhow::Result;
use reco_core::{Context, Item, PartialScore, Recommendations};
use tracing::debug;

/// Something that produces recommendations for an input.
///
/// ## Contract
/// - `name()` is stable; statistics are attributed to it
/// - `recommend` polls `context.time_left()` and stops producing new
///   candidates once it turns false, returning what it has so far
/// - An `Err` means the engine's whole contribution is unusable; what the
///   caller does with it is the caller's policy
pub trait Engine<I: Item, In>: Send + Sync {
    fn name(&self) -> &str;

    fn recommend(&self, input: &In, context: &Context<I, In>) -> Result<Recommendations<I>>;
}

impl<I: Item, In, E: Engine<I, In> + ?Sized> Engine<I, In> for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recommend(&self, input: &In, context: &Context<I, In>) -> Result<Recommendations<I>> {
        (**self).recommend(input, context)
    }
}

/// An engine computing a single score per item.
pub trait SingleScoreEngine<I: Item, In>: Send + Sync {
    fn name(&self) -> &str;

    /// Scored items, in the order they were found.
    ///
    /// An item may appear more than once; its scores are summed.
    fn score_single(&self, input: &In, context: &Context<I, In>) -> Result<Vec<(I, f32)>>;
}

/// Adapter turning a `SingleScoreEngine` into an `Engine`.
///
/// Each produced item becomes a `PartialScore` with one component named
/// after the engine. Items the context does not allow are skipped, and no
/// further items are added once the time budget is exhausted.
#[derive(Debug, Clone)]
pub struct SingleScore<E> {
    inner: E,
}

impl<E> SingleScore<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

impl<I: Item, In, E: SingleScoreEngine<I, In>> Engine<I, In> for SingleScore<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn recommend(&self, input: &In, context: &Context<I, In>) -> Result<Recommendations<I>> {
        let name = self.inner.name();
        let scored = self.inner.score_single(input, context)?;
        let produced = scored.len();

        let mut recommendations = Recommendations::new();
        for (item, score) in scored {
            if !context.time_left() {
                debug!(
                    "Engine {} ran out of time after {} of {} items",
                    name,
                    recommendations.len(),
                    produced
                );
                break;
            }
            if context.allow(&item, name)? {
                recommendations.add(item, PartialScore::new(name, score));
            }
        }
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core::{Config, ItemFilter, RecoError};
    use std::time::Duration;

    struct Fixed(Vec<(u32, f32)>);

    impl SingleScoreEngine<u32, &'static str> for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn score_single(
            &self,
            _input: &&'static str,
            _context: &Context<u32, &'static str>,
        ) -> Result<Vec<(u32, f32)>> {
            Ok(self.0.clone())
        }
    }

    struct NoOdd;

    impl ItemFilter<u32> for NoOdd {
        fn allow(&self, item: &u32, _task: &str) -> bool {
            item % 2 == 0
        }

        fn disallow(&self, _item: &u32) -> reco_core::Result<()> {
            Err(RecoError::Unsupported("NoOdd".to_string()))
        }
    }

    #[test]
    fn test_single_score_attributes_component_to_engine() {
        let engine = SingleScore::new(Fixed(vec![(1, 3.0), (2, 5.0), (1, 1.0)]));
        let context = Context::new("user", Config::new(10));

        let mut recommendations = engine.recommend(&"user", &context).unwrap();

        assert_eq!(engine.name(), "fixed");
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations.get(&1).and_then(|s| s.get("fixed")), Some(4.0));
        let ranked: Vec<u32> = recommendations.top(2).iter().map(|r| *r.item()).collect();
        assert_eq!(ranked, vec![2, 1]);
    }

    #[test]
    fn test_single_score_skips_disallowed_items() {
        let engine = SingleScore::new(Fixed(vec![(1, 3.0), (2, 5.0), (4, 1.0)]));
        let context = Context::with_filter("user", Config::new(10), NoOdd);

        let recommendations = engine.recommend(&"user", &context).unwrap();

        assert!(!recommendations.contains(&1));
        assert_eq!(recommendations.len(), 2);
    }

    #[test]
    fn test_single_score_stops_when_out_of_time() {
        let engine = SingleScore::new(Fixed(vec![(1, 3.0), (2, 5.0)]));
        let context = Context::new("user", Config::new(10).with_max_time(Duration::ZERO));

        let recommendations = engine.recommend(&"user", &context).unwrap();

        assert!(recommendations.is_empty());
    }

    #[test]
    fn test_boxed_engine_delegates() {
        let engine: Box<dyn Engine<u32, &'static str>> =
            Box::new(SingleScore::new(Fixed(vec![(7, 1.0)])));
        let context = Context::new("user", Config::new(10));

        assert_eq!(engine.name(), "fixed");
        assert_eq!(engine.recommend(&"user", &context).unwrap().len(), 1);
    }
}
