//! Core traits for the post-processing pipeline.
//!
//! This module defines the PostProcessor trait: a stage that adjusts the
//! scores of already-ranked recommendations, and declares up front how far
//! it can move any single score in either direction.

use anyhow::Result;
use reco_core::{BoundKind, Context, Item, RecoError, Recommendations};

/// Core trait for post-processing recommendations.
///
/// ## Design Note
/// - `Send + Sync` allows post-processors to be shared by concurrent requests
/// - The bounds are queried once per request, before any post-processor runs,
///   and let the caller skip candidates that provably cannot reach the top
/// - `post_process` mutates in place and must not introduce duplicate items
///   (use `Recommendations::add`, which merges)
pub trait PostProcessor<I: Item, In>: Send + Sync {
    /// Returns the name of this post-processor (for logging and statistics)
    fn name(&self) -> &str;

    /// Largest amount this post-processor may add to any single score.
    ///
    /// Must be `>= 0`; `f32::INFINITY` means unbounded.
    fn max_positive_score(&self, input: &In, context: &Context<I, In>) -> f32;

    /// Largest amount this post-processor may subtract from any single score.
    ///
    /// Must be `<= 0`; `f32::NEG_INFINITY` means unbounded.
    fn max_negative_score(&self, input: &In, context: &Context<I, In>) -> f32;

    /// Adjust `recommendations` in place.
    ///
    /// May remove items, typically after excluding them with
    /// `context.disallow`.
    fn post_process(
        &self,
        recommendations: &mut Recommendations<I>,
        input: &In,
        context: &Context<I, In>,
    ) -> Result<()>;
}

/// Worst-case score movement a post-processor (or a chain of them) may cause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBounds {
    pub max_positive: f32,
    pub max_negative: f32,
}

impl ScoreBounds {
    /// Bounds of a stage that never changes scores.
    pub const ZERO: ScoreBounds = ScoreBounds {
        max_positive: 0.0,
        max_negative: 0.0,
    };

    /// Bounds of a stage that may move scores arbitrarily.
    pub const UNBOUNDED: ScoreBounds = ScoreBounds {
        max_positive: f32::INFINITY,
        max_negative: f32::NEG_INFINITY,
    };

    pub fn new(max_positive: f32, max_negative: f32) -> Self {
        Self {
            max_positive,
            max_negative,
        }
    }

    /// Query and validate the bounds of a single post-processor.
    ///
    /// NaN is rejected on both sides.
    pub fn of<I: Item, In>(
        post_processor: &dyn PostProcessor<I, In>,
        input: &In,
        context: &Context<I, In>,
    ) -> reco_core::Result<Self> {
        let max_positive = post_processor.max_positive_score(input, context);
        if max_positive.is_nan() || max_positive < 0.0 {
            return Err(RecoError::InvalidBound {
                post_processor: post_processor.name().to_string(),
                kind: BoundKind::Positive,
                value: max_positive,
            });
        }

        let max_negative = post_processor.max_negative_score(input, context);
        if max_negative.is_nan() || max_negative > 0.0 {
            return Err(RecoError::InvalidBound {
                post_processor: post_processor.name().to_string(),
                kind: BoundKind::Negative,
                value: max_negative,
            });
        }

        Ok(Self::new(max_positive, max_negative))
    }

    /// Bounds of two stages applied one after the other.
    ///
    /// Positive and negative sides are summed separately, so infinities of
    /// opposite sign never meet and the result is never NaN.
    pub fn combine(self, other: ScoreBounds) -> ScoreBounds {
        ScoreBounds {
            max_positive: self.max_positive + other.max_positive,
            max_negative: self.max_negative + other.max_negative,
        }
    }
}

impl Default for ScoreBounds {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_sums_each_side() {
        let bounds = ScoreBounds::new(4.0, -5.0).combine(ScoreBounds::new(5.0, -5.0));
        assert_eq!(bounds, ScoreBounds::new(9.0, -10.0));
    }

    #[test]
    fn test_combine_with_unbounded_stays_infinite() {
        let bounds = ScoreBounds::UNBOUNDED
            .combine(ScoreBounds::UNBOUNDED)
            .combine(ScoreBounds::ZERO);
        assert_eq!(bounds.max_positive, f32::INFINITY);
        assert_eq!(bounds.max_negative, f32::NEG_INFINITY);
    }
}
