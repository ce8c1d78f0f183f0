//! The PostProcessingPipeline orchestrates multiple post-processors.
//!
//! This module provides the main PostProcessingPipeline struct that chains
//! post-processors together using the builder pattern. Post-processors run
//! strictly one after the other, in registration order, since later stages
//! may depend on what earlier ones did.

use crate::traits::{PostProcessor, ScoreBounds};
use anyhow::{Context as _, Result};
use reco_core::{Context, Item, Recommendations};

/// Chains multiple post-processors together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = PostProcessingPipeline::new()
///     .add_post_processor(PenaliseSeen::new(-10.0))
///     .add_post_processor(BoostFriends::new(5.0));
///
/// let bounds = pipeline.bounds(&input, &context)?;
/// pipeline.apply(&mut recommendations, &input, &context)?;
/// ```
pub struct PostProcessingPipeline<I: Item, In> {
    post_processors: Vec<Box<dyn PostProcessor<I, In>>>,
}

impl<I: Item, In> PostProcessingPipeline<I, In> {
    /// Create a new empty PostProcessingPipeline.
    pub fn new() -> Self {
        Self {
            post_processors: Vec::new(),
        }
    }

    /// Add a post-processor to the end of the pipeline (builder pattern).
    pub fn add_post_processor(mut self, post_processor: impl PostProcessor<I, In> + 'static) -> Self {
        self.post_processors.push(Box::new(post_processor));
        self
    }

    /// Append already boxed post-processors, keeping their order.
    pub fn add_post_processors(
        mut self,
        post_processors: impl IntoIterator<Item = Box<dyn PostProcessor<I, In>>>,
    ) -> Self {
        self.post_processors.extend(post_processors);
        self
    }

    pub fn len(&self) -> usize {
        self.post_processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.post_processors.is_empty()
    }

    /// Names of the registered post-processors, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.post_processors.iter().map(|p| p.name())
    }

    /// Validate and sum the declared bounds of every post-processor.
    ///
    /// ## Errors
    /// A `reco_core::RecoError::InvalidBound` (inside the `anyhow::Error`) as
    /// soon as one post-processor declares a positive bound below zero, a
    /// negative bound above zero, or NaN.
    pub fn bounds(&self, input: &In, context: &Context<I, In>) -> Result<ScoreBounds> {
        let mut total = ScoreBounds::ZERO;
        for post_processor in &self.post_processors {
            let bounds = ScoreBounds::of(post_processor.as_ref(), input, context)?;
            tracing::debug!(
                "Post-processor {} declared bounds [{}, {}]",
                post_processor.name(),
                bounds.max_positive,
                bounds.max_negative
            );
            total = total.combine(bounds);
        }
        Ok(total)
    }

    /// Run all post-processors in sequence over the recommendations.
    ///
    /// ## Algorithm
    /// 1. For each post-processor in order:
    ///    a. Log name and input count
    ///    b. Post-process in place, timing the stage into the statistics
    ///    c. Log output count
    /// 2. Stop at the first failure and return it
    pub fn apply(
        &self,
        recommendations: &mut Recommendations<I>,
        input: &In,
        context: &Context<I, In>,
    ) -> Result<()> {
        for post_processor in &self.post_processors {
            tracing::debug!(
                "Applying post-processor: {} (input count: {})",
                post_processor.name(),
                recommendations.len()
            );
            context.statistics().start_timing(post_processor.name());
            let outcome = post_processor.post_process(recommendations, input, context);
            context.statistics().stop_timing(post_processor.name());
            outcome.with_context(|| format!("Post-processor {} failed", post_processor.name()))?;
            tracing::debug!(
                "Post-processor applied: {} (output count: {})",
                post_processor.name(),
                recommendations.len()
            );
        }
        Ok(())
    }
}

impl<I: Item, In> Default for PostProcessingPipeline<I, In> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core::{Config, PartialScore, RecoError};

    /// Adds a fixed bonus to every item.
    struct Bonus(f32);

    impl PostProcessor<&'static str, u32> for Bonus {
        fn name(&self) -> &str {
            "bonus"
        }

        fn max_positive_score(&self, _input: &u32, _context: &Context<&'static str, u32>) -> f32 {
            self.0
        }

        fn max_negative_score(&self, _input: &u32, _context: &Context<&'static str, u32>) -> f32 {
            0.0
        }

        fn post_process(
            &self,
            recommendations: &mut Recommendations<&'static str>,
            _input: &u32,
            _context: &Context<&'static str, u32>,
        ) -> Result<()> {
            let items: Vec<_> = recommendations.items().copied().collect();
            for item in items {
                recommendations.add_score(item, "bonus", self.0);
            }
            Ok(())
        }
    }

    /// Declares a positive bound below zero.
    struct Broken;

    impl PostProcessor<&'static str, u32> for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn max_positive_score(&self, _input: &u32, _context: &Context<&'static str, u32>) -> f32 {
            -1.0
        }

        fn max_negative_score(&self, _input: &u32, _context: &Context<&'static str, u32>) -> f32 {
            0.0
        }

        fn post_process(
            &self,
            _recommendations: &mut Recommendations<&'static str>,
            _input: &u32,
            _context: &Context<&'static str, u32>,
        ) -> Result<()> {
            anyhow::bail!("broken post-processor ran")
        }
    }

    fn sample() -> Recommendations<&'static str> {
        [("a", 3.0), ("b", 2.0)]
            .into_iter()
            .map(|(item, score)| (item, PartialScore::new("score", score)))
            .collect()
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline: PostProcessingPipeline<&'static str, u32> = PostProcessingPipeline::new();
        let context = Context::new(1, Config::new(2));
        let mut recommendations = sample();

        assert_eq!(pipeline.bounds(&1, &context).unwrap(), ScoreBounds::ZERO);
        pipeline.apply(&mut recommendations, &1, &context).unwrap();
        assert_eq!(recommendations.len(), 2);
    }

    #[test]
    fn test_post_processors_run_in_order() {
        let pipeline = PostProcessingPipeline::new()
            .add_post_processor(Bonus(1.0))
            .add_post_processor(Bonus(2.0));
        let context = Context::new(1, Config::new(2));
        let mut recommendations = sample();

        assert_eq!(pipeline.names().collect::<Vec<_>>(), vec!["bonus", "bonus"]);
        assert_eq!(pipeline.bounds(&1, &context).unwrap(), ScoreBounds::new(3.0, 0.0));

        pipeline.apply(&mut recommendations, &1, &context).unwrap();
        assert_eq!(recommendations.get(&"a").map(PartialScore::total), Some(6.0));
        assert_eq!(recommendations.get(&"b").and_then(|s| s.get("bonus")), Some(3.0));
    }

    #[test]
    fn test_invalid_bound_is_reported() {
        let pipeline = PostProcessingPipeline::new()
            .add_post_processor(Bonus(1.0))
            .add_post_processor(Broken);
        let context = Context::new(1, Config::new(2));

        let err = pipeline.bounds(&1, &context).unwrap_err();
        match err.downcast_ref::<RecoError>() {
            Some(RecoError::InvalidBound { post_processor, .. }) => {
                assert_eq!(post_processor, "broken")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_failure_names_the_post_processor() {
        let pipeline = PostProcessingPipeline::new().add_post_processor(Broken);
        let context = Context::new(1, Config::new(2));
        let mut recommendations = sample();

        let err = pipeline.apply(&mut recommendations, &1, &context).unwrap_err();
        assert_eq!(err.to_string(), "Post-processor broken failed");
    }
}
