//! # Delegating Engine
//!
//! This module coordinates the whole recommendation computation:
//! 1. Fan out to every registered sub-engine (sequentially or in parallel)
//! 2. Merge their recommendations, summing scores of shared items
//! 3. Rank the merged candidates
//! 4. Validate the bounds declared by the post-processors
//! 5. Compute the safe prefix and drop everything after it
//! 6. Run the post-processors over the prefix
//! 7. Re-rank and return the prefix
//!
//! The result is not cut down to `Config::limit`; it is the smallest set
//! for which the top `limit` is guaranteed correct, and the caller does the
//! final truncation. A `DelegatingEngine` is itself an `Engine`, so
//! composites nest.

use std::time::Instant;

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use pipeline::{PostProcessingPipeline, PostProcessor};
use reco_core::{
    CANDIDATE_COUNT, Context, FAILURE_COUNT, Item, RecoError, Recommendations,
};

use crate::pruning::safe_prefix_len;
use crate::traits::Engine;

/// Statistics key for the number of distinct candidates after merging.
pub const MERGED_COUNT: &str = "merged";

/// Statistics key for the size of the post-processed prefix.
pub const SAFE_PREFIX: &str = "safe_prefix";

/// Statistics key for sub-engines skipped because the time budget ran out.
pub const SKIPPED_COUNT: &str = "skipped";

/// What to do when a sub-engine returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, discard the engine's whole contribution and carry on
    #[default]
    Isolate,
    /// Abort the request with `RecoError::EngineFailed`
    Propagate,
}

/// How sub-engines are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOut {
    /// One after the other on the calling thread
    #[default]
    Sequential,
    /// Concurrently on the rayon thread pool
    Parallel,
}

/// Composite engine that delegates to sub-engines and post-processes the
/// merged result.
pub struct DelegatingEngine<I: Item, In> {
    name: String,
    engines: Vec<Box<dyn Engine<I, In>>>,
    post_processing: PostProcessingPipeline<I, In>,
    failure_policy: FailurePolicy,
    fan_out: FanOut,
}

impl<I: Item, In> DelegatingEngine<I, In> {
    /// Create an empty engine named `"delegating"`.
    pub fn new() -> Self {
        Self {
            name: "delegating".to_string(),
            engines: Vec::new(),
            post_processing: PostProcessingPipeline::new(),
            failure_policy: FailurePolicy::default(),
            fan_out: FanOut::default(),
        }
    }

    /// Create an empty engine with a custom name, used when nesting.
    pub fn named(name: impl Into<String>) -> reco_core::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RecoError::InvalidArgument(
                "engine name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            ..Self::new()
        })
    }

    /// Register a sub-engine (builder pattern).
    pub fn add_engine(mut self, engine: impl Engine<I, In> + 'static) -> Self {
        self.engines.push(Box::new(engine));
        self
    }

    /// Register a post-processor after those already registered.
    pub fn add_post_processor(mut self, post_processor: impl PostProcessor<I, In> + 'static) -> Self {
        self.post_processing = self.post_processing.add_post_processor(post_processor);
        self
    }

    /// Register several post-processors, keeping their order.
    pub fn add_post_processors(
        mut self,
        post_processors: impl IntoIterator<Item = Box<dyn PostProcessor<I, In>>>,
    ) -> Self {
        self.post_processing = self.post_processing.add_post_processors(post_processors);
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    pub fn post_processor_count(&self) -> usize {
        self.post_processing.len()
    }
}

impl<I: Item, In: Sync> DelegatingEngine<I, In> {
    /// Run every sub-engine and merge what they produced.
    ///
    /// Results are merged on the calling thread in registration order, so the
    /// merged order does not depend on the fan-out mode.
    fn gather(&self, input: &In, context: &Context<I, In>) -> Result<Recommendations<I>> {
        let outcomes: Vec<Option<Result<Recommendations<I>>>> = match self.fan_out {
            FanOut::Sequential => {
                let mut outcomes = Vec::with_capacity(self.engines.len());
                let mut exhausted = false;
                for engine in &self.engines {
                    // Once the budget runs out every remaining engine is skipped
                    if exhausted {
                        outcomes.push(None);
                        continue;
                    }
                    let outcome = self.run_engine(engine.as_ref(), input, context);
                    exhausted = outcome.is_none();
                    outcomes.push(outcome);
                }
                outcomes
            }
            FanOut::Parallel => self
                .engines
                .par_iter()
                .map(|engine| self.run_engine(engine.as_ref(), input, context))
                .collect(),
        };

        let mut merged = Recommendations::new();
        for (engine, outcome) in self.engines.iter().zip(outcomes) {
            match outcome {
                Some(Ok(recommendations)) => merged.add_all(recommendations),
                Some(Err(err)) => match self.failure_policy {
                    FailurePolicy::Isolate => {
                        warn!("Engine {} failed, discarding its results: {:#}", engine.name(), err);
                        context
                            .statistics()
                            .increment_counter(engine.name(), FAILURE_COUNT);
                    }
                    FailurePolicy::Propagate => {
                        return Err(RecoError::EngineFailed {
                            engine: engine.name().to_string(),
                            reason: format!("{:#}", err),
                        }
                        .into());
                    }
                },
                None => {
                    context
                        .statistics()
                        .increment_counter(engine.name(), SKIPPED_COUNT);
                }
            }
        }
        Ok(merged)
    }

    /// Run one sub-engine, recording its time and candidate count.
    ///
    /// Returns `None` if the time budget was exhausted before it started.
    fn run_engine(
        &self,
        engine: &dyn Engine<I, In>,
        input: &In,
        context: &Context<I, In>,
    ) -> Option<Result<Recommendations<I>>> {
        if !context.time_left() {
            debug!("Time budget exhausted, skipping engine {}", engine.name());
            return None;
        }

        let start = Instant::now();
        let outcome = engine.recommend(input, context);
        context.statistics().add_time(engine.name(), start.elapsed());

        if let Ok(recommendations) = &outcome {
            debug!(
                "Engine {} produced {} candidates",
                engine.name(),
                recommendations.len()
            );
            context.statistics().add_value(
                engine.name(),
                CANDIDATE_COUNT,
                recommendations.len() as i64,
            );
        }
        Some(outcome)
    }
}

impl<I: Item, In: Sync> Engine<I, In> for DelegatingEngine<I, In> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(engine = %self.name))]
    fn recommend(&self, input: &In, context: &Context<I, In>) -> Result<Recommendations<I>> {
        let start = Instant::now();

        // Fan out and merge
        let mut recommendations = self.gather(input, context)?;
        recommendations.sort();
        let candidates = recommendations.len();

        // Bounds are checked before anything is post-processed
        let bounds = self.post_processing.bounds(input, context)?;

        let safe = safe_prefix_len(&recommendations.scores(), context.config().limit(), bounds);
        debug!(
            "Post-processing {} of {} candidates (limit: {}, bounds: [{}, {}])",
            safe,
            candidates,
            context.config().limit(),
            bounds.max_positive,
            bounds.max_negative
        );
        context
            .statistics()
            .add_value(&self.name, MERGED_COUNT, candidates as i64);
        context
            .statistics()
            .add_value(&self.name, SAFE_PREFIX, safe as i64);

        recommendations.truncate(safe);
        self.post_processing.apply(&mut recommendations, input, context)?;
        recommendations.sort();

        debug!(
            "Engine {} returned {} recommendations in {:.2?}",
            self.name,
            recommendations.len(),
            start.elapsed()
        );
        Ok(recommendations)
    }
}

impl<I: Item, In> Default for DelegatingEngine<I, In> {
    fn default() -> Self {
        Self::new()
    }
}
