//! The per-request execution context.
//!
//! A `Context` is built once at the root of a request and handed by
//! reference to every engine and post-processor that takes part in it.
//! It binds:
//! - the input recommendations are computed for
//! - the request's `Config`
//! - the request's `Statistics`
//! - an `ItemFilter` deciding which items may be recommended
//!
//! The context itself is read-only. The only mutable parts, statistics and
//! the exclusion state of a blacklisting filter, synchronise internally,
//! so a `&Context` can be shared across parallel engines.

use crate::config::Config;
use crate::error::{RecoError, Result};
use crate::statistics::{Statistics, TOTAL_TIME};
use std::fmt;

/// Policy deciding which items may appear in a request's result.
///
/// `disallow` is allowed to fail for policies that cannot remember
/// exclusions. Implementations must be safe to call from several threads.
pub trait ItemFilter<I>: Send + Sync {
    /// Whether `item` may be recommended by the task named `task`.
    fn allow(&self, item: &I, task: &str) -> bool;

    /// Exclude `item` for the rest of the request.
    fn disallow(&self, item: &I) -> Result<()>;
}

/// The simplest policy: every item is allowed, nothing can be excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl<I> ItemFilter<I> for AllowAll {
    fn allow(&self, _item: &I, _task: &str) -> bool {
        true
    }

    fn disallow(&self, _item: &I) -> Result<()> {
        Err(RecoError::Unsupported(
            "this context does not support blacklisting items; build it with a filtering policy"
                .to_string(),
        ))
    }
}

/// Execution context for one recommendation request.
pub struct Context<I, In> {
    input: In,
    config: Config,
    statistics: Statistics,
    filter: Box<dyn ItemFilter<I>>,
}

impl<I, In: fmt::Debug> Context<I, In> {
    /// Context that allows every item and cannot blacklist.
    pub fn new(input: In, config: Config) -> Self {
        Self::with_filter(input, config, AllowAll)
    }

    /// Context delegating allow/disallow decisions to `filter`.
    pub fn with_filter(input: In, config: Config, filter: impl ItemFilter<I> + 'static) -> Self {
        let statistics = Statistics::new(format!("{:?}", input));
        Self {
            input,
            config,
            statistics,
            filter: Box::new(filter),
        }
    }
}

impl<I, In> Context<I, In> {
    pub fn input(&self) -> &In {
        &self.input
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Whether the request is still within `Config::max_time`.
    ///
    /// Cooperative only: engines are expected to poll this and stop
    /// producing new candidates once it turns false.
    pub fn time_left(&self) -> bool {
        self.config.max_time() > self.statistics.get_time(TOTAL_TIME)
    }

    /// Whether `item` may be recommended by `task`.
    ///
    /// Fails if `task` is empty.
    pub fn allow(&self, item: &I, task: &str) -> Result<bool> {
        if task.is_empty() {
            return Err(RecoError::InvalidArgument(
                "task name must not be empty".to_string(),
            ));
        }
        Ok(self.filter.allow(item, task))
    }

    /// Exclude `item` from the rest of the request.
    ///
    /// Fails with `RecoError::Unsupported` unless the context was built with
    /// a filtering policy that can blacklist.
    pub fn disallow(&self, item: &I) -> Result<()> {
        self.filter.disallow(item)
    }
}

impl<I, In: fmt::Debug> fmt::Debug for Context<I, In> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("input", &self.input)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
