//! # Reco Core
//!
//! Shared building blocks for the recommendation pipeline.
//!
//! ## Main Components
//!
//! - **types**: `Item` bound and `PartialScore`, a score with named components
//! - **recommendations**: `Recommendations`, the ranked, deduplicated result container
//! - **config**: `Config`, immutable per-request settings (`limit`, `max_time`)
//! - **statistics**: `Statistics`, thread-safe per-request counters and timers
//! - **context**: `Context`, binding input, config, statistics and an item filter
//! - **error**: Error types for the core
//!
//! ## Example Usage
//!
//! ```
//! use reco_core::{Config, Context, PartialScore, Recommendations};
//!
//! let context: Context<&str, u32> = Context::new(1, Config::new(2));
//!
//! let mut recommendations = Recommendations::new();
//! recommendations.add("vince", PartialScore::new("friends", 3.0));
//! recommendations.add("adam", PartialScore::new("friends", 1.0));
//! recommendations.add("vince", PartialScore::new("likes", 2.0));
//!
//! let best = recommendations.top(context.config().limit());
//! assert_eq!(*best[0].item(), "vince");
//! assert_eq!(best[0].total(), 5.0);
//! ```

// Public modules
pub mod config;
pub mod context;
pub mod error;
pub mod recommendations;
pub mod statistics;
pub mod types;

// Re-export commonly used types for convenience
pub use config::Config;
pub use context::{AllowAll, Context, ItemFilter};
pub use error::{BoundKind, RecoError, Result};
pub use recommendations::{Recommendation, Recommendations};
pub use statistics::{
    CANDIDATE_COUNT, FAILURE_COUNT, Statistics, StatisticsSnapshot, TOTAL_TIME,
};
pub use types::{Item, PartialScore};
