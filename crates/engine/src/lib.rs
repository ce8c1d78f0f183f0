//! # Engine Crate
//!
//! This crate implements recommendation engines and the composite engine
//! that ties them together.
//!
//! ## Components
//!
//! ### Engine capability
//! - `Engine`: produce `Recommendations` for an input and a context
//! - `SingleScoreEngine` + `SingleScore`: the common case of one score per item
//!
//! ### Delegating engine
//! - Fans out to any number of sub-engines (sequentially or on rayon)
//! - Merges and ranks their output
//! - Post-processes only the safe prefix of the ranking (`pruning`)
//!
//! ## Example Usage
//!
//! ```ignore
//! use engine::{DelegatingEngine, Engine, FanOut, SingleScore};
//! use reco_core::{Config, Context};
//!
//! let engine = DelegatingEngine::new()
//!     .add_engine(SingleScore::new(FriendsInCommon::new(graph.clone())))
//!     .add_engine(SingleScore::new(SharedInterests::new(graph.clone())))
//!     .add_post_processor(PenaliseAlreadyFriends::new(graph.clone()))
//!     .with_fan_out(FanOut::Parallel);
//!
//! let context = Context::new(person, Config::new(10));
//! let mut recommendations = engine.recommend(&person, &context)?;
//! let top = recommendations.top(context.config().limit());
//! ```

// Public modules
pub mod delegating;
pub mod pruning;
pub mod traits;

// Re-export commonly used types
pub use delegating::{
    DelegatingEngine, FailurePolicy, FanOut, MERGED_COUNT, SAFE_PREFIX, SKIPPED_COUNT,
};
pub use pruning::safe_prefix_len;
pub use traits::{Engine, SingleScore, SingleScoreEngine};
