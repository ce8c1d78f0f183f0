//! Post-processing pipeline for ranked recommendations.
//!
//! This crate provides:
//! - PostProcessor trait for stages that adjust already-scored recommendations
//! - ScoreBounds, the worst-case score movement a stage declares up front
//! - PostProcessingPipeline for composing post-processors
//!
//! ## Architecture
//! Post-processing happens after candidates have been merged and ranked:
//! 1. Every post-processor declares its bounds; invalid bounds abort the request
//! 2. The caller uses the summed bounds to decide how many candidates need
//!    post-processing at all
//! 3. Post-processors run one after the other over that prefix
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::PostProcessingPipeline;
//!
//! let pipeline = PostProcessingPipeline::new()
//!     .add_post_processor(PenaliseSeen::new(-10.0))
//!     .add_post_processor(BoostFriends::new(5.0));
//!
//! let bounds = pipeline.bounds(&input, &context)?;
//! pipeline.apply(&mut recommendations, &input, &context)?;
//! ```

pub mod traits;
pub mod post_pipeline;

// Re-export main types
pub use traits::{PostProcessor, ScoreBounds};
pub use post_pipeline::PostProcessingPipeline;
