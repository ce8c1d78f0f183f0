//! Error types for the reco-core crate.
//!
//! Everything the core can refuse is listed here. Plugins (engines and
//! post-processors) report their own failures through `anyhow`, and the
//! orchestration layer wraps these typed errors into `anyhow::Error` so
//! callers can recover them with `downcast_ref::<RecoError>()`.

use std::fmt;

use thiserror::Error;

/// Which side of a post-processor's declared score range is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// The largest amount a post-processor may add to a score (must be `>= 0`).
    Positive,
    /// The largest amount a post-processor may subtract (must be `<= 0`).
    Negative,
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundKind::Positive => write!(f, "maximum positive score"),
            BoundKind::Negative => write!(f, "maximum negative score"),
        }
    }
}

/// Errors raised by the recommendation core.
#[derive(Error, Debug)]
pub enum RecoError {
    /// A caller passed an unusable argument (empty task name, empty engine name, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A post-processor declared a bound with the wrong sign, or NaN.
    ///
    /// Raised before any post-processor runs, so no mutation has happened.
    #[error("Post-processor {post_processor} declared an invalid {kind}: {value}")]
    InvalidBound {
        post_processor: String,
        kind: BoundKind,
        value: f32,
    },

    /// The context's filtering policy cannot perform the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A sub-engine failed and the composite was configured to propagate failures
    #[error("Engine {engine} failed: {reason}")]
    EngineFailed { engine: String, reason: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, RecoError>;
