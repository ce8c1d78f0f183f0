//! Safe prefix computation.
//!
//! Post-processing can be expensive, so only a prefix of the ranked
//! candidates is handed to the post-processors. The prefix must be long
//! enough that the top `limit` after post-processing is correct: any
//! candidate left out keeps its original score, so it must be impossible
//! for it to beat the worst case of the current `limit`-th candidate.
//!
//! ## Algorithm
//! 1. If there are no more candidates than `limit`, take them all
//! 2. `floor` = score of the `limit`-th candidate + summed negative bounds
//! 3. Starting at `limit`, extend the prefix while the next candidate's best
//!    case (score + summed positive bounds) reaches `floor`. Reaching it
//!    exactly counts: post-processing does not promise to keep tie order
//! 4. Stop at the end of the candidate list
//!
//! Unbounded post-processors (infinite bounds) therefore expose every
//! candidate.

use pipeline::ScoreBounds;

/// Number of top-ranked candidates that must be post-processed so that the
/// best `limit` are correct afterwards.
///
/// `sorted_scores` must be in descending order.
pub fn safe_prefix_len(sorted_scores: &[f32], limit: usize, bounds: ScoreBounds) -> usize {
    let candidates = sorted_scores.len();
    if candidates <= limit {
        return candidates;
    }
    if limit == 0 {
        return 0;
    }

    let floor = sorted_scores[limit - 1] + bounds.max_negative;

    let mut safe = limit;
    while safe < candidates && sorted_scores[safe] + bounds.max_positive >= floor {
        safe += 1;
    }
    safe
}
