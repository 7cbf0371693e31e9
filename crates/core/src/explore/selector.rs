//! Nearest-candidate selection by straight-line distance.

use crate::types::{Candidate, PixelPos};

/// The candidate whose tile center is closest to `observer`, or `None` for an empty list.
///
/// Ties keep the earliest candidate.
pub fn nearest_candidate(observer: PixelPos, candidates: &[Candidate]) -> Option<Candidate> {
    let mut best: Option<(i64, Candidate)> = None;
    for candidate in candidates {
        let dist = observer.distance_squared(candidate.tile.center());
        if best.is_none_or(|(best_dist, _)| dist < best_dist) {
            best = Some((dist, *candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}
