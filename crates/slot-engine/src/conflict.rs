//! Detect overlaps between placed time and the busy calendar.
//!
//! Adjacent ranges (one ends exactly when the other starts) are NOT conflicts.

use serde::Serialize;

use crate::interval::TimeRange;

/// An overlap between a range from each side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub a: TimeRange,
    pub b: TimeRange,
    pub overlap_minutes: i64,
}

/// Find all pairwise overlaps between two range lists.
///
/// The overlap of `a` and `b` is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn find_conflicts(ranges_a: &[TimeRange], ranges_b: &[TimeRange]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for a in ranges_a {
        for b in ranges_b {
            if let Some(overlap) = a.intersection(b) {
                conflicts.push(Conflict {
                    a: *a,
                    b: *b,
                    overlap_minutes: overlap.duration().num_minutes(),
                });
            }
        }
    }

    conflicts
}

/// True when no range of `ranges` overlaps another one of the same list.
pub fn is_disjoint(ranges: &[TimeRange]) -> bool {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| (r.start, r.end));
    sorted.windows(2).all(|w| w[0].end <= w[1].start)
}
