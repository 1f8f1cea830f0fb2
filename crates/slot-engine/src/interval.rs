//! Time ranges and busy-interval normalization.
//!
//! A [`TimeRange`] is a half-open `[start, end)` span between two UTC instants.
//! [`merge`] turns an arbitrary collection of busy ranges (unsorted, overlapping,
//! touching) into the minimal sorted, non-overlapping sequence covering the same
//! instants.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// A half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting `end < start`.
    ///
    /// A zero-length range (`start == end`) is accepted; [`merge`] drops it.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Parse a range from two RFC 3339 strings. Any offset is accepted and
    /// normalized to UTC; strings without an offset are rejected.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_instant(start)?, parse_instant(end)?)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when the two ranges share at least one instant.
    /// Touching ranges (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `other` lies entirely inside this range.
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// The overlapping part of two ranges, if any.
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeRange { start, end })
    }

    fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(SlotError::InvalidInterval(format!(
                "end {} is before start {}",
                self.end.to_rfc3339(),
                self.start.to_rfc3339()
            )));
        }
        Ok(())
    }
}

/// Parse an RFC 3339 instant with an explicit offset into UTC.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SlotError::InvalidInterval(format!("'{}' is not an RFC 3339 instant: {}", s, e)))
}

/// Merge busy intervals into a sorted, non-overlapping sequence.
///
/// Overlapping and touching intervals (`a.end == b.start`) collapse into one.
/// Zero-length intervals are dropped. The result does not depend on input order.
///
/// # Errors
/// Returns `SlotError::InvalidInterval` if any interval has `end < start`.
pub fn merge(intervals: &[TimeRange]) -> Result<Vec<TimeRange>> {
    for interval in intervals {
        interval.validate()?;
    }

    let mut sorted: Vec<TimeRange> = intervals.iter().copied().filter(|r| !r.is_empty()).collect();
    sorted.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        if let Some(last) = merged.last_mut() {
            if range.start <= last.end {
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }

    Ok(merged)
}

/// Merge busy intervals and clip the result to `bounding`, discarding
/// anything entirely outside it.
pub fn merge_clipped(intervals: &[TimeRange], bounding: &TimeRange) -> Result<Vec<TimeRange>> {
    Ok(merge(intervals)?
        .iter()
        .filter_map(|r| r.intersection(bounding))
        .collect())
}
