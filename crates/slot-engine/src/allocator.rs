//! Deterministic chunk allocation over free windows.
//!
//! Places blocks of new time into the free windows of each calendar date,
//! visiting dates in round-robin so a target total is spread across days
//! rather than piled onto the first day with room. Because each placed chunk
//! becomes a weekly recurrence, a date prefers the time that is also free on
//! every other occurrence of its weekday inside the horizon, and falls back to
//! its own free time when that common part is too small.
//!
//! The result is feasible and reproducible, not globally optimal. When the
//! free capacity cannot absorb the whole target the allocation is returned
//! partial together with the unmet remainder.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::gaps::{self, FreeWindow};
use crate::interval::TimeRange;

/// What to allocate and under which constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRequest {
    total: Duration,
    min_chunk: Duration,
    max_chunk: Duration,
    bounding: TimeRange,
    reference_offset: FixedOffset,
    week_start: Weekday,
}

impl ChunkRequest {
    /// Build a request, checking `0 < min_chunk <= max_chunk` and `total > 0`.
    ///
    /// # Errors
    /// Returns `SlotError::InvalidRequest` when a duration bound is violated and
    /// `SlotError::EmptyRange` when `bounding` is empty or inverted.
    pub fn new(
        total: Duration,
        min_chunk: Duration,
        max_chunk: Duration,
        bounding: TimeRange,
        reference_offset: FixedOffset,
    ) -> Result<Self> {
        if total <= Duration::zero() {
            return Err(SlotError::InvalidRequest(format!(
                "total duration must be positive, got {} minutes",
                total.num_minutes()
            )));
        }
        if min_chunk <= Duration::zero() {
            return Err(SlotError::InvalidRequest(format!(
                "minimum chunk must be positive, got {} minutes",
                min_chunk.num_minutes()
            )));
        }
        if min_chunk > max_chunk {
            return Err(SlotError::InvalidRequest(format!(
                "minimum chunk ({} min) exceeds maximum chunk ({} min)",
                min_chunk.num_minutes(),
                max_chunk.num_minutes()
            )));
        }
        if bounding.end <= bounding.start {
            return Err(SlotError::EmptyRange(format!(
                "bounding range [{}, {}) is empty",
                bounding.start.to_rfc3339(),
                bounding.end.to_rfc3339()
            )));
        }

        Ok(Self {
            total,
            min_chunk,
            max_chunk,
            bounding,
            reference_offset,
            week_start: Weekday::Mon,
        })
    }

    /// Use a week that starts on `week_start` instead of Monday.
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn min_chunk(&self) -> Duration {
        self.min_chunk
    }

    pub fn max_chunk(&self) -> Duration {
        self.max_chunk
    }

    pub fn bounding(&self) -> &TimeRange {
        &self.bounding
    }

    pub fn reference_offset(&self) -> FixedOffset {
        self.reference_offset
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }
}

/// A placed block of time on one calendar date. Times are in the reference
/// offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledChunk {
    weekday: Weekday,
    date: NaiveDate,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    duration_minutes: i64,
}

impl ScheduledChunk {
    pub(crate) fn new(date: NaiveDate, range: TimeRange, offset: FixedOffset) -> Self {
        Self::from_parts(
            date.weekday(),
            date,
            range.start.with_timezone(&offset),
            range.end.with_timezone(&offset),
        )
    }

    /// Unchecked constructor; the weekday is not reconciled with `start`.
    pub(crate) fn from_parts(
        weekday: Weekday,
        date: NaiveDate,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            weekday,
            date,
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    /// Date the chunk was placed on; its first occurrence.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start.time()
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end.time()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start.to_utc(),
            end: self.end.to_utc(),
        }
    }
}

/// Outcome of [`allocate`]: the placed chunks (in placement order) and the
/// part of the target that did not fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub chunks: Vec<ScheduledChunk>,
    pub remaining: Duration,
}

impl Allocation {
    pub fn placed(&self) -> Duration {
        self.chunks
            .iter()
            .fold(Duration::zero(), |acc, c| acc + c.duration())
    }

    pub fn is_complete(&self) -> bool {
        self.remaining <= Duration::zero()
    }

    pub fn report(&self) -> FeasibilityReport {
        FeasibilityReport {
            fully_allocated: self.is_complete(),
            placed_minutes: self.placed().num_minutes(),
            remaining_minutes: self.remaining.num_minutes().max(0),
        }
    }

    /// Chunks ordered by weekday within a week starting at `week_start`,
    /// then by start time and date.
    pub fn in_week_order(&self, week_start: Weekday) -> Vec<ScheduledChunk> {
        let mut chunks = self.chunks.clone();
        chunks.sort_by_key(|c| (days_since(week_start, c.weekday), c.start_time(), c.date));
        chunks
    }
}

/// Whether the requested total fit, and how much did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub fully_allocated: bool,
    pub placed_minutes: i64,
    pub remaining_minutes: i64,
}

/// Remaining capacity of one calendar date during allocation.
#[derive(Debug)]
struct DayCapacity {
    date: NaiveDate,
    /// Sorted by start, non-overlapping, all on `date`.
    windows: Vec<TimeRange>,
    /// The part of `windows` that is also free on every other occurrence of
    /// the weekday inside the horizon.
    recurring: Vec<TimeRange>,
}

impl DayCapacity {
    /// Window to carve from next: the largest recurring window when it fits
    /// `min_chunk`, otherwise the largest window of the date.
    fn next_window(&self, min_chunk: Duration) -> Option<TimeRange> {
        largest_window(&self.recurring)
            .filter(|w| w.duration() >= min_chunk)
            .or_else(|| largest_window(&self.windows))
            .filter(|w| w.duration() >= min_chunk)
    }

    fn take(&mut self, carved: &TimeRange) {
        self.windows = subtract(&self.windows, carved);
        self.recurring = subtract(&self.recurring, carved);
    }
}

/// Largest window; ties go to the earliest start.
fn largest_window(windows: &[TimeRange]) -> Option<TimeRange> {
    let mut best: Option<TimeRange> = None;
    for w in windows {
        match best {
            Some(b) if b.duration() >= w.duration() => {}
            _ => best = Some(*w),
        }
    }
    best
}

/// Remove `carved` from a sorted window list, keeping what is left on either side.
fn subtract(windows: &[TimeRange], carved: &TimeRange) -> Vec<TimeRange> {
    let mut out = Vec::with_capacity(windows.len() + 1);
    for w in windows {
        if !w.overlaps(carved) {
            out.push(*w);
            continue;
        }
        if w.start < carved.start {
            out.push(TimeRange {
                start: w.start,
                end: carved.start,
            });
        }
        if carved.end < w.end {
            out.push(TimeRange {
                start: carved.end,
                end: w.end,
            });
        }
    }
    out
}

/// Allocate `request.total()` into chunks placed inside `free_windows`.
///
/// 1. Free windows are grouped by calendar date in the reference offset and
///    dates are visited in ascending order.
/// 2. Each pass visits every date once and carves at most one chunk from the
///    start of its largest window, sized `min(max_chunk, window, remaining)`
///    rounded down to the minute. Time that is free on every occurrence of
///    the date's weekday is preferred while it still fits `min_chunk`.
/// 3. Windows (or carves) shorter than `min_chunk` are skipped.
/// 4. Allocation stops when the target is met, when the remainder drops below
///    `min_chunk`, or after a pass that placed nothing.
///
/// Every chunk lies inside a free window, chunks never overlap, each chunk is
/// within `[min_chunk, max_chunk]`, and every date with a window of at least
/// `min_chunk` receives a chunk before any date receives a second one.
pub fn allocate(free_windows: &[FreeWindow], request: &ChunkRequest) -> Allocation {
    let mut remaining = request.total;
    let mut chunks: Vec<ScheduledChunk> = Vec::new();

    if free_windows.is_empty() {
        return Allocation { chunks, remaining };
    }

    let mut days = daily_capacity(free_windows, request);

    'passes: loop {
        let mut placed_in_pass = false;

        for day in days.iter_mut() {
            if remaining < request.min_chunk {
                break 'passes;
            }
            let Some(window) = day.next_window(request.min_chunk) else {
                continue;
            };

            let size = floor_to_minute(request.max_chunk.min(window.duration()).min(remaining));
            if size < request.min_chunk {
                continue;
            }

            let carved = TimeRange {
                start: window.start,
                end: window.start + size,
            };
            day.take(&carved);

            let chunk = ScheduledChunk::new(day.date, carved, request.reference_offset);
            tracing::debug!(
                date = %chunk.date(),
                start = %chunk.start(),
                minutes = size.num_minutes(),
                "placed chunk"
            );
            chunks.push(chunk);
            remaining -= size;
            placed_in_pass = true;
        }

        if !placed_in_pass {
            break;
        }
    }

    if remaining > Duration::zero() {
        tracing::warn!(
            placed = chunks.len(),
            remaining_minutes = remaining.num_minutes(),
            "allocation is partial"
        );
    }

    Allocation { chunks, remaining }
}

/// Build per-date capacity in ascending date order.
///
/// A date's recurring windows are the time-of-day intersection of its own
/// windows with those of every other occurrence of its weekday in the horizon.
/// A fully busy occurrence empties the recurring windows, never the date.
fn daily_capacity(free_windows: &[FreeWindow], request: &ChunkRequest) -> Vec<DayCapacity> {
    let offset = request.reference_offset;

    // Re-key by local date in the request's offset; windows computed under a
    // different offset are split at this offset's midnights first.
    let mut by_date: BTreeMap<NaiveDate, Vec<TimeRange>> = BTreeMap::new();
    for window in free_windows {
        let Some(clipped) = window.range.intersection(&request.bounding) else {
            continue;
        };
        for piece in gaps::split_at_midnight(clipped, offset) {
            if !piece.range.is_empty() {
                by_date.entry(piece.day).or_default().push(piece.range);
            }
        }
    }
    for windows in by_date.values_mut() {
        windows.sort_by_key(|r| (r.start, r.end));
    }

    let mut occurrences: HashMap<Weekday, Vec<NaiveDate>> = HashMap::new();
    for date in gaps::days_spanned(&request.bounding, offset) {
        occurrences.entry(date.weekday()).or_default().push(date);
    }

    by_date
        .iter()
        .map(|(&date, windows)| {
            let mut common = time_of_day(windows, date, offset);
            let siblings = occurrences
                .get(&date.weekday())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for other in siblings.iter().filter(|d| **d != date) {
                if common.is_empty() {
                    break;
                }
                let theirs = by_date.get(other).map(Vec::as_slice).unwrap_or(&[]);
                common = intersect(&common, &time_of_day(theirs, *other, offset));
            }

            let midnight = gaps::local_midnight(date, offset);
            let recurring = common
                .into_iter()
                .map(|(s, e)| TimeRange {
                    start: midnight + s,
                    end: midnight + e,
                })
                .collect();

            DayCapacity {
                date,
                windows: windows.clone(),
                recurring,
            }
        })
        .collect()
}

/// Windows of one date as offsets from that date's local midnight.
fn time_of_day(
    windows: &[TimeRange],
    date: NaiveDate,
    offset: FixedOffset,
) -> Vec<(Duration, Duration)> {
    let midnight = gaps::local_midnight(date, offset);
    windows
        .iter()
        .map(|w| (w.start - midnight, w.end - midnight))
        .collect()
}

/// Intersect two sorted, non-overlapping interval lists.
fn intersect(a: &[(Duration, Duration)], b: &[(Duration, Duration)]) -> Vec<(Duration, Duration)> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let start = a[i].0.max(b[j].0);
        let end = a[i].1.min(b[j].1);
        if start < end {
            out.push((start, end));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

fn floor_to_minute(d: Duration) -> Duration {
    Duration::minutes(d.num_minutes())
}

/// Days from `week_start` forward to `day` (0..=6).
pub(crate) fn days_since(week_start: Weekday, day: Weekday) -> u32 {
    (day.num_days_from_monday() + 7 - week_start.num_days_from_monday()) % 7
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mins(a: i64, b: i64) -> (Duration, Duration) {
        (Duration::minutes(a), Duration::minutes(b))
    }

    #[test]
    fn intersect_keeps_common_time_only() {
        let a = vec![mins(0, 60), mins(120, 240)];
        let b = vec![mins(30, 150), mins(200, 300)];
        assert_eq!(
            intersect(&a, &b),
            vec![mins(30, 60), mins(120, 150), mins(200, 240)]
        );
    }

    #[test]
    fn intersect_with_empty_is_empty() {
        assert!(intersect(&[mins(0, 60)], &[]).is_empty());
    }

    #[test]
    fn floor_drops_seconds() {
        assert_eq!(
            floor_to_minute(Duration::seconds(90 * 60 + 59)),
            Duration::minutes(90)
        );
    }

    #[test]
    fn days_since_wraps_around_week_start() {
        assert_eq!(days_since(Weekday::Mon, Weekday::Mon), 0);
        assert_eq!(days_since(Weekday::Mon, Weekday::Sun), 6);
        assert_eq!(days_since(Weekday::Sun, Weekday::Mon), 1);
        assert_eq!(days_since(Weekday::Wed, Weekday::Tue), 6);
    }

    fn w(s: &str, e: &str) -> TimeRange {
        TimeRange::parse(s, e).unwrap()
    }

    #[test]
    fn largest_window_prefers_earliest_on_ties() {
        let windows = vec![
            w("2026-03-02T08:00:00Z", "2026-03-02T09:00:00Z"),
            w("2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z"),
            w("2026-03-02T12:00:00Z", "2026-03-02T12:30:00Z"),
        ];
        assert_eq!(largest_window(&windows), Some(windows[0]));
        assert_eq!(largest_window(&[]), None);
    }

    #[test]
    fn subtract_splits_around_the_carve() {
        let windows = vec![
            w("2026-03-02T08:00:00Z", "2026-03-02T12:00:00Z"),
            w("2026-03-02T14:00:00Z", "2026-03-02T15:00:00Z"),
        ];
        let carved = w("2026-03-02T09:00:00Z", "2026-03-02T10:00:00Z");
        assert_eq!(
            subtract(&windows, &carved),
            vec![
                w("2026-03-02T08:00:00Z", "2026-03-02T09:00:00Z"),
                w("2026-03-02T10:00:00Z", "2026-03-02T12:00:00Z"),
                w("2026-03-02T14:00:00Z", "2026-03-02T15:00:00Z"),
            ]
        );
    }

    #[test]
    fn next_window_falls_back_when_recurring_time_is_too_small() {
        let day = DayCapacity {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            windows: vec![w("2026-03-02T08:00:00Z", "2026-03-02T12:00:00Z")],
            recurring: vec![w("2026-03-02T11:00:00Z", "2026-03-02T11:15:00Z")],
        };
        assert_eq!(
            day.next_window(Duration::minutes(15)),
            Some(w("2026-03-02T11:00:00Z", "2026-03-02T11:15:00Z"))
        );
        assert_eq!(
            day.next_window(Duration::minutes(30)),
            Some(w("2026-03-02T08:00:00Z", "2026-03-02T12:00:00Z"))
        );
        assert_eq!(day.next_window(Duration::hours(5)), None);
    }
}
