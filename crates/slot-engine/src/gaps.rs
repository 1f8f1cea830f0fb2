//! Free windows: the complement of the busy calendar inside a horizon.
//!
//! Walks the merged busy sequence once, emitting the gap before each busy
//! interval and after the last one, then splits every gap at local midnight so
//! that no [`FreeWindow`] crosses a calendar-day boundary in the reference
//! offset.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::interval::{self, TimeRange};

/// A busy-free range confined to one calendar day of the reference offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeWindow {
    pub range: TimeRange,
    /// Local calendar date the window belongs to.
    pub day: NaiveDate,
}

impl FreeWindow {
    pub fn weekday(&self) -> Weekday {
        self.day.weekday()
    }

    pub fn duration(&self) -> Duration {
        self.range.duration()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.range.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.range.end
    }
}

/// Compute free windows inside `bounding`, split per local day of `offset`.
///
/// `busy` is expected to be the output of [`interval::merge`]; it is merged
/// again here so an unsorted sequence cannot produce overlapping windows.
///
/// # Errors
/// Returns `SlotError::EmptyRange` if `bounding.end <= bounding.start`, and
/// `SlotError::InvalidInterval` if a busy interval ends before it starts.
pub fn compute_free_windows(
    busy: &[TimeRange],
    bounding: &TimeRange,
    offset: FixedOffset,
) -> Result<Vec<FreeWindow>> {
    ensure_non_empty(bounding)?;
    let busy = interval::merge(busy)?;

    let mut gaps: Vec<TimeRange> = Vec::new();
    let mut cursor = bounding.start;

    for b in &busy {
        if b.end <= bounding.start {
            continue;
        }
        if b.start >= bounding.end {
            break;
        }
        if cursor < b.start {
            gaps.push(TimeRange {
                start: cursor,
                end: b.start,
            });
        }
        cursor = cursor.max(b.end);
    }

    // Trailing gap after the last busy interval.
    if cursor < bounding.end {
        gaps.push(TimeRange {
            start: cursor,
            end: bounding.end,
        });
    }

    let windows: Vec<FreeWindow> = gaps
        .into_iter()
        .flat_map(|gap| split_at_midnight(gap, offset))
        .collect();

    tracing::debug!(
        busy = busy.len(),
        windows = windows.len(),
        "computed free windows"
    );

    Ok(windows)
}

/// Every local calendar date (in `offset`) whose day intersects `bounding`,
/// in ascending order.
pub fn local_days(bounding: &TimeRange, offset: FixedOffset) -> Result<Vec<NaiveDate>> {
    ensure_non_empty(bounding)?;
    Ok(days_spanned(bounding, offset))
}

/// Like [`local_days`] but for a range already known to be non-empty.
pub(crate) fn days_spanned(bounding: &TimeRange, offset: FixedOffset) -> Vec<NaiveDate> {
    if bounding.is_empty() {
        return Vec::new();
    }
    let first = local_date(bounding.start, offset);
    let last = local_date(bounding.end - Duration::nanoseconds(1), offset);
    first.iter_days().take_while(|d| *d <= last).collect()
}

/// The calendar date of `t` in `offset`.
pub fn local_date(t: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    t.with_timezone(&offset).date_naive()
}

/// The UTC instant of local midnight starting `day` in `offset`.
pub fn local_midnight(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = day.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset.local_minus_utc()))))
}

fn ensure_non_empty(bounding: &TimeRange) -> Result<()> {
    if bounding.end <= bounding.start {
        return Err(SlotError::EmptyRange(format!(
            "bounding range [{}, {}) is empty",
            bounding.start.to_rfc3339(),
            bounding.end.to_rfc3339()
        )));
    }
    Ok(())
}

pub(crate) fn split_at_midnight(gap: TimeRange, offset: FixedOffset) -> Vec<FreeWindow> {
    let mut windows = Vec::new();
    let mut start = gap.start;

    while start < gap.end {
        let day = local_date(start, offset);
        let next_midnight = local_midnight(day + Duration::days(1), offset);
        let end = next_midnight.min(gap.end);
        windows.push(FreeWindow {
            range: TimeRange { start, end },
            day,
        });
        start = end;
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_midnight_applies_offset() {
        let cdt = FixedOffset::west_opt(5 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(local_midnight(day, cdt).to_rfc3339(), "2026-03-02T05:00:00+00:00");
    }

    #[test]
    fn split_gap_spanning_two_midnights() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let gap = TimeRange::parse("2026-03-02T20:00:00Z", "2026-03-04T02:00:00Z").unwrap();
        let windows = split_at_midnight(gap, utc);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].duration(), Duration::hours(4));
        assert_eq!(windows[1].duration(), Duration::hours(24));
        assert_eq!(windows[2].duration(), Duration::hours(2));
        assert_eq!(windows[2].day, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
    }
}
