//! Weekly recurrence descriptors for allocated chunks.
//!
//! Each [`ScheduledChunk`] becomes one [`RecurrenceDescriptor`]: a weekday, a
//! time-of-day pair and a fixed UNTIL cutoff, expressed in the caller's display
//! offset. Conversion between the reference and display offsets is a constant
//! shift; daylight-saving transitions inside the horizon are not modelled.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::allocator::ScheduledChunk;
use crate::error::{Result, SlotError};

/// Weekday codes used by the RFC 5545 `BYDAY` rule part, Monday first.
const WEEKDAY_CODES: [(Weekday, &str); 7] = [
    (Weekday::Mon, "MO"),
    (Weekday::Tue, "TU"),
    (Weekday::Wed, "WE"),
    (Weekday::Thu, "TH"),
    (Weekday::Fri, "FR"),
    (Weekday::Sat, "SA"),
    (Weekday::Sun, "SU"),
];

/// A weekly-repeating block, ready to render as an RRULE plus a time pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceDescriptor {
    #[serde(with = "weekday_code")]
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    /// May be earlier than `start_time` when the block runs past midnight in
    /// the display offset.
    pub end_time: NaiveTime,
    pub until: DateTime<Utc>,
    /// First occurrence, in the display offset.
    pub first_start: DateTime<FixedOffset>,
    pub first_end: DateTime<FixedOffset>,
}

impl RecurrenceDescriptor {
    pub fn weekday_code(&self) -> &'static str {
        weekday_to_code(self.weekday)
    }

    pub fn duration(&self) -> Duration {
        self.first_end - self.first_start
    }

    /// Render the weekly rule, e.g.
    /// `RRULE:FREQ=WEEKLY;BYDAY=TU;UNTIL=20251231T235959Z`.
    pub fn rrule(&self) -> String {
        format!(
            "RRULE:FREQ=WEEKLY;BYDAY={};UNTIL={}",
            self.weekday_code(),
            format_until(self.until)
        )
    }
}

impl fmt::Display for RecurrenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Every {}: {} - {} ({} min)",
            weekday_name(self.weekday),
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M"),
            self.duration().num_minutes()
        )
    }
}

/// Encode one chunk as a weekly recurrence ending at `until`, shown in
/// `display_offset`.
///
/// The weekday and times are read in the display offset, so a chunk near
/// midnight can land on the neighbouring weekday.
///
/// # Errors
/// Returns `SlotError::InvalidWeekday` if the chunk's weekday does not match
/// its own start instant.
pub fn encode(
    chunk: &ScheduledChunk,
    until: DateTime<Utc>,
    display_offset: FixedOffset,
) -> Result<RecurrenceDescriptor> {
    if chunk.start().weekday() != chunk.weekday() {
        return Err(SlotError::InvalidWeekday(format!(
            "chunk labelled {} starts on {} ({})",
            chunk.weekday(),
            chunk.start().weekday(),
            chunk.start().to_rfc3339()
        )));
    }

    let first_start = chunk.start().with_timezone(&display_offset);
    let first_end = chunk.end().with_timezone(&display_offset);

    if until < first_start.to_utc() {
        tracing::warn!(
            until = %until,
            first_start = %first_start,
            "recurrence cutoff precedes the first occurrence"
        );
    }

    Ok(RecurrenceDescriptor {
        weekday: first_start.weekday(),
        start_time: first_start.time(),
        end_time: first_end.time(),
        until,
        first_start,
        first_end,
    })
}

/// Encode every chunk, preserving input order.
pub fn encode_all(
    chunks: &[ScheduledChunk],
    until: DateTime<Utc>,
    display_offset: FixedOffset,
) -> Result<Vec<RecurrenceDescriptor>> {
    chunks
        .iter()
        .map(|c| encode(c, until, display_offset))
        .collect()
}

/// Two-letter `BYDAY` code for a weekday.
pub fn weekday_to_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Parse a two-letter `BYDAY` code (case-insensitive).
///
/// # Errors
/// Returns `SlotError::InvalidWeekday` for anything other than `MO`..`SU`.
pub fn weekday_from_code(code: &str) -> Result<Weekday> {
    let upper = code.trim().to_ascii_uppercase();
    WEEKDAY_CODES
        .iter()
        .find(|(_, c)| *c == upper)
        .map(|(w, _)| *w)
        .ok_or_else(|| SlotError::InvalidWeekday(format!("unknown weekday code '{}'", code)))
}

/// UNTIL value in RFC 5545 UTC form (`YYYYMMDDTHHMMSSZ`).
pub fn format_until(until: DateTime<Utc>) -> String {
    until.format("%Y%m%dT%H%M%SZ").to_string()
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

mod weekday_code {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(weekday: &Weekday, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(super::weekday_to_code(*weekday))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Weekday, D::Error> {
        let code = String::deserialize(d)?;
        super::weekday_from_code(&code).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn mislabelled_chunk_is_rejected() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let start: DateTime<FixedOffset> = "2026-03-02T10:00:00+00:00".parse().unwrap();
        let end: DateTime<FixedOffset> = "2026-03-02T11:00:00+00:00".parse().unwrap();
        // 2026-03-02 is a Monday.
        let chunk = ScheduledChunk::from_parts(
            Weekday::Fri,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            start,
            end,
        );
        let until: DateTime<Utc> = "2026-06-01T00:00:00Z".parse().unwrap();

        let err = encode(&chunk, until, utc).unwrap_err();
        assert!(matches!(err, SlotError::InvalidWeekday(_)));
    }

    #[test]
    fn codes_round_trip_for_every_weekday() {
        for (weekday, code) in WEEKDAY_CODES {
            assert_eq!(weekday_to_code(weekday), code);
            assert_eq!(weekday_from_code(code).unwrap(), weekday);
        }
    }
}
