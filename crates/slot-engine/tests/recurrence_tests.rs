//! Tests for weekly recurrence encoding.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc, Weekday};
use slot_engine::allocator::{allocate, ChunkRequest, ScheduledChunk};
use slot_engine::error::SlotError;
use slot_engine::gaps::compute_free_windows;
use slot_engine::interval::TimeRange;
use slot_engine::recurrence::{encode, encode_all, weekday_from_code, RecurrenceDescriptor};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn offset_hours(h: i32) -> FixedOffset {
    FixedOffset::east_opt(h * 3600).unwrap()
}

/// A single chunk covering exactly `[start, end)` (UTC reference).
fn chunk(start: &str, end: &str) -> ScheduledChunk {
    let bounding = TimeRange {
        start: start.parse().unwrap(),
        end: end.parse().unwrap(),
    };
    let free = compute_free_windows(&[], &bounding, utc()).unwrap();
    let d = bounding.duration();
    let req = ChunkRequest::new(d, d, d, bounding, utc()).unwrap();
    allocate(&free, &req).chunks.remove(0)
}

fn until() -> DateTime<Utc> {
    "2026-12-31T23:59:59Z".parse().unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// ── Encoding ────────────────────────────────────────────────────────────────

#[test]
fn monday_chunk_renders_weekly_rule() {
    let c = chunk("2026-03-02T10:00:00Z", "2026-03-02T12:00:00Z");

    let d = encode(&c, until(), utc()).unwrap();

    assert_eq!(d.weekday, Weekday::Mon);
    assert_eq!(d.weekday_code(), "MO");
    assert_eq!(d.start_time, time(10, 0));
    assert_eq!(d.end_time, time(12, 0));
    assert_eq!(d.duration(), Duration::hours(2));
    assert_eq!(d.rrule(), "RRULE:FREQ=WEEKLY;BYDAY=MO;UNTIL=20261231T235959Z");
}

#[test]
fn display_offset_shifts_times() {
    let c = chunk("2026-03-02T15:00:00Z", "2026-03-02T17:00:00Z");

    let d = encode(&c, until(), offset_hours(-5)).unwrap();

    assert_eq!(d.weekday, Weekday::Mon);
    assert_eq!(d.start_time, time(10, 0));
    assert_eq!(d.end_time, time(12, 0));
    assert_eq!(d.first_start.to_rfc3339(), "2026-03-02T10:00:00-05:00");
}

#[test]
fn display_offset_can_move_to_previous_weekday() {
    let c = chunk("2026-03-02T02:00:00Z", "2026-03-02T03:00:00Z");

    let d = encode(&c, until(), offset_hours(-5)).unwrap();

    assert_eq!(d.weekday, Weekday::Sun);
    assert_eq!(d.start_time, time(21, 0));
    assert!(d.rrule().contains("BYDAY=SU"));
}

#[test]
fn display_offset_can_move_to_next_weekday() {
    let c = chunk("2026-03-02T20:00:00Z", "2026-03-02T22:00:00Z");

    let d = encode(&c, until(), offset_hours(9)).unwrap();

    assert_eq!(d.weekday, Weekday::Tue);
    assert_eq!(d.start_time, time(5, 0));
    assert_eq!(d.end_time, time(7, 0));
}

#[test]
fn block_crossing_display_midnight_keeps_start_weekday() {
    let c = chunk("2026-03-02T04:00:00Z", "2026-03-02T06:00:00Z");

    let d = encode(&c, until(), offset_hours(-5)).unwrap();

    assert_eq!(d.weekday, Weekday::Sun);
    assert_eq!(d.start_time, time(23, 0));
    assert_eq!(d.end_time, time(1, 0));
    assert_eq!(d.duration(), Duration::hours(2));
}

#[test]
fn until_is_rendered_in_utc() {
    let c = chunk("2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z");
    let until: DateTime<Utc> = "2026-06-30T18:00:00-05:00".parse::<DateTime<FixedOffset>>()
        .unwrap()
        .to_utc();

    let d = encode(&c, until, offset_hours(-5)).unwrap();

    assert!(d.rrule().ends_with("UNTIL=20260630T230000Z"));
}

#[test]
fn encode_all_preserves_order() {
    let chunks = vec![
        chunk("2026-03-04T10:00:00Z", "2026-03-04T11:00:00Z"),
        chunk("2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z"),
        chunk("2026-03-03T10:00:00Z", "2026-03-03T11:00:00Z"),
    ];

    let descriptors = encode_all(&chunks, until(), utc()).unwrap();

    let codes: Vec<&str> = descriptors.iter().map(|d| d.weekday_code()).collect();
    assert_eq!(codes, vec!["WE", "MO", "TU"]);
}

#[test]
fn display_line_reads_naturally() {
    let c = chunk("2026-03-06T20:00:00Z", "2026-03-06T22:00:00Z");

    let d = encode(&c, until(), utc()).unwrap();

    assert_eq!(d.to_string(), "Every Friday: 20:00 - 22:00 (120 min)");
}

// ── Weekday codes ───────────────────────────────────────────────────────────

#[test]
fn weekday_codes_are_case_insensitive() {
    assert_eq!(weekday_from_code("tu").unwrap(), Weekday::Tue);
    assert_eq!(weekday_from_code(" SU ").unwrap(), Weekday::Sun);
}

#[test]
fn unknown_weekday_code_is_rejected() {
    for code in ["XX", "MON", "", "M"] {
        assert!(matches!(
            weekday_from_code(code),
            Err(SlotError::InvalidWeekday(_))
        ));
    }
}

// ── Serialization ───────────────────────────────────────────────────────────

#[test]
fn descriptor_serializes_weekday_as_code() {
    let c = chunk("2026-03-05T10:00:00Z", "2026-03-05T11:30:00Z");
    let d = encode(&c, until(), utc()).unwrap();

    let json = serde_json::to_value(&d).unwrap();

    assert_eq!(json["weekday"], "TH");
    assert_eq!(json["start_time"], "10:00:00");
    assert_eq!(json["end_time"], "11:30:00");

    let back: RecurrenceDescriptor = serde_json::from_value(json).unwrap();
    assert_eq!(back, d);
}
