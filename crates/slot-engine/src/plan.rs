//! End-to-end planning: busy calendar in, weekly recurrences out.
//!
//! Runs the stages in order -- merge, free windows, allocation, encoding --
//! over a single request document. Nothing is kept between calls.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::allocator::{self, ChunkRequest, FeasibilityReport, ScheduledChunk};
use crate::conflict::{self, Conflict};
use crate::error::{Result, SlotError};
use crate::expander;
use crate::gaps::{self, FreeWindow};
use crate::interval::{self, parse_instant, TimeRange};
use crate::payload::EventPayload;
use crate::recurrence::{self, RecurrenceDescriptor};
use crate::timezone;

/// A busy interval as received from the calendar backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: String,
    pub end: String,
}

impl BusyInterval {
    pub fn to_range(&self) -> Result<TimeRange> {
        TimeRange::parse(&self.start, &self.end)
    }
}

/// Busy data in either of the accepted shapes: a bare list or the backend's
/// free/busy response `{ "busy": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BusyDocument {
    List(Vec<BusyInterval>),
    FreeBusy { busy: Vec<BusyInterval> },
}

/// Parse busy intervals from JSON.
///
/// # Errors
/// `SlotError::InvalidInput` for malformed JSON, `SlotError::InvalidInterval`
/// for an instant without an offset or an interval ending before it starts.
pub fn parse_busy_json(json: &str) -> Result<Vec<TimeRange>> {
    let doc: BusyDocument = serde_json::from_str(json)
        .map_err(|e| SlotError::InvalidInput(format!("busy intervals: {}", e)))?;
    let intervals = match doc {
        BusyDocument::List(list) => list,
        BusyDocument::FreeBusy { busy } => busy,
    };
    intervals.iter().map(BusyInterval::to_range).collect()
}

fn default_timezone() -> String {
    "Z".to_string()
}

/// Everything needed to plan one recurring allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub busy: Vec<BusyInterval>,
    pub time_min: String,
    pub time_max: String,
    pub total_minutes: i64,
    pub min_chunk_minutes: i64,
    pub max_chunk_minutes: i64,
    /// Offset or IANA zone whose midnights delimit days. Defaults to UTC.
    #[serde(default = "default_timezone")]
    pub reference_timezone: String,
    /// Offset or IANA zone the recurrences are expressed in. Defaults to the
    /// reference timezone.
    #[serde(default)]
    pub display_timezone: Option<String>,
    /// Recurrence cutoff (RFC 3339).
    pub until: String,
    /// `MO`..`SU`; defaults to `MO`.
    #[serde(default)]
    pub week_start: Option<String>,
}

impl PlanRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SlotError::InvalidInput(format!("plan request: {}", e)))
    }
}

/// The outcome of [`plan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulePlan {
    pub horizon: TimeRange,
    /// Merged busy intervals clipped to the horizon.
    pub busy: Vec<TimeRange>,
    /// Chunks in week order, parallel to `descriptors`.
    pub chunks: Vec<ScheduledChunk>,
    pub descriptors: Vec<RecurrenceDescriptor>,
    pub report: FeasibilityReport,
    /// IANA name of the display zone, when one was given.
    pub display_time_zone: Option<String>,
}

impl SchedulePlan {
    pub fn rules(&self) -> Vec<String> {
        self.descriptors.iter().map(RecurrenceDescriptor::rrule).collect()
    }

    pub fn event_payloads(&self, summary: &str, description: Option<&str>) -> Vec<EventPayload> {
        self.descriptors
            .iter()
            .map(|d| {
                EventPayload::from_descriptor(
                    d,
                    summary,
                    description,
                    self.display_time_zone.as_deref(),
                )
            })
            .collect()
    }

    /// Expand every recurrence inside the horizon and check the occurrences
    /// against the busy calendar and against each other.
    pub fn verify(&self) -> Result<Verification> {
        let mut occurrences: Vec<TimeRange> = Vec::new();
        for descriptor in &self.descriptors {
            occurrences.extend(expander::expand_within(descriptor, &self.horizon)?);
        }
        let busy_conflicts = conflict::find_conflicts(&occurrences, &self.busy);
        let self_overlapping = !conflict::is_disjoint(&occurrences);

        Ok(Verification {
            occurrences: occurrences.len(),
            busy_conflicts,
            self_overlapping,
        })
    }
}

/// Result of [`SchedulePlan::verify`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub occurrences: usize,
    pub busy_conflicts: Vec<Conflict>,
    pub self_overlapping: bool,
}

impl Verification {
    pub fn is_clean(&self) -> bool {
        self.busy_conflicts.is_empty() && !self.self_overlapping
    }
}

/// Compute the free windows of a busy calendar inside `[time_min, time_max)`.
pub fn free_windows(
    busy: &[TimeRange],
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Vec<FreeWindow>> {
    let bounding = TimeRange {
        start: time_min,
        end: time_max,
    };
    let merged = interval::merge(busy)?;
    gaps::compute_free_windows(&merged, &bounding, offset)
}

fn minutes(field: &str, value: i64) -> Result<Duration> {
    Duration::try_minutes(value).ok_or_else(|| {
        SlotError::InvalidRequest(format!("{} is out of range: {}", field, value))
    })
}

/// Run the full pipeline for one request.
///
/// # Errors
/// Any validation error of the stages, unchanged. A partial allocation is not
/// an error; see [`SchedulePlan::report`].
pub fn plan(request: &PlanRequest) -> Result<SchedulePlan> {
    let horizon = TimeRange {
        start: parse_instant(&request.time_min)?,
        end: parse_instant(&request.time_max)?,
    };
    let until = parse_instant(&request.until)?;

    let reference = timezone::resolve_offset(&request.reference_timezone, horizon.start)?;
    let display_zone = request
        .display_timezone
        .as_deref()
        .unwrap_or(&request.reference_timezone);
    let display = timezone::resolve_offset(display_zone, horizon.start)?;
    let week_start = match request.week_start.as_deref() {
        Some(code) => recurrence::weekday_from_code(code)?,
        None => chrono::Weekday::Mon,
    };

    let raw_busy = request
        .busy
        .iter()
        .map(BusyInterval::to_range)
        .collect::<Result<Vec<_>>>()?;
    let merged = interval::merge(&raw_busy)?;
    let windows = gaps::compute_free_windows(&merged, &horizon, reference)?;

    let chunk_request = ChunkRequest::new(
        minutes("total_minutes", request.total_minutes)?,
        minutes("min_chunk_minutes", request.min_chunk_minutes)?,
        minutes("max_chunk_minutes", request.max_chunk_minutes)?,
        horizon,
        reference,
    )?
    .with_week_start(week_start);

    let allocation = allocator::allocate(&windows, &chunk_request);
    let chunks = allocation.in_week_order(week_start);
    let descriptors = recurrence::encode_all(&chunks, until, display)?;

    tracing::debug!(
        busy = merged.len(),
        windows = windows.len(),
        chunks = chunks.len(),
        remaining_minutes = allocation.remaining.num_minutes(),
        "planned recurring slots"
    );

    Ok(SchedulePlan {
        horizon,
        busy: interval::merge_clipped(&merged, &horizon)?,
        chunks,
        descriptors,
        report: allocation.report(),
        display_time_zone: timezone::is_named_zone(display_zone).then(|| display_zone.to_string()),
    })
}
