//! Recurrence expansion -- turns a descriptor back into concrete occurrences.
//!
//! Wraps the `rrule` crate. The rule is expanded from the first occurrence in
//! UTC with a plain weekly frequency, which keeps the weekday of the first
//! occurrence regardless of the display offset the descriptor was rendered in.

use chrono::{DateTime, Utc};
use rrule::RRuleSet;

use crate::error::{Result, SlotError};
use crate::interval::TimeRange;
use crate::recurrence::{format_until, RecurrenceDescriptor};

/// Upper bound on instances when the caller gives no limit (about ten years).
const DEFAULT_LIMIT: u16 = 520;

/// Expand a descriptor into its occurrences, oldest first, up to `limit`
/// instances (default 520 when `None`).
///
/// # Errors
/// Returns `SlotError::InvalidRule` if the `rrule` crate rejects the rule.
pub fn expand_descriptor(
    descriptor: &RecurrenceDescriptor,
    limit: Option<u16>,
) -> Result<Vec<TimeRange>> {
    if limit == Some(0) {
        return Ok(Vec::new());
    }

    let dtstart: DateTime<Utc> = descriptor.first_start.to_utc();
    if descriptor.until < dtstart {
        return Ok(Vec::new());
    }

    let rrule_text = format!(
        "DTSTART:{}\nRRULE:FREQ=WEEKLY;UNTIL={}",
        format_until(dtstart),
        format_until(descriptor.until)
    );

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| SlotError::InvalidRule(format!("{}", e)))?;

    let duration = descriptor.duration();
    let instances = rrule_set.all(limit.unwrap_or(DEFAULT_LIMIT));

    Ok(instances
        .dates
        .into_iter()
        .map(|dt| {
            let start = dt.with_timezone(&Utc);
            TimeRange {
                start,
                end: start + duration,
            }
        })
        .collect())
}

/// Occurrences of a descriptor that start inside `horizon`.
pub fn expand_within(
    descriptor: &RecurrenceDescriptor,
    horizon: &TimeRange,
) -> Result<Vec<TimeRange>> {
    Ok(expand_descriptor(descriptor, None)?
        .into_iter()
        .take_while(|occ| occ.start < horizon.end)
        .filter(|occ| occ.start >= horizon.start)
        .collect())
}
