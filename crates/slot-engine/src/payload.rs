//! Event-creation bodies for the calendar backend.

use serde::{Deserialize, Serialize};

use crate::recurrence::RecurrenceDescriptor;

/// Start or end of an event: an RFC 3339 instant plus an optional IANA zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time_zone: Option<String>,
}

/// A recurring event body: the first occurrence plus its weekly rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub recurrence: Vec<String>,
}

impl EventPayload {
    /// Build the body for one descriptor. `time_zone` should be an IANA name
    /// when the caller has one; the instants already carry their offset.
    pub fn from_descriptor(
        descriptor: &RecurrenceDescriptor,
        summary: &str,
        description: Option<&str>,
        time_zone: Option<&str>,
    ) -> Self {
        let at = |dt: String| EventDateTime {
            date_time: dt,
            time_zone: time_zone.map(str::to_string),
        };

        Self {
            summary: summary.to_string(),
            description: description.map(str::to_string),
            start: at(descriptor.first_start.to_rfc3339()),
            end: at(descriptor.first_end.to_rfc3339()),
            recurrence: vec![descriptor.rrule()],
        }
    }
}
