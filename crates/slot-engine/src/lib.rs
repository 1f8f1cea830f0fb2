//! # slot-engine
//!
//! Deterministic availability and recurring-slot allocation for calendar agents.
//!
//! Given the busy intervals of a calendar and a horizon, the engine finds the
//! free time, places new blocks that add up to a target duration (bounded by a
//! minimum and maximum chunk size and spread across the week), and renders
//! each block as a weekly recurrence. Every stage is a pure function; nothing
//! is kept between calls and nothing blocks.
//!
//! ## Modules
//!
//! - [`interval`] — `TimeRange` and busy-interval merging
//! - [`gaps`] — free windows inside a horizon, split per local day
//! - [`allocator`] — round-robin chunk allocation with a feasibility report
//! - [`recurrence`] — weekly recurrence descriptors and RRULE rendering
//! - [`timezone`] — fixed-offset and IANA timezone resolution
//! - [`expander`] — expand a descriptor into concrete occurrences
//! - [`conflict`] — detect overlapping ranges
//! - [`payload`] — event-creation bodies for the calendar backend
//! - [`plan`] — the whole pipeline over one request document
//! - [`error`] — Error types

pub mod allocator;
pub mod conflict;
pub mod error;
pub mod expander;
pub mod gaps;
pub mod interval;
pub mod payload;
pub mod plan;
pub mod recurrence;
pub mod timezone;

pub use allocator::{allocate, Allocation, ChunkRequest, FeasibilityReport, ScheduledChunk};
pub use conflict::find_conflicts;
pub use error::SlotError;
pub use expander::expand_descriptor;
pub use gaps::{compute_free_windows, FreeWindow};
pub use interval::{merge, TimeRange};
pub use payload::EventPayload;
pub use plan::{plan, PlanRequest, SchedulePlan};
pub use recurrence::{encode, encode_all, RecurrenceDescriptor};
