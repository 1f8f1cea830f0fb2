//! `slotplan` CLI — find free time and plan recurring blocks from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Free windows of a busy calendar (bare list or {"busy": [...]})
//! slotplan free --busy busy.json --from 2026-06-01T00:00:00Z --to 2026-06-08T00:00:00Z
//!
//! # Same, splitting days at UTC-5 midnight
//! slotplan free --busy busy.json --from ... --to ... --offset -05:00
//!
//! # Plan recurring blocks from a request document (stdin → stdout)
//! cat request.json | slotplan plan
//!
//! # Plan, include event bodies for the calendar backend, and check the result
//! slotplan plan -i request.json --events --summary "Gaming" --verify
//!
//! # Fail (exit 2) when the requested total does not fit
//! slotplan plan -i request.json --strict
//! ```
//!
//! Logs go to stderr; `RUST_LOG` sets the filter (default `warn`), `-v` forces `debug`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read};
use std::process;
use tracing_subscriber::EnvFilter;

use slot_engine::plan::{self, PlanRequest, SchedulePlan, Verification};
use slot_engine::{EventPayload, FeasibilityReport, FreeWindow};

#[derive(Parser)]
#[command(
    name = "slotplan",
    version,
    about = "Plan recurring time blocks around a busy calendar"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the free windows of a busy calendar as JSON
    Free {
        /// Busy intervals file (reads from stdin if omitted)
        #[arg(short, long)]
        busy: Option<String>,
        /// Horizon start (RFC 3339)
        #[arg(long)]
        from: String,
        /// Horizon end (RFC 3339)
        #[arg(long)]
        to: String,
        /// Offset or IANA zone whose midnights split days
        #[arg(long, default_value = "Z", allow_hyphen_values = true)]
        offset: String,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Allocate recurring blocks for a plan request
    Plan {
        /// Plan request file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Include event-creation bodies
        #[arg(long)]
        events: bool,
        /// Event summary used with --events
        #[arg(long, default_value = "Recurring block")]
        summary: String,
        /// Event description used with --events
        #[arg(long)]
        description: Option<String>,
        /// Expand the recurrences inside the horizon and check for conflicts
        #[arg(long)]
        verify: bool,
        /// Exit with status 2 when the requested total does not fit
        #[arg(long)]
        strict: bool,
    },
}

// ---------------------------------------------------------------------------
// Output DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct FreeWindowDto {
    start: String,
    end: String,
    day: String,
    weekday: String,
    duration_minutes: i64,
}

impl From<&FreeWindow> for FreeWindowDto {
    fn from(w: &FreeWindow) -> Self {
        Self {
            start: w.start().to_rfc3339(),
            end: w.end().to_rfc3339(),
            day: w.day.to_string(),
            weekday: w.weekday().to_string(),
            duration_minutes: w.duration().num_minutes(),
        }
    }
}

#[derive(Serialize)]
struct RecurrenceDto {
    weekday: &'static str,
    start_time: String,
    end_time: String,
    duration_minutes: i64,
    first_start: String,
    first_end: String,
    rrule: String,
    text: String,
}

#[derive(Serialize)]
struct PlanOutput {
    recurrences: Vec<RecurrenceDto>,
    report: FeasibilityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<EventPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<Verification>,
}

impl PlanOutput {
    fn new(plan: &SchedulePlan) -> Self {
        let recurrences = plan
            .descriptors
            .iter()
            .map(|d| RecurrenceDto {
                weekday: d.weekday_code(),
                start_time: d.start_time.format("%H:%M").to_string(),
                end_time: d.end_time.format("%H:%M").to_string(),
                duration_minutes: d.duration().num_minutes(),
                first_start: d.first_start.to_rfc3339(),
                first_end: d.first_end.to_rfc3339(),
                rrule: d.rrule(),
                text: d.to_string(),
            })
            .collect();

        Self {
            recurrences,
            report: plan.report,
            events: None,
            verification: None,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Free {
            busy,
            from,
            to,
            offset,
            output,
        } => {
            let json = read_input(busy.as_deref())?;
            let busy = plan::parse_busy_json(&json).context("Failed to parse busy intervals")?;
            let time_min = slot_engine::interval::parse_instant(&from)
                .context("Invalid --from instant")?;
            let time_max =
                slot_engine::interval::parse_instant(&to).context("Invalid --to instant")?;
            let offset = slot_engine::timezone::resolve_offset(&offset, time_min)
                .context("Invalid --offset")?;

            let windows = plan::free_windows(&busy, time_min, time_max, offset)
                .context("Failed to compute free windows")?;
            let dtos: Vec<FreeWindowDto> = windows.iter().map(FreeWindowDto::from).collect();

            write_output(output.as_deref(), &serde_json::to_string_pretty(&dtos)?)?;
        }
        Commands::Plan {
            input,
            output,
            events,
            summary,
            description,
            verify,
            strict,
        } => {
            let json = read_input(input.as_deref())?;
            let request = PlanRequest::from_json(&json).context("Failed to parse plan request")?;
            let schedule = plan::plan(&request).context("Failed to plan recurring slots")?;

            let mut out = PlanOutput::new(&schedule);
            if events {
                out.events = Some(schedule.event_payloads(&summary, description.as_deref()));
            }
            if verify {
                out.verification = Some(schedule.verify().context("Failed to verify plan")?);
            }

            write_output(output.as_deref(), &serde_json::to_string_pretty(&out)?)?;

            if strict && !schedule.report.fully_allocated {
                eprintln!(
                    "Error: only {} of {} minutes could be placed",
                    schedule.report.placed_minutes,
                    schedule.report.placed_minutes + schedule.report.remaining_minutes
                );
                process::exit(2);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
