//! Resolve timezone names and offsets to fixed offsets.
//!
//! The engine works with constant offsets only. Callers may still name an IANA
//! zone (e.g., "America/Chicago"); it is resolved through `chrono-tz` to the
//! offset in force at a given instant, and that offset is then used for the
//! whole horizon.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

use crate::error::{Result, SlotError};

/// Resolve `zone` to a fixed offset.
///
/// Accepts `Z`/`UTC`, a signed offset (`+05:30`, `-0500`, `+09`), or an IANA
/// timezone name evaluated at `at`.
///
/// # Errors
/// Returns `SlotError::InvalidTimezone` if `zone` is none of the above.
pub fn resolve_offset(zone: &str, at: DateTime<Utc>) -> Result<FixedOffset> {
    let zone = zone.trim();
    if zone.eq_ignore_ascii_case("z") || zone.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    if zone.starts_with('+') || zone.starts_with('-') {
        return parse_signed_offset(zone);
    }

    let tz: chrono_tz::Tz = zone
        .parse()
        .map_err(|_| SlotError::InvalidTimezone(zone.to_string()))?;
    Ok(tz.offset_from_utc_datetime(&at.naive_utc()).fix())
}

/// True when `zone` names an IANA zone rather than a literal offset.
pub fn is_named_zone(zone: &str) -> bool {
    let zone = zone.trim();
    !(zone.starts_with('+')
        || zone.starts_with('-')
        || zone.eq_ignore_ascii_case("z")
        || zone.eq_ignore_ascii_case("utc"))
}

fn parse_signed_offset(zone: &str) -> Result<FixedOffset> {
    let invalid = || SlotError::InvalidTimezone(zone.to_string());

    let (sign, digits) = zone.split_at(1);
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    let seconds = (hours * 3600 + minutes * 60) * if sign == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        "2026-07-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn literal_offsets() {
        assert_eq!(resolve_offset("Z", at()).unwrap().local_minus_utc(), 0);
        assert_eq!(resolve_offset("+05:30", at()).unwrap().local_minus_utc(), 19800);
        assert_eq!(resolve_offset("-0500", at()).unwrap().local_minus_utc(), -18000);
        assert_eq!(resolve_offset("+09", at()).unwrap().local_minus_utc(), 32400);
    }

    #[test]
    fn named_zone_uses_offset_at_instant() {
        // Chicago observes CDT (UTC-5) in July and CST (UTC-6) in January.
        let summer = resolve_offset("America/Chicago", at()).unwrap();
        let winter =
            resolve_offset("America/Chicago", "2026-01-15T12:00:00Z".parse().unwrap()).unwrap();
        assert_eq!(summer.local_minus_utc(), -5 * 3600);
        assert_eq!(winter.local_minus_utc(), -6 * 3600);
    }

    #[test]
    fn garbage_is_rejected() {
        for zone in ["Mars/Olympus", "+25:00", "+5:3", "-ab:cd"] {
            assert!(
                matches!(resolve_offset(zone, at()), Err(SlotError::InvalidTimezone(_))),
                "{zone} should be rejected"
            );
        }
    }
}
