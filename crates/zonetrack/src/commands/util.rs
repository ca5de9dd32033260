//! Shared helpers for command handlers.

use std::io::IsTerminal;

use chrono::{DateTime, Days, Local, NaiveDate, Utc};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the action is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Which end of a `--from`/`--to` range a bare date describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// Local midnight at the start of the day.
    Start,
    /// Local midnight after the day, so the whole day is included.
    End,
}

/// Parse `YYYY-MM-DD` (local time) or an RFC 3339 timestamp.
pub fn parse_bound(field: &str, raw: &str, bound: DateBound) -> Result<DateTime<Utc>, CliError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let invalid = |reason: &str| CliError::Validation {
        field: field.into(),
        reason: format!("'{raw}': {reason}"),
    };

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| invalid("expected YYYY-MM-DD or an RFC 3339 timestamp"))?;
    let day = match bound {
        DateBound::Start => Some(date),
        DateBound::End => date.checked_add_days(Days::new(1)),
    }
    .ok_or_else(|| invalid("date out of range"))?;

    day.and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| invalid("no such local time"))
}

/// Local wall-clock rendering used in tables.
pub fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn local_clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_passes_through() {
        let at = parse_bound("from", "2025-06-01T09:00:00Z", DateBound::Start).unwrap();
        assert_eq!(at.to_rfc3339(), "2025-06-01T09:00:00+00:00");
    }

    #[test]
    fn end_date_covers_whole_day() {
        let start = parse_bound("from", "2025-06-01", DateBound::Start).unwrap();
        let end = parse_bound("to", "2025-06-01", DateBound::End).unwrap();
        assert_eq!((end - start).num_hours(), 24);
    }

    #[test]
    fn garbage_is_a_validation_error() {
        let err = parse_bound("from", "last tuesday", DateBound::Start).unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "from"));
    }
}
