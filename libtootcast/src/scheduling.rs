//! Scheduled-status time handling
//!
//! Accepts relative durations ("90m", "2h 30m") and natural language
//! ("tomorrow 10am", "next friday 18:00"). Schedules must lie in the future.

use chrono::{DateTime, Duration, Utc};

use crate::{Result, TootcastError};

/// Parse a schedule string into a UTC timestamp
///
/// # Errors
///
/// Returns a validation error when the input is empty, cannot be parsed, or
/// resolves to a time that is not in the future.
pub fn parse_schedule(input: &str) -> Result<DateTime<Utc>> {
    parse_schedule_at(input, Utc::now())
}

/// Like [`parse_schedule`], relative to a fixed `now`
pub fn parse_schedule_at(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TootcastError::Validation(
            "Schedule cannot be empty".to_string(),
        ));
    }

    let scheduled_at = match parse_duration(input) {
        Some(duration) => now.checked_add_signed(duration).ok_or_else(|| {
            TootcastError::Validation(format!("Schedule '{}' is too far in the future", input))
        })?,
        None => chrono_english::parse_date_string(input, now, chrono_english::Dialect::Us)
            .map_err(|e| {
                TootcastError::Validation(format!("Could not parse schedule '{}': {}", input, e))
            })?,
    };

    if scheduled_at <= now {
        return Err(TootcastError::Validation(format!(
            "Schedule '{}' is not in the future",
            input
        )));
    }

    Ok(scheduled_at)
}

/// Render a schedule for the "scheduled for" toast
pub fn format_schedule(scheduled_at: &DateTime<Utc>) -> String {
    scheduled_at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn parse_duration(input: &str) -> Option<Duration> {
    let std_duration = humantime::parse_duration(input).ok()?;
    Duration::from_std(std_duration).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_relative_duration() {
        let now = fixed_now();
        assert_eq!(
            parse_schedule_at("90m", now).unwrap(),
            now + Duration::minutes(90)
        );
        assert_eq!(
            parse_schedule_at("2h 30m", now).unwrap(),
            now + Duration::minutes(150)
        );
    }

    #[test]
    fn test_parse_natural_language() {
        let now = fixed_now();
        let result = parse_schedule_at("tomorrow", now).unwrap();
        assert!(result > now);
        assert!(result <= now + Duration::days(2));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let err = parse_schedule_at("0s", fixed_now()).unwrap_err();
        assert!(matches!(err, TootcastError::Validation(_)));
    }

    #[test]
    fn test_oversized_duration_is_rejected() {
        let err = parse_schedule_at("1000000years", fixed_now()).unwrap_err();
        assert!(matches!(err, TootcastError::Validation(_)));
        assert!(err.to_string().contains("too far in the future"));
    }

    #[test]
    fn test_past_time_is_rejected() {
        let err = parse_schedule_at("2020-01-01 10:00", fixed_now()).unwrap_err();
        assert!(err.to_string().contains("not in the future"));
    }

    #[test]
    fn test_empty_and_garbage_are_rejected() {
        assert!(parse_schedule_at("", fixed_now()).is_err());
        assert!(parse_schedule_at("   ", fixed_now()).is_err());
        assert!(parse_schedule_at("whenever you like", fixed_now()).is_err());
    }

    #[test]
    fn test_parse_schedule_uses_current_time() {
        let before = Utc::now();
        let result = parse_schedule("1h").unwrap();
        assert!(result >= before + Duration::minutes(59));
    }

    #[test]
    fn test_format_schedule() {
        let at = Utc.with_ymd_and_hms(2025, 3, 15, 18, 5, 42).unwrap();
        assert_eq!(format_schedule(&at), "2025-03-15 18:05 UTC");
    }
}
