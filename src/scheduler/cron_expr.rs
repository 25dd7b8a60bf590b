//! Cron expression parsing and next-occurrence computation (spec §4.11).
//! Accepts the standard 5-field expression plus the `@yearly|@monthly|
//! @weekly|@daily|@hourly|@reboot` keywords, delegating the 5-field case to
//! the `cron` crate (which speaks 6-field `sec min hour dom month dow`) the
//! way the grounding codebase's `compute_next_run` already does for its own
//! `Schedule::Cron` variant.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use cron::Schedule as CronSchedule;

use crate::error::SchedulerError;

/// Occurrences more than this far out are treated as "no next run" —
/// guards against pathological expressions (spec §4.11 "capped at ~4 years").
const MAX_LOOKAHEAD_DAYS: i64 = 4 * 365;

fn normalize(expr: &str) -> Result<String, SchedulerError> {
    let trimmed = expr.trim();
    Ok(match trimmed {
        "@yearly" | "@annually" => "0 0 0 1 1 *".to_string(),
        "@monthly" => "0 0 0 1 * *".to_string(),
        "@weekly" => "0 0 0 * * 0".to_string(),
        "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
        "@hourly" => "0 0 * * * *".to_string(),
        other => match other.split_whitespace().count() {
            5 => format!("0 {other}"),
            6 | 7 => other.to_string(),
            _ => return Err(SchedulerError::InvalidExpression(expr.to_string())),
        },
    })
}

/// Validates `expr` without computing an occurrence. `@reboot` is accepted
/// here but handled specially by [`next_occurrence`], since it names a
/// trigger rather than a cron schedule.
pub fn validate(expr: &str) -> Result<(), SchedulerError> {
    if expr.trim().eq_ignore_ascii_case("@reboot") {
        return Ok(());
    }
    let normalized = normalize(expr)?;
    CronSchedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidExpression(format!("{expr}: {e}")))?;
    Ok(())
}

/// Computes the next occurrence strictly after `after`. `@reboot` fires
/// exactly once, immediately, the first time it's scheduled (`already_ran`
/// false), and never again afterward.
pub fn next_occurrence(expr: &str, after: DateTime<Utc>, already_ran: bool) -> Result<Option<DateTime<Utc>>, SchedulerError> {
    if expr.trim().eq_ignore_ascii_case("@reboot") {
        return Ok(if already_ran { None } else { Some(after) });
    }

    let normalized = normalize(expr)?;
    let schedule = CronSchedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidExpression(format!("{expr}: {e}")))?;
    let cap = after + Duration::days(MAX_LOOKAHEAD_DAYS);
    Ok(schedule.after(&after).next().filter(|next| *next <= cap))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_keyword_fires_on_the_hour() {
        let after = "2026-01-01T00:15:00Z".parse::<DateTime<Utc>>().unwrap();
        let next = next_occurrence("@hourly", after, false).unwrap().unwrap();
        assert_eq!(next, "2026-01-01T01:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn five_field_expression_is_accepted() {
        let after = "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let next = next_occurrence("0 9 * * *", after, false).unwrap();
        assert!(next.is_some());
    }

    #[test]
    fn reboot_fires_once_then_never_again() {
        let after = Utc::now();
        assert!(next_occurrence("@reboot", after, false).unwrap().is_some());
        assert!(next_occurrence("@reboot", after, true).unwrap().is_none());
    }

    #[test]
    fn invalid_expression_is_rejected() {
        assert!(validate("not a cron expression").is_err());
    }

    #[test]
    fn unreachable_far_future_expression_returns_none() {
        // Feb 30th never occurs; the day-of-month field still parses, but no
        // occurrence exists, so the iterator should yield nothing before the cap.
        let after = Utc::now();
        let result = next_occurrence("0 0 30 2 *", after, false).unwrap();
        assert!(result.is_none());
    }
}
