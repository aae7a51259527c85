//! Trigger types: when a job fires.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use cron::Schedule;

use crate::error::SchedulerError;

/// When and how often a job fires.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Fires every `every`, starting one period after scheduling.
    Interval { every: Duration },
    /// Fires on a cron schedule (5-field or 6-field expression).
    Cron {
        expression: String,
        schedule: Schedule,
    },
    /// Fires once at a fixed instant.
    Date { at: DateTime<Utc> },
}

impl Trigger {
    pub fn interval_seconds(seconds: i64) -> Self {
        Trigger::Interval {
            every: Duration::seconds(seconds),
        }
    }

    pub fn interval_minutes(minutes: i64) -> Self {
        Trigger::Interval {
            every: Duration::minutes(minutes),
        }
    }

    pub fn interval_hours(hours: i64) -> Self {
        Trigger::Interval {
            every: Duration::hours(hours),
        }
    }

    pub fn interval_days(days: i64) -> Self {
        Trigger::Interval {
            every: Duration::days(days),
        }
    }

    /// Parse a cron trigger. Invalid expressions are rejected up front so a
    /// bad job definition cannot reach the dispatch loop.
    pub fn cron(expression: &str) -> Result<Self, SchedulerError> {
        let schedule = parse_cron(expression).map_err(|e| {
            SchedulerError::InvalidTrigger(format!("cron '{}': {}", expression, e))
        })?;
        Ok(Trigger::Cron {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn date(at: DateTime<Utc>) -> Self {
        Trigger::Date { at }
    }

    /// The first fire time for a job scheduled at `now`.
    pub fn first_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Interval { every } => Some(now + *every),
            Trigger::Cron { schedule, .. } => schedule.after(&now).next(),
            Trigger::Date { at } => Some(*at),
        }
    }

    /// The next fire time strictly after a given occurrence. `None` means
    /// the trigger is exhausted.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Interval { every } => Some(after + *every),
            Trigger::Cron { schedule, .. } => schedule.after(&after).next(),
            Trigger::Date { at } => {
                if *at > after {
                    Some(*at)
                } else {
                    None
                }
            }
        }
    }

    /// Interval triggers must advance time, or the dispatch loop would spin
    /// on the same occurrence forever.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        match self {
            Trigger::Interval { every } if *every <= Duration::zero() => Err(
                SchedulerError::InvalidTrigger("interval must be positive".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Interval { every } => write!(f, "interval[every {}s]", every.num_seconds()),
            Trigger::Cron { expression, .. } => write!(f, "cron[{}]", expression),
            Trigger::Date { at } => write!(f, "date[{}]", at.to_rfc3339()),
        }
    }
}

/// Parse a cron expression, auto-prepending "0 " for 5-field expressions.
///
/// The `cron` crate requires 6 fields (sec min hr dom mon dow), but users
/// typically write 5-field cron (min hr dom mon dow). We detect and adapt.
fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    if parts.len() == 5 {
        let six_field = format!("0 {}", expr);
        Schedule::from_str(&six_field)
    } else {
        Schedule::from_str(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_advances_by_period() {
        let trigger = Trigger::interval_hours(24);
        let t0 = Utc::now();
        let first = trigger.first_fire(t0).unwrap();
        assert_eq!(first - t0, Duration::hours(24));
        assert_eq!(trigger.next_after(first).unwrap() - first, Duration::hours(24));
    }

    #[test]
    fn five_field_cron_is_accepted() {
        let trigger = Trigger::cron("0 9 * * *").unwrap();
        let next = trigger.first_fire(Utc::now()).unwrap();
        assert_eq!(next.format("%H:%M:%S").to_string(), "09:00:00");
    }

    #[test]
    fn six_field_cron_is_accepted() {
        assert!(Trigger::cron("0 */5 * * * *").is_ok());
    }

    #[test]
    fn invalid_cron_is_rejected() {
        let err = Trigger::cron("not a cron").unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidTrigger(_)));
    }

    #[test]
    fn date_fires_once_then_exhausts() {
        let at = Utc::now() + Duration::minutes(5);
        let trigger = Trigger::date(at);
        assert_eq!(trigger.first_fire(Utc::now()), Some(at));
        assert_eq!(trigger.next_after(at), None);
    }

    #[test]
    fn zero_interval_fails_validation() {
        assert!(Trigger::interval_seconds(0).validate().is_err());
        assert!(Trigger::interval_seconds(1).validate().is_ok());
    }

    #[test]
    fn display_describes_trigger() {
        assert_eq!(Trigger::interval_hours(1).to_string(), "interval[every 3600s]");
        assert_eq!(Trigger::cron("0 9 * * *").unwrap().to_string(), "cron[0 9 * * *]");
    }
}
