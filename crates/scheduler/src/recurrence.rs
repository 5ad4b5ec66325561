//! Pure next-run computation for recurrence specs.
//!
//! `next_run` is a free function of (spec, reference time) with no state;
//! the poller and the service layer both call it and persist the result.
//! For the fixed frequencies the result is always strictly after the
//! reference time; only custom cron can fail to produce one.

use std::cmp::min;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use cron::Schedule;
use tracing::warn;

use refresh_core::model::{parse_specific_time, Frequency, RecurrenceSpec};
use refresh_core::ValidationError;

/// Compute the next execution time strictly after `from`.
///
/// Returns `None` only when a custom cron expression is invalid or has no
/// upcoming occurrence; the fixed frequencies always produce a time.
pub fn next_run(spec: &RecurrenceSpec, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let interval = spec.interval.max(1);

    match spec.frequency {
        Frequency::Hourly => Some(from + Duration::hours(interval as i64)),

        Frequency::Daily => {
            let mut next = from + Duration::days(interval as i64);
            next = apply_specific_time(next, spec);
            if next <= from {
                next += Duration::days(1);
            }
            Some(next)
        }

        Frequency::Weekly => {
            let mut next = match spec.day_of_week {
                // Days until the requested weekday; 0 means "this week"
                // still counts and the time correction below handles it.
                Some(dow) => {
                    let today = from.weekday().num_days_from_sunday() as i64;
                    let days = (dow as i64 - today + 7) % 7;
                    from + Duration::days(days)
                }
                None => from + Duration::days(7 * interval as i64),
            };
            next = apply_specific_time(next, spec);
            if next <= from {
                next += Duration::days(7);
            }
            Some(next)
        }

        Frequency::Monthly => {
            // The day is clamped within the reference month before the
            // month advance, matching the source system (Feb 31 → Feb 28
            // → Mar 28, not Mar 31).
            let base = match spec.day_of_month {
                Some(dom) => {
                    let clamped = min(dom as u32, days_in_month(from.year(), from.month()));
                    from.with_day(clamped)?
                }
                None => from,
            };
            let mut next = base.checked_add_months(Months::new(interval))?;
            next = apply_specific_time(next, spec);
            if next <= from {
                next = next.checked_add_months(Months::new(1))?;
            }
            Some(next)
        }

        Frequency::Custom => {
            let expr = spec.cron_expression.as_deref()?;
            next_cron_occurrence(expr, from)
        }
    }
}

/// Full validation of a recurrence spec, including cron syntax.
///
/// Extends [`RecurrenceSpec::validate`] with a parse of the custom cron
/// expression, so bad expressions are rejected before they are stored.
pub fn validate_spec(spec: &RecurrenceSpec) -> Result<(), ValidationError> {
    spec.validate()?;
    if spec.frequency == Frequency::Custom {
        // validate() guarantees presence.
        let expr = spec.cron_expression.as_deref().unwrap_or_default();
        Schedule::from_str(&normalize_cron(expr)).map_err(|e| {
            ValidationError::BadCronExpression {
                expression: expr.to_string(),
                reason: e.to_string(),
            }
        })?;
    }
    Ok(())
}

/// Replace the time-of-day component when the spec carries one.
fn apply_specific_time(at: DateTime<Utc>, spec: &RecurrenceSpec) -> DateTime<Utc> {
    match spec.specific_time.as_deref().and_then(parse_specific_time) {
        Some(t) => at.date_naive().and_time(t).and_utc(),
        None => at,
    }
}

/// Number of days in the given month.
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_y, next_m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_y, next_m, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// API clients send standard 5-field cron: `min hour day-of-month month day-of-week`.
fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    let field_count = trimmed.split_whitespace().count();
    if field_count == 5 {
        format!("0 {}", trimmed)
    } else {
        // Already 6-field or non-standard; pass through as-is.
        trimmed.to_string()
    }
}

/// First occurrence of `expr` strictly after `from`.
fn next_cron_occurrence(expr: &str, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match Schedule::from_str(&normalize_cron(expr)) {
        Ok(schedule) => schedule.after(&from).next(),
        Err(e) => {
            warn!(cron = %expr, error = %e, "invalid cron expression");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn spec(frequency: Frequency) -> RecurrenceSpec {
        RecurrenceSpec {
            frequency,
            interval: 1,
            day_of_week: None,
            day_of_month: None,
            specific_time: None,
            cron_expression: None,
        }
    }

    // ── fixed frequencies ───────────────────────────────────────────

    #[test]
    fn hourly_adds_interval_hours() {
        let mut s = spec(Frequency::Hourly);
        s.interval = 3;
        let from = at("2024-01-01T10:00:00Z");
        assert_eq!(next_run(&s, from), Some(at("2024-01-01T13:00:00Z")));
    }

    #[test]
    fn daily_adds_interval_days() {
        let mut s = spec(Frequency::Daily);
        s.interval = 2;
        let from = at("2024-01-01T10:00:00Z");
        assert_eq!(next_run(&s, from), Some(at("2024-01-03T10:00:00Z")));
    }

    #[test]
    fn daily_specific_time_already_passed_advances_a_day() {
        let mut s = spec(Frequency::Daily);
        s.specific_time = Some("09:00".to_string());
        // 10:00 on Jan 1 — 09:00 has passed; next run is Jan 2 at 09:00.
        let from = at("2024-01-01T10:00:00Z");
        assert_eq!(next_run(&s, from), Some(at("2024-01-02T09:00:00Z")));
    }

    #[test]
    fn weekly_day_of_week_lands_same_week() {
        let mut s = spec(Frequency::Weekly);
        s.day_of_week = Some(3); // Wednesday
        let monday = at("2024-01-01T08:00:00Z"); // 2024-01-01 is a Monday
        assert_eq!(next_run(&s, monday), Some(at("2024-01-03T08:00:00Z")));
    }

    #[test]
    fn weekly_same_weekday_with_passed_time_advances_seven_days() {
        let mut s = spec(Frequency::Weekly);
        s.day_of_week = Some(1); // Monday
        s.specific_time = Some("06:00".to_string());
        let monday = at("2024-01-01T08:00:00Z");
        // days-to-add is 0 but 06:00 already passed — next Monday 06:00.
        assert_eq!(next_run(&s, monday), Some(at("2024-01-08T06:00:00Z")));
    }

    #[test]
    fn weekly_without_day_of_week_adds_interval_weeks() {
        let mut s = spec(Frequency::Weekly);
        s.interval = 2;
        let from = at("2024-01-01T08:00:00Z");
        assert_eq!(next_run(&s, from), Some(at("2024-01-15T08:00:00Z")));
    }

    #[test]
    fn monthly_day_31_clamped_in_february() {
        let mut s = spec(Frequency::Monthly);
        s.day_of_month = Some(31);
        let from = at("2024-02-10T12:00:00Z"); // 2024 is a leap year
        let next = next_run(&s, from).unwrap();
        assert_eq!(next.day(), 29);
        assert_eq!(next.month(), 3);
    }

    #[test]
    fn monthly_without_day_keeps_day_and_adds_months() {
        let mut s = spec(Frequency::Monthly);
        s.interval = 2;
        let from = at("2024-01-15T12:00:00Z");
        assert_eq!(next_run(&s, from), Some(at("2024-03-15T12:00:00Z")));
    }

    #[test]
    fn monthly_day_of_month_with_specific_time() {
        let mut s = spec(Frequency::Monthly);
        s.day_of_month = Some(10);
        s.specific_time = Some("09:00".to_string());
        let from = at("2024-02-10T12:00:00Z");
        assert_eq!(next_run(&s, from), Some(at("2024-03-10T09:00:00Z")));
    }

    #[test]
    fn fixed_frequencies_always_strictly_future() {
        let instants = [
            at("2024-01-01T00:00:00Z"),
            at("2024-02-29T23:59:59Z"),
            at("2024-12-31T12:30:00Z"),
        ];
        let mut specs = vec![
            spec(Frequency::Hourly),
            spec(Frequency::Daily),
            spec(Frequency::Weekly),
            spec(Frequency::Monthly),
        ];
        let mut timed = spec(Frequency::Daily);
        timed.specific_time = Some("00:00".to_string());
        specs.push(timed);
        let mut dow = spec(Frequency::Weekly);
        dow.day_of_week = Some(0);
        specs.push(dow);
        let mut dom = spec(Frequency::Monthly);
        dom.day_of_month = Some(31);
        specs.push(dom);

        for s in &specs {
            for &from in &instants {
                let next = next_run(s, from).unwrap();
                assert!(
                    next > from,
                    "{:?} from {} gave non-future {}",
                    s.frequency,
                    from,
                    next
                );
            }
        }
    }

    // ── custom cron ─────────────────────────────────────────────────

    #[test]
    fn custom_cron_first_occurrence_after_from() {
        let mut s = spec(Frequency::Custom);
        s.cron_expression = Some("0 9 * * *".to_string()); // daily at 09:00
        let from = at("2024-01-01T10:00:00Z");
        assert_eq!(next_run(&s, from), Some(at("2024-01-02T09:00:00Z")));
    }

    #[test]
    fn custom_cron_invalid_yields_none() {
        let mut s = spec(Frequency::Custom);
        s.cron_expression = Some("not a cron".to_string());
        assert_eq!(next_run(&s, at("2024-01-01T10:00:00Z")), None);
    }

    #[test]
    fn custom_cron_missing_yields_none() {
        let s = spec(Frequency::Custom);
        assert_eq!(next_run(&s, at("2024-01-01T10:00:00Z")), None);
    }

    // ── validate_spec ───────────────────────────────────────────────

    #[test]
    fn validate_spec_rejects_bad_cron_syntax() {
        let mut s = spec(Frequency::Custom);
        s.cron_expression = Some("90 * * * *".to_string());
        assert!(matches!(
            validate_spec(&s),
            Err(ValidationError::BadCronExpression { .. })
        ));
    }

    #[test]
    fn validate_spec_accepts_five_field_cron() {
        let mut s = spec(Frequency::Custom);
        s.cron_expression = Some("*/15 * * * *".to_string());
        assert!(validate_spec(&s).is_ok());
    }

    // ── helpers ─────────────────────────────────────────────────────

    #[test]
    fn normalize_cron_5_to_6_fields() {
        assert_eq!(normalize_cron("*/15 * * * *"), "0 */15 * * * *");
        assert_eq!(normalize_cron("0 */15 * * * *"), "0 */15 * * * *");
        assert_eq!(normalize_cron("  0 6 * * 1-5  "), "0 0 6 * * 1-5");
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }
}
