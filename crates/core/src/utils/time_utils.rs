use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Converts a UTC instant to a valuation date in the given timezone.
///
/// This is the single conversion from instants to domain dates; "today" is
/// always evaluated in the configured zone, never in UTC.
pub fn valuation_date_from_utc(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

pub fn get_days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        if let Some(next) = current.succ_opt() {
            current = next;
        } else {
            break;
        }
    }
    days
}

/// Returns the dates `date, date-1, ..., date-lookback_days`, newest first.
pub fn lookback_dates(date: NaiveDate, lookback_days: u32) -> Vec<NaiveDate> {
    (0..=i64::from(lookback_days))
        .filter_map(|offset| date.checked_sub_signed(Duration::days(offset)))
        .collect()
}

/// Next instant strictly after `now` at which the local wall clock in `tz`
/// reads `at`.
///
/// Nonexistent local times (DST gaps) fall forward to the next day that has
/// them; ambiguous times take the earlier of the two instants.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let mut day = valuation_date_from_utc(now, tz);
    for _ in 0..8 {
        let local = NaiveDateTime::new(day, at);
        if let Some(candidate) = tz.from_local_datetime(&local).earliest() {
            let candidate = candidate.with_timezone(&Utc);
            if candidate > now {
                return candidate;
            }
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    now + Duration::days(1)
}
