//! Relative time labels for conversation lists.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Format `then` relative to `now` ("Just now", "Yesterday", "3 months ago").
///
/// Years and months are counted on the calendar; smaller units come from
/// the elapsed duration. Timestamps in the future read as "Just now".
#[must_use]
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if then >= now {
        return "Just now".to_string();
    }

    let months = whole_months_between(then, now);
    let years = months / 12;
    if years > 0 {
        return plural(years, "1 year ago", "years ago");
    }
    if months > 0 {
        return plural(months, "1 month ago", "months ago");
    }

    let elapsed = now - then;
    let days = elapsed.num_days();
    if days > 0 {
        return plural(days, "Yesterday", "days ago");
    }
    let hours = elapsed.num_hours();
    if hours > 0 {
        return plural(hours, "1 hour ago", "hours ago");
    }
    let minutes = elapsed.num_minutes();
    if minutes > 0 {
        return plural(minutes, "1 minute ago", "minutes ago");
    }
    "Just now".to_string()
}

fn plural(count: i64, one: &str, many: &str) -> String {
    if count == 1 {
        one.to_string()
    } else {
        format!("{count} {many}")
    }
}

fn whole_months_between(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let mut months = i64::from(now.year() - then.year()) * 12
        + i64::from(now.month()) - i64::from(then.month());
    let then_rest = (then.day(), then.num_seconds_from_midnight(), then.nanosecond());
    let now_rest = (now.day(), now.num_seconds_from_midnight(), now.nanosecond());
    if now_rest < then_rest {
        months -= 1;
    }
    months.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_recent_is_just_now() {
        let now = at(2025, 6, 10, 12, 0);
        assert_eq!(time_ago(now - Duration::seconds(30), now), "Just now");
        assert_eq!(time_ago(now + Duration::minutes(5), now), "Just now");
    }

    #[test]
    fn test_minutes_and_hours() {
        let now = at(2025, 6, 10, 12, 0);
        assert_eq!(time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(42), now), "42 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(time_ago(now - Duration::hours(5), now), "5 hours ago");
    }

    #[test]
    fn test_days() {
        let now = at(2025, 6, 10, 12, 0);
        assert_eq!(time_ago(now - Duration::hours(30), now), "Yesterday");
        assert_eq!(time_ago(now - Duration::days(6), now), "6 days ago");
    }

    #[test]
    fn test_calendar_months_and_years() {
        let now = at(2025, 6, 10, 12, 0);
        assert_eq!(time_ago(at(2025, 5, 10, 12, 0), now), "1 month ago");
        assert_eq!(time_ago(at(2025, 5, 11, 12, 0), now), "30 days ago");
        assert_eq!(time_ago(at(2025, 2, 1, 9, 0), now), "4 months ago");
        assert_eq!(time_ago(at(2024, 6, 10, 12, 0), now), "1 year ago");
        assert_eq!(time_ago(at(2021, 1, 1, 0, 0), now), "4 years ago");
    }
}
