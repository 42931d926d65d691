//! Presentation helpers: toast payloads and relative timestamps.

use chrono::{DateTime, Utc};
use serde::Serialize;

use simguardian_entity::notification::{Notification, NotificationCategory};

/// Visual weight of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    /// Neutral styling.
    Default,
    /// Error styling, used for fraud alerts.
    Destructive,
}

impl ToastVariant {
    /// Variant for a notification category.
    pub fn for_category(category: NotificationCategory) -> Self {
        match category {
            NotificationCategory::Alert => Self::Destructive,
            _ => Self::Default,
        }
    }
}

/// Transient pop-up announcing a newly arrived notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    /// Headline.
    pub title: String,
    /// Body.
    pub description: String,
    /// Styling.
    pub variant: ToastVariant,
}

impl Toast {
    /// Build the toast shown when `notification` arrives.
    pub fn for_notification(notification: &Notification) -> Self {
        Self {
            title: notification.title.clone(),
            description: notification.message.clone(),
            variant: ToastVariant::for_category(notification.category),
        }
    }
}

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2520;
const MINUTES_IN_MONTH: i64 = 43200;
const MINUTES_IN_TWO_MONTHS: i64 = 86400;

/// Human distance between `then` and `now`, e.g. `"5 minutes ago"` or
/// `"in about 2 hours"`.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let phrase = distance_phrase(seconds.abs());
    if seconds >= 0 {
        format!("{phrase} ago")
    } else {
        format!("in {phrase}")
    }
}

/// Relative time of a notification's creation.
pub fn notification_age(notification: &Notification, now: DateTime<Utc>) -> String {
    relative_time(notification.created_at, now)
}

fn distance_phrase(seconds: i64) -> String {
    let minutes = (seconds as f64 / 60.0).round() as i64;

    if minutes < 1 {
        return "less than a minute".to_string();
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        let hours = (minutes as f64 / 60.0).round() as i64;
        return format!("about {}", plural(hours, "hour"));
    }
    if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        let days = (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64;
        return plural(days, "day");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        return format!("about {}", plural(months, "month"));
    }

    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        return plural(months, "month");
    }

    let years = months / 12;
    match months % 12 {
        0..=2 => format!("about {}", plural(years, "year")),
        3..=8 => format!("over {}", plural(years, "year")),
        _ => format!("almost {}", plural(years + 1, "year")),
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn ago(d: Duration) -> String {
        relative_time(now() - d, now())
    }

    #[test]
    fn test_minutes_and_hours() {
        assert_eq!(ago(Duration::seconds(10)), "less than a minute ago");
        assert_eq!(ago(Duration::seconds(70)), "1 minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(50)), "about 1 hour ago");
        assert_eq!(ago(Duration::hours(3)), "about 3 hours ago");
    }

    #[test]
    fn test_days_months_years() {
        assert_eq!(ago(Duration::hours(30)), "1 day ago");
        assert_eq!(ago(Duration::days(6)), "6 days ago");
        assert_eq!(ago(Duration::days(40)), "about 1 month ago");
        assert_eq!(ago(Duration::days(150)), "5 months ago");
        assert_eq!(ago(Duration::days(365)), "about 1 year ago");
        assert_eq!(ago(Duration::days(540)), "over 1 year ago");
        assert_eq!(ago(Duration::days(700)), "almost 2 years ago");
    }

    #[test]
    fn test_future_uses_in_prefix() {
        assert_eq!(relative_time(now() + Duration::minutes(2), now()), "in 2 minutes");
    }

    #[test]
    fn test_alert_toast_is_destructive() {
        assert_eq!(
            ToastVariant::for_category(NotificationCategory::Alert),
            ToastVariant::Destructive
        );
        assert_eq!(
            ToastVariant::for_category(NotificationCategory::Success),
            ToastVariant::Default
        );
    }
}
