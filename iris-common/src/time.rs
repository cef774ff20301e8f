//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Instant `minutes` from now
pub fn minutes_from_now(minutes: i64) -> DateTime<Utc> {
    now() + Duration::minutes(minutes)
}

/// Whole seconds left until `deadline`, 0 once it has passed
pub fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis / 1000) as u64
    }
}

/// `MM:SS` countdown display; minutes are not wrapped at 60
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
