use chrono::Utc;

/// Current Unix timestamp in seconds.
pub fn current_timestamp_seconds() -> i64 {
    Utc::now().timestamp()
}
