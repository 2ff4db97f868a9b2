use chrono::{DateTime, Utc};

/// Current UTC time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Clamp a caller-supplied page size into `1..=max`, defaulting to `max`.
pub fn clamp_limit(limit: Option<i64>, max: i64) -> i64 {
    limit.unwrap_or(max).clamp(1, max)
}
