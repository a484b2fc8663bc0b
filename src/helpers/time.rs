use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

use crate::utils::constants::DEFAULT_SAFETY_MARGIN_SECS;

pub fn get_token_safety_margin_seconds(safety_margin_seconds_settings: Option<u64>) -> u64 {
    safety_margin_seconds_settings.unwrap_or(DEFAULT_SAFETY_MARGIN_SECS)
}

/// `expires_in` seconds from `now`, pulled in by the safety margin (never before `now`).
pub fn expires_at_with_margin(now: DateTime<Utc>, expires_in_seconds: u64, safety_margin_seconds: u64) -> DateTime<Utc> {
    let usable = expires_in_seconds.saturating_sub(safety_margin_seconds);
    now + Duration::seconds(usable as i64)
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn get_instant() -> Instant {
    Instant::now()
}
