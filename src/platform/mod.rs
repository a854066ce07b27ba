//! Platform abstraction layer
//!
//! Wall-clock access lives here so the simulation stays clock-free.

use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in whole milliseconds
pub fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}
