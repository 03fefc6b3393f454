//! Pure period arithmetic.
//!
//! These functions map timestamps to period indices without reading system time; the
//! caller provides the instant and the window length. A zero window collapses
//! everything into period 0 so admission degrades to a single-bin system instead of
//! dividing by zero.

use crate::types::NANOS_PER_SECOND;
use std::time::{SystemTime, UNIX_EPOCH};

/// Period index of a unix-second timestamp for the given window length.
///
/// Pre-epoch timestamps and a zero window both map to period 0.
#[must_use]
pub fn reservation_period(timestamp_secs: i64, window_secs: u64) -> u64 {
    if window_secs == 0 || timestamp_secs < 0 {
        return 0;
    }
    timestamp_secs as u64 / window_secs
}

/// Period index of a nanosecond timestamp for the given window length.
#[must_use]
pub fn reservation_period_from_nanos(timestamp_ns: i64, window_secs: u64) -> u64 {
    if timestamp_ns < 0 {
        return 0;
    }
    reservation_period(timestamp_ns / NANOS_PER_SECOND, window_secs)
}

/// Whole unix seconds of a wall-clock instant; pre-epoch instants map to 0.
#[must_use]
pub(crate) fn unix_seconds(instant: SystemTime) -> i64 {
    instant.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs() as i64)
}
