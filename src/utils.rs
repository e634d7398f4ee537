//! Internal utilities for the dues modules.

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in seconds.
#[inline]
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_recent() {
        // Well past 2020-01-01
        assert!(current_timestamp() > 1_577_836_800);
    }
}
