//! Human-readable durations for voting windows, timelocks and escrow locks.

use agora_types::Timestamp;

/// Format a duration in seconds, keeping the two most significant units.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600)
    }
}

/// Time left until `deadline`, or `"passed"` once it is reached.
pub fn format_until(now: Timestamp, deadline: Timestamp) -> String {
    if now >= deadline {
        "passed".to_string()
    } else {
        format_duration(deadline.as_secs() - now.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_two_units() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(30 * 60), "30m 0s");
        assert_eq!(format_duration(3 * 3600 + 120), "3h 2m");
        assert_eq!(format_duration(7 * 86_400 + 3600), "7d 1h");
    }

    #[test]
    fn until_deadline() {
        let now = Timestamp::new(100);
        assert_eq!(format_until(now, Timestamp::new(160)), "1m 0s");
        assert_eq!(format_until(now, Timestamp::new(100)), "passed");
    }
}
