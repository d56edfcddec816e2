//! Timestamp utilities

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Source of write-time timestamps
///
/// Status transitions capture the time through this trait so tests can
/// control it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

/// Render a timestamp for operators, e.g. `Sep 20, 2025 8:05 AM`
///
/// `utc_offset_minutes` shifts the timestamp into the venue's local time.
/// Offsets outside ±24h fall back to UTC.
pub fn format_display(timestamp: &DateTime<Utc>, utc_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
        .unwrap_or_else(|| Utc.fix());
    timestamp
        .with_timezone(&offset)
        .format("%b %-d, %Y %-I:%M %p")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_system_clock_advances() {
        let clock = SystemClock;
        let time1 = clock.now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = clock.now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_format_display_utc() {
        let ts = Utc.with_ymd_and_hms(2025, 9, 20, 8, 5, 0).unwrap();
        assert_eq!(format_display(&ts, 0), "Sep 20, 2025 8:05 AM");
    }

    #[test]
    fn test_format_display_with_offset() {
        // 20:30 UTC is 04:30 next day at UTC+8
        let ts = Utc.with_ymd_and_hms(2025, 5, 18, 20, 30, 0).unwrap();
        assert_eq!(format_display(&ts, 480), "May 19, 2025 4:30 AM");
    }

    #[test]
    fn test_format_display_invalid_offset_falls_back_to_utc() {
        let ts = Utc.with_ymd_and_hms(2025, 5, 18, 13, 0, 0).unwrap();
        assert_eq!(format_display(&ts, 100_000), "May 18, 2025 1:00 PM");
    }
}
