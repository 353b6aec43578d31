//! The activity window: two civil dates interpreted in a fixed UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

use crate::error::LeaderboardError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// `[start 00:00, (end_inclusive + 1 day) 00:00)` in a fixed offset.
///
/// The offset never changes, so both bounds are plain epoch arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveDate,
    end_inclusive: NaiveDate,
    offset: FixedOffset,
    label: String,
}

impl TimeWindow {
    pub fn new(
        start: NaiveDate,
        end_inclusive: NaiveDate,
        offset: FixedOffset,
        label: &str,
    ) -> Result<Self, LeaderboardError> {
        if start > end_inclusive {
            return Err(LeaderboardError::Config(format!(
                "window start {} is after end {}",
                start, end_inclusive
            )));
        }
        Ok(Self {
            start,
            end_inclusive,
            offset,
            label: label.to_string(),
        })
    }

    /// Parses ISO dates (`YYYY-MM-DD`) and an offset in seconds east of UTC.
    pub fn parse(
        start: &str,
        end_inclusive: &str,
        offset_seconds: i32,
        label: &str,
    ) -> Result<Self, LeaderboardError> {
        let start = parse_date(start)?;
        let end_inclusive = parse_date(end_inclusive)?;
        let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(|| {
            LeaderboardError::Config(format!("invalid UTC offset: {}s", offset_seconds))
        })?;
        Self::new(start, end_inclusive, offset, label)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_inclusive
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Epoch seconds of local midnight at the start date.
    pub fn start_epoch(&self) -> i64 {
        self.local_midnight(self.start)
    }

    /// Epoch seconds of local midnight on the day after the end date.
    pub fn end_exclusive_epoch(&self) -> i64 {
        self.local_midnight(self.end_inclusive) + SECONDS_PER_DAY
    }

    pub fn contains(&self, epoch_seconds: i64) -> bool {
        epoch_seconds >= self.start_epoch() && epoch_seconds < self.end_exclusive_epoch()
    }

    /// `YYYY-MM-DD HH:MM:SS <label>` in the window's offset.
    pub fn format_timestamp(&self, epoch_seconds: i64) -> String {
        match DateTime::from_timestamp(epoch_seconds, 0) {
            Some(utc) => format!(
                "{} {}",
                utc.with_timezone(&self.offset).format("%Y-%m-%d %H:%M:%S"),
                self.label
            ),
            None => epoch_seconds.to_string(),
        }
    }

    fn local_midnight(&self, date: NaiveDate) -> i64 {
        let utc_midnight = date.and_time(NaiveTime::MIN).and_utc().timestamp();
        utc_midnight - i64::from(self.offset.local_minus_utc())
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, LeaderboardError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| LeaderboardError::Config(format!("invalid date '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phoenix() -> TimeWindow {
        TimeWindow::parse("2026-01-12", "2026-05-01", -7 * 3600, "MST").unwrap()
    }

    #[test]
    fn bounds_use_fixed_offset() {
        let window = phoenix();
        assert_eq!(window.start_epoch(), 1768201200);
        assert_eq!(window.end_exclusive_epoch(), 1777705200);
    }

    #[test]
    fn start_is_inclusive_end_is_exclusive() {
        let window = phoenix();
        assert!(window.contains(window.start_epoch()));
        assert!(!window.contains(window.start_epoch() - 1));
        assert!(window.contains(window.end_exclusive_epoch() - 1));
        assert!(!window.contains(window.end_exclusive_epoch()));
    }

    #[test]
    fn single_day_window() {
        let window = TimeWindow::parse("2026-03-01", "2026-03-01", 0, "UTC").unwrap();
        assert_eq!(
            window.end_exclusive_epoch() - window.start_epoch(),
            SECONDS_PER_DAY
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let err = TimeWindow::parse("2026-05-02", "2026-05-01", 0, "UTC").unwrap_err();
        assert!(matches!(err, LeaderboardError::Config(_)));
    }

    #[test]
    fn rejects_bad_date() {
        assert!(TimeWindow::parse("2026-13-01", "2026-05-01", 0, "UTC").is_err());
    }

    #[test]
    fn formats_in_local_time() {
        let window = phoenix();
        assert_eq!(
            window.format_timestamp(1768201200),
            "2026-01-12 00:00:00 MST"
        );
        assert_eq!(
            window.format_timestamp(1768201200 + 13 * 3600 + 61),
            "2026-01-12 13:01:01 MST"
        );
    }
}
