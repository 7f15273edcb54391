//! Date ranges for filtering transactions by creation time

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use fintrack_config::DateRangePreset;
use serde::{Deserialize, Serialize};

/// Creation-time window; both ends inclusive, either may be unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Unbounded range
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Resolve a preset relative to `now`; calendar boundaries use `now`'s zone
    pub fn resolve<Tz: TimeZone>(preset: DateRangePreset, now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let now_utc = now.with_timezone(&Utc);

        let at = |date: NaiveDate, h: u32, m: u32, s: u32| -> Option<DateTime<Utc>> {
            let naive = date.and_hms_opt(h, m, s)?;
            tz.from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        };
        let month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1);

        match preset {
            DateRangePreset::Last7Days => Self::new(now_utc - Duration::days(7), now_utc),
            DateRangePreset::Last30Days => Self::new(now_utc - Duration::days(30), now_utc),
            DateRangePreset::ThisMonth => Self {
                start: month_start.and_then(|d| at(d, 0, 0, 0)),
                end: Some(now_utc),
            },
            DateRangePreset::LastMonth => {
                let last_day = month_start.and_then(|d| d.pred_opt());
                let first_day = last_day.and_then(|d| NaiveDate::from_ymd_opt(d.year(), d.month(), 1));
                Self {
                    start: first_day.and_then(|d| at(d, 0, 0, 0)),
                    end: last_day.and_then(|d| at(d, 23, 59, 59)),
                }
            }
            DateRangePreset::ThisYear => Self {
                start: NaiveDate::from_ymd_opt(today.year(), 1, 1).and_then(|d| at(d, 0, 0, 0)),
                end: Some(now_utc),
            },
            DateRangePreset::All => Self::all(),
        }
    }

    /// Resolve a preset against the local clock
    pub fn from_preset(preset: DateRangePreset) -> Self {
        Self::resolve(preset, chrono::Local::now())
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Check if an instant falls inside the range
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        match (&self.start, &self.end) {
            (None, None) => true,
            (Some(s), None) => instant >= s,
            (None, Some(e)) => instant <= e,
            (Some(s), Some(e)) => instant >= s && instant <= e,
        }
    }

    /// Get a human-readable description of the range
    pub fn description(&self) -> String {
        match (&self.start, &self.end) {
            (None, None) => "All Time".to_string(),
            (Some(s), None) => format!("Since {}", s.date_naive()),
            (None, Some(e)) => format!("Until {}", e.date_naive()),
            (Some(s), Some(e)) => format!("{} to {}", s.date_naive(), e.date_naive()),
        }
    }
}
