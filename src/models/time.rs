//! Time resolution for the scheduling core.
//!
//! Templates carry wall-clock times in the business timezone; occurrences
//! store absolute UTC instants. This module owns that conversion and the
//! clock seam used to make "has this session started yet?" decisions
//! testable.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Clock abstraction so services can be tested against a fixed instant.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Resolve a caller-local date + time of day into the stored UTC instant.
///
/// DST handling: an ambiguous wall-clock time (clocks rolled back) maps to
/// the earliest valid instant; a nonexistent time (clocks rolled forward)
/// maps to the first instant after the gap.
pub fn resolve_local(date: NaiveDate, time_of_day: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time_of_day);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Wall-clock time skipped by a DST gap: step forward until the
            // mapping exists again.
            let mut probe = naive;
            loop {
                probe += chrono::Duration::minutes(30);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
        }
    }
}

/// Number of whole days from `from` to `to` (negative when `to` < `from`).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// The date of day `day` in the month containing `anchor`, clamped to the
/// last day of that month when the month is shorter.
pub fn day_of_month_clamped(anchor: NaiveDate, day: u32) -> NaiveDate {
    use chrono::Datelike;
    let (year, month) = (anchor.year(), anchor.month());
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| last_day_of_month(year, month))
}

/// Advance `(year, month)` of `anchor` by one month, returning day `day`
/// clamped to that month's length.
pub fn day_of_next_month_clamped(anchor: NaiveDate, day: u32) -> NaiveDate {
    use chrono::Datelike;
    let (year, month) = if anchor.month() == 12 {
        (anchor.year() + 1, 1)
    } else {
        (anchor.year(), anchor.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| last_day_of_month(year, month))
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .expect("month arithmetic stays within chrono's date range")
}
