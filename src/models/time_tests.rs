use super::time::*;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[test]
fn test_resolve_local_utc_is_identity() {
    let resolved = resolve_local(date(2024, 1, 15), time(8, 0), Tz::UTC);
    assert_eq!(
        resolved,
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
    );
}

#[test]
fn test_resolve_local_fixed_offset_winter() {
    // Madrid is UTC+1 in winter
    let resolved = resolve_local(date(2024, 1, 15), time(8, 0), Tz::Europe__Madrid);
    assert_eq!(
        resolved,
        Utc.with_ymd_and_hms(2024, 1, 15, 7, 0, 0).unwrap()
    );
}

#[test]
fn test_resolve_local_fixed_offset_summer() {
    // Madrid is UTC+2 in summer
    let resolved = resolve_local(date(2024, 7, 15), time(8, 0), Tz::Europe__Madrid);
    assert_eq!(
        resolved,
        Utc.with_ymd_and_hms(2024, 7, 15, 6, 0, 0).unwrap()
    );
}

#[test]
fn test_resolve_local_dst_gap_moves_forward() {
    // 2024-03-31 02:30 does not exist in Madrid (clocks jump 02:00 -> 03:00)
    let resolved = resolve_local(date(2024, 3, 31), time(2, 30), Tz::Europe__Madrid);
    assert_eq!(
        resolved,
        Utc.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).unwrap()
    );
}

#[test]
fn test_resolve_local_dst_fold_takes_earliest() {
    // 2024-10-27 02:30 happens twice in Madrid; earliest is UTC+2
    let resolved = resolve_local(date(2024, 10, 27), time(2, 30), Tz::Europe__Madrid);
    assert_eq!(
        resolved,
        Utc.with_ymd_and_hms(2024, 10, 27, 0, 30, 0).unwrap()
    );
}

#[test]
fn test_days_between() {
    assert_eq!(days_between(date(2024, 1, 10), date(2024, 2, 5)), 26);
    assert_eq!(days_between(date(2024, 2, 5), date(2024, 2, 5)), 0);
    assert_eq!(days_between(date(2024, 2, 5), date(2024, 1, 10)), -26);
}

#[test]
fn test_day_of_month_clamped() {
    assert_eq!(
        day_of_month_clamped(date(2024, 1, 10), 5),
        date(2024, 1, 5)
    );
    // February 2024 has 29 days
    assert_eq!(
        day_of_month_clamped(date(2024, 2, 10), 31),
        date(2024, 2, 29)
    );
    // Non leap year
    assert_eq!(
        day_of_month_clamped(date(2023, 2, 10), 31),
        date(2023, 2, 28)
    );
}

#[test]
fn test_day_of_next_month_clamped() {
    assert_eq!(
        day_of_next_month_clamped(date(2024, 1, 10), 5),
        date(2024, 2, 5)
    );
    assert_eq!(
        day_of_next_month_clamped(date(2024, 12, 20), 5),
        date(2025, 1, 5)
    );
    assert_eq!(
        day_of_next_month_clamped(date(2024, 1, 31), 31),
        date(2024, 2, 29)
    );
}

#[test]
fn test_fixed_clock() {
    let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let clock = FixedClock(instant);
    assert_eq!(clock.now_utc(), instant);
}
