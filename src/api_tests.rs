use crate::api::*;
use chrono::{NaiveDate, NaiveTime, Weekday};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_template() -> ClassTemplate {
    ClassTemplate {
        id: Some(TemplateId::new(1)),
        title: "Morning spin".to_string(),
        client_id: None,
        time_of_day: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        duration_minutes: 60,
        weekdays: vec![Weekday::Mon, Weekday::Wed],
        start_date: date(2024, 1, 1),
        end_date: Some(date(2024, 6, 30)),
        notes: String::new(),
    }
}

#[test]
fn test_id_display_and_value() {
    let id = OccurrenceId::new(42);
    assert_eq!(id.value(), 42);
    assert_eq!(id.to_string(), "42");
    assert_eq!(i64::from(id), 42);
}

#[test]
fn test_template_validate_ok() {
    assert!(sample_template().validate().is_ok());
}

#[test]
fn test_template_validate_inverted_range() {
    let mut template = sample_template();
    template.end_date = Some(date(2023, 12, 1));
    assert!(template.validate().is_err());
}

#[test]
fn test_template_validate_empty_weekdays() {
    let mut template = sample_template();
    template.weekdays.clear();
    assert!(template.validate().is_err());
}

#[test]
fn test_template_validate_nonpositive_duration() {
    let mut template = sample_template();
    template.duration_minutes = 0;
    assert!(template.validate().is_err());
}

#[test]
fn test_template_covers_weekday_and_range() {
    let template = sample_template();
    // 2024-01-01 is a Monday
    assert!(template.covers(date(2024, 1, 1)));
    // Tuesday is not in the weekday set
    assert!(!template.covers(date(2024, 1, 2)));
    // Before recurrence start
    assert!(!template.covers(date(2023, 12, 25)));
    // After recurrence end (a Monday)
    assert!(!template.covers(date(2024, 7, 1)));
}

#[test]
fn test_open_ended_template_covers_far_future() {
    let mut template = sample_template();
    template.end_date = None;
    assert!(template.covers(date(2030, 12, 30))); // a Monday
}

#[test]
fn test_tier_ranks_and_displaceability() {
    assert!(EnrollmentTier::PayPerSession.rank() < EnrollmentTier::SubsidizedA.rank());
    assert!(EnrollmentTier::SubsidizedA.rank() < EnrollmentTier::SubsidizedB.rank());
    assert!(!EnrollmentTier::PayPerSession.is_displaceable());
    assert!(EnrollmentTier::SubsidizedA.is_displaceable());
    assert!(EnrollmentTier::SubsidizedB.is_displaceable());
}

#[test]
fn test_attendance_status_round_trip() {
    for status in [
        AttendanceStatus::Scheduled,
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
    ] {
        let parsed: AttendanceStatus = status.to_string().parse().unwrap();
        assert_eq!(parsed, status);
    }
    assert!("no-show".parse::<AttendanceStatus>().is_err());
}

#[test]
fn test_date_window_rejects_inverted() {
    assert!(DateWindow::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
}

#[test]
fn test_date_window_dates_inclusive() {
    let window = DateWindow::new(date(2024, 1, 30), date(2024, 2, 2)).unwrap();
    let dates: Vec<_> = window.dates().collect();
    assert_eq!(
        dates,
        vec![
            date(2024, 1, 30),
            date(2024, 1, 31),
            date(2024, 2, 1),
            date(2024, 2, 2),
        ]
    );
}

#[test]
fn test_single_day_window() {
    let window = DateWindow::new(date(2024, 3, 15), date(2024, 3, 15)).unwrap();
    assert_eq!(window.dates().count(), 1);
}

#[test]
fn test_occurrence_patch_is_empty() {
    assert!(OccurrencePatch::default().is_empty());
    let patch = OccurrencePatch {
        duration_minutes: Some(45),
        ..Default::default()
    };
    assert!(!patch.is_empty());
}
