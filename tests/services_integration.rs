//! Integration tests for the service layer.
//!
//! These run complete lifecycles through the public service functions
//! against a LocalRepository: template creation and expansion, enrollment
//! with displacement, attendance updates and billing.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use studio_rust::api::{
    AttendanceStatus, ClassTemplate, ClientId, ClientRecord, DateWindow, EnrollmentTier,
};
use studio_rust::config::EngineSettings;
use studio_rust::db::repositories::LocalRepository;
use studio_rust::db::repository::{EnrollmentRepository, RepositoryError};
use studio_rust::models::time::FixedClock;
use studio_rust::services::{
    apply_template_edit, compute_pro_rata_with_settings, confirm_displacement, create_template,
    delete_template, expand_template, remove_enrollment, try_enroll, update_attendance,
    EnrollOutcome,
};

fn madrid_settings(capacity: usize) -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.scheduling.capacity = capacity;
    settings.scheduling.timezone = "Europe/Madrid".to_string();
    settings
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn weekly_template(weekdays: Vec<Weekday>) -> ClassTemplate {
    ClassTemplate {
        id: None,
        title: "Morning pilates".to_string(),
        client_id: None,
        time_of_day: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        duration_minutes: 60,
        weekdays,
        start_date: date(2024, 1, 1),
        end_date: None,
        notes: String::new(),
    }
}

fn seed_repo() -> Arc<LocalRepository> {
    let repo = Arc::new(LocalRepository::new());
    let members = [
        (1, "Ana", EnrollmentTier::SubsidizedB),
        (2, "Bruno", EnrollmentTier::SubsidizedA),
        (3, "Carla", EnrollmentTier::PayPerSession),
        (4, "Diego", EnrollmentTier::PayPerSession),
    ];
    for (id, name, tier) in members {
        repo.upsert_client(ClientRecord {
            id: ClientId::new(id),
            name: name.to_string(),
            tier,
        });
    }
    repo
}

#[tokio::test]
async fn test_full_class_lifecycle() {
    let repo = seed_repo();
    let settings = madrid_settings(2);
    let clock = FixedClock(Utc.with_ymd_and_hms(2023, 12, 20, 12, 0, 0).unwrap());

    // Template -> occurrences.
    let template_id = create_template(repo.as_ref(), weekly_template(vec![Weekday::Wed]))
        .await
        .unwrap();
    let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 14)).unwrap();
    let created = expand_template(repo.as_ref(), &settings, template_id, window)
        .await
        .unwrap();
    assert_eq!(created.len(), 2, "two Wednesdays in the window");
    // 09:00 Madrid is 08:00 UTC in January.
    assert_eq!(
        created[0].starts_at,
        Utc.with_ymd_and_hms(2024, 1, 3, 8, 0, 0).unwrap()
    );
    let occurrence_id = created[0].id.unwrap();

    // Two subsidized members fill the class.
    let ana = match try_enroll(repo.as_ref(), &settings, &clock, occurrence_id, ClientId::new(1))
        .await
        .unwrap()
    {
        EnrollOutcome::Enrolled(e) => e,
        other => panic!("Expected enrollment, got {:?}", other),
    };
    assert!(matches!(
        try_enroll(repo.as_ref(), &settings, &clock, occurrence_id, ClientId::new(2))
            .await
            .unwrap(),
        EnrollOutcome::Enrolled(_)
    ));

    // A third subsidized request bounces.
    // (Ana is client 1; re-use is blocked, so this uses a fresh directory row.)
    repo.upsert_client(ClientRecord {
        id: ClientId::new(5),
        name: "Elena".to_string(),
        tier: EnrollmentTier::SubsidizedA,
    });
    assert!(matches!(
        try_enroll(repo.as_ref(), &settings, &clock, occurrence_id, ClientId::new(5))
            .await
            .unwrap(),
        EnrollOutcome::Rejected { .. }
    ));

    // A pay-per-session client gets a proposal against Ana (tier B).
    let proposal = match try_enroll(
        repo.as_ref(),
        &settings,
        &clock,
        occurrence_id,
        ClientId::new(3),
    )
    .await
    .unwrap()
    {
        EnrollOutcome::DisplacementProposed(p) => p,
        other => panic!("Expected proposal, got {:?}", other),
    };
    assert_eq!(proposal.victim.id, ana.id);
    assert_eq!(proposal.victim_tier, EnrollmentTier::SubsidizedB);

    let carla = confirm_displacement(
        repo.as_ref(),
        &settings,
        &clock,
        occurrence_id,
        proposal.victim.id.unwrap(),
        proposal.incoming_client,
    )
    .await
    .unwrap();
    assert_eq!(carla.client_id, ClientId::new(3));
    assert_eq!(repo.count_for_occurrence(occurrence_id).await.unwrap(), 2);

    // Attendance is taken after the session.
    let updated = update_attendance(repo.as_ref(), carla.id.unwrap(), AttendanceStatus::Present)
        .await
        .unwrap();
    assert_eq!(updated.status, AttendanceStatus::Present);

    // Carla drops the class; her slot frees immediately.
    remove_enrollment(repo.as_ref(), carla.id.unwrap()).await.unwrap();
    assert_eq!(repo.count_for_occurrence(occurrence_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_expansion_is_idempotent_across_runs() {
    let repo = seed_repo();
    let settings = madrid_settings(10);

    let template_id = create_template(repo.as_ref(), weekly_template(vec![Weekday::Mon]))
        .await
        .unwrap();

    let january = DateWindow::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
    let first = expand_template(repo.as_ref(), &settings, template_id, january)
        .await
        .unwrap();
    assert_eq!(first.len(), 5);

    // Re-running over a containing window only fills the uncovered tail.
    let extended = DateWindow::new(date(2024, 1, 1), date(2024, 2, 14)).unwrap();
    let second = expand_template(repo.as_ref(), &settings, template_id, extended)
        .await
        .unwrap();
    assert_eq!(second.len(), 2, "only the February Mondays are new");
}

#[tokio::test]
async fn test_edit_preserves_enrollments_on_kept_occurrences() {
    let repo = seed_repo();
    let settings = madrid_settings(10);
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 4, 12, 0, 0).unwrap());

    let template_id = create_template(repo.as_ref(), weekly_template(vec![Weekday::Wed]))
        .await
        .unwrap();
    let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
    let created = expand_template(repo.as_ref(), &settings, template_id, window)
        .await
        .unwrap();
    assert_eq!(created.len(), 5);

    // Enroll into a future occurrence, then shift the class an hour later.
    let future = created[1].id.unwrap();
    let enrollment = match try_enroll(repo.as_ref(), &settings, &clock, future, ClientId::new(1))
        .await
        .unwrap()
    {
        EnrollOutcome::Enrolled(e) => e,
        other => panic!("Expected enrollment, got {:?}", other),
    };

    let mut edited = weekly_template(vec![Weekday::Wed]);
    edited.id = Some(template_id);
    edited.time_of_day = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
    let summary = apply_template_edit(repo.as_ref(), &settings, &clock, edited)
        .await
        .unwrap();
    assert_eq!(summary.updated, 4, "Jan 3 already started");
    assert_eq!(summary.removed, 0);

    use studio_rust::db::repository::OccurrenceRepository;
    let shifted = repo.fetch_occurrence(future).await.unwrap();
    assert_eq!(
        shifted.starts_at,
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
    );
    // The enrollment rides along with the shifted occurrence.
    assert!(repo.fetch_enrollment(enrollment.id.unwrap()).await.is_ok());
}

#[tokio::test]
async fn test_delete_template_keeps_attendance_history() {
    let repo = seed_repo();
    let settings = madrid_settings(10);
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 11, 12, 0, 0).unwrap());

    let template_id = create_template(repo.as_ref(), weekly_template(vec![Weekday::Wed]))
        .await
        .unwrap();
    let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
    let created = expand_template(repo.as_ref(), &settings, template_id, window)
        .await
        .unwrap();

    // Mark attendance on a past occurrence before deleting the template.
    let past = created[0].id.unwrap();
    let enrollment = match try_enroll(repo.as_ref(), &settings, &clock, past, ClientId::new(1))
        .await
        .unwrap()
    {
        EnrollOutcome::Enrolled(e) => e,
        other => panic!("Expected enrollment, got {:?}", other),
    };
    update_attendance(repo.as_ref(), enrollment.id.unwrap(), AttendanceStatus::Present)
        .await
        .unwrap();

    let removed = delete_template(repo.as_ref(), &clock, template_id).await.unwrap();
    assert_eq!(removed, 3, "Jan 17, 24 and 31 are still in the future");

    use studio_rust::db::repository::OccurrenceRepository;
    let kept = repo.fetch_occurrence(past).await.unwrap();
    assert_eq!(kept.template_id, Some(template_id));
    let history = repo.fetch_enrollment(enrollment.id.unwrap()).await.unwrap();
    assert_eq!(history.status, AttendanceStatus::Present);
}

#[tokio::test]
async fn test_stale_proposal_is_rejected_after_rival_enrollment() {
    let repo = seed_repo();
    let settings = madrid_settings(1);
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());

    let template_id = create_template(repo.as_ref(), weekly_template(vec![Weekday::Wed]))
        .await
        .unwrap();
    let window = DateWindow::new(date(2024, 1, 3), date(2024, 1, 3)).unwrap();
    let created = expand_template(repo.as_ref(), &settings, template_id, window)
        .await
        .unwrap();
    let occurrence_id = created[0].id.unwrap();

    // Ana holds the only slot; Carla is offered a displacement.
    assert!(matches!(
        try_enroll(repo.as_ref(), &settings, &clock, occurrence_id, ClientId::new(1))
            .await
            .unwrap(),
        EnrollOutcome::Enrolled(_)
    ));
    let proposal = match try_enroll(
        repo.as_ref(),
        &settings,
        &clock,
        occurrence_id,
        ClientId::new(3),
    )
    .await
    .unwrap()
    {
        EnrollOutcome::DisplacementProposed(p) => p,
        other => panic!("Expected proposal, got {:?}", other),
    };

    // Before Carla confirms, Ana cancels and Diego snaps up the slot.
    remove_enrollment(repo.as_ref(), proposal.victim.id.unwrap())
        .await
        .unwrap();
    assert!(matches!(
        try_enroll(repo.as_ref(), &settings, &clock, occurrence_id, ClientId::new(4))
            .await
            .unwrap(),
        EnrollOutcome::Enrolled(_)
    ));

    // Confirmation falls back to a plain insert, which finds the class full.
    let result = confirm_displacement(
        repo.as_ref(),
        &settings,
        &clock,
        occurrence_id,
        proposal.victim.id.unwrap(),
        proposal.incoming_client,
    )
    .await;
    assert!(matches!(
        result,
        Err(RepositoryError::CapacityExceeded { .. })
    ));
}

#[tokio::test]
async fn test_billing_for_mid_cycle_signup() {
    let mut settings = madrid_settings(10);
    settings.billing.monthly_fee = "300".parse().unwrap();
    settings.billing.due_day = 5;
    settings.billing.validity_days = 30;

    let invoice =
        compute_pro_rata_with_settings(&settings.billing, date(2024, 1, 10), false).unwrap();
    assert_eq!(invoice.cycle_start, date(2024, 2, 5));
    assert_eq!(invoice.gap_days, 26);
    assert_eq!(invoice.pro_rata_amount.to_string(), "260.00");
    assert_eq!(invoice.total_due.to_string(), "560.00");
    assert!(!invoice.waived);
    assert!(!invoice.needs_review);

    // The owner may waive the bridge amount at signup.
    let waived =
        compute_pro_rata_with_settings(&settings.billing, date(2024, 1, 10), true).unwrap();
    assert!(waived.waived);
    assert_eq!(waived.pro_rata_amount.to_string(), "0.00");
    assert_eq!(waived.total_due.to_string(), "300.00");
}
