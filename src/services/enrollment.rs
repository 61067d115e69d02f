//! Capacity and displacement resolution service.
//!
//! Admission control for enrollments. A request either takes a free slot,
//! is rejected, or, when the incoming client is pay-per-session and a
//! subsidized enrollee holds a slot, produces a displacement proposal.
//! Displacement is two-phase: the proposal carries the victim, and nothing
//! changes until the caller confirms it.

use log::{info, warn};

use crate::api::{
    AttendanceStatus, ClientId, Enrollment, EnrollmentId, EnrollmentTier, OccurrenceId,
};
use crate::config::EngineSettings;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::db::FullRepository;
use crate::models::time::Clock;

/// Outcome of an enrollment request.
#[derive(Debug, Clone)]
pub enum EnrollOutcome {
    /// A slot was free; the enrollment was created.
    Enrolled(Enrollment),
    /// The class is full and no displacement is possible.
    Rejected { reason: String },
    /// The class is full but a lower-priority enrollee may be bumped.
    /// Nothing has changed yet; confirm with [`confirm_displacement`].
    DisplacementProposed(DisplacementProposal),
}

/// A proposed displacement, awaiting explicit confirmation.
#[derive(Debug, Clone)]
pub struct DisplacementProposal {
    pub occurrence_id: OccurrenceId,
    /// The enrollee who would lose the slot.
    pub victim: Enrollment,
    pub victim_tier: EnrollmentTier,
    /// The pay-per-session client who would take it.
    pub incoming_client: ClientId,
}

/// Request enrollment of `client_id` into `occurrence_id`.
///
/// The capacity check and the insert are one atomic repository operation,
/// so two concurrent requests for the last slot cannot both succeed. When
/// the occurrence is full, a pay-per-session client gets a
/// [`DisplacementProposal`] against the lowest-tier, earliest-created
/// subsidized enrollee; anyone else is rejected.
pub async fn try_enroll(
    repo: &dyn FullRepository,
    settings: &EngineSettings,
    clock: &dyn Clock,
    occurrence_id: OccurrenceId,
    client_id: ClientId,
) -> RepositoryResult<EnrollOutcome> {
    // Surface an unknown occurrence as NotFound before any tier lookup.
    repo.fetch_occurrence(occurrence_id).await?;
    let tier = repo.enrollment_tier(client_id).await?;

    let enrollment = new_enrollment(occurrence_id, client_id, clock);
    match repo
        .insert_enrollment_checked(enrollment, settings.scheduling.capacity)
        .await
    {
        Ok(id) => {
            let enrollment = repo.fetch_enrollment(id).await?;
            Ok(EnrollOutcome::Enrolled(enrollment))
        }
        Err(RepositoryError::CapacityExceeded { .. }) => {
            resolve_full_class(repo, occurrence_id, client_id, tier).await
        }
        Err(e) => Err(e),
    }
}

/// Confirm a previously proposed displacement.
///
/// Atomically removes the victim's enrollment and creates one for the
/// incoming client. The repository re-validates the count inside its
/// guard, so a proposal made stale by a capacity change or a concurrent
/// mutation is rejected rather than trusted. A conflict (the victim
/// vanished on its own) is retried once as a plain insert into the freed
/// slot before giving up.
pub async fn confirm_displacement(
    repo: &dyn FullRepository,
    settings: &EngineSettings,
    clock: &dyn Clock,
    occurrence_id: OccurrenceId,
    victim: EnrollmentId,
    incoming_client: ClientId,
) -> RepositoryResult<Enrollment> {
    let capacity = settings.scheduling.capacity;
    let replacement = new_enrollment(occurrence_id, incoming_client, clock);

    match repo
        .swap_enrollment(occurrence_id, victim, replacement.clone(), capacity)
        .await
    {
        Ok(id) => {
            info!(
                "Displacement confirmed on occurrence {}: enrollment {} replaced by client {}",
                occurrence_id, victim, incoming_client
            );
            repo.fetch_enrollment(id).await
        }
        Err(RepositoryError::ConflictError { message, .. }) => {
            // The victim is already gone; its slot may simply be free now.
            warn!(
                "Displacement on occurrence {} raced ({}); re-checking capacity",
                occurrence_id, message
            );
            match repo.insert_enrollment_checked(replacement, capacity).await {
                Ok(id) => repo.fetch_enrollment(id).await,
                Err(RepositoryError::CapacityExceeded { message, .. }) => {
                    Err(RepositoryError::capacity_exceeded_with_context(
                        message,
                        ErrorContext::new("confirm_displacement")
                            .with_entity("occurrence")
                            .with_entity_id(occurrence_id)
                            .with_details("stale displacement proposal"),
                    ))
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Voluntarily remove an enrollment, freeing its slot immediately.
/// No waitlist backfill takes place.
pub async fn remove_enrollment(
    repo: &dyn FullRepository,
    enrollment_id: EnrollmentId,
) -> RepositoryResult<()> {
    repo.delete_enrollment(enrollment_id).await
}

fn new_enrollment(
    occurrence_id: OccurrenceId,
    client_id: ClientId,
    clock: &dyn Clock,
) -> Enrollment {
    Enrollment {
        id: None,
        occurrence_id,
        client_id,
        status: AttendanceStatus::Scheduled,
        created_at: clock.now_utc(),
    }
}

/// Decide what a full class means for this client: a displacement
/// proposal for pay-per-session clients when a subsidized enrollee holds
/// a slot, a rejection otherwise.
async fn resolve_full_class(
    repo: &dyn FullRepository,
    occurrence_id: OccurrenceId,
    client_id: ClientId,
    tier: EnrollmentTier,
) -> RepositoryResult<EnrollOutcome> {
    if tier != EnrollmentTier::PayPerSession {
        return Ok(EnrollOutcome::Rejected {
            reason: "class full".to_string(),
        });
    }

    match select_victim(repo, occurrence_id).await? {
        Some((victim, victim_tier)) => {
            Ok(EnrollOutcome::DisplacementProposed(DisplacementProposal {
                occurrence_id,
                victim,
                victim_tier,
                incoming_client: client_id,
            }))
        }
        None => Ok(EnrollOutcome::Rejected {
            reason: "class full".to_string(),
        }),
    }
}

/// Deterministic victim selection: lowest tier first (subsidized B before
/// subsidized A), then earliest-created, then lowest enrollment id.
async fn select_victim(
    repo: &dyn FullRepository,
    occurrence_id: OccurrenceId,
) -> RepositoryResult<Option<(Enrollment, EnrollmentTier)>> {
    let enrollments = repo.enrollments_for_occurrence(occurrence_id).await?;

    let mut candidates = Vec::new();
    for enrollment in enrollments {
        let tier = repo.enrollment_tier(enrollment.client_id).await?;
        if tier.is_displaceable() {
            candidates.push((enrollment, tier));
        }
    }

    candidates.sort_by_key(|(enrollment, tier)| {
        (
            std::cmp::Reverse(tier.rank()),
            enrollment.created_at,
            enrollment.id.map(|id| id.value()).unwrap_or_default(),
        )
    });

    Ok(candidates.into_iter().next())
}
