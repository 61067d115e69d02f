//! Repository traits for enrollments and the client directory.
//!
//! The enrollment operations are where the capacity invariant lives:
//! `insert_enrollment_checked` and `swap_enrollment` must be atomic with
//! respect to each other, with the capacity count re-validated inside the
//! same guard. Two concurrent requests for the last slot of an occurrence
//! must not both succeed.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{
    AttendanceStatus, ClientId, ClientRecord, Enrollment, EnrollmentId, EnrollmentTier,
    OccurrenceId,
};

/// Repository trait for enrollment records.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert an enrollment if, and only if, the occurrence still has a
    /// free slot under `capacity` and the client is not already enrolled.
    ///
    /// The count check and the insert happen under one guard.
    ///
    /// # Returns
    /// * `Ok(EnrollmentId)` - Enrollment created
    /// * `Err(RepositoryError::CapacityExceeded)` - Occurrence is full
    /// * `Err(RepositoryError::ValidationError)` - Client already enrolled
    /// * `Err(RepositoryError::NotFound)` - Occurrence does not exist
    async fn insert_enrollment_checked(
        &self,
        enrollment: Enrollment,
        capacity: usize,
    ) -> RepositoryResult<EnrollmentId>;

    /// Atomically remove `victim` and insert `replacement` for the same
    /// occurrence, re-validating the count inside the guard. Either both
    /// mutations happen or neither does.
    ///
    /// # Returns
    /// * `Ok(EnrollmentId)` - Id of the replacement enrollment
    /// * `Err(RepositoryError::ConflictError)` - Victim vanished since the
    ///   proposal (stale proposal; the caller should re-evaluate)
    /// * `Err(RepositoryError::CapacityExceeded)` - Recount shows the swap
    ///   would leave the occurrence above `capacity`
    async fn swap_enrollment(
        &self,
        occurrence_id: OccurrenceId,
        victim: EnrollmentId,
        replacement: Enrollment,
        capacity: usize,
    ) -> RepositoryResult<EnrollmentId>;

    /// Fetch an enrollment by id.
    async fn fetch_enrollment(&self, id: EnrollmentId) -> RepositoryResult<Enrollment>;

    /// All enrollments of an occurrence, ordered by creation time then id.
    async fn enrollments_for_occurrence(
        &self,
        occurrence_id: OccurrenceId,
    ) -> RepositoryResult<Vec<Enrollment>>;

    /// Number of enrollments currently held by an occurrence.
    async fn count_for_occurrence(&self, occurrence_id: OccurrenceId) -> RepositoryResult<usize>;

    /// Overwrite the attendance status of an enrollment.
    async fn update_enrollment_status(
        &self,
        id: EnrollmentId,
        status: AttendanceStatus,
    ) -> RepositoryResult<()>;

    /// Delete an enrollment, freeing its slot immediately.
    async fn delete_enrollment(&self, id: EnrollmentId) -> RepositoryResult<()>;
}

/// Client/member directory collaborator.
///
/// The core never owns client records; it reads the display name and the
/// displacement-priority tier at decision time.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Fetch a client record.
    ///
    /// # Returns
    /// * `Ok(ClientRecord)` - The client
    /// * `Err(RepositoryError::NotFound)` - Unknown client id
    async fn client(&self, id: ClientId) -> RepositoryResult<ClientRecord>;

    /// Resolve a client's displacement-priority tier.
    async fn enrollment_tier(&self, id: ClientId) -> RepositoryResult<EnrollmentTier>;
}
