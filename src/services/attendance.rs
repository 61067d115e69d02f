//! Attendance status updates.
//!
//! Each enrollment carries a flat status: `Scheduled` (initial),
//! `Present` or `Absent`. Updates are direct overwrites; administrative
//! correction back to any status is allowed, there are no guarded
//! transitions. Status never affects capacity counts; those are computed
//! from row existence.

use crate::api::{AttendanceStatus, Enrollment, EnrollmentId};
use crate::db::repository::RepositoryResult;
use crate::db::FullRepository;

/// Overwrite the attendance status of an enrollment.
///
/// # Returns
/// The updated enrollment record.
pub async fn update_attendance(
    repo: &dyn FullRepository,
    enrollment_id: EnrollmentId,
    status: AttendanceStatus,
) -> RepositoryResult<Enrollment> {
    repo.update_enrollment_status(enrollment_id, status).await?;
    repo.fetch_enrollment(enrollment_id).await
}
