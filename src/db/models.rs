//! Shared data models re-exported for database layer consumers.

pub use crate::api::{
    AttendanceStatus, ClassOccurrence, ClassTemplate, ClientId, ClientRecord, Enrollment,
    EnrollmentId, EnrollmentTier, OccurrenceId, OccurrencePatch, TemplateId,
};
