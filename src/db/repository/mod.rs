//! Repository trait definitions and error taxonomy.
//!
//! The repository layer abstracts the generic record store the core
//! depends on. Implementations must be `Send + Sync` and must honor the
//! atomicity notes on [`EnrollmentRepository`]; everything else is plain
//! record read/write/query.

pub mod enrollment;
pub mod error;
pub mod scheduling;

pub use enrollment::{ClientDirectory, EnrollmentRepository};
pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use scheduling::{OccurrenceRepository, TemplateRepository};

use async_trait::async_trait;

/// Combined repository interface: everything the scheduling core needs
/// from the storage collaborator in one object-safe trait.
#[async_trait]
pub trait FullRepository:
    TemplateRepository + OccurrenceRepository + EnrollmentRepository + ClientDirectory
{
    /// Lightweight liveness probe for the backend.
    async fn health_check(&self) -> RepositoryResult<bool>;
}
