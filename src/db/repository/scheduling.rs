//! Repository traits for class templates and occurrences.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::api::{ClassOccurrence, ClassTemplate, OccurrenceId, OccurrencePatch, TemplateId};

/// Repository trait for recurring class templates.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Insert a new template.
    ///
    /// # Returns
    /// * `Ok(TemplateId)` - Id assigned by the store
    /// * `Err(RepositoryError)` - If the operation fails
    async fn insert_template(&self, template: ClassTemplate) -> RepositoryResult<TemplateId>;

    /// Fetch a template by id.
    ///
    /// # Returns
    /// * `Ok(ClassTemplate)` - The template
    /// * `Err(RepositoryError::NotFound)` - If no such template exists
    async fn fetch_template(&self, id: TemplateId) -> RepositoryResult<ClassTemplate>;

    /// List all templates.
    async fn list_templates(&self) -> RepositoryResult<Vec<ClassTemplate>>;

    /// Replace a stored template. The template must carry its id.
    async fn update_template(&self, template: ClassTemplate) -> RepositoryResult<()>;

    /// Delete a template record.
    ///
    /// Cascading deletion of generated occurrences is a service-layer
    /// decision (past occurrences are historical record); this removes
    /// only the template row itself.
    async fn delete_template(&self, id: TemplateId) -> RepositoryResult<()>;
}

/// Repository trait for dated class occurrences.
#[async_trait]
pub trait OccurrenceRepository: Send + Sync {
    /// Insert an ad-hoc occurrence.
    async fn insert_occurrence(&self, occurrence: ClassOccurrence)
        -> RepositoryResult<OccurrenceId>;

    /// Insert a template-generated occurrence, deduplicating on
    /// (template id, start timestamp).
    ///
    /// Implementations must perform the existence check and the insert
    /// under one guard so concurrent expansions of the same template
    /// cannot create duplicates.
    ///
    /// # Returns
    /// * `Ok(Some(OccurrenceId))` - Newly created occurrence
    /// * `Ok(None)` - An occurrence for this (template, start) already exists
    async fn insert_generated_occurrence(
        &self,
        occurrence: ClassOccurrence,
    ) -> RepositoryResult<Option<OccurrenceId>>;

    /// Fetch an occurrence by id.
    async fn fetch_occurrence(&self, id: OccurrenceId) -> RepositoryResult<ClassOccurrence>;

    /// All occurrences generated by a template, ordered by start time.
    async fn occurrences_for_template(
        &self,
        template_id: TemplateId,
    ) -> RepositoryResult<Vec<ClassOccurrence>>;

    /// Occurrences starting within `[from, to)`, ordered by start time.
    async fn occurrences_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<ClassOccurrence>>;

    /// Apply a partial patch to an occurrence.
    async fn patch_occurrence(
        &self,
        id: OccurrenceId,
        patch: &OccurrencePatch,
    ) -> RepositoryResult<()>;

    /// Delete an occurrence and its enrollments.
    async fn delete_occurrence(&self, id: OccurrenceId) -> RepositoryResult<()>;

    /// Delete all of a template's occurrences with `starts_at > now`,
    /// together with their enrollments. Past occurrences are untouched.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of occurrences deleted
    async fn delete_future_occurrences(
        &self,
        template_id: TemplateId,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize>;
}
