//! Template expansion service.
//!
//! Turns recurring class templates into concrete dated occurrences. The
//! expansion is idempotent: re-running it over a window that already has
//! materialized occurrences creates no duplicates, because the repository
//! deduplicates on (template id, start timestamp) inside its write guard.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::api::{
    ClassOccurrence, ClassTemplate, DateWindow, OccurrencePatch, TemplateId,
};
use crate::config::EngineSettings;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::db::FullRepository;
use crate::models::time::{resolve_local, Clock};

/// Summary of an edit applied to a template and its future occurrences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateEditSummary {
    /// Future occurrences patched in place.
    pub updated: usize,
    /// Future occurrences removed because the edited recurrence no longer
    /// covers their date.
    pub removed: usize,
}

/// Validate and insert a new template.
///
/// A template whose recurrence range is inverted is rejected here, before
/// any expansion can run.
pub async fn create_template(
    repo: &dyn FullRepository,
    template: ClassTemplate,
) -> RepositoryResult<TemplateId> {
    template.validate().map_err(|e| {
        RepositoryError::validation_with_context(
            e,
            ErrorContext::new("create_template").with_entity("template"),
        )
    })?;
    repo.insert_template(template).await
}

/// Materialize a template's occurrences within `window`.
///
/// For each window date covered by the template's weekday set and
/// recurrence range, one occurrence is created at the template's
/// wall-clock time resolved in the business timezone. Dates already
/// materialized are skipped.
///
/// # Returns
/// The occurrences newly created by this run, ordered by start time.
pub async fn expand_template(
    repo: &dyn FullRepository,
    settings: &EngineSettings,
    template_id: TemplateId,
    window: DateWindow,
) -> RepositoryResult<Vec<ClassOccurrence>> {
    let template = repo.fetch_template(template_id).await?;
    template.validate().map_err(|e| {
        RepositoryError::validation_with_context(
            e,
            ErrorContext::new("expand_template")
                .with_entity("template")
                .with_entity_id(template_id),
        )
    })?;

    let tz = settings.timezone()?;
    let title = occurrence_title(repo, &template).await?;

    let mut created = Vec::new();
    let mut skipped = 0usize;
    for date in window.dates() {
        if !template.covers(date) {
            continue;
        }
        let starts_at = resolve_local(date, template.time_of_day, tz);
        let occurrence = ClassOccurrence {
            id: None,
            starts_at,
            duration_minutes: template.duration_minutes,
            client_id: template.client_id,
            title: title.clone(),
            template_id: Some(template_id),
            notes: template.notes.clone(),
        };
        match repo.insert_generated_occurrence(occurrence).await? {
            Some(id) => {
                let occurrence = repo.fetch_occurrence(id).await?;
                created.push(occurrence);
            }
            None => skipped += 1,
        }
    }

    debug!(
        "Expanded template {} over [{}, {}]: {} created, {} already materialized",
        template_id, window.from, window.to, created.len(), skipped
    );
    Ok(created)
}

/// Apply an edited template to the store.
///
/// The template record is replaced, and the edit is propagated to its
/// generated occurrences that have not yet started: their start time,
/// title, duration and notes are recomputed from the edited template.
/// Future occurrences whose date the edited recurrence no longer covers
/// are deleted (with their enrollments). Already-started and past
/// occurrences are immutable with respect to the template.
pub async fn apply_template_edit(
    repo: &dyn FullRepository,
    settings: &EngineSettings,
    clock: &dyn Clock,
    template: ClassTemplate,
) -> RepositoryResult<TemplateEditSummary> {
    let template_id = template.id.ok_or_else(|| {
        RepositoryError::validation("Cannot edit a template without an id")
    })?;
    template.validate().map_err(|e| {
        RepositoryError::validation_with_context(
            e,
            ErrorContext::new("apply_template_edit")
                .with_entity("template")
                .with_entity_id(template_id),
        )
    })?;

    let tz = settings.timezone()?;
    let now = clock.now_utc();
    let title = occurrence_title(repo, &template).await?;

    repo.update_template(template.clone()).await?;

    let mut summary = TemplateEditSummary::default();
    for occurrence in repo.occurrences_for_template(template_id).await? {
        if occurrence.has_started(now) {
            continue;
        }
        let id = match occurrence.id {
            Some(id) => id,
            None => continue,
        };
        let local_date = occurrence.starts_at.with_timezone(&tz).date_naive();
        if !template.covers(local_date) {
            repo.delete_occurrence(id).await?;
            summary.removed += 1;
            continue;
        }
        let patch = OccurrencePatch {
            starts_at: Some(resolve_local(local_date, template.time_of_day, tz)),
            title: Some(title.clone()),
            duration_minutes: Some(template.duration_minutes),
            notes: Some(template.notes.clone()),
        };
        repo.patch_occurrence(id, &patch).await?;
        summary.updated += 1;
    }

    debug!(
        "Edited template {}: {} future occurrences updated, {} removed",
        template_id, summary.updated, summary.removed
    );
    Ok(summary)
}

/// Delete a template together with its not-yet-started occurrences.
///
/// Past and already-started occurrences are historical record and remain
/// queryable; only future generated occurrences (and their enrollments)
/// are removed.
///
/// # Returns
/// Number of occurrences deleted.
pub async fn delete_template(
    repo: &dyn FullRepository,
    clock: &dyn Clock,
    template_id: TemplateId,
) -> RepositoryResult<usize> {
    // Fetch first so an unknown id surfaces as NotFound before any cascade.
    repo.fetch_template(template_id).await?;

    let now = clock.now_utc();
    let removed = repo.delete_future_occurrences(template_id, now).await?;
    repo.delete_template(template_id).await?;

    info!(
        "Deleted template {} and {} future occurrences",
        template_id, removed
    );
    Ok(removed)
}

/// Occurrences within a date window, resolved in the business timezone.
pub async fn occurrences_in_window(
    repo: &dyn FullRepository,
    settings: &EngineSettings,
    window: DateWindow,
) -> RepositoryResult<Vec<ClassOccurrence>> {
    let tz = settings.timezone()?;
    let from = resolve_local(window.from, chrono::NaiveTime::MIN, tz);
    let to_exclusive: DateTime<Utc> = match window.to.succ_opt() {
        Some(next) => resolve_local(next, chrono::NaiveTime::MIN, tz),
        None => DateTime::<Utc>::MAX_UTC,
    };
    repo.occurrences_in_range(from, to_exclusive).await
}

/// Display title of a generated occurrence: "session with {client name}"
/// for single-student templates, the template title otherwise.
async fn occurrence_title(
    repo: &dyn FullRepository,
    template: &ClassTemplate,
) -> RepositoryResult<String> {
    match template.client_id {
        Some(client_id) => {
            let client = repo.client(client_id).await?;
            Ok(format!("session with {}", client.name))
        }
        None => Ok(template.title.clone()),
    }
}
