//! In-memory repository implementation.
//!
//! `LocalRepository` keeps every record in process memory behind a single
//! `parking_lot::RwLock`. All checked mutations (conditional enrollment
//! insert, displacement swap, deduplicated occurrence insert) take the
//! write guard for their whole check-then-mutate sequence, which gives the
//! atomicity the repository traits require: two racing enrollments for the
//! last slot of an occurrence cannot both succeed.
//!
//! The repository also doubles as a [`ClientDirectory`] so tests and local
//! development do not need a separate member-directory collaborator; seed
//! it with [`LocalRepository::upsert_client`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::api::{
    AttendanceStatus, ClassOccurrence, ClassTemplate, ClientId, ClientRecord, Enrollment,
    EnrollmentId, EnrollmentTier, OccurrenceId, OccurrencePatch, TemplateId,
};
use crate::db::repository::{
    ClientDirectory, EnrollmentRepository, ErrorContext, FullRepository, OccurrenceRepository,
    RepositoryError, RepositoryResult, TemplateRepository,
};

#[derive(Default)]
struct Store {
    templates: HashMap<i64, ClassTemplate>,
    occurrences: HashMap<i64, ClassOccurrence>,
    enrollments: HashMap<i64, Enrollment>,
    clients: HashMap<i64, ClientRecord>,
    next_template_id: i64,
    next_occurrence_id: i64,
    next_enrollment_id: i64,
}

impl Store {
    fn occurrence_enrollment_count(&self, occurrence_id: OccurrenceId) -> usize {
        self.enrollments
            .values()
            .filter(|e| e.occurrence_id == occurrence_id)
            .count()
    }

    fn client_enrolled(&self, occurrence_id: OccurrenceId, client_id: ClientId) -> bool {
        self.enrollments
            .values()
            .any(|e| e.occurrence_id == occurrence_id && e.client_id == client_id)
    }

    fn remove_enrollments_of_occurrence(&mut self, occurrence_id: OccurrenceId) {
        self.enrollments
            .retain(|_, e| e.occurrence_id != occurrence_id);
    }
}

/// In-memory repository for unit testing and local development.
#[derive(Default)]
pub struct LocalRepository {
    inner: RwLock<Store>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a client record in the embedded directory.
    pub fn upsert_client(&self, client: ClientRecord) {
        let mut store = self.inner.write();
        store.clients.insert(client.id.value(), client);
    }
}

#[async_trait]
impl TemplateRepository for LocalRepository {
    async fn insert_template(&self, mut template: ClassTemplate) -> RepositoryResult<TemplateId> {
        let mut store = self.inner.write();
        store.next_template_id += 1;
        let id = TemplateId::new(store.next_template_id);
        template.id = Some(id);
        store.templates.insert(id.value(), template);
        Ok(id)
    }

    async fn fetch_template(&self, id: TemplateId) -> RepositoryResult<ClassTemplate> {
        let store = self.inner.read();
        store.templates.get(&id.value()).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Template {} does not exist", id),
                ErrorContext::new("fetch_template")
                    .with_entity("template")
                    .with_entity_id(id),
            )
        })
    }

    async fn list_templates(&self) -> RepositoryResult<Vec<ClassTemplate>> {
        let store = self.inner.read();
        let mut templates: Vec<_> = store.templates.values().cloned().collect();
        templates.sort_by_key(|t| t.id.map(|id| id.value()).unwrap_or_default());
        Ok(templates)
    }

    async fn update_template(&self, template: ClassTemplate) -> RepositoryResult<()> {
        let id = template.id.ok_or_else(|| {
            RepositoryError::validation("Cannot update a template without an id")
        })?;
        let mut store = self.inner.write();
        if !store.templates.contains_key(&id.value()) {
            return Err(RepositoryError::not_found(format!(
                "Template {} does not exist",
                id
            )));
        }
        store.templates.insert(id.value(), template);
        Ok(())
    }

    async fn delete_template(&self, id: TemplateId) -> RepositoryResult<()> {
        let mut store = self.inner.write();
        if store.templates.remove(&id.value()).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Template {} does not exist",
                id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OccurrenceRepository for LocalRepository {
    async fn insert_occurrence(
        &self,
        mut occurrence: ClassOccurrence,
    ) -> RepositoryResult<OccurrenceId> {
        let mut store = self.inner.write();
        store.next_occurrence_id += 1;
        let id = OccurrenceId::new(store.next_occurrence_id);
        occurrence.id = Some(id);
        store.occurrences.insert(id.value(), occurrence);
        Ok(id)
    }

    async fn insert_generated_occurrence(
        &self,
        mut occurrence: ClassOccurrence,
    ) -> RepositoryResult<Option<OccurrenceId>> {
        let template_id = occurrence.template_id.ok_or_else(|| {
            RepositoryError::validation("Generated occurrence must reference its template")
        })?;

        // Existence check and insert under one write guard: concurrent
        // expansions of the same template stay idempotent.
        let mut store = self.inner.write();
        let duplicate = store
            .occurrences
            .values()
            .any(|o| o.template_id == Some(template_id) && o.starts_at == occurrence.starts_at);
        if duplicate {
            return Ok(None);
        }

        store.next_occurrence_id += 1;
        let id = OccurrenceId::new(store.next_occurrence_id);
        occurrence.id = Some(id);
        store.occurrences.insert(id.value(), occurrence);
        Ok(Some(id))
    }

    async fn fetch_occurrence(&self, id: OccurrenceId) -> RepositoryResult<ClassOccurrence> {
        let store = self.inner.read();
        store.occurrences.get(&id.value()).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Occurrence {} does not exist", id),
                ErrorContext::new("fetch_occurrence")
                    .with_entity("occurrence")
                    .with_entity_id(id),
            )
        })
    }

    async fn occurrences_for_template(
        &self,
        template_id: TemplateId,
    ) -> RepositoryResult<Vec<ClassOccurrence>> {
        let store = self.inner.read();
        let mut occurrences: Vec<_> = store
            .occurrences
            .values()
            .filter(|o| o.template_id == Some(template_id))
            .cloned()
            .collect();
        occurrences.sort_by_key(|o| (o.starts_at, o.id.map(|id| id.value()).unwrap_or_default()));
        Ok(occurrences)
    }

    async fn occurrences_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<ClassOccurrence>> {
        let store = self.inner.read();
        let mut occurrences: Vec<_> = store
            .occurrences
            .values()
            .filter(|o| o.starts_at >= from && o.starts_at < to)
            .cloned()
            .collect();
        occurrences.sort_by_key(|o| (o.starts_at, o.id.map(|id| id.value()).unwrap_or_default()));
        Ok(occurrences)
    }

    async fn patch_occurrence(
        &self,
        id: OccurrenceId,
        patch: &OccurrencePatch,
    ) -> RepositoryResult<()> {
        let mut store = self.inner.write();
        let occurrence = store.occurrences.get_mut(&id.value()).ok_or_else(|| {
            RepositoryError::not_found(format!("Occurrence {} does not exist", id))
        })?;
        if let Some(starts_at) = patch.starts_at {
            occurrence.starts_at = starts_at;
        }
        if let Some(ref title) = patch.title {
            occurrence.title = title.clone();
        }
        if let Some(duration) = patch.duration_minutes {
            occurrence.duration_minutes = duration;
        }
        if let Some(ref notes) = patch.notes {
            occurrence.notes = notes.clone();
        }
        Ok(())
    }

    async fn delete_occurrence(&self, id: OccurrenceId) -> RepositoryResult<()> {
        let mut store = self.inner.write();
        if store.occurrences.remove(&id.value()).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Occurrence {} does not exist",
                id
            )));
        }
        store.remove_enrollments_of_occurrence(id);
        Ok(())
    }

    async fn delete_future_occurrences(
        &self,
        template_id: TemplateId,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let mut store = self.inner.write();
        let doomed: Vec<OccurrenceId> = store
            .occurrences
            .values()
            .filter(|o| o.template_id == Some(template_id) && o.starts_at > now)
            .filter_map(|o| o.id)
            .collect();
        for id in &doomed {
            store.occurrences.remove(&id.value());
            store.remove_enrollments_of_occurrence(*id);
        }
        Ok(doomed.len())
    }
}

#[async_trait]
impl EnrollmentRepository for LocalRepository {
    async fn insert_enrollment_checked(
        &self,
        mut enrollment: Enrollment,
        capacity: usize,
    ) -> RepositoryResult<EnrollmentId> {
        let mut store = self.inner.write();

        let occurrence_id = enrollment.occurrence_id;
        if !store.occurrences.contains_key(&occurrence_id.value()) {
            return Err(RepositoryError::not_found_with_context(
                format!("Occurrence {} does not exist", occurrence_id),
                ErrorContext::new("insert_enrollment_checked")
                    .with_entity("occurrence")
                    .with_entity_id(occurrence_id),
            ));
        }
        if store.client_enrolled(occurrence_id, enrollment.client_id) {
            return Err(RepositoryError::validation_with_context(
                format!(
                    "Client {} is already enrolled in occurrence {}",
                    enrollment.client_id, occurrence_id
                ),
                ErrorContext::new("insert_enrollment_checked")
                    .with_entity("enrollment")
                    .with_details("duplicate client"),
            ));
        }
        // Count re-validated inside the same guard as the insert.
        if store.occurrence_enrollment_count(occurrence_id) >= capacity {
            return Err(RepositoryError::capacity_exceeded_with_context(
                format!("Occurrence {} is full", occurrence_id),
                ErrorContext::new("insert_enrollment_checked")
                    .with_entity("occurrence")
                    .with_entity_id(occurrence_id)
                    .with_details(format!("capacity={}", capacity)),
            ));
        }

        store.next_enrollment_id += 1;
        let id = EnrollmentId::new(store.next_enrollment_id);
        enrollment.id = Some(id);
        store.enrollments.insert(id.value(), enrollment);
        Ok(id)
    }

    async fn swap_enrollment(
        &self,
        occurrence_id: OccurrenceId,
        victim: EnrollmentId,
        mut replacement: Enrollment,
        capacity: usize,
    ) -> RepositoryResult<EnrollmentId> {
        let mut store = self.inner.write();

        let victim_valid = store
            .enrollments
            .get(&victim.value())
            .map(|e| e.occurrence_id == occurrence_id)
            .unwrap_or(false);
        if !victim_valid {
            // The proposal is stale: the victim cancelled or was already
            // displaced. The caller re-evaluates from scratch.
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "Victim enrollment {} is no longer part of occurrence {}",
                    victim, occurrence_id
                ),
                ErrorContext::new("swap_enrollment")
                    .with_entity("enrollment")
                    .with_entity_id(victim),
            ));
        }

        if store.client_enrolled(occurrence_id, replacement.client_id) {
            return Err(RepositoryError::validation_with_context(
                format!(
                    "Client {} is already enrolled in occurrence {}",
                    replacement.client_id, occurrence_id
                ),
                ErrorContext::new("swap_enrollment").with_details("duplicate client"),
            ));
        }

        // Recount with the victim excluded; capacity may have changed
        // between proposal and confirmation.
        let count_without_victim = store.occurrence_enrollment_count(occurrence_id) - 1;
        if count_without_victim >= capacity {
            return Err(RepositoryError::capacity_exceeded_with_context(
                format!("Occurrence {} is full even after displacement", occurrence_id),
                ErrorContext::new("swap_enrollment")
                    .with_entity("occurrence")
                    .with_entity_id(occurrence_id)
                    .with_details(format!("capacity={}", capacity)),
            ));
        }

        // Both mutations under one guard: no capacity-1 state is observable.
        store.enrollments.remove(&victim.value());
        store.next_enrollment_id += 1;
        let id = EnrollmentId::new(store.next_enrollment_id);
        replacement.id = Some(id);
        store.enrollments.insert(id.value(), replacement);
        Ok(id)
    }

    async fn fetch_enrollment(&self, id: EnrollmentId) -> RepositoryResult<Enrollment> {
        let store = self.inner.read();
        store.enrollments.get(&id.value()).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Enrollment {} does not exist", id),
                ErrorContext::new("fetch_enrollment")
                    .with_entity("enrollment")
                    .with_entity_id(id),
            )
        })
    }

    async fn enrollments_for_occurrence(
        &self,
        occurrence_id: OccurrenceId,
    ) -> RepositoryResult<Vec<Enrollment>> {
        let store = self.inner.read();
        let mut enrollments: Vec<_> = store
            .enrollments
            .values()
            .filter(|e| e.occurrence_id == occurrence_id)
            .cloned()
            .collect();
        enrollments.sort_by_key(|e| (e.created_at, e.id.map(|id| id.value()).unwrap_or_default()));
        Ok(enrollments)
    }

    async fn count_for_occurrence(&self, occurrence_id: OccurrenceId) -> RepositoryResult<usize> {
        let store = self.inner.read();
        Ok(store.occurrence_enrollment_count(occurrence_id))
    }

    async fn update_enrollment_status(
        &self,
        id: EnrollmentId,
        status: AttendanceStatus,
    ) -> RepositoryResult<()> {
        let mut store = self.inner.write();
        let enrollment = store.enrollments.get_mut(&id.value()).ok_or_else(|| {
            RepositoryError::not_found(format!("Enrollment {} does not exist", id))
        })?;
        enrollment.status = status;
        Ok(())
    }

    async fn delete_enrollment(&self, id: EnrollmentId) -> RepositoryResult<()> {
        let mut store = self.inner.write();
        if store.enrollments.remove(&id.value()).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Enrollment {} does not exist",
                id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ClientDirectory for LocalRepository {
    async fn client(&self, id: ClientId) -> RepositoryResult<ClientRecord> {
        let store = self.inner.read();
        store.clients.get(&id.value()).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Client {} does not exist", id),
                ErrorContext::new("client")
                    .with_entity("client")
                    .with_entity_id(id),
            )
        })
    }

    async fn enrollment_tier(&self, id: ClientId) -> RepositoryResult<EnrollmentTier> {
        self.client(id).await.map(|c| c.tier)
    }
}

#[async_trait]
impl FullRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }
}
