//! In-process store used by tests and local runs without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AssignmentProvider, GroupProvider, ModuleProvider, ProgressStore};
use crate::{
    error::AppError,
    models::{
        assignment::{Assignment, Participation},
        group::Group,
        module::ModuleVersion,
        progress::{ModuleProgress, NewModuleProgress, QuestionResponse},
    },
};

#[derive(Default)]
struct Inner {
    groups: HashMap<i64, Group>,
    versions: HashMap<i64, ModuleVersion>,
    /// Published version ids per module, in publishing order.
    published: HashMap<i64, Vec<i64>>,
    assignments: HashMap<i64, Assignment>,
    participations: Vec<Participation>,
    progress: HashMap<i64, ModuleProgress>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_group(&self, mut group: Group) {
        group.slots.sort_by_key(|s| s.order_number);
        self.inner.write().await.groups.insert(group.id, group);
    }

    /// Stores a version and marks it as the module's latest published one.
    pub async fn publish_module_version(&self, version: ModuleVersion) {
        let mut inner = self.inner.write().await;
        inner
            .published
            .entry(version.module_id)
            .or_default()
            .push(version.id);
        inner.versions.insert(version.id, version);
    }

    pub async fn insert_assignment(&self, assignment: Assignment) {
        self.inner
            .write()
            .await
            .assignments
            .insert(assignment.id, assignment);
    }

    pub async fn add_participant(&self, assignment_id: i64, exam_taker_id: i64) -> Participation {
        let mut inner = self.inner.write().await;
        let participation = Participation {
            id: inner.next_id(),
            assignment_id,
            exam_taker_id,
        };
        inner.participations.push(participation.clone());
        participation
    }
}

#[async_trait]
impl ModuleProvider for MemoryStore {
    async fn latest_published_version(&self, module_id: i64) -> Result<ModuleVersion, AppError> {
        let inner = self.inner.read().await;
        inner
            .published
            .get(&module_id)
            .and_then(|ids| ids.last())
            .and_then(|id| inner.versions.get(id))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Module {} has no published version", module_id)))
    }

    async fn module_version(&self, version_id: i64) -> Result<ModuleVersion, AppError> {
        self.inner
            .read()
            .await
            .versions
            .get(&version_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Module version not found".to_string()))
    }
}

#[async_trait]
impl GroupProvider for MemoryStore {
    async fn group(&self, group_id: i64) -> Result<Group, AppError> {
        self.inner
            .read()
            .await
            .groups
            .get(&group_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))
    }
}

#[async_trait]
impl AssignmentProvider for MemoryStore {
    async fn assignment(&self, assignment_id: i64) -> Result<Assignment, AppError> {
        self.inner
            .read()
            .await
            .assignments
            .get(&assignment_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))
    }

    async fn participation(
        &self,
        assignment_id: i64,
        exam_taker_id: i64,
    ) -> Result<Option<Participation>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .participations
            .iter()
            .find(|p| p.assignment_id == assignment_id && p.exam_taker_id == exam_taker_id)
            .cloned())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn list_progress(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
    ) -> Result<Vec<ModuleProgress>, AppError> {
        let inner = self.inner.read().await;
        let mut found: Vec<ModuleProgress> = inner
            .progress
            .values()
            .filter(|p| p.exam_taker_id == exam_taker_id && p.assignment_id == assignment_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.id);
        Ok(found)
    }

    async fn find_progress(&self, progress_id: i64) -> Result<Option<ModuleProgress>, AppError> {
        Ok(self.inner.read().await.progress.get(&progress_id).cloned())
    }

    async fn find_progress_for_version(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
        module_version_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ModuleProgress>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .progress
            .values()
            .filter(|p| {
                p.exam_taker_id == exam_taker_id
                    && p.assignment_id == assignment_id
                    && p.module_version_id == module_version_id
            })
            .max_by_key(|p| (p.is_active(now), p.id))
            .cloned())
    }

    async fn insert_progress(&self, new: NewModuleProgress) -> Result<ModuleProgress, AppError> {
        let mut inner = self.inner.write().await;
        let duplicate = inner.progress.values().any(|p| {
            p.exam_taker_id == new.exam_taker_id
                && p.group_member_id == new.group_member_id
                && p.assignment_id == new.assignment_id
        });
        if duplicate {
            return Err(AppError::Conflict("Module already started".to_string()));
        }

        let progress = ModuleProgress {
            id: inner.next_id(),
            exam_taker_id: new.exam_taker_id,
            participation_id: new.participation_id,
            assignment_id: new.assignment_id,
            group_member_id: new.group_member_id,
            module_version_id: new.module_version_id,
            duration_in_minutes: new.duration_in_minutes,
            started_at: new.started_at,
            completed_at: None,
            question_seed: new.question_seed,
            answer_seed: new.answer_seed,
            responses: Vec::new(),
        };
        inner.progress.insert(progress.id, progress.clone());
        Ok(progress)
    }

    async fn upsert_response(&self, response: QuestionResponse) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let progress = inner
            .progress
            .get_mut(&response.module_progress_id)
            .ok_or_else(|| AppError::NotFound("Progress not found".to_string()))?;

        if progress.completed_at.is_some() {
            return Err(AppError::Conflict("Module already completed".to_string()));
        }
        match progress
            .responses
            .iter_mut()
            .find(|r| r.question_id == response.question_id)
        {
            Some(existing) => *existing = response,
            None => progress.responses.push(response),
        }
        Ok(())
    }

    async fn complete_progress(
        &self,
        progress_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<ModuleProgress, AppError> {
        let mut inner = self.inner.write().await;
        let progress = inner
            .progress
            .get_mut(&progress_id)
            .ok_or_else(|| AppError::NotFound("Progress not found".to_string()))?;

        if progress.completed_at.is_some() {
            return Err(AppError::Conflict("Module already completed".to_string()));
        }
        progress.completed_at = Some(completed_at);
        Ok(progress.clone())
    }
}
