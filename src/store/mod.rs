//! Narrow data-access interfaces consumed by the exam engine.
//!
//! Content authoring, group editing and participation management happen
//! elsewhere; from here modules, groups and assignments are read-only.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        assignment::{Assignment, Participation},
        group::Group,
        module::ModuleVersion,
        progress::{ModuleProgress, NewModuleProgress, QuestionResponse},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ModuleProvider: Send + Sync {
    /// Latest published version of a module, questions and answers in authored order.
    /// `NotFound` when nothing is published.
    async fn latest_published_version(&self, module_id: i64) -> Result<ModuleVersion, AppError>;

    /// A specific version, published or since superseded.
    async fn module_version(&self, version_id: i64) -> Result<ModuleVersion, AppError>;
}

#[async_trait]
pub trait GroupProvider: Send + Sync {
    /// Group flags plus its slots ordered by order number.
    async fn group(&self, group_id: i64) -> Result<Group, AppError>;
}

#[async_trait]
pub trait AssignmentProvider: Send + Sync {
    async fn assignment(&self, assignment_id: i64) -> Result<Assignment, AppError>;

    async fn participation(
        &self,
        assignment_id: i64,
        exam_taker_id: i64,
    ) -> Result<Option<Participation>, AppError>;
}

/// Storage for attempts and their responses. Returned progress always carries its responses.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// All of the exam taker's progress within one assignment (and so one group).
    async fn list_progress(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
    ) -> Result<Vec<ModuleProgress>, AppError>;

    async fn find_progress(&self, progress_id: i64) -> Result<Option<ModuleProgress>, AppError>;

    /// Progress on a module version. When several slots share the module, the
    /// attempt still running at `now` wins, then the most recently created one.
    async fn find_progress_for_version(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
        module_version_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ModuleProgress>, AppError>;

    /// `Conflict` if the (exam taker, slot, assignment) tuple already has progress.
    async fn insert_progress(&self, progress: NewModuleProgress) -> Result<ModuleProgress, AppError>;

    /// Inserts or replaces the response for (progress, question).
    /// `Conflict` if the progress was completed in the meantime.
    async fn upsert_response(&self, response: QuestionResponse) -> Result<(), AppError>;

    /// Sets `completed_at` once. `Conflict` if it was already set.
    async fn complete_progress(
        &self,
        progress_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<ModuleProgress, AppError>;
}

/// Everything the engine reads and writes.
pub trait ExamStore: ModuleProvider + GroupProvider + AssignmentProvider + ProgressStore {}

impl<T> ExamStore for T where T: ModuleProvider + GroupProvider + AssignmentProvider + ProgressStore {}
