// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{AssignmentProvider, GroupProvider, ModuleProvider, ProgressStore};
use crate::{
    error::AppError,
    models::{
        assignment::{Assignment, Participation},
        group::{Group, GroupMemberSlot},
        module::{ModuleVersion, PossibleAnswer, Question},
        progress::{ModuleProgress, NewModuleProgress, QuestionResponse},
    },
};

const PROGRESS_COLUMNS: &str = "id, exam_taker_id, participation_id, assignment_id, group_member_id, \
     module_version_id, duration_in_minutes, started_at, completed_at, question_seed, answer_seed";

/// Store backed by the Postgres schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads questions and possible answers of a version in authored order.
    async fn with_questions(&self, mut version: ModuleVersion) -> Result<ModuleVersion, AppError> {
        let mut questions: Vec<Question> = sqlx::query_as(
            r#"
            SELECT id, module_version_id, type, content
            FROM questions
            WHERE module_version_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(version.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions of version {}: {:?}", version.id, e);
            AppError::from(e)
        })?;

        let answers: Vec<PossibleAnswer> = sqlx::query_as(
            r#"
            SELECT pa.id, pa.question_id, pa.text, pa.is_correct
            FROM possible_answers pa
            JOIN questions q ON q.id = pa.question_id
            WHERE q.module_version_id = $1
            ORDER BY pa.position, pa.id
            "#,
        )
        .bind(version.id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<i64, Vec<PossibleAnswer>> = HashMap::new();
        for answer in answers {
            by_question.entry(answer.question_id).or_default().push(answer);
        }
        for question in &mut questions {
            question.answers = by_question.remove(&question.id).unwrap_or_default();
        }

        version.questions = questions;
        Ok(version)
    }

    /// Attaches stored responses to each progress record.
    async fn with_responses(&self, mut progress: Vec<ModuleProgress>) -> Result<Vec<ModuleProgress>, AppError> {
        if progress.is_empty() {
            return Ok(progress);
        }
        let ids: Vec<i64> = progress.iter().map(|p| p.id).collect();

        let responses: Vec<QuestionResponse> = sqlx::query_as(
            r#"
            SELECT module_progress_id, question_id, question_type, selected_answer_ids,
                   free_text, is_correct, responded_at
            FROM question_responses
            WHERE module_progress_id = ANY($1)
            ORDER BY responded_at, question_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_progress: HashMap<i64, Vec<QuestionResponse>> = HashMap::new();
        for response in responses {
            by_progress
                .entry(response.module_progress_id)
                .or_default()
                .push(response);
        }
        for p in &mut progress {
            p.responses = by_progress.remove(&p.id).unwrap_or_default();
        }
        Ok(progress)
    }

    async fn with_responses_one(&self, progress: Option<ModuleProgress>) -> Result<Option<ModuleProgress>, AppError> {
        match progress {
            Some(p) => Ok(self.with_responses(vec![p]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ModuleProvider for PgStore {
    async fn latest_published_version(&self, module_id: i64) -> Result<ModuleVersion, AppError> {
        let version: ModuleVersion = sqlx::query_as(
            r#"
            SELECT id, module_id, duration_in_minutes
            FROM module_versions
            WHERE module_id = $1 AND published_at IS NOT NULL
            ORDER BY published_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Module {} has no published version", module_id)))?;

        self.with_questions(version).await
    }

    async fn module_version(&self, version_id: i64) -> Result<ModuleVersion, AppError> {
        let version: ModuleVersion = sqlx::query_as(
            "SELECT id, module_id, duration_in_minutes FROM module_versions WHERE id = $1",
        )
        .bind(version_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Module version not found".to_string()))?;

        self.with_questions(version).await
    }
}

#[async_trait]
impl GroupProvider for PgStore {
    async fn group(&self, group_id: i64) -> Result<Group, AppError> {
        let mut group: Group = sqlx::query_as(
            r#"
            SELECT id, name, is_member_order_locked, wait_module_completion
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Group not found".to_string()))?;

        group.slots = sqlx::query_as::<_, GroupMemberSlot>(
            r#"
            SELECT id, group_id, order_number, module_id
            FROM group_members
            WHERE group_id = $1
            ORDER BY order_number
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(group)
    }
}

#[async_trait]
impl AssignmentProvider for PgStore {
    async fn assignment(&self, assignment_id: i64) -> Result<Assignment, AppError> {
        sqlx::query_as(
            r#"
            SELECT id, group_id, randomize_questions, randomize_answers,
                   show_results_immediately, starts_at, ends_at
            FROM assignments
            WHERE id = $1
            "#,
        )
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Assignment not found".to_string()))
    }

    async fn participation(
        &self,
        assignment_id: i64,
        exam_taker_id: i64,
    ) -> Result<Option<Participation>, AppError> {
        let participation = sqlx::query_as(
            r#"
            SELECT id, assignment_id, exam_taker_id
            FROM assignment_participations
            WHERE assignment_id = $1 AND exam_taker_id = $2
            "#,
        )
        .bind(assignment_id)
        .bind(exam_taker_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participation)
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn list_progress(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
    ) -> Result<Vec<ModuleProgress>, AppError> {
        let sql = format!(
            "SELECT {} FROM module_progress WHERE exam_taker_id = $1 AND assignment_id = $2 ORDER BY id",
            PROGRESS_COLUMNS
        );
        let progress: Vec<ModuleProgress> = sqlx::query_as(&sql)
            .bind(exam_taker_id)
            .bind(assignment_id)
            .fetch_all(&self.pool)
            .await?;

        self.with_responses(progress).await
    }

    async fn find_progress(&self, progress_id: i64) -> Result<Option<ModuleProgress>, AppError> {
        let sql = format!("SELECT {} FROM module_progress WHERE id = $1", PROGRESS_COLUMNS);
        let progress: Option<ModuleProgress> = sqlx::query_as(&sql)
            .bind(progress_id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_responses_one(progress).await
    }

    async fn find_progress_for_version(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
        module_version_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ModuleProgress>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM module_progress
            WHERE exam_taker_id = $1 AND assignment_id = $2 AND module_version_id = $3
            ORDER BY (completed_at IS NULL
                      AND started_at + make_interval(mins => duration_in_minutes) > $4) DESC,
                     id DESC
            LIMIT 1
            "#,
            PROGRESS_COLUMNS
        );
        let progress: Option<ModuleProgress> = sqlx::query_as(&sql)
            .bind(exam_taker_id)
            .bind(assignment_id)
            .bind(module_version_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        self.with_responses_one(progress).await
    }

    async fn insert_progress(&self, new: NewModuleProgress) -> Result<ModuleProgress, AppError> {
        let sql = format!(
            r#"
            INSERT INTO module_progress (
                exam_taker_id, participation_id, assignment_id, group_member_id,
                module_version_id, duration_in_minutes, started_at, question_seed, answer_seed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PROGRESS_COLUMNS
        );

        sqlx::query_as(&sql)
            .bind(new.exam_taker_id)
            .bind(new.participation_id)
            .bind(new.assignment_id)
            .bind(new.group_member_id)
            .bind(new.module_version_id)
            .bind(new.duration_in_minutes)
            .bind(new.started_at)
            .bind(new.question_seed)
            .bind(new.answer_seed)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match AppError::from(e) {
                // (exam_taker_id, group_member_id, assignment_id) is unique
                AppError::Conflict(_) => AppError::Conflict("Module already started".to_string()),
                other => {
                    tracing::error!("Failed to insert module progress: {}", other);
                    other
                }
            })
    }

    async fn upsert_response(&self, response: QuestionResponse) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO question_responses (
                module_progress_id, question_id, question_type, selected_answer_ids,
                free_text, is_correct, responded_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE EXISTS (
                SELECT 1 FROM module_progress WHERE id = $1 AND completed_at IS NULL
            )
            ON CONFLICT (module_progress_id, question_id) DO UPDATE SET
                question_type = EXCLUDED.question_type,
                selected_answer_ids = EXCLUDED.selected_answer_ids,
                free_text = EXCLUDED.free_text,
                is_correct = EXCLUDED.is_correct,
                responded_at = EXCLUDED.responded_at
            "#,
        )
        .bind(response.module_progress_id)
        .bind(response.question_id)
        .bind(&response.question_type)
        .bind(&response.selected_answer_ids)
        .bind(&response.free_text)
        .bind(response.is_correct)
        .bind(response.responded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert question response: {:?}", e);
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("Module already completed".to_string()));
        }
        Ok(())
    }

    async fn complete_progress(
        &self,
        progress_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<ModuleProgress, AppError> {
        let sql = format!(
            "UPDATE module_progress SET completed_at = $2 \
             WHERE id = $1 AND completed_at IS NULL RETURNING {}",
            PROGRESS_COLUMNS
        );
        let updated: Option<ModuleProgress> = sqlx::query_as(&sql)
            .bind(progress_id)
            .bind(completed_at)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(progress) => Ok(self
                .with_responses(vec![progress])
                .await?
                .pop()
                .ok_or(AppError::NotFound("Progress not found".to_string()))?),
            None => match self.find_progress(progress_id).await? {
                Some(_) => Err(AppError::Conflict("Module already completed".to_string())),
                None => Err(AppError::NotFound("Progress not found".to_string())),
            },
        }
    }
}
