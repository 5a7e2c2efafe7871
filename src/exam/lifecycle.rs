//! Creation, content delivery, answering and completion of module attempts.
//!
//! Every transition is guarded by the status resolver or the attempt's time
//! window, and every guard runs before anything is written.

use std::sync::Arc;

use crate::{
    error::AppError,
    exam::{
        grader::{self, Submission},
        shuffle,
        status::{resolve_all, resolve_status},
    },
    models::{
        assignment::{Assignment, Participation},
        module::{Question, QuestionType},
        progress::{ModuleProgress, ModuleStatus, NewModuleProgress, QuestionResponse},
        session::{
            CompletionSummary, ModuleContent, ModuleResult, PublicAnswer, PublicQuestion,
            RecordedAnswer, SlotStatus, SubmitAnswerRequest, SubmitAnswerResponse,
        },
    },
    store::ExamStore,
    utils::clock::Clock,
};

#[derive(Clone)]
pub struct ProgressEngine {
    store: Arc<dyn ExamStore>,
    clock: Arc<dyn Clock>,
}

impl ProgressEngine {
    pub fn new(store: Arc<dyn ExamStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Status of every slot in the assignment's group, in slot order.
    pub async fn module_statuses(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
    ) -> Result<Vec<SlotStatus>, AppError> {
        let assignment = self.store.assignment(assignment_id).await?;
        self.participation(&assignment, exam_taker_id).await?;
        let group = self.store.group(assignment.group_id).await?;
        let progress = self.store.list_progress(exam_taker_id, assignment_id).await?;

        let statuses = resolve_all(&progress, &group, self.clock.now())
            .into_iter()
            .map(|(slot, status)| SlotStatus {
                progress_id: progress
                    .iter()
                    .find(|p| p.group_member_id == slot.id)
                    .map(|p| p.id),
                slot_id: slot.id,
                order_number: slot.order_number,
                module_id: slot.module_id,
                status,
            })
            .collect();

        Ok(statuses)
    }

    /// Starts an attempt at `slot_id`. Only allowed while the slot is `NotStarted`.
    pub async fn create_progress(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
        slot_id: i64,
    ) -> Result<ModuleProgress, AppError> {
        let assignment = self.store.assignment(assignment_id).await?;
        if !assignment.is_open_at(self.clock.now()) {
            tracing::warn!(
                "Exam taker {} tried to start slot {} outside the window of assignment {}",
                exam_taker_id,
                slot_id,
                assignment_id
            );
            return Err(AppError::Conflict("Assignment is not open".to_string()));
        }
        let participation = self.participation(&assignment, exam_taker_id).await?;

        let group = self.store.group(assignment.group_id).await?;
        let slot = group
            .slot(slot_id)
            .ok_or(AppError::NotFound("Slot not found in group".to_string()))?;

        let progress = self.store.list_progress(exam_taker_id, assignment_id).await?;
        if progress.iter().any(|p| p.group_member_id == slot.id) {
            return Err(AppError::Conflict("Module already started".to_string()));
        }

        let status = resolve_status(slot, &progress, &group, self.clock.now());
        if status != ModuleStatus::NotStarted {
            tracing::warn!(
                "Exam taker {} cannot start slot {}: module is {}",
                exam_taker_id,
                slot.id,
                status
            );
            return Err(AppError::Conflict(format!("Module is {}", status)));
        }

        let version = self.store.latest_published_version(slot.module_id).await?;

        let created = self
            .store
            .insert_progress(NewModuleProgress {
                exam_taker_id,
                participation_id: participation.id,
                assignment_id,
                group_member_id: slot.id,
                module_version_id: version.id,
                duration_in_minutes: version.duration_in_minutes,
                started_at: self.clock.now(),
                question_seed: assignment.randomize_questions.then(shuffle::generate_seed),
                answer_seed: assignment.randomize_answers.then(shuffle::generate_seed),
            })
            .await?;

        tracing::info!(
            "Exam taker {} started slot {} (progress {}, module version {}, {} min)",
            exam_taker_id,
            slot.id,
            created.id,
            created.module_version_id,
            created.duration_in_minutes
        );
        Ok(created)
    }

    /// Content of the pinned module version, randomized per attempt.
    pub async fn module_content(
        &self,
        exam_taker_id: i64,
        assignment_id: i64,
        module_version_id: i64,
    ) -> Result<ModuleContent, AppError> {
        let assignment = self.store.assignment(assignment_id).await?;
        self.participation(&assignment, exam_taker_id).await?;
        let now = self.clock.now();

        let progress = self
            .store
            .find_progress_for_version(exam_taker_id, assignment_id, module_version_id, now)
            .await?
            .ok_or(AppError::NotFound("Module has not been started".to_string()))?;

        let version = self.store.module_version(progress.module_version_id).await?;
        let reveal = assignment.show_results_immediately && progress.is_completed();

        let questions = shuffle::shuffle(version.questions, progress.question_seed)
            .into_iter()
            .map(|question| public_question(question, &progress, reveal))
            .collect();

        Ok(ModuleContent {
            progress_id: progress.id,
            module_version_id: progress.module_version_id,
            duration_in_minutes: progress.duration_in_minutes,
            started_at: progress.started_at,
            completed_at: progress.completed_at,
            time_remaining_seconds: progress.time_remaining_seconds(now),
            questions,
        })
    }

    /// Grades and records one answer. Resubmitting the same answer writes nothing.
    pub async fn submit_answer(
        &self,
        exam_taker_id: i64,
        progress_id: i64,
        req: &SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse, AppError> {
        let progress = self.owned_progress(exam_taker_id, progress_id).await?;
        self.ensure_running(&progress)?;

        let version = self.store.module_version(progress.module_version_id).await?;
        let question = version
            .question(req.question_id)
            .ok_or(AppError::NotFound("Question not found in module".to_string()))?;

        let is_correct = grader::grade(
            question,
            Submission {
                selected_answer_ids: &req.selected_answer_ids,
                free_text: req.free_text.as_deref(),
            },
        )?;

        let assignment = self.store.assignment(progress.assignment_id).await?;
        let disclose = |correct: bool| assignment.show_results_immediately.then_some(correct);

        if let Some(existing) = progress.response(question.id) {
            if existing.same_submission(&req.selected_answer_ids, req.free_text.as_deref()) {
                tracing::debug!(
                    "Unchanged answer for question {} in progress {}",
                    question.id,
                    progress.id
                );
                return Ok(SubmitAnswerResponse {
                    question_id: question.id,
                    responded_at: existing.responded_at,
                    is_correct: disclose(existing.is_correct),
                });
            }
        }

        let mut selected_answer_ids = req.selected_answer_ids.clone();
        selected_answer_ids.sort_unstable();
        selected_answer_ids.dedup();

        let response = QuestionResponse {
            module_progress_id: progress.id,
            question_id: question.id,
            question_type: question.question_type.clone(),
            selected_answer_ids,
            free_text: req.free_text.clone(),
            is_correct,
            responded_at: self.clock.now(),
        };
        let responded_at = response.responded_at;
        self.store.upsert_response(response).await?;

        tracing::debug!(
            "Recorded answer for question {} in progress {}",
            question.id,
            progress.id
        );
        Ok(SubmitAnswerResponse {
            question_id: question.id,
            responded_at,
            is_correct: disclose(is_correct),
        })
    }

    /// Finishes the attempt. Terminal; a timed-out attempt cannot be completed.
    pub async fn complete(
        &self,
        exam_taker_id: i64,
        progress_id: i64,
    ) -> Result<CompletionSummary, AppError> {
        let progress = self.owned_progress(exam_taker_id, progress_id).await?;
        self.ensure_running(&progress)?;

        let completed = self
            .store
            .complete_progress(progress.id, self.clock.now())
            .await?;
        let completed_at = completed
            .completed_at
            .ok_or(AppError::InternalServerError("Completion was not stored".to_string()))?;

        tracing::info!(
            "Exam taker {} completed progress {} ({} answers)",
            exam_taker_id,
            completed.id,
            completed.responses.len()
        );

        let assignment = self.store.assignment(completed.assignment_id).await?;
        let result = if assignment.show_results_immediately {
            let version = self.store.module_version(completed.module_version_id).await?;
            Some(ModuleResult {
                correct: completed.responses.iter().filter(|r| r.is_correct).count(),
                answered: completed.responses.len(),
                total: version.questions.len(),
            })
        } else {
            None
        };

        Ok(CompletionSummary {
            progress_id: completed.id,
            completed_at,
            result,
        })
    }

    async fn participation(
        &self,
        assignment: &Assignment,
        exam_taker_id: i64,
    ) -> Result<Participation, AppError> {
        self.store
            .participation(assignment.id, exam_taker_id)
            .await?
            .ok_or(AppError::NotFound("Not a participant of this assignment".to_string()))
    }

    /// Progress owned by someone else is reported as absent.
    async fn owned_progress(&self, exam_taker_id: i64, progress_id: i64) -> Result<ModuleProgress, AppError> {
        self.store
            .find_progress(progress_id)
            .await?
            .filter(|p| p.exam_taker_id == exam_taker_id)
            .ok_or(AppError::NotFound("Progress not found".to_string()))
    }

    fn ensure_running(&self, progress: &ModuleProgress) -> Result<(), AppError> {
        if progress.is_completed() {
            return Err(AppError::Conflict("Module already completed".to_string()));
        }
        if progress.is_time_elapsed(self.clock.now()) {
            tracing::warn!("Progress {} is past its time window", progress.id);
            return Err(AppError::Conflict("Module time has elapsed".to_string()));
        }
        Ok(())
    }
}

fn public_question(question: Question, progress: &ModuleProgress, reveal: bool) -> PublicQuestion {
    let answers = match QuestionType::parse(&question.question_type) {
        Some(QuestionType::Single | QuestionType::Multiple) => {
            let seed = progress
                .answer_seed
                .map(|seed| shuffle::answer_seed_for(seed, question.id));
            shuffle::shuffle(question.answers, seed)
                .into_iter()
                .map(|a| PublicAnswer { id: a.id, text: a.text })
                .collect()
        }
        // Free-text answer keys never leave the server.
        _ => Vec::new(),
    };

    let response = progress.response(question.id).map(|r| RecordedAnswer {
        selected_answer_ids: r.selected_answer_ids.clone(),
        free_text: r.free_text.clone(),
        responded_at: r.responded_at,
        is_correct: reveal.then_some(r.is_correct),
    });

    PublicQuestion {
        id: question.id,
        question_type: question.question_type,
        content: question.content,
        answers,
        response,
    }
}
