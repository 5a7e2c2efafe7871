// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::progress::ModuleStatus;

/// Status of one slot as reported to the exam taker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatus {
    pub slot_id: i64,
    pub order_number: i32,
    pub module_id: i64,
    pub status: ModuleStatus,
    pub progress_id: Option<i64>,
}

/// DTO for submitting one answer.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    /// Ids of the selected possible answers (choice questions).
    #[serde(default)]
    #[validate(length(max = 100))]
    pub selected_answer_ids: Vec<i64>,
    /// Typed answer (free-text questions).
    #[validate(length(max = 5000))]
    pub free_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    pub question_id: i64,
    pub responded_at: DateTime<Utc>,
    /// Present only when the assignment reveals results immediately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

/// Module content delivered to the client, already randomized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleContent {
    pub progress_id: i64,
    pub module_version_id: i64,
    pub duration_in_minutes: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Computed server-side so the client cannot stretch its own window.
    pub time_remaining_seconds: i64,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for sending question to client (never includes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    /// Empty for free-text questions.
    pub answers: Vec<PublicAnswer>,
    pub response: Option<RecordedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicAnswer {
    pub id: i64,
    pub text: String,
}

/// What the exam taker already submitted for a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAnswer {
    pub selected_answer_ids: Vec<i64>,
    pub free_text: Option<String>,
    pub responded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub progress_id: i64,
    pub completed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ModuleResult>,
}

/// Score of a completed attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleResult {
    pub correct: usize,
    pub answered: usize,
    pub total: usize,
}
