// src/models/progress.rs

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'module_progress' table: one exam taker's attempt at one slot.
///
/// `module_version_id` and `duration_in_minutes` are pinned when the attempt
/// starts and never change afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    pub id: i64,
    pub exam_taker_id: i64,
    pub participation_id: i64,
    pub assignment_id: i64,
    pub group_member_id: i64,
    pub module_version_id: i64,
    pub duration_in_minutes: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub question_seed: Option<i64>,
    #[serde(skip)]
    pub answer_seed: Option<i64>,

    #[sqlx(skip)]
    #[serde(skip)]
    pub responses: Vec<QuestionResponse>,
}

impl ModuleProgress {
    /// End of the time window: `started_at + duration_in_minutes`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.started_at + Duration::minutes(i64::from(self.duration_in_minutes))
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_time_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Started, not completed and still inside its window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && !self.is_time_elapsed(now)
    }

    /// Seconds left in the window, floored at zero.
    pub fn time_remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds().max(0)
    }

    pub fn response(&self, question_id: i64) -> Option<&QuestionResponse> {
        self.responses.iter().find(|r| r.question_id == question_id)
    }
}

/// Values for a progress row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewModuleProgress {
    pub exam_taker_id: i64,
    pub participation_id: i64,
    pub assignment_id: i64,
    pub group_member_id: i64,
    pub module_version_id: i64,
    pub duration_in_minutes: i32,
    pub started_at: DateTime<Utc>,
    pub question_seed: Option<i64>,
    pub answer_seed: Option<i64>,
}

/// Represents the 'question_responses' table.
/// At most one row exists per (progress, question).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub module_progress_id: i64,
    pub question_id: i64,
    pub question_type: String,
    pub selected_answer_ids: Vec<i64>,
    pub free_text: Option<String>,
    pub is_correct: bool,
    pub responded_at: DateTime<Utc>,
}

impl QuestionResponse {
    /// Whether a new submission equals this one (same text, same selected-id set).
    pub fn same_submission(&self, selected_answer_ids: &[i64], free_text: Option<&str>) -> bool {
        let mine: BTreeSet<i64> = self.selected_answer_ids.iter().copied().collect();
        let theirs: BTreeSet<i64> = selected_answer_ids.iter().copied().collect();
        mine == theirs && self.free_text.as_deref() == free_text
    }
}

/// Accessibility state of a slot for one exam taker. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleStatus {
    NotStarted,
    Locked,
    InProgress,
    WaitForModuleDurationToElapse,
    TimeElapsed,
    Completed,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModuleStatus::NotStarted => "not started",
            ModuleStatus::Locked => "locked",
            ModuleStatus::InProgress => "in progress",
            ModuleStatus::WaitForModuleDurationToElapse => "waiting for the module duration to elapse",
            ModuleStatus::TimeElapsed => "time elapsed",
            ModuleStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}
