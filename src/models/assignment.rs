// src/models/assignment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'assignments' table: a group handed out to a cohort.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub group_id: i64,
    pub randomize_questions: bool,
    pub randomize_answers: bool,
    pub show_results_immediately: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.is_none_or(|start| now >= start) && self.ends_at.is_none_or(|end| now <= end)
    }
}

/// Represents the 'assignment_participations' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Participation {
    pub id: i64,
    pub assignment_id: i64,
    pub exam_taker_id: i64,
}
