// src/models/module.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'module_versions' table.
/// A module is republished as a new version; attempts pin the version they started on.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub id: i64,
    pub module_id: i64,
    pub duration_in_minutes: i32,

    /// Questions in authored order.
    #[sqlx(skip)]
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl ModuleVersion {
    pub fn question(&self, question_id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub module_version_id: i64,

    /// Question type: 'single', 'multiple' or 'free_text'.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,

    /// The text content of the question.
    pub content: String,

    /// Possible answers in authored order, loaded separately.
    #[sqlx(skip)]
    #[serde(default)]
    pub answers: Vec<PossibleAnswer>,
}

/// Represents the 'possible_answers' table.
/// For free-text questions, the texts flagged correct are the accepted answers.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct PossibleAnswer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Known question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Single,
    Multiple,
    FreeText,
}

impl QuestionType {
    /// Parses a stored type tag; `None` for anything we cannot grade.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(QuestionType::Single),
            "multiple" => Some(QuestionType::Multiple),
            "free_text" => Some(QuestionType::FreeText),
            _ => None,
        }
    }
}
