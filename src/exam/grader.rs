//! Correctness of a single submitted answer.

use std::collections::BTreeSet;

use crate::{
    error::AppError,
    models::module::{Question, QuestionType},
};

/// The raw answer as submitted, before grading.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub selected_answer_ids: &'a [i64],
    pub free_text: Option<&'a str>,
}

/// Grades `submission` against `question`. Pure; nothing is persisted.
///
/// Single-choice questions take exactly one id: zero or several ids are
/// rejected rather than truncated.
pub fn grade(question: &Question, submission: Submission<'_>) -> Result<bool, AppError> {
    let question_type = QuestionType::parse(&question.question_type)
        .ok_or_else(|| AppError::UnsupportedQuestionType(question.question_type.clone()))?;

    match question_type {
        QuestionType::Single => {
            let selected = selected_ids(question, submission)?;
            if selected.len() != 1 {
                return Err(AppError::BadRequest(
                    "Single-choice questions take exactly one answer".to_string(),
                ));
            }
            Ok(selected == correct_ids(question))
        }
        QuestionType::Multiple => {
            let selected = selected_ids(question, submission)?;
            Ok(selected == correct_ids(question))
        }
        QuestionType::FreeText => {
            if !submission.selected_answer_ids.is_empty() {
                return Err(AppError::BadRequest(
                    "Free-text questions do not take selected answers".to_string(),
                ));
            }
            let text = submission
                .free_text
                .ok_or_else(|| AppError::BadRequest("Missing free-text answer".to_string()))?;
            let given = normalize(text);
            Ok(question
                .answers
                .iter()
                .filter(|a| a.is_correct)
                .any(|a| normalize(&a.text) == given))
        }
    }
}

/// Validates ownership of every id and collapses duplicates.
fn selected_ids(question: &Question, submission: Submission<'_>) -> Result<BTreeSet<i64>, AppError> {
    if submission.free_text.is_some() {
        return Err(AppError::BadRequest(
            "Choice questions do not take a free-text answer".to_string(),
        ));
    }
    let mut selected = BTreeSet::new();
    for id in submission.selected_answer_ids {
        if !question.answers.iter().any(|a| a.id == *id) {
            return Err(AppError::BadRequest(format!(
                "Answer {} does not belong to question {}",
                id, question.id
            )));
        }
        selected.insert(*id);
    }
    Ok(selected)
}

fn correct_ids(question: &Question) -> BTreeSet<i64> {
    question
        .answers
        .iter()
        .filter(|a| a.is_correct)
        .map(|a| a.id)
        .collect()
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::module::PossibleAnswer;

    fn question(question_type: &str, answers: &[(i64, &str, bool)]) -> Question {
        Question {
            id: 1,
            module_version_id: 1,
            question_type: question_type.to_string(),
            content: "Q".to_string(),
            answers: answers
                .iter()
                .map(|(id, text, is_correct)| PossibleAnswer {
                    id: *id,
                    question_id: 1,
                    text: text.to_string(),
                    is_correct: *is_correct,
                })
                .collect(),
        }
    }

    fn choice(ids: &[i64]) -> Submission<'_> {
        Submission {
            selected_answer_ids: ids,
            free_text: None,
        }
    }

    fn text(value: &str) -> Submission<'_> {
        Submission {
            selected_answer_ids: &[],
            free_text: Some(value),
        }
    }

    #[test]
    fn test_single_choice() {
        let q = question("single", &[(10, "A", true), (11, "B", false), (12, "C", false)]);
        assert!(!grade(&q, choice(&[11])).unwrap());
        assert!(grade(&q, choice(&[10])).unwrap());
    }

    #[test]
    fn test_single_choice_rejects_several_ids() {
        let q = question("single", &[(10, "A", true), (11, "B", false), (12, "C", false)]);
        assert!(matches!(grade(&q, choice(&[10, 11])), Err(AppError::BadRequest(_))));
        assert!(matches!(grade(&q, choice(&[])), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_foreign_answer_id_is_bad_request() {
        let q = question("multiple", &[(10, "A", true), (11, "B", false)]);
        assert!(matches!(grade(&q, choice(&[10, 99])), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_multiple_choice_requires_exact_set() {
        let q = question(
            "multiple",
            &[(10, "A", true), (11, "B", true), (12, "C", false)],
        );
        assert!(grade(&q, choice(&[11, 10])).unwrap());
        assert!(grade(&q, choice(&[10, 11, 10])).unwrap());
        assert!(!grade(&q, choice(&[10])).unwrap());
        assert!(!grade(&q, choice(&[10, 11, 12])).unwrap());
        assert!(!grade(&q, choice(&[])).unwrap());
    }

    #[test]
    fn test_free_text_is_trimmed_and_case_insensitive() {
        let q = question("free_text", &[(20, "Paris", true), (21, "PARIS ", true), (22, "Lyon", false)]);
        assert!(grade(&q, text("paris")).unwrap());
        assert!(grade(&q, text("  Paris\n")).unwrap());
        assert!(!grade(&q, text("lyon")).unwrap());
        assert!(!grade(&q, text("")).unwrap());
    }

    #[test]
    fn test_free_text_input_shape() {
        let q = question("free_text", &[(20, "Paris", true)]);
        assert!(matches!(grade(&q, choice(&[])), Err(AppError::BadRequest(_))));
        assert!(matches!(grade(&q, choice(&[20])), Err(AppError::BadRequest(_))));

        let single = question("single", &[(10, "A", true)]);
        assert!(matches!(grade(&single, text("A")), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_unknown_type() {
        let q = question("essay", &[]);
        assert_eq!(
            grade(&q, text("anything")),
            Err(AppError::UnsupportedQuestionType("essay".to_string()))
        );
    }
}
