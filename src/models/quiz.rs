// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Strongly-typed quiz identifier, shared by quiz lookups, room membership
/// and the realtime protocol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct QuizId(pub i64);

impl std::fmt::Display for QuizId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One question inside a quiz. The whole ordered list is stored as a JSONB
/// array on the quiz row, so questions carry their own ids (assigned
/// 1..=n at creation) for the answers map to reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// Represents the 'quizzes' table in the database.
/// Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    pub subject: Option<String>,

    /// Time limit in seconds.
    #[serde(rename = "duration")]
    pub duration_secs: i64,

    /// Full question list, correct answers included.
    pub questions: Json<Vec<Question>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Dashboard listing row; question count instead of the question bodies.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: QuizId,
    pub title: String,
    pub subject: Option<String>,
    #[serde(rename = "duration")]
    pub duration_secs: i64,
    pub question_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for a question in a quiz-creation request. Ids are assigned
/// server-side, in list order.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    /// Seconds; defaults to 300 when omitted.
    pub duration: Option<i64>,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<NewQuestion>,
}

fn validate_questions(questions: &[NewQuestion]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }
    for q in questions {
        if q.text.is_empty() || q.text.len() > 1000 {
            return Err(validator::ValidationError::new("question_text_invalid"));
        }
        if q.options.is_empty() || q.options.len() > 10 {
            return Err(validator::ValidationError::new("options_count_invalid"));
        }
        for opt in &q.options {
            if opt.is_empty() || opt.len() > 500 {
                return Err(validator::ValidationError::new("option_invalid"));
            }
        }
        if q.correct_answer.is_empty() || q.correct_answer.len() > 500 {
            return Err(validator::ValidationError::new("correct_answer_invalid"));
        }
    }
    Ok(())
}
