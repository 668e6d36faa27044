// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::{
        leaderboard::{SubmissionResult, SubmitQuizRequest},
        quiz::{CreateQuizRequest, Question, Quiz, QuizId, QuizSummary},
        user::User,
    },
    scoring::score_answers,
    utils::jwt::Claims,
};
use validator::Validate;

/// Lists all quizzes as dashboard summaries (no question bodies).
pub async fn list_quizzes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT
            id,
            title,
            subject,
            duration_secs,
            jsonb_array_length(questions)::BIGINT AS question_count,
            created_at
        FROM quizzes
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Retrieves a single quiz by id, questions and correct answers included.
/// The quiz-taking view consumes this directly; answers are not redacted.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<QuizId>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, subject, duration_secs, questions, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Creates a new quiz. Question ids are assigned server-side, 1..=n in
/// list order, so answer sheets can reference them.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let questions: Vec<Question> = payload
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| Question {
            id: (i + 1) as i64,
            text: q.text,
            options: q.options,
            correct_answer: q.correct_answer,
        })
        .collect();

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (title, subject, duration_secs, questions)
        VALUES ($1, $2, $3, $4)
        RETURNING id, title, subject, duration_secs, questions, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.subject)
    .bind(payload.duration.unwrap_or(300))
    .bind(SqlJson(&questions))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Submits a user's answer sheet and calculates the score.
///
/// * Validates the token and extracts the user id.
/// * Grades the sheet against the quiz's question list.
/// * Records the score on the leaderboard only if this is the user's first
///   submission for the quiz; the unique index on (user_id, quiz_id) is the
///   authoritative guard, so a concurrent duplicate insert lands on the
///   already-recorded path instead of failing.
/// * Always returns the freshly computed result.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<QuizId>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, subject, duration_secs, questions, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, score, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let breakdown = score_answers(&quiz.questions, &req.answers);

    let result = sqlx::query(
        r#"
        INSERT INTO leaderboard (user_id, username, subject, quiz_id, score)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, quiz_id) DO NOTHING
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(quiz.subject.as_deref().unwrap_or("General"))
    .bind(quiz.id)
    .bind(breakdown.score)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record leaderboard entry: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    let recorded = result.rows_affected() == 1;
    let message = if recorded {
        "Score recorded to leaderboard.".to_string()
    } else {
        "Leaderboard updated only for first submission. Latest attempt marks shown here."
            .to_string()
    };

    Ok(Json(SubmissionResult {
        score: breakdown.score,
        correct: breakdown.correct,
        wrong: breakdown.wrong,
        not_attempted: breakdown.not_attempted,
        total: breakdown.total,
        quiz_id: quiz.id,
        subject: quiz.subject,
        recorded,
        message,
    }))
}
