// src/models/leaderboard.rs

use crate::models::quiz::QuizId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

/// Represents the 'leaderboard' table in the database.
/// One immutable row per (user, quiz): the user's first scored attempt.
/// A unique index on (user_id, quiz_id) is the authoritative guard.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub username: String,
    pub subject: String,
    pub score: i64,
    pub quiz_id: QuizId,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting an answer sheet.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// User's answers map.
    /// Key: question id, Value: the selected option string.
    /// Entries may be omitted; omitted or empty answers count as
    /// not attempted.
    #[serde(default)]
    pub answers: HashMap<i64, String>,
}

/// The response to a submission. Computed fresh on every call, whether or
/// not a leaderboard row was written, so a resubmitting user sees their
/// latest marks while the board keeps the first attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub score: i64,
    pub correct: i64,
    pub wrong: i64,
    pub not_attempted: i64,
    pub total: i64,
    pub quiz_id: QuizId,
    pub subject: Option<String>,
    /// Whether this attempt is the one recorded on the leaderboard.
    pub recorded: bool,
    pub message: String,
}
