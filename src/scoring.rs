// src/scoring.rs

use crate::models::quiz::Question;
use std::collections::HashMap;

/// Per-category counts for one graded attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBreakdown {
    /// 4 points per correct answer, -1 per wrong answer. May be negative.
    pub score: i64,
    pub correct: i64,
    pub wrong: i64,
    pub not_attempted: i64,
    pub total: i64,
}

/// Grades an answer sheet against a quiz's question list.
///
/// * Missing or empty answer counts as not attempted.
/// * Exact string match with the correct option scores +4.
/// * Any other non-empty answer scores -1.
///
/// No partial credit, no per-question weighting. Pure and deterministic.
pub fn score_answers(questions: &[Question], answers: &HashMap<i64, String>) -> ScoreBreakdown {
    let mut score = 0;
    let mut correct = 0;
    let mut wrong = 0;
    let mut not_attempted = 0;

    for question in questions {
        match answers.get(&question.id).map(String::as_str) {
            None | Some("") => not_attempted += 1,
            Some(answer) if answer == question.correct_answer => {
                score += 4;
                correct += 1;
            }
            Some(_) => {
                score -= 1;
                wrong += 1;
            }
        }
    }

    ScoreBreakdown {
        score,
        correct,
        wrong,
        not_attempted,
        total: questions.len() as i64,
    }
}
