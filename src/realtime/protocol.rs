//! src/realtime/protocol.rs
//!
//! WebSocket message protocol between the browser client and the server.
//! Event and field names stay camelCase for front-end parity.

use crate::models::{leaderboard::LeaderboardEntry, quiz::QuizId};
use serde::{Deserialize, Serialize};

/// Structured text messages a client can send to the server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Enter a quiz's leaderboard room.
    JoinQuiz { quiz_id: QuizId, user: String },

    /// Leave a quiz's leaderboard room.
    LeaveQuiz { quiz_id: QuizId, user: String },

    /// Request the current leaderboard snapshot. A cached snapshot is
    /// delivered immediately when one exists; the authoritative one
    /// follows after a database refresh.
    GetLeaderboard { quiz_id: QuizId },

    /// Notifies the server that a submission landed, triggering a refresh
    /// pushed to every member of the quiz's room.
    QuizSubmitted {
        quiz_id: QuizId,
        subject: Option<String>,
    },
}

/// Structured text messages the server can send to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A leaderboard snapshot: top entries for one quiz, sorted descending
    /// by score.
    LeaderboardUpdate {
        quiz_id: QuizId,
        entries: Vec<LeaderboardEntry>,
    },

    /// Reports a malformed frame back to the client.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_parse_camel_case() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"joinQuiz","quizId":7,"user":"alice"}"#).unwrap();
        match event {
            ClientEvent::JoinQuiz { quiz_id, user } => {
                assert_eq!(quiz_id, QuizId(7));
                assert_eq!(user, "alice");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"quizSubmitted","quizId":3}"#).unwrap();
        assert!(matches!(
            event,
            ClientEvent::QuizSubmitted {
                quiz_id: QuizId(3),
                subject: None
            }
        ));
    }

    #[test]
    fn leaderboard_update_serializes_camel_case() {
        let event = ServerEvent::LeaderboardUpdate {
            quiz_id: QuizId(5),
            entries: vec![LeaderboardEntry {
                user_id: 1,
                username: "alice".to_string(),
                subject: "General".to_string(),
                score: 11,
                quiz_id: QuizId(5),
                created_at: None,
            }],
        };

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "leaderboardUpdate");
        assert_eq!(json["quizId"], 5);
        assert_eq!(json["entries"][0]["userId"], 1);
        assert_eq!(json["entries"][0]["score"], 11);
    }
}
