//! src/realtime/hub.rs
//!
//! Room membership and the per-quiz leaderboard snapshot cache.
//!
//! The hub is an explicit service object held in `AppState` and injected
//! into the socket handler. Rooms map a quiz id to the set of connections
//! watching it; the cache holds the most recently computed top-10 snapshot
//! per quiz. The cache is best-effort: rebuilt from Postgres on miss and
//! never treated as the source of truth.

use crate::models::{leaderboard::LeaderboardEntry, quiz::QuizId};
use crate::realtime::protocol::ServerEvent;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// How many entries a snapshot carries.
const SNAPSHOT_SIZE: i64 = 10;

/// Identifies one WebSocket connection for room membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LeaderboardHub {
    pool: PgPool,

    /// quiz id -> connections currently in that quiz's room.
    rooms: Mutex<HashMap<QuizId, HashMap<ConnectionId, UnboundedSender<ServerEvent>>>>,

    /// quiz id -> latest top-10 snapshot, descending by score.
    cache: Mutex<HashMap<QuizId, Vec<LeaderboardEntry>>>,

    /// Per-quiz gates serializing refresh -> cache write -> delivery, so a
    /// connection never sees an older snapshot after a newer one.
    refresh_gates: Mutex<HashMap<QuizId, Arc<tokio::sync::Mutex<()>>>>,
}

impl LeaderboardHub {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            rooms: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
            refresh_gates: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a connection to a quiz's room. Joining twice is a no-op apart
    /// from refreshing the stored sender.
    pub fn join(&self, quiz_id: QuizId, conn: ConnectionId, tx: UnboundedSender<ServerEvent>) {
        let mut rooms = self.rooms.lock().unwrap();
        rooms.entry(quiz_id).or_default().insert(conn, tx);
    }

    /// Removes a connection from a quiz's room.
    pub fn leave(&self, quiz_id: QuizId, conn: ConnectionId) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(members) = rooms.get_mut(&quiz_id) {
            members.remove(&conn);
            if members.is_empty() {
                rooms.remove(&quiz_id);
            }
        }
    }

    /// Removes a disconnecting connection from every room it joined.
    pub fn disconnect(&self, conn: ConnectionId) {
        let mut rooms = self.rooms.lock().unwrap();
        rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    pub fn member_count(&self, quiz_id: QuizId) -> usize {
        self.rooms
            .lock()
            .unwrap()
            .get(&quiz_id)
            .map_or(0, HashMap::len)
    }

    /// The cached snapshot for a quiz, if any. Stale-but-fast.
    pub fn cached(&self, quiz_id: QuizId) -> Option<Vec<LeaderboardEntry>> {
        self.cache.lock().unwrap().get(&quiz_id).cloned()
    }

    /// Delivers the leaderboard to one requesting connection: the cached
    /// snapshot immediately when present, then the refreshed one once the
    /// authoritative query lands.
    pub async fn request_snapshot(&self, quiz_id: QuizId, tx: &UnboundedSender<ServerEvent>) {
        if let Some(entries) = self.cached(quiz_id) {
            let _ = tx.send(ServerEvent::LeaderboardUpdate { quiz_id, entries });
        }

        let gate = self.refresh_gate(quiz_id);
        let _guard = gate.lock().await;

        match self.fetch_top(quiz_id).await {
            Ok(entries) => {
                self.cache.lock().unwrap().insert(quiz_id, entries.clone());
                let _ = tx.send(ServerEvent::LeaderboardUpdate { quiz_id, entries });
            }
            Err(e) => {
                tracing::error!("Leaderboard fetch error for quiz {}: {:?}", quiz_id, e);
            }
        }
    }

    /// A submission landed: refresh the snapshot and push it to every
    /// connection currently in the quiz's room, the submitter included.
    pub async fn notify_submitted(&self, quiz_id: QuizId) {
        let gate = self.refresh_gate(quiz_id);
        let _guard = gate.lock().await;

        let entries = match self.fetch_top(quiz_id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Leaderboard update error for quiz {}: {:?}", quiz_id, e);
                return;
            }
        };

        self.cache.lock().unwrap().insert(quiz_id, entries.clone());

        // Senders are unbounded, so delivery under the gate never blocks;
        // holding it keeps cache writes and pushes in query order.
        let members: Vec<UnboundedSender<ServerEvent>> = {
            let rooms = self.rooms.lock().unwrap();
            rooms
                .get(&quiz_id)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default()
        };

        for tx in members {
            let _ = tx.send(ServerEvent::LeaderboardUpdate {
                quiz_id,
                entries: entries.clone(),
            });
        }
    }

    async fn fetch_top(&self, quiz_id: QuizId) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT user_id, username, subject, score, quiz_id, created_at
            FROM leaderboard
            WHERE quiz_id = $1
            ORDER BY score DESC
            LIMIT $2
            "#,
        )
        .bind(quiz_id)
        .bind(SNAPSHOT_SIZE)
        .fetch_all(&self.pool)
        .await
    }

    fn refresh_gate(&self, quiz_id: QuizId) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.refresh_gates.lock().unwrap();
        gates.entry(quiz_id).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use tokio::sync::mpsc;

    // Membership and cache behavior need no live database; a lazy pool is
    // never connected by these paths, and the short acquire timeout keeps
    // the failed-refresh test from stalling.
    fn hub() -> LeaderboardHub {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(100))
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        LeaderboardHub::new(pool)
    }

    fn entry(user_id: i64, score: i64, quiz_id: QuizId) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id,
            username: format!("user{}", user_id),
            subject: "General".to_string(),
            score,
            quiz_id,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn join_leave_tracks_membership() {
        let hub = hub();
        let quiz = QuizId(1);
        let (tx, _rx) = mpsc::unbounded_channel();

        let a = ConnectionId::new();
        let b = ConnectionId::new();
        hub.join(quiz, a, tx.clone());
        hub.join(quiz, b, tx.clone());
        assert_eq!(hub.member_count(quiz), 2);

        hub.leave(quiz, a);
        assert_eq!(hub.member_count(quiz), 1);

        hub.leave(quiz, b);
        assert_eq!(hub.member_count(quiz), 0);
    }

    #[tokio::test]
    async fn disconnect_removes_from_all_rooms() {
        let hub = hub();
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn = ConnectionId::new();
        hub.join(QuizId(1), conn, tx.clone());
        hub.join(QuizId(2), conn, tx.clone());

        hub.disconnect(conn);
        assert_eq!(hub.member_count(QuizId(1)), 0);
        assert_eq!(hub.member_count(QuizId(2)), 0);
    }

    #[tokio::test]
    async fn request_snapshot_serves_cache_first() {
        let hub = hub();
        let quiz = QuizId(9);
        hub.cache
            .lock()
            .unwrap()
            .insert(quiz, vec![entry(1, 8, quiz)]);

        let (tx, mut rx) = mpsc::unbounded_channel();
        // The follow-up refresh fails against the lazy pool and is logged,
        // so exactly the cached snapshot arrives.
        hub.request_snapshot(quiz, &tx).await;

        match rx.try_recv().unwrap() {
            ServerEvent::LeaderboardUpdate { quiz_id, entries } => {
                assert_eq!(quiz_id, quiz);
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].score, 8);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn request_snapshot_on_cold_cache_sends_nothing_when_query_fails() {
        let hub = hub();
        let (tx, mut rx) = mpsc::unbounded_channel();

        hub.request_snapshot(QuizId(3), &tx).await;

        assert!(rx.try_recv().is_err());
    }
}
