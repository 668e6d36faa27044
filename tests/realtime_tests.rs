// tests/realtime_tests.rs
//
// Exercises the leaderboard hub against a real database: room fan-out,
// snapshot capping/ordering, and the cache-then-refresh read path.

use quiz_arena_backend::models::quiz::QuizId;
use quiz_arena_backend::realtime::{
    hub::{ConnectionId, LeaderboardHub},
    protocol::ServerEvent,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;

async fn test_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

async fn seed_user(pool: &PgPool, name: &str) -> i64 {
    let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (name, email, password) VALUES ($1, $2, 'not-a-real-hash') RETURNING id",
    )
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await
    .expect("Failed to seed user");
    id
}

async fn seed_quiz(pool: &PgPool) -> QuizId {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO quizzes (title, subject, duration_secs, questions) \
         VALUES ('Realtime fixture', 'General', 300, $1) RETURNING id",
    )
    .bind(serde_json::json!([]))
    .fetch_one(pool)
    .await
    .expect("Failed to seed quiz");
    QuizId(id)
}

async fn seed_entry(pool: &PgPool, user_id: i64, name: &str, quiz_id: QuizId, score: i64) {
    sqlx::query(
        "INSERT INTO leaderboard (user_id, username, subject, quiz_id, score) \
         VALUES ($1, $2, 'General', $3, $4)",
    )
    .bind(user_id)
    .bind(name)
    .bind(quiz_id.0)
    .bind(score)
    .execute(pool)
    .await
    .expect("Failed to seed leaderboard entry");
}

fn expect_update(event: ServerEvent) -> (QuizId, Vec<i64>) {
    match event {
        ServerEvent::LeaderboardUpdate { quiz_id, entries } => {
            (quiz_id, entries.iter().map(|e| e.score).collect())
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn notify_submitted_pushes_to_all_room_members() {
    let pool = test_pool().await;
    let quiz_id = seed_quiz(&pool).await;
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    seed_entry(&pool, alice, "alice", quiz_id, 12).await;
    seed_entry(&pool, bob, "bob", quiz_id, 3).await;

    let hub = LeaderboardHub::new(pool.clone());
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    hub.join(quiz_id, ConnectionId::new(), tx_a);
    hub.join(quiz_id, ConnectionId::new(), tx_b);

    hub.notify_submitted(quiz_id).await;

    for rx in [&mut rx_a, &mut rx_b] {
        let (id, scores) = expect_update(rx.recv().await.expect("No push received"));
        assert_eq!(id, quiz_id);
        assert_eq!(scores, vec![12, 3]);
    }
}

#[tokio::test]
async fn snapshot_is_capped_at_ten_and_sorted_descending() {
    let pool = test_pool().await;
    let quiz_id = seed_quiz(&pool).await;
    for i in 0..12 {
        let name = format!("player{}", i);
        let user = seed_user(&pool, &name).await;
        seed_entry(&pool, user, &name, quiz_id, i).await;
    }

    let hub = LeaderboardHub::new(pool.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.join(quiz_id, ConnectionId::new(), tx);

    hub.notify_submitted(quiz_id).await;

    let (_, scores) = expect_update(rx.recv().await.expect("No push received"));
    assert_eq!(scores.len(), 10);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    // The two lowest scores (0 and 1) fall off the snapshot.
    assert_eq!(*scores.last().unwrap(), 2);
}

#[tokio::test]
async fn member_who_left_receives_no_push() {
    let pool = test_pool().await;
    let quiz_id = seed_quiz(&pool).await;
    let user = seed_user(&pool, "solo").await;
    seed_entry(&pool, user, "solo", quiz_id, 4).await;

    let hub = LeaderboardHub::new(pool.clone());
    let (tx_stay, mut rx_stay) = mpsc::unbounded_channel();
    let (tx_gone, mut rx_gone) = mpsc::unbounded_channel();
    let stay = ConnectionId::new();
    let gone = ConnectionId::new();
    hub.join(quiz_id, stay, tx_stay);
    hub.join(quiz_id, gone, tx_gone);
    hub.leave(quiz_id, gone);

    hub.notify_submitted(quiz_id).await;

    assert!(rx_stay.recv().await.is_some());
    assert!(rx_gone.try_recv().is_err());
}

#[tokio::test]
async fn late_joiner_snapshot_reflects_earlier_submission() {
    let pool = test_pool().await;
    let quiz_id = seed_quiz(&pool).await;
    let first = seed_user(&pool, "first").await;
    seed_entry(&pool, first, "first", quiz_id, 3).await;

    let hub = LeaderboardHub::new(pool.clone());

    // A submission lands and is broadcast while nobody new is watching.
    hub.notify_submitted(quiz_id).await;

    // A second submission is recorded afterwards.
    let second = seed_user(&pool, "second").await;
    seed_entry(&pool, second, "second", quiz_id, 8).await;

    // A late joiner asks for the board: the cached snapshot arrives first,
    // then the refreshed one reflecting every completed submission.
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.join(quiz_id, ConnectionId::new(), tx.clone());
    hub.request_snapshot(quiz_id, &tx).await;

    let (_, cached) = expect_update(rx.recv().await.expect("No cached snapshot"));
    assert_eq!(cached, vec![3]);

    let (_, fresh) = expect_update(rx.recv().await.expect("No refreshed snapshot"));
    assert_eq!(fresh, vec![8, 3]);
}
