//! src/realtime/ws.rs
//!
//! WebSocket entry point for the live leaderboard. The route sits behind
//! `auth_middleware`, so every socket belongs to an identified user before
//! it can join a room.

use crate::{
    realtime::{
        hub::{ConnectionId, LeaderboardHub},
        protocol::{ClientEvent, ServerEvent},
    },
    utils::jwt::Claims,
};
use axum::{
    Extension,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};

/// Upgrades the HTTP request to a WebSocket connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<LeaderboardHub>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub, claims))
}

async fn handle_socket(socket: WebSocket, hub: Arc<LeaderboardHub>, claims: Claims) {
    let conn = ConnectionId::new();
    info!(
        "New WebSocket connection {:?} for user {}",
        conn,
        claims.user_id()
    );

    let (mut sink, mut stream) = socket.split();

    // All pushes to this socket flow through one unbounded queue drained by
    // a writer task, so hub delivery never blocks on a slow client and the
    // client sees snapshots in queue order.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to serialize server event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handle_event(event, &hub, conn, &tx).await,
                Err(e) => {
                    warn!("Failed to deserialize client event: {}", e);
                    let _ = tx.send(ServerEvent::Error {
                        message: "Unrecognized event".to_string(),
                    });
                }
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    hub.disconnect(conn);
    drop(tx);
    let _ = writer.await;
    info!("WebSocket connection {:?} closed", conn);
}

async fn handle_event(
    event: ClientEvent,
    hub: &Arc<LeaderboardHub>,
    conn: ConnectionId,
    tx: &UnboundedSender<ServerEvent>,
) {
    match event {
        ClientEvent::JoinQuiz { quiz_id, user } => {
            hub.join(quiz_id, conn, tx.clone());
            info!("{} joined quiz {}", user, quiz_id);
        }
        ClientEvent::LeaveQuiz { quiz_id, user } => {
            hub.leave(quiz_id, conn);
            info!("{} left quiz {}", user, quiz_id);
        }
        ClientEvent::GetLeaderboard { quiz_id } => {
            hub.request_snapshot(quiz_id, tx).await;
        }
        ClientEvent::QuizSubmitted { quiz_id, .. } => {
            hub.notify_submitted(quiz_id).await;
        }
    }
}
