//! Floorplan WebSocket Relay Server
//!
//! Forwards collaboration messages between clients editing the same project.
//! The relay never interprets geometry: it remembers the latest
//! `geometry_update` per room for late joiners, keeps a short chat history,
//! and fans everything else out to the other peers.
//!
//! ## Protocol
//!
//! Messages are JSON objects tagged by `event`:
//! ```json
//! { "event": "join", "room": "project-id", "user_id": "alice" }
//! { "event": "geometry_update", "state": { "levels": [...], "site": {...} } }
//! { "event": "cursor_move", "x": 120.0, "y": 340.0 }
//! { "event": "object_selection", "selection": null }
//! ```

mod state;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use floorplan_core::protocol::{ClientMessage, ServerMessage};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use state::{AppState, ConnectionId, Envelope};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_ADDR: &str = "0.0.0.0:3030";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floorplan_relay=info,tower_http=info".into()),
        )
        .init();

    let addr: SocketAddr = match std::env::var("FLOORPLAN_RELAY_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid FLOORPLAN_RELAY_ADDR: {}", e);
            std::process::exit(2);
        }
    };

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Floorplan relay listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

async fn index() -> &'static str {
    "Floorplan Relay Server - Connect via WebSocket at /ws"
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

type Sender = SplitSink<WebSocket, Message>;

async fn send_json(sender: &mut Sender, msg: &ServerMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to encode message: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

/// The room a connection is in, as which user.
struct Membership {
    room: String,
    user_id: String,
    rx: broadcast::Receiver<Envelope>,
}

fn leave(state: &AppState, conn: ConnectionId, membership: Membership) {
    if let Some(user_id) = state.leave_room(&membership.room, conn) {
        state.broadcast(&membership.room, conn, &ServerMessage::PeerLeft { user_id });
        info!("{} left room {}", membership.user_id, membership.room);
    }
}

/// Handle one client message. Returns false when the socket is gone.
async fn handle_client_message(
    msg: ClientMessage,
    conn: ConnectionId,
    state: &AppState,
    sender: &mut Sender,
    membership: &mut Option<Membership>,
) -> bool {
    match msg {
        ClientMessage::Join { room, user_id } => {
            if let Some(old) = membership.take() {
                leave(state, conn, old);
            }
            let joined = state.join_room(&room, conn, &user_id);
            if !send_json(sender, &joined.message).await {
                return false;
            }
            state.broadcast(&room, conn, &ServerMessage::PeerJoined { user_id: user_id.clone() });
            info!("{} joined room {}", user_id, room);
            *membership = Some(Membership {
                room,
                user_id,
                rx: joined.rx,
            });
        }
        ClientMessage::Leave => {
            if let Some(old) = membership.take() {
                leave(state, conn, old);
            }
        }
        other => {
            let Some(Membership { room, user_id, .. }) = membership.as_ref() else {
                return send_json(
                    sender,
                    &ServerMessage::Error {
                        message: "Not in a room".to_string(),
                    },
                )
                .await;
            };
            let from = user_id.clone();
            let outgoing = match other {
                ClientMessage::GeometryUpdate { state: snapshot } => {
                    state.set_last_state(room, snapshot.clone());
                    ServerMessage::GeometryUpdate { from, state: snapshot }
                }
                ClientMessage::CursorMove { x, y } => ServerMessage::CursorMove { from, x, y },
                ClientMessage::ObjectSelection { selection } => {
                    ServerMessage::ObjectSelection { from, selection }
                }
                ClientMessage::ChatMessage { text } => {
                    let entry = state.push_chat(room, &from, text);
                    ServerMessage::ChatMessage {
                        from: entry.from,
                        text: entry.text,
                        sent_at: entry.sent_at,
                    }
                }
                ClientMessage::Join { .. } | ClientMessage::Leave => return true,
            };
            state.broadcast(room, conn, &outgoing);
        }
    }
    true
}

/// Next message from the joined room, or never if not in one.
async fn next_envelope(membership: &mut Option<Membership>) -> Option<Envelope> {
    let Some(m) = membership.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match m.rx.recv().await {
            Ok(envelope) => return Some(envelope),
            Err(RecvError::Lagged(skipped)) => {
                warn!("{} lagged, skipped {} messages", m.user_id, skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn = Uuid::new_v4();
    info!("New connection: {}", conn);

    let (mut sender, mut receiver) = socket.split();
    let mut membership: Option<Membership> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if !handle_client_message(client_msg, conn, &state, &mut sender, &mut membership).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Invalid message from {}: {}", conn, e);
                                let err = ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                };
                                if !send_json(&mut sender, &err).await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn, e);
                        break;
                    }
                }
            }

            envelope = next_envelope(&mut membership) => {
                match envelope {
                    // Don't echo back to sender
                    Some((from, json)) if from != conn => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(_) => {}
                    None => membership = None,
                }
            }
        }
    }

    if let Some(old) = membership.take() {
        leave(&state, conn, old);
    }
    info!("Connection closed: {}", conn);
}
