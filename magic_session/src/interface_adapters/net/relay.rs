use crate::domain::PlayerId;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{PEER_LEFT_MESSAGE, encode_relay_frame, peek_sender};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::conn_id;
use crate::use_cases::session::{RelayFrame, SessionHandle, SessionRegistry};

use axum::{
    Error,
    body::Bytes,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info, info_span, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_FRAMES: u32 = 10;

#[derive(Debug, serde::Deserialize)]
pub struct PeerQuery {
    // Session to join; the default session when absent.
    #[serde(default)]
    session_id: Option<String>,
    // Identity this connection broadcasts as.
    player_id: PlayerId,
}

enum LoopControl {
    Continue,
    Disconnect,
}

// Per-connection counters and throttles.
struct ConnCtx {
    player_id: PlayerId,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_frames: u32,
    spoofed_frames: u32,
    last_invalid_log: Instant,
    last_lag_log: Instant,
    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new(player_id: PlayerId) -> Self {
        let now = Instant::now() - LOG_THROTTLE;
        Self {
            player_id,
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            invalid_frames: 0,
            spoofed_frames: 0,
            last_invalid_log: now,
            last_lag_log: now,
            close_frame: None,
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeerQuery>,
) -> impl IntoResponse {
    let session_id = query
        .session_id
        .unwrap_or_else(|| state.default_session_id.to_string());

    let Some(session) = state.session_registry.get_session(&session_id).await else {
        // Keep not-found responses consistent with the JSON error schema.
        return (
            StatusCode::NOT_FOUND,
            axum::Json(ErrorResponse::new("session not found")),
        )
            .into_response();
    };
    if !session.is_player_allowed(query.player_id) {
        return (
            StatusCode::FORBIDDEN,
            axum::Json(ErrorResponse::new("player not allowed in session")),
        )
            .into_response();
    }

    let registry = state.session_registry.clone();
    let player_id = query.player_id;
    let span = info_span!("conn", conn_id = conn_id(), player_id, session_id = %session_id);
    ws.on_upgrade(move |socket| {
        handle_socket(socket, session_id, player_id, registry).instrument(span)
    })
}

async fn handle_socket(
    mut socket: WebSocket,
    session_id: String,
    player_id: PlayerId,
    registry: Arc<SessionRegistry>,
) {
    // Counting the connection keeps the session alive while the socket is open.
    let Some(session) = registry.join(&session_id, player_id).await else {
        // The session can be removed between the upgrade and registration.
        warn!("session missing during connection registration");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "session unavailable".into(),
            })))
            .await;
        return;
    };
    // Subscribe before the first await in the loop so no frame is missed.
    let mut relay_rx = session.relay_tx.subscribe();
    info!(
        connections = session.connection_count(),
        player_connections = session.player_connections(player_id),
        "peer connected"
    );

    let mut ctx = ConnCtx::new(player_id);
    run_peer_loop(&mut socket, &session, &mut relay_rx, &mut ctx).await;

    disconnect_cleanup(&session, &registry, &ctx).await;
}

async fn run_peer_loop(
    socket: &mut WebSocket,
    session: &SessionHandle,
    relay_rx: &mut broadcast::Receiver<RelayFrame>,
    ctx: &mut ConnCtx,
) {
    loop {
        let disconnect = tokio::select! {
            incoming = socket.recv() => {
                matches!(handle_incoming_ws(incoming, session, ctx), LoopControl::Disconnect)
            }

            relayed = relay_rx.recv() => match relayed {
                // Peers never get their own frames back.
                Ok(frame) if frame.sender_id == ctx.player_id => false,
                Ok(frame) => matches!(
                    forward_frame(frame.bytes, socket, ctx).await,
                    LoopControl::Disconnect
                ),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Snapshots are republished periodically, so skipping ahead is safe.
                    if should_log(&mut ctx.last_lag_log) {
                        warn!(player_id = ctx.player_id, missed = n, "relay lagged; frames dropped");
                    }
                    false
                }
                Err(broadcast::error::RecvError::Closed) => true,
            },
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            break;
        }
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    session: &SessionHandle,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let player_id = ctx.player_id;
    match incoming {
        Some(Ok(Message::Binary(bytes))) => {
            ctx.msgs_in += 1;
            ctx.bytes_in += bytes.len() as u64;

            match peek_sender(&bytes) {
                Ok(sender_id) if sender_id == player_id => {
                    // No receivers just means nobody else is connected yet.
                    let _ = session.relay_tx.send(RelayFrame { sender_id, bytes });
                    LoopControl::Continue
                }
                Ok(sender_id) => {
                    // Ownership is stamped by the connection; foreign senders are dropped.
                    ctx.spoofed_frames += 1;
                    if should_log(&mut ctx.last_invalid_log) {
                        warn!(player_id, claimed = sender_id, "spoofed sender id; frame dropped");
                    }
                    LoopControl::Continue
                }
                Err(err) => {
                    ctx.invalid_frames += 1;
                    if should_log(&mut ctx.last_invalid_log) {
                        warn!(player_id, bytes = bytes.len(), error = %err, "invalid relay frame");
                    }
                    if ctx.invalid_frames > MAX_INVALID_FRAMES {
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::POLICY,
                            reason: "too many invalid frames".into(),
                        });
                        return LoopControl::Disconnect;
                    }
                    LoopControl::Continue
                }
            }
        }
        Some(Ok(Message::Text(_))) => {
            ctx.close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "text messages not supported".into(),
            });
            LoopControl::Disconnect
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => LoopControl::Continue,
        Some(Ok(Message::Close(_))) => LoopControl::Disconnect,
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
        None => {
            info!(player_id, "websocket closed");
            LoopControl::Disconnect
        }
    }
}

async fn forward_frame(bytes: Bytes, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    let len = bytes.len();
    match socket.send(Message::Binary(bytes)).await {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Disconnect follows immediately.
            warn!(player_id = ctx.player_id, error = %err, "failed to forward relay frame");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(session: &SessionHandle, registry: &SessionRegistry, ctx: &ConnCtx) {
    // The player is only gone once its last connection closes.
    let player_gone = registry.leave(session, ctx.player_id).await;
    if player_gone {
        // Let the remaining peers cancel whatever this player still had in flight.
        let farewell = encode_relay_frame(PEER_LEFT_MESSAGE, ctx.player_id, &[]);
        let _ = session.relay_tx.send(RelayFrame {
            sender_id: ctx.player_id,
            bytes: Bytes::from(farewell),
        });
    }

    debug!(
        player_id = ctx.player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_frames = ctx.invalid_frames,
        spoofed_frames = ctx.spoofed_frames,
        "connection stats"
    );
    info!(player_id = ctx.player_id, player_gone, "peer disconnected");
}

pub(crate) fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}
