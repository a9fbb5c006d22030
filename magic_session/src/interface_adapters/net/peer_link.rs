// Peer side of the relay: one websocket per peer, implementing the session transport.

use crate::domain::PlayerId;
use crate::domain::ports::Transport;
use crate::interface_adapters::net::relay::should_log;
use crate::interface_adapters::protocol::{PEER_LEFT_MESSAGE, decode_relay_frame, encode_relay_frame};
use crate::interface_adapters::utils::ids;
use crate::use_cases::PeerEvent;

use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum NetError {
    Connect(tokio_tungstenite::tungstenite::Error),
    ConnectTimeout,
    InvalidSessionId(String),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Connect(err) => write!(f, "relay connect failed: {err}"),
            NetError::ConnectTimeout => f.write_str("relay connect timed out"),
            NetError::InvalidSessionId(id) => write!(f, "session id {id:?} is not url-safe"),
        }
    }
}

impl std::error::Error for NetError {}

pub struct PeerLink {
    player_id: PlayerId,
    // Encoded frames waiting for the socket writer.
    outbound_tx: mpsc::Sender<Vec<u8>>,
    last_full_log: Mutex<Instant>,
}

impl PeerLink {
    /// Joins `session_id` on the relay at `relay_url` (ws://host:port) and starts
    /// forwarding relayed frames into `events_tx`.
    pub async fn connect(
        relay_url: &str,
        session_id: &str,
        player_id: PlayerId,
        events_tx: mpsc::Sender<PeerEvent>,
        outbound_capacity: usize,
    ) -> Result<Arc<PeerLink>, NetError> {
        if !ids::is_url_safe(session_id) {
            return Err(NetError::InvalidSessionId(session_id.to_string()));
        }
        let url = format!("{relay_url}/ws?session_id={session_id}&player_id={player_id}");
        let (ws_stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| NetError::ConnectTimeout)?
            .map_err(NetError::Connect)?;
        let (mut sink, mut stream) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(outbound_capacity);

        // Writer: drains queued frames until the link is dropped.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(err) = sink.send(Message::Binary(frame.into())).await {
                    warn!(player_id, error = %err, "relay send failed; writer exiting");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader: decodes relayed frames into peer events.
        tokio::spawn(async move {
            let mut last_invalid_log = Instant::now() - Duration::from_secs(60);
            while let Some(incoming) = stream.next().await {
                let bytes = match incoming {
                    Ok(Message::Binary(bytes)) => bytes,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(player_id, error = %err, "relay recv error");
                        break;
                    }
                };

                let message = match decode_relay_frame(&bytes) {
                    Ok(message) => message,
                    Err(err) => {
                        if should_log(&mut last_invalid_log) {
                            warn!(player_id, error = %err, "dropping malformed relay frame");
                        }
                        continue;
                    }
                };

                let event = if message.message_type == PEER_LEFT_MESSAGE {
                    PeerEvent::PeerLeft {
                        player_id: message.sender_id,
                    }
                } else {
                    PeerEvent::Inbound {
                        message_type: message.message_type,
                        sender_id: message.sender_id,
                        payload: message.payload,
                    }
                };
                if events_tx.send(event).await.is_err() {
                    debug!(player_id, "peer loop gone; reader exiting");
                    break;
                }
            }
            info!(player_id, "relay link closed");
        });

        info!(player_id, session_id, "connected to relay");
        Ok(Arc::new(PeerLink {
            player_id,
            outbound_tx,
            last_full_log: Mutex::new(Instant::now() - Duration::from_secs(60)),
        }))
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }
}

impl Transport for PeerLink {
    fn broadcast(&self, message_type: &str, sender_id: PlayerId, payload: Vec<u8>) {
        let frame = encode_relay_frame(message_type, sender_id, &payload);
        match self.outbound_tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                // Snapshots are republished, so a dropped frame heals later.
                let log = self
                    .last_full_log
                    .lock()
                    .map(|mut last| should_log(&mut last))
                    .unwrap_or(false);
                if log {
                    warn!(player_id = self.player_id, message_type, "outbound relay queue full; dropping frame");
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!(player_id = self.player_id, message_type, "relay link closed; frame dropped");
            }
        }
    }
}
