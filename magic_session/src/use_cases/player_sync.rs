// Owner-writes replication of per-player spell state.
//
// Envelope (little-endian): [format_version:i32][sender_id:i64][payload]
// where payload is JSON. Spell state snapshots carry `PlayerSpellState`.

use crate::domain::ports::Transport;
use crate::domain::{PlayerId, PlayerSpellState};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use tracing::{debug, warn};

pub const SPELL_STATE_MESSAGE: &str = "magic:spell-state";
pub const FORMAT_VERSION: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    Truncated,
    UnsupportedVersion(i32),
    // Envelope names a different player than the transport did.
    SenderMismatch { envelope: PlayerId, transport: PlayerId },
    Payload(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated => f.write_str("envelope truncated"),
            ProtocolError::UnsupportedVersion(v) => write!(f, "unsupported format version {v}"),
            ProtocolError::SenderMismatch {
                envelope,
                transport,
            } => write!(f, "envelope sender {envelope} does not match {transport}"),
            ProtocolError::Payload(err) => write!(f, "bad message payload: {err}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

pub fn encode_envelope<T: Serialize>(sender_id: PlayerId, body: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(body).map_err(|e| ProtocolError::Payload(e.to_string()))?;
    let mut buf = Vec::with_capacity(12 + payload.len());
    // Writes into a Vec are infallible.
    let _ = buf.write_i32::<LittleEndian>(FORMAT_VERSION);
    let _ = buf.write_i64::<LittleEndian>(sender_id);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<(PlayerId, T), ProtocolError> {
    let mut cursor = Cursor::new(bytes);
    let version = cursor
        .read_i32::<LittleEndian>()
        .map_err(|_| ProtocolError::Truncated)?;
    if version != FORMAT_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }
    let sender_id = cursor
        .read_i64::<LittleEndian>()
        .map_err(|_| ProtocolError::Truncated)?;
    let payload = &bytes[cursor.position() as usize..];
    let body = serde_json::from_slice(payload).map_err(|e| ProtocolError::Payload(e.to_string()))?;
    Ok((sender_id, body))
}

pub fn encode_snapshot(sender_id: PlayerId, state: &PlayerSpellState) -> Result<Vec<u8>, ProtocolError> {
    encode_envelope(sender_id, state)
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<(PlayerId, PlayerSpellState), ProtocolError> {
    decode_envelope(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    // Not ours to handle: other message type, or our own echo.
    Ignored,
    Replaced,
}

/// Local player's outbound snapshot tracking plus the mirror of every other peer.
#[derive(Debug)]
pub struct PlayerStateSync {
    local_id: PlayerId,
    last_published: Option<PlayerSpellState>,
    peers: HashMap<PlayerId, PlayerSpellState>,
}

impl PlayerStateSync {
    pub fn new(local_id: PlayerId) -> Self {
        Self {
            local_id,
            last_published: None,
            peers: HashMap::new(),
        }
    }

    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    /// Seeds the peer cache from persisted records; the local record is skipped.
    pub fn seed_peers(&mut self, records: impl IntoIterator<Item = (PlayerId, PlayerSpellState)>) {
        for (player_id, state) in records {
            if player_id != self.local_id {
                self.peers.insert(player_id, state);
            }
        }
    }

    /// Broadcasts `state` if it differs from the last published snapshot.
    pub fn publish(&mut self, state: &PlayerSpellState, transport: &dyn Transport) -> bool {
        if self.last_published.as_ref() == Some(state) {
            return false;
        }
        self.republish(state, transport)
    }

    /// Unconditional broadcast; heals peers that missed earlier snapshots.
    /// A snapshot that cannot be encoded is logged and not sent.
    pub fn republish(&mut self, state: &PlayerSpellState, transport: &dyn Transport) -> bool {
        let frame = match encode_snapshot(self.local_id, state) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(player_id = self.local_id, error = %err, "spell state not encodable; skipped");
                return false;
            }
        };
        transport.broadcast(SPELL_STATE_MESSAGE, self.local_id, frame);
        self.last_published = Some(state.clone());
        true
    }

    /// Applies one inbound message. On error the cached record is left as it was.
    pub fn on_receive(
        &mut self,
        message_type: &str,
        sender_id: PlayerId,
        bytes: &[u8],
    ) -> Result<ReceiveOutcome, ProtocolError> {
        if message_type != SPELL_STATE_MESSAGE || sender_id == self.local_id {
            return Ok(ReceiveOutcome::Ignored);
        }

        let (envelope_sender, state) = decode_snapshot(bytes)?;
        if envelope_sender != sender_id {
            return Err(ProtocolError::SenderMismatch {
                envelope: envelope_sender,
                transport: sender_id,
            });
        }

        debug!(
            player_id = sender_id,
            free_points = state.free_points,
            "peer spell state replaced"
        );
        self.peers.insert(sender_id, state);
        Ok(ReceiveOutcome::Replaced)
    }

    pub fn peer(&self, player_id: PlayerId) -> Option<&PlayerSpellState> {
        self.peers.get(&player_id)
    }

    pub fn peers(&self) -> impl Iterator<Item = (&PlayerId, &PlayerSpellState)> {
        self.peers.iter()
    }

    pub fn forget_peer(&mut self, player_id: PlayerId) -> bool {
        self.peers.remove(&player_id).is_some()
    }
}
