// Owner-writes replication of thrown axes, active effects and the world
// changes they cause. Every message rides the player-sync envelope, one
// message type per entity family.

use super::player_sync::{ProtocolError, decode_envelope, encode_envelope};
use crate::domain::effects::EffectRecord;
use crate::domain::ports::Transport;
use crate::domain::{EntityId, PlayerId};
use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const PROJECTILE_MESSAGE: &str = "magic:projectile";
pub const EFFECT_MESSAGE: &str = "magic:effect";
pub const WORLD_MESSAGE: &str = "magic:world";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectileMessage {
    #[serde(rename_all = "camelCase")]
    Spawned {
        axe_id: EntityId,
        location: String,
        tier: u32,
        start: Vec2,
        target: Vec2,
    },
    // `dead` is the owner's final word; the mirror is removed on it.
    #[serde(rename_all = "camelCase")]
    Moved {
        axe_id: EntityId,
        location: String,
        position: Vec2,
        dead: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectMessage {
    #[serde(rename_all = "camelCase")]
    Started {
        effect_id: EntityId,
        record: EffectRecord,
    },
    #[serde(rename_all = "camelCase")]
    Ended { effect_id: EntityId },
}

/// World changes made by the sender's own simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorldMessage {
    #[serde(rename_all = "camelCase")]
    HostileDamaged {
        location: String,
        hostile_id: EntityId,
        amount: i32,
    },
    #[serde(rename_all = "camelCase")]
    Exploded {
        location: String,
        tile: IVec2,
        radius: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityMessage {
    Projectile(ProjectileMessage),
    Effect(EffectMessage),
    World(WorldMessage),
}

impl EntityMessage {
    pub fn message_type(&self) -> &'static str {
        match self {
            EntityMessage::Projectile(_) => PROJECTILE_MESSAGE,
            EntityMessage::Effect(_) => EFFECT_MESSAGE,
            EntityMessage::World(_) => WORLD_MESSAGE,
        }
    }

    pub fn encode(&self, sender_id: PlayerId) -> Result<Vec<u8>, ProtocolError> {
        match self {
            EntityMessage::Projectile(msg) => encode_envelope(sender_id, msg),
            EntityMessage::Effect(msg) => encode_envelope(sender_id, msg),
            EntityMessage::World(msg) => encode_envelope(sender_id, msg),
        }
    }

    /// Decodes a frame of one of the entity message types. None for any other type.
    pub fn decode(
        message_type: &str,
        bytes: &[u8],
    ) -> Result<Option<(PlayerId, EntityMessage)>, ProtocolError> {
        let decoded = match message_type {
            PROJECTILE_MESSAGE => {
                let (sender, msg) = decode_envelope(bytes)?;
                (sender, EntityMessage::Projectile(msg))
            }
            EFFECT_MESSAGE => {
                let (sender, msg) = decode_envelope(bytes)?;
                (sender, EntityMessage::Effect(msg))
            }
            WORLD_MESSAGE => {
                let (sender, msg) = decode_envelope(bytes)?;
                (sender, EntityMessage::World(msg))
            }
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }
}

pub fn is_entity_message(message_type: &str) -> bool {
    matches!(
        message_type,
        PROJECTILE_MESSAGE | EFFECT_MESSAGE | WORLD_MESSAGE
    )
}

/// Queues the local peer's entity messages for the next flush and screens
/// inbound ones.
#[derive(Debug)]
pub struct EntitySync {
    local_id: PlayerId,
    outbox: Vec<EntityMessage>,
}

impl EntitySync {
    pub fn new(local_id: PlayerId) -> Self {
        Self {
            local_id,
            outbox: Vec::new(),
        }
    }

    pub fn push(&mut self, message: EntityMessage) {
        self.outbox.push(message);
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Broadcasts queued messages in the order they were pushed. A message
    /// that cannot be encoded is logged and dropped. Returns how many were sent.
    pub fn flush(&mut self, transport: &dyn Transport) -> usize {
        let mut sent = 0;
        for message in self.outbox.drain(..) {
            match message.encode(self.local_id) {
                Ok(frame) => {
                    transport.broadcast(message.message_type(), self.local_id, frame);
                    sent += 1;
                }
                Err(err) => warn!(
                    player_id = self.local_id,
                    message_type = message.message_type(),
                    error = %err,
                    "entity message not encodable; skipped"
                ),
            }
        }
        sent
    }

    /// Decodes one inbound frame. None for other message types and for our own echo.
    pub fn on_receive(
        &self,
        message_type: &str,
        transport_sender: PlayerId,
        bytes: &[u8],
    ) -> Result<Option<EntityMessage>, ProtocolError> {
        if transport_sender == self.local_id {
            return Ok(None);
        }
        let Some((envelope_sender, message)) = EntityMessage::decode(message_type, bytes)? else {
            return Ok(None);
        };
        if envelope_sender != transport_sender {
            return Err(ProtocolError::SenderMismatch {
                envelope: envelope_sender,
                transport: transport_sender,
            });
        }
        Ok(Some(message))
    }
}
