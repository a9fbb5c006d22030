// Use-case level inputs/outputs for the peer loop.

use crate::domain::cast::{CastError, CastRequest};
use crate::domain::render::DrawList;
use crate::domain::{EntityId, PlayerId, PlayerSpellState};
use glam::Vec2;
use serde::Serialize;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum PeerEvent {
    Cast(CastRequest),
    ThrowAxe { tier: u32, target: Vec2 },
    GrantPoints { points: u32 },
    // Spends one free point to learn (or raise) a spell.
    Learn { spell_id: String, level: u32 },
    Inbound {
        message_type: String,
        sender_id: PlayerId,
        payload: Vec<u8>,
    },
    PeerLeft { player_id: PlayerId },
    // Hands back the local record so the caller can persist it.
    Export { reply: oneshot::Sender<PlayerSpellState> },
    // Reads the cached mirror of another player.
    PeerState {
        player_id: PlayerId,
        reply: oneshot::Sender<Option<PlayerSpellState>>,
    },
}

/// Feedback for the local player, produced while processing a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    CastStarted { spell_id: String },
    CastRejected { spell_id: String, reason: String },
    AxeThrown { axe_id: EntityId },
    SpellLearned { spell_id: String, level: u32 },
    LearnRejected { spell_id: String },
    PeerStateUpdated { player_id: PlayerId },
}

impl Notice {
    pub fn cast_rejected(spell_id: &str, error: CastError) -> Self {
        Notice::CastRejected {
            spell_id: spell_id.to_string(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameUpdate {
    pub tick: u64,
    pub sprites: DrawList,
    pub notices: Vec<Notice>,
}
