// Active effects: time-stepped spell consequences driven by the per-tick runtime.

pub mod meteor;
pub mod shockwave;

use super::catalog::EffectKind;
use super::render::DrawList;
use super::state::World;
use super::{EntityId, PlayerId};
use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use meteor::Meteor;
pub use shockwave::Shockwave;

/// What other peers need to replay an effect they do not simulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectRecord {
    pub kind: EffectKind,
    pub level: u32,
    pub location: String,
    pub anchor: Vec2,
}

/// Capability set every in-flight effect provides to the runtime.
pub trait ActiveEffect: Send {
    /// Player that cast the effect.
    fn caster(&self) -> PlayerId;

    /// Name of the location the effect plays out in.
    fn location(&self) -> &str;

    fn record(&self) -> EffectRecord;

    /// Advances the effect by one tick. Returns false once it has finished; any
    /// terminal side effect must have been applied by then.
    fn update(&mut self, world: &mut World) -> bool;

    /// Appends the effect's sprites. Must not change simulation state.
    fn draw(&self, out: &mut DrawList);
}

struct Slot {
    id: EntityId,
    effect: Box<dyn ActiveEffect>,
}

/// Owns the live effects, in insertion order. An effect is identified by its
/// caster plus the id it was spawned or inserted under.
#[derive(Default)]
pub struct ActiveEffectRuntime {
    effects: Vec<Slot>,
    next_id: EntityId,
    // (caster, id) of effects that finished since the last `take_finished`.
    finished: Vec<(PlayerId, EntityId)>,
}

impl ActiveEffectRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a locally created effect and returns the id it was given.
    pub fn spawn(&mut self, effect: Box<dyn ActiveEffect>) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.insert(id, effect);
        id
    }

    /// Adds an effect under an id chosen by its caster's peer.
    pub fn insert(&mut self, id: EntityId, effect: Box<dyn ActiveEffect>) {
        self.effects.push(Slot { id, effect });
    }

    pub fn contains(&self, caster: PlayerId, id: EntityId) -> bool {
        self.effects
            .iter()
            .any(|slot| slot.id == id && slot.effect.caster() == caster)
    }

    /// Advances every live effect once and drops the ones that finished.
    /// Returns how many finished this tick.
    pub fn tick(&mut self, world: &mut World) -> usize {
        let before = self.effects.len();
        let finished = &mut self.finished;
        // A finished effect is dropped before the next one is advanced.
        self.effects.retain_mut(|slot| {
            let alive = slot.effect.update(world);
            if !alive {
                finished.push((slot.effect.caster(), slot.id));
            }
            alive
        });
        before - self.effects.len()
    }

    pub fn take_finished(&mut self) -> Vec<(PlayerId, EntityId)> {
        std::mem::take(&mut self.finished)
    }

    pub fn draw(&self, out: &mut DrawList) {
        for slot in &self.effects {
            slot.effect.draw(out);
        }
    }

    /// Draws only the effects playing out in `location`.
    pub fn draw_in(&self, location: &str, out: &mut DrawList) {
        for slot in self.effects.iter().filter(|s| s.effect.location() == location) {
            slot.effect.draw(out);
        }
    }

    /// Removes one effect without running its terminal action.
    pub fn remove(&mut self, caster: PlayerId, id: EntityId) -> bool {
        let before = self.effects.len();
        self.effects
            .retain(|slot| !(slot.id == id && slot.effect.caster() == caster));
        before != self.effects.len()
    }

    /// Removes every effect cast by `caster` without running terminal actions.
    pub fn cancel_caster(&mut self, caster: PlayerId) -> usize {
        let before = self.effects.len();
        self.effects.retain(|slot| slot.effect.caster() != caster);
        before - self.effects.len()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
