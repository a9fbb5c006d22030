// Thrown axes and the per-location collection that owns and resolves them.

use super::render::{DrawList, SourceRect, SpriteDraw, SpriteSheet};
use super::state::Hostile;
use super::tuning::{AxeTuning, MAX_AXE_TIER};
use super::{EntityId, PlayerId};
use glam::Vec2;
use std::collections::HashSet;
use tracing::debug;

const TOOL_SHEET_COLUMNS: i32 = 21;
const AXE_FIRST_CELL: i32 = 215;
const SPIN_PER_DRAW: f32 = 0.3;
// Sprite and hit box are centred this far from `position`.
const CENTER_OFFSET: Vec2 = Vec2::new(32.0, 32.0);
// Mirrors whose owner never reported them dead are dropped this long after the owner would have.
const MIRROR_GRACE: f32 = 1.0;

pub struct ThrownAxe {
    id: EntityId,
    owner: PlayerId,
    tier: u32,
    damage: i32,
    target: Vec2,
    position: Vec2,
    speed: f32,
    rotation: f32,
    age: f32,
    hits: HashSet<EntityId>,
    dead: bool,
    // Copy of an axe simulated by its owner's peer; moved only by the owner's updates.
    mirrored: bool,
}

impl ThrownAxe {
    pub fn new(
        id: EntityId,
        owner: PlayerId,
        position: Vec2,
        tier: u32,
        damage: i32,
        target: Vec2,
        speed: f32,
    ) -> Self {
        Self {
            id,
            owner,
            tier,
            damage,
            target,
            position,
            speed,
            rotation: 0.0,
            age: 0.0,
            hits: HashSet::new(),
            dead: false,
            mirrored: false,
        }
    }

    /// Read-only copy of another peer's axe. It never moves or hits on its own.
    pub fn mirror(
        id: EntityId,
        owner: PlayerId,
        position: Vec2,
        tier: u32,
        damage: i32,
        target: Vec2,
        speed: f32,
    ) -> Self {
        Self {
            mirrored: true,
            ..Self::new(id, owner, position, tier, damage, target, speed)
        }
    }

    /// Axe leaving the hands of a player standing at `standing`.
    pub fn thrown_by(
        id: EntityId,
        owner: PlayerId,
        standing: Vec2,
        tier: u32,
        target: Vec2,
        tuning: &AxeTuning,
    ) -> Self {
        Self::new(
            id,
            owner,
            standing + tuning.spawn_offset,
            tier,
            tuning.damage_for_tier(tier),
            target,
            tuning.speed,
        )
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn is_mirror(&self) -> bool {
        self.mirrored
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn kill(&mut self) {
        self.dead = true;
    }

    /// One movement step toward the fixed target. Snaps onto it instead of overshooting.
    pub fn advance(&mut self, dt: f32) {
        if self.dead {
            return;
        }

        let to_target = self.target - self.position;
        if to_target.length() < self.speed {
            self.position = self.target;
        } else {
            self.position += to_target.normalize_or_zero() * self.speed;
        }
        self.age += dt;
    }

    /// Whether `point` lies inside the square hit box of side `size`.
    pub fn overlaps(&self, point: Vec2, size: f32) -> bool {
        let delta = (point - (self.position + CENTER_OFFSET)).abs();
        delta.x <= size / 2.0 && delta.y <= size / 2.0
    }

    /// Damages `hostile` unless this axe already hit it. Returns whether damage was applied.
    pub fn on_collide_with_hostile(&mut self, hostile: &mut Hostile) -> bool {
        if self.dead || self.mirrored || !self.hits.insert(hostile.id) {
            return false;
        }
        hostile.take_damage(self.damage, self.owner);
        true
    }

    // The axe passes through walls and players.
    pub fn on_collide_with_terrain(&mut self) {}

    pub fn on_collide_with_player(&mut self, _player: PlayerId) {}

    pub fn source_rect(&self) -> SourceRect {
        let tier = self.tier.min(MAX_AXE_TIER);
        let mut shift = tier as i32 * 7;
        if tier > 2 {
            shift += 21;
        }
        SourceRect::cell(AXE_FIRST_CELL + shift, TOOL_SHEET_COLUMNS, 16)
    }

    /// Emits the spinning sprite. Spinning is cosmetic and advances once per call.
    pub fn draw(&mut self, out: &mut DrawList) {
        out.push(SpriteDraw {
            sheet: SpriteSheet::Tools,
            source: self.source_rect(),
            position: self.position + CENTER_OFFSET,
            origin: Vec2::new(8.0, 8.0),
            rotation: self.rotation,
            scale: 4.0,
            layer_depth: 1.0,
        });
        self.rotation += SPIN_PER_DRAW;
    }
}

/// Axes in flight inside one location.
#[derive(Default)]
pub struct ProjectileSet {
    axes: Vec<ThrownAxe>,
}

impl ProjectileSet {
    pub fn spawn(&mut self, axe: ThrownAxe) {
        self.axes.push(axe);
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThrownAxe> {
        self.axes.iter()
    }

    pub fn get(&self, owner: PlayerId, id: EntityId) -> Option<&ThrownAxe> {
        self.axes.iter().find(|axe| axe.owner == owner && axe.id == id)
    }

    /// Axes this peer simulates itself.
    pub fn locals(&self) -> impl Iterator<Item = &ThrownAxe> {
        self.axes.iter().filter(|axe| !axe.mirrored)
    }

    /// Moves a mirrored axe to the position its owner reported. False if no such mirror.
    pub fn move_mirror(&mut self, owner: PlayerId, id: EntityId, position: Vec2) -> bool {
        let Some(axe) = self
            .axes
            .iter_mut()
            .find(|axe| axe.mirrored && axe.owner == owner && axe.id == id)
        else {
            return false;
        };
        axe.position = position;
        true
    }

    pub fn remove(&mut self, owner: PlayerId, id: EntityId) -> bool {
        let before = self.axes.len();
        self.axes
            .retain(|axe| !(axe.owner == owner && axe.id == id));
        before != self.axes.len()
    }

    /// Moves every axe, resolves hostile hits and drops the dead ones.
    /// Returns how many axes were removed.
    pub fn update(&mut self, hostiles: &mut [Hostile], dt: f32, tuning: &AxeTuning) -> usize {
        for axe in self.axes.iter_mut() {
            if axe.is_dead() {
                continue;
            }

            if axe.mirrored {
                axe.age += dt;
                if axe.age >= tuning.max_lifetime + MIRROR_GRACE {
                    axe.kill();
                }
                continue;
            }

            axe.advance(dt);
            if axe.age >= tuning.max_lifetime {
                axe.kill();
                continue;
            }

            for hostile in hostiles.iter_mut().filter(|h| h.is_alive()) {
                if !axe.overlaps(hostile.position, tuning.hit_box) {
                    continue;
                }
                if axe.on_collide_with_hostile(hostile) {
                    debug!(
                        axe_id = axe.id,
                        owner = axe.owner,
                        hostile_id = hostile.id,
                        hostile_hp = hostile.hp,
                        "axe hit"
                    );
                }
            }
        }

        let before = self.axes.len();
        self.axes.retain(|axe| !axe.is_dead());
        before - self.axes.len()
    }

    /// Removes an owner's axes without resolving anything further.
    pub fn remove_owner(&mut self, owner: PlayerId) -> usize {
        let before = self.axes.len();
        self.axes.retain(|axe| axe.owner != owner);
        before - self.axes.len()
    }

    pub fn draw(&mut self, out: &mut DrawList) {
        for axe in self.axes.iter_mut() {
            axe.draw(out);
        }
    }
}
