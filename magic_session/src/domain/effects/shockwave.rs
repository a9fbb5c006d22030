use crate::domain::catalog::EffectKind;
use crate::domain::render::{DrawList, SourceRect, SpriteDraw, SpriteSheet};
use crate::domain::state::World;
use crate::domain::tuning::ShockwaveTuning;
use crate::domain::{EntityId, PlayerId};
use glam::Vec2;
use std::collections::HashSet;
use std::f32::consts::TAU;
use tracing::{debug, warn};

use super::{ActiveEffect, EffectRecord};

// Stone debris cell on the objects sheet.
const DEBRIS: SourceRect = SourceRect::cell(390, 24, 16);
const DEBRIS_PER_RING: u32 = 8;

/// Expanding rings around the caster's position. Each hostile is hit at most once.
pub struct Shockwave {
    caster: PlayerId,
    location: String,
    center: Vec2,
    level: u32,
    ticks: u32,
    rings_fired: u32,
    hit: HashSet<EntityId>,
    tuning: ShockwaveTuning,
    // Replays another peer's shockwave: rings expand but hit nothing.
    replica: bool,
}

impl Shockwave {
    pub fn new(
        caster: PlayerId,
        location: impl Into<String>,
        center: Vec2,
        level: u32,
        tuning: ShockwaveTuning,
    ) -> Self {
        Self {
            caster,
            location: location.into(),
            center,
            level,
            ticks: 0,
            rings_fired: 0,
            hit: HashSet::new(),
            tuning,
            replica: false,
        }
    }

    pub fn into_replica(mut self) -> Self {
        self.replica = true;
        self
    }

    pub fn rings_fired(&self) -> u32 {
        self.rings_fired
    }

    fn current_radius(&self) -> f32 {
        self.rings_fired as f32 * self.tuning.ring_step
    }

    fn fire_ring(&mut self, world: &mut World) -> bool {
        let Some(location) = world.location_mut(&self.location) else {
            warn!(
                caster = self.caster,
                location = %self.location,
                "shockwave location unavailable; effect dropped"
            );
            return false;
        };

        self.rings_fired += 1;
        let radius = self.current_radius();
        let damage = self.tuning.damage_for_level(self.level);

        let mut hits: u32 = 0;
        for hostile in location.hostiles_within_mut(self.center, radius) {
            if !self.hit.insert(hostile.id) {
                continue;
            }
            hostile.take_damage(damage, self.caster);
            hits += 1;
        }

        world.award_experience(self.caster, hits * self.tuning.experience_per_hit);
        debug!(
            caster = self.caster,
            ring = self.rings_fired,
            radius,
            hits,
            "shockwave ring"
        );
        true
    }
}

impl ActiveEffect for Shockwave {
    fn caster(&self) -> PlayerId {
        self.caster
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn record(&self) -> EffectRecord {
        EffectRecord {
            kind: EffectKind::Shockwave,
            level: self.level,
            location: self.location.clone(),
            anchor: self.center,
        }
    }

    fn update(&mut self, world: &mut World) -> bool {
        self.ticks += 1;
        if self.ticks % self.tuning.ring_interval_ticks.max(1) != 0 {
            return true;
        }

        if self.replica {
            self.rings_fired += 1;
        } else if !self.fire_ring(world) {
            return false;
        }
        self.rings_fired < self.tuning.rings_for_level(self.level)
    }

    fn draw(&self, out: &mut DrawList) {
        if self.rings_fired == 0 {
            return;
        }

        let radius = self.current_radius();
        for i in 0..DEBRIS_PER_RING {
            let angle = TAU * i as f32 / DEBRIS_PER_RING as f32;
            let position = self.center + Vec2::from_angle(angle) * radius;
            out.push(SpriteDraw {
                sheet: SpriteSheet::Objects,
                source: DEBRIS,
                position,
                origin: Vec2::new(8.0, 8.0),
                rotation: angle,
                scale: 4.0,
                layer_depth: position.y / 10000.0,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Hostile, Location};

    const CASTER: PlayerId = 5;

    fn arena() -> World {
        let mut location = Location::new("Mine", Vec2::new(2048.0, 2048.0));
        location.spawn_hostile(Hostile::new(1, Vec2::new(1050.0, 1000.0), 100));
        location.spawn_hostile(Hostile::new(2, Vec2::new(1100.0, 1000.0), 100));
        location.spawn_hostile(Hostile::new(3, Vec2::new(1500.0, 1000.0), 100));
        let mut world = World::new();
        world.insert_location(location);
        world
    }

    #[test]
    fn when_level_one_then_two_rings_fire_and_effect_finishes() {
        let mut world = arena();
        let mut wave = Shockwave::new(
            CASTER,
            "Mine",
            Vec2::new(1000.0, 1000.0),
            1,
            ShockwaveTuning::default(),
        );

        for _ in 0..19 {
            assert!(wave.update(&mut world));
        }
        assert!(!wave.update(&mut world));
        assert_eq!(wave.rings_fired(), 2);
    }

    #[test]
    fn when_hostile_inside_several_rings_then_hit_only_once() {
        let mut world = arena();
        let mut wave = Shockwave::new(
            CASTER,
            "Mine",
            Vec2::new(1000.0, 1000.0),
            2,
            ShockwaveTuning::default(),
        );

        while wave.update(&mut world) {}

        let mine = world.location("Mine").expect("mine");
        // Level 2 deals 20 damage; hostiles 1 and 2 are within 192px, hostile 3 is not.
        assert_eq!(mine.hostile(1).map(|h| h.hp), Some(80));
        assert_eq!(mine.hostile(2).map(|h| h.hp), Some(80));
        assert_eq!(mine.hostile(3).map(|h| h.hp), Some(100));
        assert_eq!(world.experience(CASTER), 2);
    }

    #[test]
    fn draw_is_empty_before_first_ring() {
        let wave = Shockwave::new(CASTER, "Mine", Vec2::ZERO, 0, ShockwaveTuning::default());
        let mut out = DrawList::new();
        wave.draw(&mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn when_replica_runs_then_rings_expand_without_hits() {
        let mut world = arena();
        let mut replica = Shockwave::new(
            CASTER,
            "Mine",
            Vec2::new(1000.0, 1000.0),
            1,
            ShockwaveTuning::default(),
        )
        .into_replica();

        while replica.update(&mut world) {}

        assert_eq!(replica.rings_fired(), 2);
        let mine = world.location("Mine").expect("mine");
        assert_eq!(mine.hostile(1).map(|h| h.hp), Some(100));
        assert_eq!(world.experience(CASTER), 0);
    }
}
