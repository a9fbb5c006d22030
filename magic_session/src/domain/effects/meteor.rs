use crate::domain::PlayerId;
use crate::domain::catalog::EffectKind;
use crate::domain::render::{DrawList, SourceRect, SpriteDraw, SpriteSheet};
use crate::domain::state::{World, tile_at};
use crate::domain::tuning::MeteorTuning;
use glam::Vec2;
use tracing::{info, warn};

use super::{ActiveEffect, EffectRecord};

const SPRITE: SourceRect = SourceRect::new(352, 400, 32, 32);
const SPRITE_SCALE: f32 = 10.0;

/// Falls toward a fixed impact point, then damages everything around it once.
pub struct Meteor {
    caster: PlayerId,
    location: String,
    position: Vec2,
    height: f32,
    tuning: MeteorTuning,
    // Replays another peer's meteor: same fall, no impact.
    replica: bool,
}

impl Meteor {
    pub fn new(
        caster: PlayerId,
        location: impl Into<String>,
        position: Vec2,
        tuning: MeteorTuning,
    ) -> Self {
        Self {
            caster,
            location: location.into(),
            position,
            height: tuning.start_height,
            tuning,
            replica: false,
        }
    }

    pub fn into_replica(mut self) -> Self {
        self.replica = true;
        self
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    fn impact(&self, world: &mut World) {
        let Some(location) = world.location_mut(&self.location) else {
            warn!(
                caster = self.caster,
                location = %self.location,
                "meteor location unavailable; impact skipped"
            );
            return;
        };

        let mut hits: u32 = 0;
        for hostile in location.hostiles_within_mut(self.position, self.tuning.impact_radius) {
            hostile.take_damage(self.tuning.damage, self.caster);
            hits += 1;
        }
        location.explode(
            tile_at(self.position),
            self.tuning.explosion_radius,
            self.caster,
        );

        world.award_experience(self.caster, hits * self.tuning.experience_per_hit);
        info!(
            caster = self.caster,
            location = %self.location,
            x = self.position.x,
            y = self.position.y,
            hits,
            "meteor impact"
        );
    }
}

impl ActiveEffect for Meteor {
    fn caster(&self) -> PlayerId {
        self.caster
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn record(&self) -> EffectRecord {
        EffectRecord {
            kind: EffectKind::Meteor,
            level: 0,
            location: self.location.clone(),
            anchor: self.position,
        }
    }

    fn update(&mut self, world: &mut World) -> bool {
        self.height -= self.tuning.fall_speed;
        if self.height > 0.0 {
            return true;
        }

        if !self.replica {
            self.impact(world);
        }
        false
    }

    fn draw(&self, out: &mut DrawList) {
        let y = self.position.y - self.height;
        out.push(SpriteDraw {
            sheet: SpriteSheet::Objects,
            source: SPRITE,
            position: Vec2::new(self.position.x, y),
            origin: Vec2::new(16.0, 16.0),
            rotation: 0.0,
            scale: SPRITE_SCALE,
            layer_depth: (y + 96.0) / 10000.0,
        });
    }
}
