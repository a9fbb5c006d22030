use glam::Vec2;

/// Highest upgrade tier on the tool sheet (iridium).
pub const MAX_AXE_TIER: u32 = 4;

/// Gameplay tuning for thrown axes.

#[derive(Debug, Clone, Copy)]
pub struct AxeTuning {
    /// Distance travelled per simulation tick, in pixels.
    pub speed: f32,

    /// Damage of a copper (tier 0) axe.
    pub base_damage: i32,

    /// Extra damage per upgrade tier.
    pub damage_per_tier: i32,

    /// Seconds an axe stays in the world before the location removes it.
    pub max_lifetime: f32,

    /// Side of the square hit box in pixels.
    pub hit_box: f32,

    /// Spawn offset from the thrower's standing position.
    pub spawn_offset: Vec2,
}

impl AxeTuning {
    pub fn damage_for_tier(&self, tier: u32) -> i32 {
        let tier = i32::try_from(tier).unwrap_or(i32::MAX);
        self.base_damage
            .saturating_add(self.damage_per_tier.saturating_mul(tier))
    }
}

impl Default for AxeTuning {
    fn default() -> Self {
        Self {
            speed: 20.0,
            base_damage: 3,
            damage_per_tier: 3,
            max_lifetime: 2.0,
            hit_box: 64.0,
            spawn_offset: Vec2::new(-16.0, -64.0),
        }
    }
}
