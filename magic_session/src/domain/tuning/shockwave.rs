/// Gameplay tuning for the shockwave rings.

#[derive(Debug, Clone, Copy)]
pub struct ShockwaveTuning {
    /// Ticks between two consecutive rings.
    pub ring_interval_ticks: u32,

    /// Radius growth per ring in pixels.
    pub ring_step: f32,

    /// Rings fired at level 0; each level adds one.
    pub base_rings: u32,

    /// Damage at level 0.
    pub base_damage: i32,

    /// Extra damage per spell level.
    pub damage_per_level: i32,

    /// Experience credited to the caster per hostile hit.
    pub experience_per_hit: u32,
}

impl ShockwaveTuning {
    pub fn rings_for_level(&self, level: u32) -> u32 {
        self.base_rings.saturating_add(level)
    }

    pub fn damage_for_level(&self, level: u32) -> i32 {
        let level = i32::try_from(level).unwrap_or(i32::MAX);
        self.base_damage
            .saturating_add(self.damage_per_level.saturating_mul(level))
    }
}

impl Default for ShockwaveTuning {
    fn default() -> Self {
        Self {
            ring_interval_ticks: 10,
            ring_step: 64.0,
            base_rings: 1,
            base_damage: 10,
            damage_per_level: 5,
            experience_per_hit: 1,
        }
    }
}
