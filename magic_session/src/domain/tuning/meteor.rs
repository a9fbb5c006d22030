/// Gameplay tuning for the meteor strike.
///
/// Fixed per effect type; casts never override these values.

#[derive(Debug, Clone, Copy)]
pub struct MeteorTuning {
    /// Height the meteor starts falling from, in pixels.
    pub start_height: f32,

    /// Height lost per simulation tick.
    pub fall_speed: f32,

    /// Impact radius in pixels for hostile damage.
    pub impact_radius: f32,

    /// Damage applied to every hostile inside the impact radius.
    pub damage: i32,

    /// Experience credited to the caster per hostile hit.
    pub experience_per_hit: u32,

    /// Terrain explosion radius in tiles.
    pub explosion_radius: i32,
}

impl Default for MeteorTuning {
    fn default() -> Self {
        Self {
            start_height: 1000.0,
            fall_speed: 64.0,
            impact_radius: 8.0 * 64.0,
            damage: 300,
            experience_per_hit: 5,
            explosion_radius: 6,
        }
    }
}
