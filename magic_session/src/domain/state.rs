// Domain-level world entities and the network-visible player snapshot.

use super::features::TileMap;
use super::projectile::ProjectileSet;
use super::spellbook::SpellBook;
use super::tuning::AxeTuning;
use super::{EntityId, PlayerId};
use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Edge length of one map tile in world pixels.
pub const TILE_SIZE: f32 = 64.0;

/// Shareable per-player state; replaced wholesale on every received snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSpellState {
    #[serde(default)]
    pub free_points: u32,
    #[serde(default)]
    pub spell_book: SpellBook,
}

#[derive(Debug, Clone)]
pub struct Hostile {
    pub id: EntityId,
    pub position: Vec2,
    pub hp: i32,
    // Last player that damaged this hostile (kill credit).
    pub last_attacker: Option<PlayerId>,
}

impl Hostile {
    pub fn new(id: EntityId, position: Vec2, hp: i32) -> Self {
        Self {
            id,
            position,
            hp,
            last_attacker: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn take_damage(&mut self, amount: i32, attacker: PlayerId) {
        self.hp = (self.hp - amount).max(0);
        self.last_attacker = Some(attacker);
    }
}

/// Terrain destruction request recorded by a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explosion {
    pub tile: IVec2,
    pub radius: i32,
    pub source: PlayerId,
}

pub struct Location {
    pub name: String,
    // Playable area in world pixels, origin at the top-left corner.
    pub size: Vec2,
    pub hostiles: Vec<Hostile>,
    pub explosions: Vec<Explosion>,
    pub projectiles: ProjectileSet,
    // Tile layers, when the content provider supplied them.
    pub map: Option<TileMap>,
}

impl Location {
    pub fn new(name: impl Into<String>, size: Vec2) -> Self {
        Self {
            name: name.into(),
            size,
            hostiles: Vec::new(),
            explosions: Vec::new(),
            projectiles: ProjectileSet::default(),
            map: None,
        }
    }

    pub fn with_map(mut self, map: TileMap) -> Self {
        self.map = Some(map);
        self
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.is_finite()
            && point.x >= 0.0
            && point.y >= 0.0
            && point.x <= self.size.x
            && point.y <= self.size.y
    }

    pub fn spawn_hostile(&mut self, hostile: Hostile) {
        self.hostiles.push(hostile);
    }

    pub fn hostile(&self, id: EntityId) -> Option<&Hostile> {
        self.hostiles.iter().find(|h| h.id == id)
    }

    /// Living hostiles whose position lies within `radius` of `center`.
    pub fn hostiles_within_mut(
        &mut self,
        center: Vec2,
        radius: f32,
    ) -> impl Iterator<Item = &mut Hostile> {
        self.hostiles
            .iter_mut()
            .filter(move |h| h.is_alive() && h.position.distance(center) <= radius)
    }

    pub fn explode(&mut self, tile: IVec2, radius: i32, source: PlayerId) {
        self.explosions.push(Explosion {
            tile,
            radius,
            source,
        });
    }

    /// Advances this location's projectiles against its hostiles.
    pub fn update_projectiles(&mut self, dt: f32, tuning: &AxeTuning) -> usize {
        self.projectiles.update(&mut self.hostiles, dt, tuning)
    }
}

/// Tile coordinate containing a world-space point.
pub fn tile_at(point: Vec2) -> IVec2 {
    (point / TILE_SIZE).floor().as_ivec2()
}

/// Locations plus the reward counters effects credit into.
#[derive(Default)]
pub struct World {
    locations: HashMap<String, Location>,
    experience: HashMap<PlayerId, u32>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_location(&mut self, location: Location) {
        self.locations.insert(location.name.clone(), location);
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.get(name)
    }

    pub fn location_mut(&mut self, name: &str) -> Option<&mut Location> {
        self.locations.get_mut(name)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn locations_mut(&mut self) -> impl Iterator<Item = &mut Location> {
        self.locations.values_mut()
    }

    pub fn award_experience(&mut self, player_id: PlayerId, amount: u32) {
        *self.experience.entry(player_id).or_default() += amount;
    }

    pub fn experience(&self, player_id: PlayerId) -> u32 {
        self.experience.get(&player_id).copied().unwrap_or(0)
    }
}
