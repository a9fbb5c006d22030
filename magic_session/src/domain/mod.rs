// Domain layer: casting rules and world state.

pub mod cast;
pub mod catalog;
pub mod effects;
pub mod features;
pub mod ledger;
pub mod ports;
pub mod projectile;
pub mod registry;
pub mod render;
pub mod spellbook;
pub mod state;
pub mod tuning;

/// Multiplayer identity of a player (stable across the session).
pub type PlayerId = i64;

/// Identity of a non-player entity inside a location.
pub type EntityId = u64;

pub use cast::{CastContext, CastController, CastError, CastRequest};
pub use catalog::{SpellCatalog, SpellDefinition};
pub use effects::{ActiveEffect, ActiveEffectRuntime};
pub use ledger::{Inventory, ResourceLedger};
pub use ports::Transport;
pub use projectile::{ProjectileSet, ThrownAxe};
pub use render::{DrawList, SpriteDraw};
pub use spellbook::SpellBook;
pub use state::{Hostile, Location, PlayerSpellState, World};
