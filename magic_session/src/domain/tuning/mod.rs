// Gameplay tuning, kept apart from runtime configuration.

pub mod axe;
pub mod meteor;
pub mod shockwave;

pub use axe::{AxeTuning, MAX_AXE_TIER};
pub use meteor::MeteorTuning;
pub use shockwave::ShockwaveTuning;
