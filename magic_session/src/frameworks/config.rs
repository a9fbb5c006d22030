use crate::domain::features::FeaturePlacement;
use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env_parse("MAGIC_SESSION_PORT").unwrap_or(3001)
}

pub fn save_dir() -> PathBuf {
    env::var("MAGIC_SAVE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./saves"))
}

/// Altar/radio placement overrides, read once at setup.
pub fn feature_placement() -> FeaturePlacement {
    let defaults = FeaturePlacement::default();
    FeaturePlacement {
        altar_location: env::var("MAGIC_ALTAR_LOCATION").unwrap_or(defaults.altar_location),
        altar_x: env_parse("MAGIC_ALTAR_X").unwrap_or(defaults.altar_x),
        altar_y: env_parse("MAGIC_ALTAR_Y").unwrap_or(defaults.altar_y),
        radio_location: env::var("MAGIC_RADIO_LOCATION").unwrap_or(defaults.radio_location),
        radio_x: env_parse("MAGIC_RADIO_X").unwrap_or(defaults.radio_x),
        radio_y: env_parse("MAGIC_RADIO_Y").unwrap_or(defaults.radio_y),
        has_expanded_map: env_parse("MAGIC_HAS_EXPANDED_MAP").unwrap_or(defaults.has_expanded_map),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub const DEFAULT_SESSION_ID: &str = "default";

pub const RELAY_CHANNEL_CAPACITY: usize = 256;
pub const PEER_EVENT_CAPACITY: usize = 1024;
pub const FRAME_BROADCAST_CAPACITY: usize = 128;
pub const OUTBOUND_FRAME_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
// Unconditional snapshot broadcast so peers that missed one converge.
pub const REPUBLISH_INTERVAL: Duration = Duration::from_secs(5);
