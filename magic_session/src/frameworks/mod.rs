// Frameworks layer: process bootstrap and peer wiring.

pub mod config;
pub mod peer;
pub mod server;
