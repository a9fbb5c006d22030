// Interface adapters: wire formats and network handling.

pub mod http;
pub mod net;
pub mod persistence;
pub mod protocol;
pub mod state;
pub mod utils;
