// Network adapters: relay sockets and the peer-side link.

pub mod internal;
pub mod peer_link;
pub mod relay;

pub use internal::create_session_handler;
pub use peer_link::{NetError, PeerLink};
pub use relay::ws_handler;
