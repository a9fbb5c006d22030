// Use cases layer: session workflows built on the domain.

pub mod entity_sync;
pub mod features;
pub mod peer;
pub mod player_sync;
pub mod session;
pub mod types;

pub use entity_sync::{EntityMessage, EntitySync};
pub use peer::{LocalPlayer, PeerSettings, SessionPeer, peer_task};
pub use player_sync::{PlayerStateSync, ProtocolError, ReceiveOutcome};
pub use types::{FrameUpdate, Notice, PeerEvent};
