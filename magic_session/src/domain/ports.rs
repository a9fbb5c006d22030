use super::PlayerId;

// Outbound side of the session transport; implemented by the network adapter.
// Delivery is fire-and-forget: no acknowledgement, no retry.
pub trait Transport: Send + Sync {
    fn broadcast(&self, message_type: &str, sender_id: PlayerId, payload: Vec<u8>);
}
