use crate::use_cases::session::SessionRegistry;
use std::sync::Arc;

pub struct AppState {
    // Live relay sessions.
    pub session_registry: Arc<SessionRegistry>,
    // Session used when a peer connects without naming one.
    pub default_session_id: Arc<str>,
}
