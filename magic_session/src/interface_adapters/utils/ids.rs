use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

fn counter() -> &'static AtomicU64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    // Seeded from the clock so ids differ across restarts.
    COUNTER.get_or_init(|| {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        AtomicU64::new(nanos)
    })
}

/// Process-unique id for correlating one connection's logs.
pub fn conn_id() -> u64 {
    counter().fetch_add(1, Ordering::Relaxed)
}

/// Fresh session id for sessions created without one. URL-safe.
pub fn session_id() -> String {
    format!("session-{:x}", counter().fetch_add(1, Ordering::Relaxed))
}

/// Whether `id` can sit in a query string as is: ASCII letters, digits and `-_.~`.
pub fn is_url_safe(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
}
