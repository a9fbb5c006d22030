// Shared relay bootstrap and helpers for the integration tests.
#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

static RELAY_HTTP_URL: OnceLock<String> = OnceLock::new();
static RELAY_STARTED: OnceLock<()> = OnceLock::new();

// Boots the relay once per test binary and returns its http:// base URL.
pub fn ensure_server() -> &'static str {
    RELAY_STARTED.get_or_init(|| {
        let bound = Arc::new(OnceLock::<String>::new());
        let bound_in_thread = Arc::clone(&bound);
        // A dedicated OS thread and runtime outlive each `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("relay runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral relay port");
                let addr = listener.local_addr().expect("relay addr");
                let _ = bound_in_thread.set(format!("http://{addr}"));
                magic_session::run(listener).await.expect("relay failed");
            });
        });
        wait_until_accepting(bound);
    });

    RELAY_HTTP_URL
        .get()
        .expect("relay url should be initialized")
        .as_str()
}

// Same relay, ws:// scheme, for peer links.
pub fn ensure_relay() -> String {
    ensure_server().replacen("http://", "ws://", 1)
}

// Fresh save directory so tests never share records.
pub fn temp_save_dir() -> PathBuf {
    std::env::temp_dir().join(format!("magic-session-{}", uuid::Uuid::new_v4()))
}

fn wait_until_accepting(bound: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = bound.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    let _ = RELAY_HTTP_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("relay did not start accepting in time");
}
