// Framework bootstrap for the session relay runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{create_session_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::session::{SessionRegistry, SessionSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

pub fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    // try_init: a second call (tests, embedding) keeps the first subscriber.
    let installed = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
    };
    if installed.is_err() {
        return;
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/sessions", post(create_session_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let session_registry = Arc::new(SessionRegistry::new(SessionSettings {
        relay_channel_capacity: config::RELAY_CHANNEL_CAPACITY,
    }));

    // The default session is pinned so peers can always connect without creating one.
    session_registry
        .create_pinned_session(config::DEFAULT_SESSION_ID.to_string())
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default session: {e:?}")))?;

    Ok(Arc::new(AppState {
        session_registry,
        default_session_id: Arc::from(config::DEFAULT_SESSION_ID),
    }))
}
