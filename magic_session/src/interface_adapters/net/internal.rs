use crate::domain::PlayerId;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids;
use crate::use_cases::session::SessionError;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::{collections::HashSet, sync::Arc};

#[derive(Debug, Default, serde::Deserialize)]
pub struct SessionInitRequest {
    // Optional caller-chosen id; generated when absent.
    #[serde(default)]
    session_id: Option<String>,
    // Player ids allowed to join (empty means open session).
    #[serde(default)]
    allowed_player_ids: Vec<PlayerId>,
}

#[derive(Debug, serde::Serialize)]
struct SessionInitResponse {
    session_id: String,
}

pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<SessionInitRequest>>,
) -> impl IntoResponse {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let session_id = match payload.session_id.as_deref().map(str::trim) {
        Some("") => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("session_id must not be blank")),
            )
                .into_response();
        }
        // Peers put the id into a query string unescaped.
        Some(id) if !ids::is_url_safe(id) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    "session_id may only use letters, digits and -_.~",
                )),
            )
                .into_response();
        }
        Some(id) => id.to_string(),
        None => ids::session_id(),
    };

    let allowed_players: HashSet<PlayerId> = payload.allowed_player_ids.into_iter().collect();

    // Created sessions are not pinned and go away with their last connection.
    match state
        .session_registry
        .create_session(session_id.clone(), allowed_players)
        .await
    {
        Ok(_) => (StatusCode::CREATED, Json(SessionInitResponse { session_id })).into_response(),
        Err(SessionError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("session already exists")),
        )
            .into_response(),
    }
}
