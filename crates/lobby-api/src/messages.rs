use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use lobby_gateway::Poll;
use lobby_types::api::{Claims, PollResponse, SendMessageRequest, StatusResponse, UsersResponse};

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    /// Return the full history instead of what's pending.
    #[serde(default)]
    pub first_load: bool,
    /// Cursor read: everything from this position on. Wins over `first_load`.
    pub after: Option<usize>,
    /// With `first_load`, only the last `limit` messages of the history.
    pub limit: Option<usize>,
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Run the history rewrite off the async runtime
    let chat = state.chat.clone();
    tokio::task::spawn_blocking(move || chat.send(&claims.username, &req.content)).await??;
    Ok(Json(StatusResponse::success()))
}

/// Polls never wait for new messages; an empty result comes back at once.
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // Reads take the log lock, which writers hold across the file rewrite
    let chat = state.chat.clone();
    let poll = tokio::task::spawn_blocking(move || {
        let name = &claims.username;
        match (query.after, query.limit) {
            (Some(cursor), _) => chat.poll_since(name, cursor),
            (None, Some(limit)) if query.first_load => chat.poll_recent(name, limit),
            (None, _) => chat.poll(name, query.first_load),
        }
    })
    .await??;

    let Poll { messages, users, cursor } = poll;
    Ok(Json(PollResponse {
        status: "success".into(),
        messages,
        users,
        cursor,
    }))
}

pub async fn active_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.chat.list_active_users(&claims.username)?;
    Ok(Json(UsersResponse {
        status: "success".into(),
        users,
    }))
}
