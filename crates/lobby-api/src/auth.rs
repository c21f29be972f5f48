use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use lobby_gateway::Chat;
use lobby_types::api::{Claims, LoginRequest, LoginResponse, StatusResponse};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub chat: Chat,
    pub jwt_secret: String,
}

/// Upper bound on a token's life. Logout or expiry ends the session sooner.
const TOKEN_TTL_DAYS: i64 = 30;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Login announces the join, which rewrites the history file
    let chat = state.chat.clone();
    let session = tokio::task::spawn_blocking(move || chat.login(&req.username)).await??;

    let token = create_token(&state.jwt_secret, session.id, &session.name)
        .map_err(ApiError::internal)?;

    Ok(Json(LoginResponse {
        status: "success".into(),
        username: session.name,
        token,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.chat.clone();
    tokio::task::spawn_blocking(move || chat.logout(&claims.username)).await?;
    Ok(Json(StatusResponse::success()))
}

pub fn create_token(
    secret: &str,
    session_id: Uuid,
    username: &str,
) -> jsonwebtoken::errors::Result<String> {
    let claims = Claims {
        sub: session_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
