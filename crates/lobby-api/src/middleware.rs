use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use lobby_gateway::ChatError;
use lobby_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate the JWT from the Authorization header.
///
/// The token must also name a live session: after logout or expiry the
/// same token is refused until the participant logs in again.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ChatError::NotAuthenticated)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ChatError::NotAuthenticated)?;

    let owner = state.chat.authenticate(token_data.claims.sub)?;
    if owner != token_data.claims.username {
        return Err(ChatError::NotAuthenticated.into());
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
