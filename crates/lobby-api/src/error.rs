use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use lobby_gateway::ChatError;
use lobby_types::api::ErrorResponse;

/// Request failure, rendered as `{"status": "error", "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Detail is logged, never sent to the client.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Chat(ChatError::EmptyName | ChatError::EmptyContent) => StatusCode::BAD_REQUEST,
            Self::Chat(ChatError::NotAuthenticated) => StatusCode::UNAUTHORIZED,
            Self::Chat(ChatError::NotActive) => StatusCode::FORBIDDEN,
            Self::Chat(ChatError::Persistence(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::internal(e)
    }
}
