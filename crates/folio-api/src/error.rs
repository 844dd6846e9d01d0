use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use folio_editor::EditorError;
use folio_types::api::ErrorResponse;

/// Everything a handler can fail with. Invalid input is rejected before any
/// store call; store failures are logged and reported generically.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("admin access required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("deleting a magazine cannot be undone; repeat the request with confirm=true")]
    ConfirmationRequired,

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("remote operation failed")]
    Store(#[source] anyhow::Error),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ConfirmationRequired => StatusCode::PRECONDITION_REQUIRED,
            Self::Editor(e) => match e {
                EditorError::SessionNotFound(_) | EditorError::ElementNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                EditorError::NotOwner(_) => StatusCode::FORBIDDEN,
                EditorError::PageOutOfRange { .. }
                | EditorError::EmptyImage
                | EditorError::StyleNotApplicable(_) => StatusCode::BAD_REQUEST,
            },
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Store(e) => error!("Store operation failed: {:#}", e),
            other => warn!("Request rejected ({}): {}", status, other),
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
