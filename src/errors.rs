use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::services::auth::LOGIN_URL;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden")]
    Forbidden,

    /// No valid session. Surfaced as a redirect to the login page, carrying
    /// the path the request was aiming for.
    #[error("authentication required")]
    Unauthenticated { next: String },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(what) => {
                tracing::debug!(what = %what, "404");
                (StatusCode::NOT_FOUND, Html("<h1>Not Found</h1>".to_string())).into_response()
            }
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                Html("<h1>403 Forbidden</h1>".to_string()),
            )
                .into_response(),
            AppError::Unauthenticated { next } => {
                Redirect::to(&format!("{LOGIN_URL}?next={next}")).into_response()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("<h1>Internal Server Error</h1>".to_string()),
                )
                    .into_response()
            }
        }
    }
}
