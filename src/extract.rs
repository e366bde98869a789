use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use chrono::Utc;

use crate::errors::AppError;
use crate::models::Identity;
use crate::services::auth::{self, SESSION_COOKIE};
use crate::state::AppState;

/// The signed-in identity, resolved from the session cookie. Rejects
/// anonymous requests with a redirect to the login page that carries the
/// originally requested path.
pub struct CurrentUser(pub Identity);

/// Like [`CurrentUser`] but additionally requires staff or superuser rights.
pub struct StaffUser(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve_identity(parts, state)? {
            Some(identity) => Ok(CurrentUser(identity)),
            None => Err(AppError::Unauthenticated {
                next: parts.uri.path().to_string(),
            }),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        if identity.is_elevated() {
            Ok(StaffUser(identity))
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Best-effort identity lookup. `None` covers everything short of a storage
/// failure: no cookie, a bad signature, an unknown token, an expired session.
fn resolve_identity(parts: &Parts, state: &AppState) -> Result<Option<Identity>, AppError> {
    let Some(raw) = session_cookie(&parts.headers) else {
        return Ok(None);
    };
    let Some(token) = auth::verify_cookie_value(&raw, &state.config.session_secret) else {
        tracing::debug!("session cookie signature rejected");
        return Ok(None);
    };

    let conn = state.db.lock().unwrap();
    let now = Utc::now().naive_utc();
    Ok(auth::session_identity(&conn, &token, &now)?)
}

/// Pull the raw (still signed) session cookie out of a Cookie header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in header.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == SESSION_COOKIE {
                return Some(value.to_string());
            }
        }
    }
    None
}
