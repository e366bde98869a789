use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use serde_json::json;

use crate::errors::AppError;
use crate::extract;
use crate::services::auth::{self, LoginForm, SignupForm, LOGIN_URL, MSG_LOGIN_FAILED};
use crate::state::AppState;

// GET /
pub async fn root_redirect() -> Redirect {
    Redirect::to(LOGIN_URL)
}

// GET /accounts/signup/
pub async fn signup_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let context = json!({ "form": {}, "errors": {} });
    Html(state.renderer.render("registration/signup.html", &context))
}

// POST /accounts/signup/submit/
pub async fn signup_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();
    match auth::signup(&conn, &form)? {
        Ok(user) => {
            // New accounts are signed in right away.
            let token = auth::create_session(&conn, &user.id)?;
            let cookie = auth::session_cookie_header(&token, &state.config.session_secret)?;
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/bookings/")).into_response())
        }
        Err(errors) => {
            let context = json!({
                "form": { "username": form.username },
                "errors": errors,
            });
            Ok(Html(state.renderer.render("registration/signup.html", &context)).into_response())
        }
    }
}

#[derive(Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: String,
}

// GET /accounts/login/
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextQuery>,
) -> Html<String> {
    let context = json!({ "form": {}, "next": query.next, "error": "" });
    Html(state.renderer.render("bookings/login.html", &context))
}

// POST /accounts/login/
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();
    match auth::authenticate(&conn, &form.username, &form.password)? {
        Some(user) => {
            let token = auth::create_session(&conn, &user.id)?;
            let cookie = auth::session_cookie_header(&token, &state.config.session_secret)?;
            let target = auth::safe_next(&form.next).unwrap_or("/bookings/");
            tracing::info!(username = %user.username, "login");
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response())
        }
        None => {
            tracing::info!(username = %form.username, "failed login");
            let context = json!({
                "form": { "username": form.username },
                "next": form.next,
                "error": MSG_LOGIN_FAILED,
            });
            Ok(Html(state.renderer.render("bookings/login.html", &context)).into_response())
        }
    }
}

// POST /accounts/logout/
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(raw) = extract::session_cookie(&headers) {
        if let Some(token) = auth::verify_cookie_value(&raw, &state.config.session_secret) {
            let conn = state.db.lock().unwrap();
            if let Err(e) = auth::destroy_session(&conn, &token) {
                tracing::error!(error = %e, "failed to destroy session");
            }
        }
    }

    (
        [(header::SET_COOKIE, auth::clear_session_cookie_header())],
        Redirect::to(LOGIN_URL),
    )
        .into_response()
}
