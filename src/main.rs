use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use detailing::config::AppConfig;
use detailing::db;
use detailing::handlers;
use detailing::render::HtmlRenderer;
use detailing::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        renderer: Box::new(HtmlRenderer),
    });

    let app = Router::new()
        .route("/", get(handlers::auth::root_redirect))
        .route("/health/", get(handlers::health::health))
        .route("/accounts/signup/", get(handlers::auth::signup_page))
        .route(
            "/accounts/signup/submit/",
            post(handlers::auth::signup_submit),
        )
        .route(
            "/accounts/login/",
            get(handlers::auth::login_page).post(handlers::auth::login_submit),
        )
        .route("/accounts/logout/", post(handlers::auth::logout))
        .route("/bookings/", get(handlers::bookings::booking_list))
        .route("/bookings/create/", get(handlers::bookings::create_form))
        .route(
            "/bookings/create/submit/",
            post(handlers::bookings::create_submit),
        )
        .route("/bookings/:id/edit/", get(handlers::bookings::edit_form))
        .route(
            "/bookings/:id/edit/submit/",
            post(handlers::bookings::edit_submit),
        )
        .route(
            "/bookings/:id/delete/",
            get(handlers::bookings::delete_confirm_page),
        )
        .route(
            "/bookings/:id/delete/confirm/",
            post(handlers::bookings::delete_confirm),
        )
        .route("/slots/", get(handlers::slots::slot_list))
        .route("/slots/create/", post(handlers::slots::slot_create))
        .route("/slots/:id/delete/", post(handlers::slots::slot_delete))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
