// ABOUTME: Main entry point for the petstagram web app: profiles, pets, tagged photos and likes
// ABOUTME: Sets up configuration, logging, storage, sessions and the route table

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod accounts;
mod auth;
mod auth_helpers;
mod blob_store;
mod config;
mod entities;
mod error;
mod handlers;
mod middleware;
mod migration;
mod pets;
mod photos;
mod profiles;
mod session;
mod storage;
mod types;
mod validators;

#[cfg(test)]
mod storage_tests;

use config::Config;
use session::SessionStore;
use storage::Storage;

/// Room for a maximum-size photo plus form overhead; the 5 MiB photo limit
/// itself is checked by the photo service.
const UPLOAD_BODY_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub sessions: SessionStore,
    pub cookie_secure: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/dashboard", get(handlers::dashboard))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/change-password", post(auth::change_password))
        .route(
            "/profile/:id",
            get(handlers::profile_details)
                .post(handlers::edit_profile)
                .put(handlers::edit_profile)
                .delete(handlers::delete_profile),
        )
        .route("/pet", post(handlers::add_pet))
        .route(
            "/pet/:id",
            post(handlers::edit_pet)
                .put(handlers::edit_pet)
                .delete(handlers::delete_pet),
        )
        .route(
            "/photo",
            post(handlers::add_photo).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/photo/:id",
            get(handlers::photo_details)
                .post(handlers::edit_photo)
                .put(handlers::edit_photo)
                .delete(handlers::delete_photo),
        )
        .route("/photo/:id/image", get(handlers::photo_image))
        .route("/photo/:id/like", post(handlers::like_photo))
        .layer(axum_middleware::from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("petstagram=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let storage = Arc::new(Storage::new(&config).await?);

    let app_state = AppState {
        storage,
        sessions: SessionStore::new(),
        cookie_secure: config.cookie_secure,
    };

    let app = build_router(app_state);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("Server running on http://{}", config.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
