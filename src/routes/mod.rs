mod auth;
mod config;
mod health;
mod pinpoints;
mod sounds;

use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_mw;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::cache::cache_control_middleware;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::state::AppState;
use crate::storage::MAX_SOUND_SIZE;

/// Base64 inflates by 4/3; leave room for the JSON or multipart framing.
const UPLOAD_BODY_LIMIT: usize = MAX_SOUND_SIZE / 3 * 4 + 64 * 1024;

/// Build the full application router. Consumes the state so middleware
/// layers that need `State<AppState>` (e.g. rate limiter) can be wired up.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/sounds", get(sounds::fetch_sound))
        .nest("/api", api_routes(&state))
        // Router-wide: every response, errors and 404s included, gets a cache
        // policy.
        .layer(axum_mw::from_fn(cache_control_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/version", get(health::version))
        // Pinpoints
        .route(
            "/pinpoints",
            get(pinpoints::list_pinpoints).post(pinpoints::create_pinpoint),
        )
        .route(
            "/pinpoints/{pinpoint_id}",
            get(pinpoints::get_pinpoint)
                .put(pinpoints::update_pinpoint)
                .patch(pinpoints::update_pinpoint)
                .delete(pinpoints::delete_pinpoint),
        )
        // Sounds
        .route(
            "/sounds",
            get(sounds::list_or_fetch)
                .post(sounds::create_sound)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/sounds/{sound_id}", delete(sounds::delete_sound))
        // Map config
        .route(
            "/config",
            get(config::get_config).put(config::update_config),
        )
        .route("/config/tiles", get(config::list_tile_presets))
        // Admin session
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .merge(login_routes(state))
}

fn login_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
}
