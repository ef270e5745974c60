#![allow(dead_code)]

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Auth endpoints (mixed: some public, some protected)
        .nest("/auth", auth_routes(app_state.clone()))
        // Lesson catalog and submissions (mixed auth)
        .nest("/lessons", lesson_routes(app_state.clone()))
        // Profile (requires JWT)
        .nest("/profile", profile_routes(app_state.clone()))
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn auth_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    let public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Protected routes (require JWT)
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_current_user))
        .route("/refresh", post(handlers::auth::refresh_token))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}

fn lesson_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    // Browsing works anonymously but picks up progress when a valid token
    // is presented
    let browse_routes = Router::new()
        .route("/", get(handlers::lessons::list_lessons))
        .route("/{id}", get(handlers::lessons::get_lesson))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::optional_auth_middleware,
        ));

    let stats_routes = Router::new().route("/{id}/stats", get(handlers::lessons::get_lesson_stats));

    let protected_routes = Router::new()
        .route("/{id}/submit", post(handlers::lessons::submit_answers))
        .route("/{id}/attempts", get(handlers::lessons::get_lesson_attempts))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    browse_routes.merge(stats_routes).merge(protected_routes)
}

fn profile_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", get(handlers::profile::get_profile))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}
