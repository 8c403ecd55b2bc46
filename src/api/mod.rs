//! API handlers for the author registry REST endpoints

pub mod authors;
pub mod health;
pub mod openapi;
pub mod publications;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authors
        .route("/authors", post(authors::create_author))
        .route("/authors/search", get(authors::search_authors))
        .route("/authors/resolve", post(authors::resolve_author))
        .route("/authors/:id", get(authors::get_author))
        // Publications
        .route(
            "/publications/authors/resolve",
            post(publications::resolve_publication_authors),
        )
        .route(
            "/publications/:id/authors",
            put(publications::set_publication_authors),
        )
        .with_state(state);

    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
