//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, health, publications};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Research Hub Author Registry API",
        version = "0.1.0",
        description = "Author identity resolution for publications and research media"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Authors
        authors::search_authors,
        authors::create_author,
        authors::get_author,
        authors::resolve_author,
        // Publications
        publications::resolve_publication_authors,
        publications::set_publication_authors,
    ),
    components(
        schemas(
            health::HealthResponse,
            crate::error::ErrorResponse,
            // Authors
            authors::AuthorSearchQuery,
            authors::CreateAuthorResponse,
            authors::ResolveAuthorRequest,
            crate::models::Author,
            crate::models::AuthorWithCount,
            crate::models::AuthorCandidate,
            crate::models::Researcher,
            crate::models::AuthorIdentity,
            crate::models::AuthorSearchHit,
            crate::models::ConflictKind,
            crate::models::MatchRule,
            crate::models::FuzzyPolicy,
            crate::models::Resolution,
            crate::models::ResolveOutcome,
            crate::models::CreateAuthorOutcome,
            // Publications
            crate::models::PublicationAuthorInput,
            crate::models::ResolvedPublicationAuthor,
            crate::models::PublicationAuthorLink,
            crate::models::publication::PublicationAuthorsRequest,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "authors", description = "Author search, creation and resolution"),
        (name = "publications", description = "Publication author lists")
    )
)]
pub struct ApiDoc;

/// Create OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
