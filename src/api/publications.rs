//! Publication author list endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        publication::PublicationAuthorsRequest, PublicationAuthorLink, ResolvedPublicationAuthor,
    },
    AppState,
};

/// Resolve a publication's author list without attaching it
#[utoipa::path(
    post,
    path = "/publications/authors/resolve",
    tag = "publications",
    request_body = PublicationAuthorsRequest,
    responses(
        (status = 200, description = "Every author resolved", body = Vec<ResolvedPublicationAuthor>),
        (status = 400, description = "Invalid order values or candidates"),
        (status = 404, description = "Referenced author or researcher not found")
    )
)]
pub async fn resolve_publication_authors(
    State(state): State<AppState>,
    Json(request): Json<PublicationAuthorsRequest>,
) -> AppResult<Json<Vec<ResolvedPublicationAuthor>>> {
    let resolved = state
        .services
        .authors
        .resolve_for_publication(&request.authors)
        .await?;
    Ok(Json(resolved))
}

/// Replace the author list of a publication
#[utoipa::path(
    put,
    path = "/publications/{id}/authors",
    tag = "publications",
    params(
        ("id" = i32, Path, description = "Publication ID")
    ),
    request_body = PublicationAuthorsRequest,
    responses(
        (status = 200, description = "Links stored", body = Vec<PublicationAuthorLink>),
        (status = 400, description = "Invalid order values or candidates"),
        (status = 404, description = "Publication, author or researcher not found")
    )
)]
pub async fn set_publication_authors(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<PublicationAuthorsRequest>,
) -> AppResult<Json<Vec<PublicationAuthorLink>>> {
    let links = state
        .services
        .publications
        .set_authors(id, &request.authors)
        .await?;
    Ok(Json(links))
}
