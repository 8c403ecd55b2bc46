//! Author endpoints: autocomplete, explicit creation, resolution

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        Author, AuthorCandidate, AuthorSearchHit, CreateAuthorOutcome, FuzzyPolicy, ResolveOutcome,
    },
    AppState,
};

const DEFAULT_SEARCH_LIMIT: i64 = 10;
const MAX_SEARCH_LIMIT: i64 = 50;

/// Query parameters for author search
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AuthorSearchQuery {
    /// Text matched against name, email, affiliation and ORCID
    pub q: Option<String>,
    /// Total number of hits, split evenly between researchers and authors (default: 10)
    pub limit: Option<i64>,
}

/// Response of the "create author" dialog
#[derive(Serialize, ToSchema)]
pub struct CreateAuthorResponse {
    pub outcome: CreateAuthorOutcome,
    /// Human-readable guidance
    pub message: String,
}

/// Body of `POST /authors/resolve`
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveAuthorRequest {
    pub candidate: AuthorCandidate,
    /// Reuse an author found only by name and affiliation instead of
    /// returning it as a suggestion
    #[serde(default)]
    pub accept_fuzzy: bool,
}

/// Search researchers and standalone authors for autocomplete
#[utoipa::path(
    get,
    path = "/authors/search",
    tag = "authors",
    params(AuthorSearchQuery),
    responses(
        (status = 200, description = "Matching researchers and authors", body = Vec<AuthorSearchHit>)
    )
)]
pub async fn search_authors(
    State(state): State<AppState>,
    Query(query): Query<AuthorSearchQuery>,
) -> AppResult<Json<Vec<AuthorSearchHit>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(0, MAX_SEARCH_LIMIT);
    let term = query.q.unwrap_or_default();

    let hits = state.services.authors.search_candidates(&term, limit).await?;
    Ok(Json(hits))
}

/// Create a standalone author unless it duplicates an existing identity
#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    request_body = AuthorCandidate,
    responses(
        (status = 201, description = "Author created", body = CreateAuthorResponse),
        (status = 409, description = "Existing identity found; nothing created", body = CreateAuthorResponse),
        (status = 400, description = "Invalid candidate")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    Json(candidate): Json<AuthorCandidate>,
) -> AppResult<(StatusCode, Json<CreateAuthorResponse>)> {
    let outcome = state.services.authors.create_author(&candidate).await?;

    let status = if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    };
    let message = outcome.message();

    Ok((status, Json(CreateAuthorResponse { outcome, message })))
}

/// Get author details by ID
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author details", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Author>> {
    let author = state.services.authors.get_author(id).await?;
    Ok(Json(author))
}

/// Resolve one candidate to an author row, creating it when nothing matches
#[utoipa::path(
    post,
    path = "/authors/resolve",
    tag = "authors",
    request_body = ResolveAuthorRequest,
    responses(
        (status = 200, description = "Resolved identity", body = ResolveOutcome),
        (status = 409, description = "Possible duplicate; nothing created", body = ResolveOutcome),
        (status = 400, description = "Invalid candidate"),
        (status = 404, description = "Referenced author or researcher not found")
    )
)]
pub async fn resolve_author(
    State(state): State<AppState>,
    Json(request): Json<ResolveAuthorRequest>,
) -> AppResult<(StatusCode, Json<ResolveOutcome>)> {
    let policy = if request.accept_fuzzy {
        FuzzyPolicy::Accept
    } else {
        FuzzyPolicy::Advise
    };

    let outcome = state
        .services
        .authors
        .resolve(&request.candidate, policy)
        .await?;

    let status = if outcome.is_resolved() {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };

    Ok((status, Json(outcome)))
}
