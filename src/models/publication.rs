//! Publication ↔ author links

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{author::AuthorCandidate, identity::MatchRule};

/// One entry of a publication's submitted author list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PublicationAuthorInput {
    pub author: AuthorCandidate,
    /// Zero-based position in the author list
    pub order: i32,
    #[serde(default)]
    pub contribution: Option<String>,
    #[serde(default)]
    pub is_corresponding: bool,
}

impl PublicationAuthorInput {
    pub fn new(author: AuthorCandidate, order: i32) -> Self {
        Self {
            author,
            order,
            contribution: None,
            is_corresponding: false,
        }
    }
}

/// Candidate resolved to a concrete `authors` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedPublicationAuthor {
    pub author_id: i32,
    pub order: i32,
    pub contribution: Option<String>,
    pub is_corresponding: bool,
    pub matched_by: MatchRule,
    pub created: bool,
    pub candidate: AuthorCandidate,
}

/// Row of the `publication_authors` junction table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PublicationAuthorLink {
    pub publication_id: i32,
    pub author_id: i32,
    pub position: i32,
    pub contribution: Option<String>,
    pub is_corresponding: bool,
}

impl PublicationAuthorLink {
    pub fn from_resolved(publication_id: i32, resolved: &ResolvedPublicationAuthor) -> Self {
        Self {
            publication_id,
            author_id: resolved.author_id,
            position: resolved.order,
            contribution: resolved.contribution.clone(),
            is_corresponding: resolved.is_corresponding,
        }
    }
}

/// Body of `PUT /publications/{id}/authors` and `POST /publications/authors/resolve`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PublicationAuthorsRequest {
    pub authors: Vec<PublicationAuthorInput>,
}
