//! Researcher profile (a `researchers` row joined to its `users` row)

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Platform researcher. Read-only from the author registry's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Researcher {
    /// `researchers.id`
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub affiliation: Option<String>,
    pub orcid: Option<String>,
    pub avatar_url: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub featured: bool,
}
