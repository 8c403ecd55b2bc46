//! Standalone author model and candidate normalisation

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppResult;
use crate::models::researcher::Researcher;

/// Bare ORCID iD: four groups of four, last character may be the `X` checksum.
pub static ORCID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").expect("valid ORCID regex"));

const ORCID_URL_PREFIXES: [&str; 4] = [
    "https://orcid.org/",
    "http://orcid.org/",
    "orcid.org/",
    "orcid:",
];

/// Author row from the `authors` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub affiliation: Option<String>,
    pub orcid: Option<String>,
    /// Set once the author is promoted to a platform researcher
    pub researcher_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author row annotated with the number of publications crediting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuthorWithCount {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub affiliation: Option<String>,
    pub orcid: Option<String>,
    pub researcher_id: Option<i32>,
    pub publication_count: i64,
}

impl AuthorWithCount {
    pub fn new(author: &Author, publication_count: i64) -> Self {
        Self {
            id: author.id,
            name: author.name.clone(),
            email: author.email.clone(),
            affiliation: author.affiliation.clone(),
            orcid: author.orcid.clone(),
            researcher_id: author.researcher_id,
            publication_count,
        }
    }
}

/// Insert payload for a new `authors` row
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuthor {
    pub name: String,
    pub email: Option<String>,
    pub affiliation: Option<String>,
    pub orcid: Option<String>,
    pub researcher_id: Option<i32>,
}

impl NewAuthor {
    /// Standalone author built from an already normalised candidate
    pub fn standalone(candidate: &AuthorCandidate) -> Self {
        Self {
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            affiliation: candidate.affiliation.clone(),
            orcid: candidate.orcid.clone(),
            researcher_id: None,
        }
    }

    /// Author row that mirrors a researcher profile
    pub fn for_researcher(researcher: &Researcher) -> Self {
        Self {
            name: clean(Some(&researcher.name)).unwrap_or_else(|| researcher.name.clone()),
            email: normalize_email(Some(&researcher.email)),
            affiliation: clean(researcher.affiliation.as_deref()),
            orcid: researcher.orcid.as_deref().and_then(|o| normalize_orcid(Some(o))),
            researcher_id: Some(researcher.id),
        }
    }
}

/// Raw author description coming from a submission form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct AuthorCandidate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub affiliation: Option<String>,
    #[serde(default)]
    #[validate(regex(path = *ORCID_REGEX))]
    pub orcid: Option<String>,
    /// Caller already knows the candidate is this researcher
    #[serde(default)]
    pub researcher_id: Option<i32>,
    /// Caller already knows the exact author row
    #[serde(default)]
    pub author_id: Option<i32>,
}

impl AuthorCandidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_orcid(mut self, orcid: impl Into<String>) -> Self {
        self.orcid = Some(orcid.into());
        self
    }

    pub fn with_researcher(mut self, researcher_id: i32) -> Self {
        self.researcher_id = Some(researcher_id);
        self
    }

    pub fn with_author(mut self, author_id: i32) -> Self {
        self.author_id = Some(author_id);
        self
    }

    /// Trim every field, drop empty strings, canonicalise email and ORCID,
    /// then validate the result.
    pub fn normalized(&self) -> AppResult<AuthorCandidate> {
        let candidate = AuthorCandidate {
            name: self.name.trim().to_string(),
            email: normalize_email(self.email.as_deref()),
            affiliation: clean(self.affiliation.as_deref()),
            orcid: normalize_orcid(self.orcid.as_deref()),
            researcher_id: self.researcher_id,
            author_id: self.author_id,
        };
        candidate.validate()?;
        Ok(candidate)
    }
}

/// Trimmed text, with blank values treated as absent
pub fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn normalize_email(value: Option<&str>) -> Option<String> {
    clean(value).map(|e| e.to_lowercase())
}

/// Strip URL forms down to the bare iD and upper-case the check character.
pub fn normalize_orcid(value: Option<&str>) -> Option<String> {
    let raw = clean(value)?;
    let lower = raw.to_lowercase();
    let bare = ORCID_URL_PREFIXES
        .iter()
        .find(|prefix| lower.starts_with(*prefix))
        .and_then(|prefix| raw.get(prefix.len()..))
        .unwrap_or(&raw);
    clean(Some(bare)).map(|o| o.to_uppercase())
}

/// Lower-cased name tokens used by the fuzzy name match.
///
/// Punctuation separates tokens, so "J. Smith" yields `["j", "smith"]`,
/// and each token must occur somewhere in a stored name.
pub fn name_tokens(name: &str) -> Vec<String> {
    name.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|t| t.trim_matches(|c| c == '-' || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Case-insensitive, token-wise substring match on name and affiliation.
pub fn fuzzy_matches(author: &Author, tokens: &[String], affiliation: &str) -> bool {
    if tokens.is_empty() {
        return false;
    }
    let Some(ref stored_affiliation) = author.affiliation else {
        return false;
    };
    let name = author.name.to_lowercase();
    tokens.iter().all(|t| name.contains(t.as_str()))
        && stored_affiliation
            .to_lowercase()
            .contains(&affiliation.to_lowercase())
}
