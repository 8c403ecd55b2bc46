//! Resolved author identities and the outcomes reported back to callers

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    author::{Author, AuthorWithCount},
    researcher::Researcher,
};

/// Who a candidate turned out to be
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthorIdentity {
    Researcher(Researcher),
    Author(Author),
}

/// One autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthorSearchHit {
    Researcher(Researcher),
    Author(AuthorWithCount),
}

/// Field that produced an exact match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Orcid,
    Email,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::Orcid => write!(f, "ORCID"),
            ConflictKind::Email => write!(f, "email"),
        }
    }
}

/// Rule of the resolution precedence chain that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Explicit `author_id` reference
    AuthorId,
    /// Explicit `researcher_id` reference
    ResearcherId,
    Orcid,
    Email,
    /// Fuzzy name + affiliation match
    NameAffiliation,
    /// Nothing matched; a new standalone author was created
    NewAuthor,
}

impl From<ConflictKind> for MatchRule {
    fn from(kind: ConflictKind) -> Self {
        match kind {
            ConflictKind::Orcid => MatchRule::Orcid,
            ConflictKind::Email => MatchRule::Email,
        }
    }
}

/// How a fuzzy name + affiliation match is treated by `resolve`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyPolicy {
    /// Reuse the matched author (curated author lists)
    Accept,
    /// Write nothing and hand the match back for a human to confirm
    #[default]
    Advise,
}

/// Result of resolving one candidate to a concrete `authors` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Resolution {
    pub author: Author,
    /// Present when the identity is a platform researcher
    pub researcher: Option<Researcher>,
    pub matched_by: MatchRule,
    /// A new `authors` row was inserted (or an existing one promoted)
    pub created: bool,
    pub explanation: String,
}

impl Resolution {
    pub fn new(author: Author, researcher: Option<Researcher>, matched_by: MatchRule, created: bool) -> Self {
        let mut resolution = Self {
            author,
            researcher,
            matched_by,
            created,
            explanation: String::new(),
        };
        resolution.explanation = resolution.describe();
        resolution
    }

    pub fn author_id(&self) -> i32 {
        self.author.id
    }

    pub fn identity(&self) -> AuthorIdentity {
        match self.researcher {
            Some(ref researcher) => AuthorIdentity::Researcher(researcher.clone()),
            None => AuthorIdentity::Author(self.author.clone()),
        }
    }

    fn describe(&self) -> String {
        let who = match self.researcher {
            Some(ref r) => format!("researcher \"{}\"", r.name),
            None => format!("author \"{}\" (id {})", self.author.name, self.author.id),
        };
        let base = match self.matched_by {
            MatchRule::AuthorId => format!("Using the selected {}.", who),
            MatchRule::ResearcherId if self.created => {
                format!("Created an author record for {}.", who)
            }
            MatchRule::ResearcherId => format!("Using the author record of {}.", who),
            MatchRule::Orcid | MatchRule::Email => {
                let field = if self.matched_by == MatchRule::Orcid { "ORCID" } else { "email" };
                if self.created {
                    format!("The {} matches {}; created its author record.", field, who)
                } else {
                    format!("The {} matches existing {}.", field, who)
                }
            }
            MatchRule::NameAffiliation => {
                format!("Name and affiliation match existing {}.", who)
            }
            MatchRule::NewAuthor => format!("Created new {}.", who),
        }
    }
}

/// Outcome of `resolve`.
///
/// `PotentialDuplicate` leaves the store untouched: the caller has to
/// confirm the suggestion or create a new author explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveOutcome {
    Resolved(Resolution),
    PotentialDuplicate {
        suggestion: Author,
        explanation: String,
    },
}

impl ResolveOutcome {
    pub fn potential_duplicate(suggestion: Author) -> Self {
        let explanation = format!(
            "Did you mean \"{}\" (id {})? Name and affiliation match an existing author; nothing was created.",
            suggestion.name, suggestion.id
        );
        ResolveOutcome::PotentialDuplicate {
            suggestion,
            explanation,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolveOutcome::Resolved(_))
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        match self {
            ResolveOutcome::Resolved(resolution) => Some(resolution),
            ResolveOutcome::PotentialDuplicate { .. } => None,
        }
    }
}

/// Outcome of the explicit "create new author" flow.
///
/// Only `Created` writes anything; the other variants tell the caller
/// which existing identity to use instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateAuthorOutcome {
    Created {
        author: Author,
    },
    DuplicateConflict {
        kind: ConflictKind,
        existing: Author,
    },
    AlreadyResearcher {
        kind: ConflictKind,
        researcher: Researcher,
    },
    PotentialDuplicate {
        suggestion: Author,
    },
}

impl CreateAuthorOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateAuthorOutcome::Created { .. })
    }

    /// Guidance shown to the admin
    pub fn message(&self) -> String {
        match self {
            CreateAuthorOutcome::Created { author } => {
                format!("Author \"{}\" created.", author.name)
            }
            CreateAuthorOutcome::DuplicateConflict { kind, existing } => format!(
                "An author with this {} already exists: \"{}\" (id {}). Use the existing author instead.",
                kind, existing.name, existing.id
            ),
            CreateAuthorOutcome::AlreadyResearcher { kind, researcher } => format!(
                "This {} belongs to researcher \"{}\". Select the researcher instead of creating an author.",
                kind, researcher.name
            ),
            CreateAuthorOutcome::PotentialDuplicate { suggestion } => format!(
                "Did you mean \"{}\"{}? An author with a similar name and affiliation already exists (id {}).",
                suggestion.name,
                suggestion
                    .affiliation
                    .as_ref()
                    .map(|a| format!(" ({})", a))
                    .unwrap_or_default(),
                suggestion.id
            ),
        }
    }
}
