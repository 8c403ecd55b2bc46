//! Data models for the author registry

pub mod author;
pub mod identity;
pub mod publication;
pub mod researcher;

// Re-export commonly used types
pub use author::{Author, AuthorCandidate, AuthorWithCount, NewAuthor};
pub use identity::{
    AuthorIdentity, AuthorSearchHit, ConflictKind, CreateAuthorOutcome, FuzzyPolicy, MatchRule,
    Resolution, ResolveOutcome,
};
pub use publication::{PublicationAuthorInput, PublicationAuthorLink, ResolvedPublicationAuthor};
pub use researcher::Researcher;
