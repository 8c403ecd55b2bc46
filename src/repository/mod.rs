//! Repository layer for author storage.
//!
//! The resolution service talks to the store through [`AuthorStore`] and
//! the transactional [`AuthorTx`]. `authors` holds the PostgreSQL
//! implementation, `memory` an in-process one.

pub mod authors;
pub mod memory;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Author, AuthorWithCount, NewAuthor, PublicationAuthorLink, Researcher},
};

pub use authors::AuthorsRepository;
pub use memory::MemoryAuthorStore;

/// Result of an `authors` insert
#[derive(Debug, Clone, PartialEq)]
pub enum InsertResult {
    Inserted(Author),
    /// A unique constraint (named) rejected the row; the transaction is still usable
    UniqueViolation(String),
}

/// Entry point to the author store
#[async_trait]
pub trait AuthorStore: Send + Sync {
    /// Start a transaction. Dropping it without `commit` rolls back.
    async fn begin(&self) -> AppResult<Box<dyn AuthorTx>>;

    async fn get_author(&self, id: i32) -> AppResult<Option<Author>>;

    /// Active researchers whose name, email, affiliation or ORCID contains `term`
    async fn search_researchers(&self, term: &str, limit: i64) -> AppResult<Vec<Researcher>>;

    /// Authors whose name, email, affiliation or ORCID contains `term`
    async fn search_authors(&self, term: &str, limit: i64) -> AppResult<Vec<AuthorWithCount>>;

    async fn ping(&self) -> AppResult<()>;
}

/// Reads and writes performed inside one store transaction
#[async_trait]
pub trait AuthorTx: Send {
    async fn author_by_id(&mut self, id: i32) -> AppResult<Option<Author>>;

    async fn author_by_researcher(&mut self, researcher_id: i32) -> AppResult<Option<Author>>;

    async fn author_by_orcid(&mut self, orcid: &str) -> AppResult<Option<Author>>;

    /// Case-insensitive email lookup
    async fn author_by_email(&mut self, email: &str) -> AppResult<Option<Author>>;

    /// Authors whose name contains every token and whose affiliation contains `affiliation`
    async fn authors_by_name_affiliation(
        &mut self,
        tokens: &[String],
        affiliation: &str,
    ) -> AppResult<Vec<Author>>;

    async fn researcher_by_id(&mut self, id: i32) -> AppResult<Option<Researcher>>;

    async fn researcher_by_orcid(&mut self, orcid: &str) -> AppResult<Option<Researcher>>;

    async fn researcher_by_email(&mut self, email: &str) -> AppResult<Option<Researcher>>;

    async fn insert_author(&mut self, author: &NewAuthor) -> AppResult<InsertResult>;

    /// Set `researcher_id` on an author that has none yet.
    /// Returns `None` when the author is already linked or another author holds the researcher.
    async fn promote_author(&mut self, author_id: i32, researcher_id: i32) -> AppResult<Option<Author>>;

    async fn publication_exists(&mut self, publication_id: i32) -> AppResult<bool>;

    /// Replace every link of a publication
    async fn replace_publication_authors(
        &mut self,
        publication_id: i32,
        links: &[PublicationAuthorLink],
    ) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
