//! In-process author store.
//!
//! Mirrors the PostgreSQL constraints (unique ORCID, email and researcher
//! link) so the resolution service behaves identically on top of it. Writes
//! are visible to other transactions immediately and undone on rollback;
//! every transactional call yields to the scheduler first so concurrent
//! resolutions interleave the way independent connections do.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::{AuthorStore, AuthorTx, InsertResult};
use crate::{
    error::AppResult,
    models::{
        author::fuzzy_matches, Author, AuthorWithCount, NewAuthor, PublicationAuthorLink,
        Researcher,
    },
};

#[derive(Default)]
struct State {
    next_author_id: i32,
    authors: Vec<Author>,
    researchers: Vec<Researcher>,
    /// Researchers whose profile is deactivated; hidden like `NOT r.active`
    inactive: BTreeSet<i32>,
    publications: BTreeSet<i32>,
    links: Vec<PublicationAuthorLink>,
    /// Row committed by a "competing" writer right before the next insert
    pending_race: Option<NewAuthor>,
}

impl State {
    fn violated_constraint(&self, candidate: &NewAuthor) -> Option<&'static str> {
        for existing in &self.authors {
            if candidate.orcid.is_some() && existing.orcid == candidate.orcid {
                return Some("authors_orcid_key");
            }
            if let (Some(a), Some(b)) = (&existing.email, &candidate.email) {
                if a.to_lowercase() == b.to_lowercase() {
                    return Some("authors_email_key");
                }
            }
            if candidate.researcher_id.is_some() && existing.researcher_id == candidate.researcher_id {
                return Some("authors_researcher_id_key");
            }
        }
        None
    }

    fn push_author(&mut self, new: &NewAuthor) -> Author {
        self.next_author_id += 1;
        let now = Utc::now();
        let author = Author {
            id: self.next_author_id,
            name: new.name.clone(),
            email: new.email.clone(),
            affiliation: new.affiliation.clone(),
            orcid: new.orcid.clone(),
            researcher_id: new.researcher_id,
            created_at: now,
            updated_at: now,
        };
        self.authors.push(author.clone());
        author
    }

    fn active_researchers(&self) -> impl Iterator<Item = &Researcher> {
        self.researchers
            .iter()
            .filter(|r| !self.inactive.contains(&r.id))
    }

    fn publication_count(&self, author_id: i32) -> i64 {
        self.links.iter().filter(|l| l.author_id == author_id).count() as i64
    }
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.map_or(false, |f| f.to_lowercase().contains(needle))
}

/// Shared in-memory store; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryAuthorStore {
    state: Arc<Mutex<State>>,
}

impl MemoryAuthorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a researcher profile (the account subsystem owns these)
    pub fn add_researcher(&self, researcher: Researcher) {
        self.lock().researchers.push(researcher);
    }

    /// Hide a researcher from lookups and search, as `researchers.active = false` does
    pub fn deactivate_researcher(&self, researcher_id: i32) {
        self.lock().inactive.insert(researcher_id);
    }

    pub fn add_publication(&self, publication_id: i32) {
        self.lock().publications.insert(publication_id);
    }

    /// Insert an author directly, bypassing resolution
    pub fn seed_author(&self, author: NewAuthor) -> Author {
        self.lock().push_author(&author)
    }

    /// Make `author` appear, as if committed by another writer, just before
    /// the next insert attempt.
    pub fn race_next_insert(&self, author: NewAuthor) {
        self.lock().pending_race = Some(author);
    }

    pub fn authors(&self) -> Vec<Author> {
        self.lock().authors.clone()
    }

    pub fn publication_links(&self, publication_id: i32) -> Vec<PublicationAuthorLink> {
        let state = self.lock();
        let mut links: Vec<_> = state
            .links
            .iter()
            .filter(|l| l.publication_id == publication_id)
            .cloned()
            .collect();
        links.sort_by_key(|l| l.position);
        links
    }

    /// Link an author to a publication outside of any resolution
    pub fn seed_link(&self, link: PublicationAuthorLink) {
        self.lock().links.push(link);
    }
}

#[async_trait]
impl AuthorStore for MemoryAuthorStore {
    async fn begin(&self) -> AppResult<Box<dyn AuthorTx>> {
        Ok(Box::new(MemoryTx {
            store: self.clone(),
            undo: Vec::new(),
            committed: false,
        }))
    }

    async fn get_author(&self, id: i32) -> AppResult<Option<Author>> {
        Ok(self.lock().authors.iter().find(|a| a.id == id).cloned())
    }

    async fn search_researchers(&self, term: &str, limit: i64) -> AppResult<Vec<Researcher>> {
        let needle = term.to_lowercase();
        let state = self.lock();
        Ok(state
            .active_researchers()
            .filter(|r| {
                r.name.to_lowercase().contains(&needle)
                    || r.email.to_lowercase().contains(&needle)
                    || contains_ci(r.affiliation.as_deref(), &needle)
                    || contains_ci(r.orcid.as_deref(), &needle)
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn search_authors(&self, term: &str, limit: i64) -> AppResult<Vec<AuthorWithCount>> {
        let needle = term.to_lowercase();
        let state = self.lock();
        Ok(state
            .authors
            .iter()
            .filter(|a| {
                a.name.to_lowercase().contains(&needle)
                    || contains_ci(a.email.as_deref(), &needle)
                    || contains_ci(a.affiliation.as_deref(), &needle)
                    || contains_ci(a.orcid.as_deref(), &needle)
            })
            .take(limit.max(0) as usize)
            .map(|a| AuthorWithCount::new(a, state.publication_count(a.id)))
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

enum Undo {
    Inserted(i32),
    Promoted(i32),
    Links {
        publication_id: i32,
        previous: Vec<PublicationAuthorLink>,
    },
}

struct MemoryTx {
    store: MemoryAuthorStore,
    undo: Vec<Undo>,
    committed: bool,
}

impl MemoryTx {
    fn find_author(&self, pred: impl Fn(&Author) -> bool) -> Option<Author> {
        self.store.lock().authors.iter().find(|a| pred(a)).cloned()
    }

    fn find_researcher(&self, pred: impl Fn(&Researcher) -> bool) -> Option<Researcher> {
        self.store.lock().active_researchers().find(|r| pred(r)).cloned()
    }

    fn try_insert(&mut self, author: &NewAuthor) -> InsertResult {
        let mut state = self.store.lock();
        if let Some(competing) = state.pending_race.take() {
            if state.violated_constraint(&competing).is_none() {
                state.push_author(&competing);
            }
        }
        if let Some(constraint) = state.violated_constraint(author) {
            return InsertResult::UniqueViolation(constraint.to_string());
        }
        let row = state.push_author(author);
        drop(state);
        self.undo.push(Undo::Inserted(row.id));
        InsertResult::Inserted(row)
    }

    fn try_promote(&mut self, author_id: i32, researcher_id: i32) -> Option<Author> {
        let mut state = self.store.lock();
        if state
            .authors
            .iter()
            .any(|a| a.id != author_id && a.researcher_id == Some(researcher_id))
        {
            return None;
        }
        let author = state
            .authors
            .iter_mut()
            .find(|a| a.id == author_id && a.researcher_id.is_none())?;
        author.researcher_id = Some(researcher_id);
        author.updated_at = Utc::now();
        let promoted = author.clone();
        drop(state);
        self.undo.push(Undo::Promoted(author_id));
        Some(promoted)
    }

    fn swap_links(&mut self, publication_id: i32, links: &[PublicationAuthorLink]) {
        let mut state = self.store.lock();
        let (previous, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.links)
            .into_iter()
            .partition(|l| l.publication_id == publication_id);
        state.links = kept;
        state.links.extend(links.iter().map(|l| PublicationAuthorLink {
            publication_id,
            ..l.clone()
        }));
        drop(state);
        self.undo.push(Undo::Links {
            publication_id,
            previous,
        });
    }
}

#[async_trait]
impl AuthorTx for MemoryTx {
    async fn author_by_id(&mut self, id: i32) -> AppResult<Option<Author>> {
        tokio::task::yield_now().await;
        Ok(self.find_author(|a| a.id == id))
    }

    async fn author_by_researcher(&mut self, researcher_id: i32) -> AppResult<Option<Author>> {
        tokio::task::yield_now().await;
        Ok(self.find_author(|a| a.researcher_id == Some(researcher_id)))
    }

    async fn author_by_orcid(&mut self, orcid: &str) -> AppResult<Option<Author>> {
        tokio::task::yield_now().await;
        Ok(self.find_author(|a| a.orcid.as_deref() == Some(orcid)))
    }

    async fn author_by_email(&mut self, email: &str) -> AppResult<Option<Author>> {
        tokio::task::yield_now().await;
        let email = email.to_lowercase();
        Ok(self.find_author(|a| a.email.as_deref().map_or(false, |e| e.to_lowercase() == email)))
    }

    async fn authors_by_name_affiliation(
        &mut self,
        tokens: &[String],
        affiliation: &str,
    ) -> AppResult<Vec<Author>> {
        tokio::task::yield_now().await;
        Ok(self
            .store
            .lock()
            .authors
            .iter()
            .filter(|a| fuzzy_matches(a, tokens, affiliation))
            .cloned()
            .collect())
    }

    async fn researcher_by_id(&mut self, id: i32) -> AppResult<Option<Researcher>> {
        tokio::task::yield_now().await;
        Ok(self.find_researcher(|r| r.id == id))
    }

    async fn researcher_by_orcid(&mut self, orcid: &str) -> AppResult<Option<Researcher>> {
        tokio::task::yield_now().await;
        Ok(self.find_researcher(|r| r.orcid.as_deref() == Some(orcid)))
    }

    async fn researcher_by_email(&mut self, email: &str) -> AppResult<Option<Researcher>> {
        tokio::task::yield_now().await;
        let email = email.to_lowercase();
        Ok(self.find_researcher(|r| r.email.to_lowercase() == email))
    }

    async fn insert_author(&mut self, author: &NewAuthor) -> AppResult<InsertResult> {
        tokio::task::yield_now().await;
        Ok(self.try_insert(author))
    }

    async fn promote_author(&mut self, author_id: i32, researcher_id: i32) -> AppResult<Option<Author>> {
        tokio::task::yield_now().await;
        Ok(self.try_promote(author_id, researcher_id))
    }

    async fn publication_exists(&mut self, publication_id: i32) -> AppResult<bool> {
        tokio::task::yield_now().await;
        Ok(self.store.lock().publications.contains(&publication_id))
    }

    async fn replace_publication_authors(
        &mut self,
        publication_id: i32,
        links: &[PublicationAuthorLink],
    ) -> AppResult<()> {
        tokio::task::yield_now().await;
        self.swap_links(publication_id, links);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        self.committed = true;
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if self.committed || self.undo.is_empty() {
            return;
        }
        let mut state = self.store.lock();
        for entry in self.undo.drain(..).rev() {
            match entry {
                Undo::Inserted(id) => state.authors.retain(|a| a.id != id),
                Undo::Promoted(id) => {
                    if let Some(author) = state.authors.iter_mut().find(|a| a.id == id) {
                        author.researcher_id = None;
                    }
                }
                Undo::Links {
                    publication_id,
                    previous,
                } => {
                    state.links.retain(|l| l.publication_id != publication_id);
                    state.links.extend(previous);
                }
            }
        }
    }
}
