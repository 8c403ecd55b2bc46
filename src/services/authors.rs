//! Author identity resolution.
//!
//! Every call site that needs to turn a submitted author description into
//! an `authors` row goes through [`AuthorService`]. Matching precedence:
//!
//! 1. explicit `author_id`
//! 2. explicit `researcher_id` (creating the researcher's author row if needed)
//! 3. ORCID, against authors then researchers
//! 4. email, against authors then researchers
//! 5. name tokens + affiliation (fuzzy; unless the caller accepts it, the
//!    match is returned for confirmation and nothing is written)
//! 6. new standalone author
//!
//! Inserts that lose a race against a concurrent writer are answered by
//! re-reading the winning row (researcher link, then ORCID, then email).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::name_tokens, Author, AuthorCandidate, AuthorSearchHit, ConflictKind,
        CreateAuthorOutcome, FuzzyPolicy, MatchRule, NewAuthor, PublicationAuthorInput,
        Researcher, Resolution, ResolveOutcome, ResolvedPublicationAuthor,
    },
    repository::{AuthorStore, AuthorTx, InsertResult},
    services::cache::SearchCache,
};

/// First rule of the precedence chain (steps 3-5) that matched
enum Match {
    Author(Author, ConflictKind),
    Researcher(Researcher, ConflictKind),
    Fuzzy(Author),
    None,
}

#[derive(Clone)]
pub struct AuthorService {
    store: Arc<dyn AuthorStore>,
    cache: SearchCache,
}

impl AuthorService {
    pub fn new(store: Arc<dyn AuthorStore>, cache: SearchCache) -> Self {
        Self { store, cache }
    }

    /// Get an author row by id
    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.store
            .get_author(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// Map a candidate to exactly one author row, creating it only when
    /// nothing matches.
    pub async fn resolve(
        &self,
        candidate: &AuthorCandidate,
        fuzzy: FuzzyPolicy,
    ) -> AppResult<ResolveOutcome> {
        let candidate = candidate.normalized()?;

        let mut tx = self.store.begin().await?;
        let outcome = self.resolve_in(&mut *tx, &candidate, fuzzy).await?;
        tx.commit().await?;

        match outcome {
            ResolveOutcome::Resolved(ref resolution) => {
                if resolution.created {
                    self.cache.invalidate();
                }
                tracing::debug!(
                    author_id = resolution.author_id(),
                    matched_by = ?resolution.matched_by,
                    created = resolution.created,
                    "Resolved author candidate \"{}\"",
                    candidate.name
                );
            }
            ResolveOutcome::PotentialDuplicate { ref suggestion, .. } => {
                tracing::info!(
                    "Author candidate \"{}\" may be author id={}; awaiting confirmation",
                    candidate.name,
                    suggestion.id
                );
            }
        }

        Ok(outcome)
    }

    /// Explicit "create new author" flow: refuses to create anything that
    /// matches an existing identity and says why.
    pub async fn create_author(&self, candidate: &AuthorCandidate) -> AppResult<CreateAuthorOutcome> {
        let candidate = candidate.normalized()?;

        let mut tx = self.store.begin().await?;
        let outcome = match Self::find_match(&mut *tx, &candidate).await? {
            Match::Author(existing, kind) => CreateAuthorOutcome::DuplicateConflict { kind, existing },
            Match::Researcher(researcher, kind) => {
                CreateAuthorOutcome::AlreadyResearcher { kind, researcher }
            }
            Match::Fuzzy(suggestion) => CreateAuthorOutcome::PotentialDuplicate { suggestion },
            Match::None => {
                let new = NewAuthor::standalone(&candidate);
                match tx.insert_author(&new).await? {
                    InsertResult::Inserted(author) => CreateAuthorOutcome::Created { author },
                    InsertResult::UniqueViolation(constraint) => {
                        let existing = Self::refetch_after_conflict(&mut *tx, &new, &constraint).await?;
                        CreateAuthorOutcome::DuplicateConflict {
                            kind: conflict_kind(&existing, &new),
                            existing,
                        }
                    }
                }
            }
        };
        tx.commit().await?;

        match outcome {
            CreateAuthorOutcome::Created { ref author } => {
                self.cache.invalidate();
                tracing::info!("Created author id={} \"{}\"", author.id, author.name);
            }
            ref refused => {
                tracing::info!("Author creation refused for \"{}\": {}", candidate.name, refused.message());
            }
        }

        Ok(outcome)
    }

    /// Autocomplete: half of `limit` researchers, half standalone authors.
    /// Results from the two groups are not deduplicated against each other.
    pub async fn search_candidates(&self, query: &str, limit: i64) -> AppResult<Vec<AuthorSearchHit>> {
        let term = query.trim();
        let per_group = limit.max(0) / 2;
        if term.is_empty() || per_group == 0 {
            return Ok(Vec::new());
        }

        if let Some(hits) = self.cache.get(term, limit).await {
            return Ok(hits.as_ref().clone());
        }

        let (researchers, authors) = tokio::try_join!(
            self.store.search_researchers(term, per_group),
            self.store.search_authors(term, per_group),
        )?;

        let hits: Vec<AuthorSearchHit> = researchers
            .into_iter()
            .map(AuthorSearchHit::Researcher)
            .chain(authors.into_iter().map(AuthorSearchHit::Author))
            .collect();

        self.cache.insert(term, limit, Arc::new(hits.clone())).await;
        Ok(hits)
    }

    /// Resolve a curated publication author list in one transaction.
    /// Either every candidate resolves or nothing is written.
    pub async fn resolve_for_publication(
        &self,
        inputs: &[PublicationAuthorInput],
    ) -> AppResult<Vec<ResolvedPublicationAuthor>> {
        let prepared = Self::prepare_batch(inputs)?;

        let mut tx = self.store.begin().await?;
        let resolved = self.resolve_batch_in(&mut *tx, &prepared).await?;
        tx.commit().await?;

        if resolved.iter().any(|r| r.created) {
            self.cache.invalidate();
        }

        Ok(resolved)
    }

    pub fn invalidate_search_cache(&self) {
        self.cache.invalidate();
    }

    /// Check order values and normalise every candidate before the store is touched.
    pub(crate) fn prepare_batch(inputs: &[PublicationAuthorInput]) -> AppResult<Vec<PublicationAuthorInput>> {
        if inputs.is_empty() {
            return Err(AppError::Validation(
                "At least one author is required".to_string(),
            ));
        }

        let orders: BTreeSet<i32> = inputs.iter().map(|i| i.order).collect();
        if orders.len() != inputs.len() {
            return Err(AppError::Validation("Author order values must be unique".to_string()));
        }
        let contiguous = orders.iter().copied().eq(0..inputs.len() as i32);
        if !contiguous {
            return Err(AppError::Validation(
                "Author order values must be contiguous from 0".to_string(),
            ));
        }

        let mut prepared = inputs
            .iter()
            .map(|input| {
                let author = input.author.normalized().map_err(|e| match e {
                    AppError::Validation(msg) => {
                        AppError::Validation(format!("Author at order {}: {}", input.order, msg))
                    }
                    other => other,
                })?;
                Ok(PublicationAuthorInput {
                    author,
                    order: input.order,
                    contribution: crate::models::author::clean(input.contribution.as_deref()),
                    is_corresponding: input.is_corresponding,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        prepared.sort_by_key(|i| i.order);

        Ok(prepared)
    }

    /// Resolve already prepared inputs inside the caller's transaction
    pub(crate) async fn resolve_batch_in(
        &self,
        tx: &mut dyn AuthorTx,
        prepared: &[PublicationAuthorInput],
    ) -> AppResult<Vec<ResolvedPublicationAuthor>> {
        let mut resolved = Vec::with_capacity(prepared.len());
        let mut seen: HashMap<i32, i32> = HashMap::new();

        for input in prepared {
            let resolution = match self
                .resolve_in(&mut *tx, &input.author, FuzzyPolicy::Accept)
                .await?
            {
                ResolveOutcome::Resolved(resolution) => resolution,
                ResolveOutcome::PotentialDuplicate { suggestion, .. } => {
                    return Err(AppError::Validation(format!(
                        "Author at order {} may be \"{}\" (id {}); select an author explicitly",
                        input.order, suggestion.name, suggestion.id
                    )));
                }
            };

            if let Some(previous) = seen.insert(resolution.author_id(), input.order) {
                return Err(AppError::Validation(format!(
                    "Authors at order {} and {} are the same person (author id {})",
                    previous,
                    input.order,
                    resolution.author_id()
                )));
            }

            resolved.push(ResolvedPublicationAuthor {
                author_id: resolution.author_id(),
                order: input.order,
                contribution: input.contribution.clone(),
                is_corresponding: input.is_corresponding,
                matched_by: resolution.matched_by,
                created: resolution.created,
                candidate: input.author.clone(),
            });
        }

        Ok(resolved)
    }

    /// Precedence chain on a normalised candidate
    async fn resolve_in(
        &self,
        tx: &mut dyn AuthorTx,
        candidate: &AuthorCandidate,
        fuzzy: FuzzyPolicy,
    ) -> AppResult<ResolveOutcome> {
        if let Some(author_id) = candidate.author_id {
            let author = tx
                .author_by_id(author_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", author_id)))?;
            let researcher = Self::researcher_of(&mut *tx, &author).await?;
            return Ok(ResolveOutcome::Resolved(Resolution::new(
                author,
                researcher,
                MatchRule::AuthorId,
                false,
            )));
        }

        if let Some(researcher_id) = candidate.researcher_id {
            return self
                .resolve_researcher(&mut *tx, researcher_id, MatchRule::ResearcherId)
                .await
                .map(ResolveOutcome::Resolved);
        }

        let resolution = match Self::find_match(&mut *tx, candidate).await? {
            Match::Author(author, kind) => {
                let researcher = Self::researcher_of(&mut *tx, &author).await?;
                Resolution::new(author, researcher, kind.into(), false)
            }
            Match::Researcher(researcher, kind) => {
                self.resolve_researcher(&mut *tx, researcher.id, kind.into()).await?
            }
            Match::Fuzzy(existing) => match fuzzy {
                FuzzyPolicy::Accept => {
                    let researcher = Self::researcher_of(&mut *tx, &existing).await?;
                    Resolution::new(existing, researcher, MatchRule::NameAffiliation, false)
                }
                FuzzyPolicy::Advise => return Ok(ResolveOutcome::potential_duplicate(existing)),
            },
            Match::None => self.create_standalone(&mut *tx, candidate).await?,
        };

        Ok(ResolveOutcome::Resolved(resolution))
    }

    /// Steps 3-5 of the precedence chain
    async fn find_match(tx: &mut dyn AuthorTx, candidate: &AuthorCandidate) -> AppResult<Match> {
        if let Some(ref orcid) = candidate.orcid {
            if let Some(author) = tx.author_by_orcid(orcid).await? {
                return Ok(Match::Author(author, ConflictKind::Orcid));
            }
            if let Some(researcher) = tx.researcher_by_orcid(orcid).await? {
                return Ok(Match::Researcher(researcher, ConflictKind::Orcid));
            }
        }

        if let Some(ref email) = candidate.email {
            if let Some(author) = tx.author_by_email(email).await? {
                return Ok(Match::Author(author, ConflictKind::Email));
            }
            if let Some(researcher) = tx.researcher_by_email(email).await? {
                return Ok(Match::Researcher(researcher, ConflictKind::Email));
            }
        }

        if let Some(ref affiliation) = candidate.affiliation {
            let tokens = name_tokens(&candidate.name);
            if !tokens.is_empty() {
                let matches = tx.authors_by_name_affiliation(&tokens, affiliation).await?;
                if let Some(author) = matches.into_iter().next() {
                    return Ok(Match::Fuzzy(author));
                }
            }
        }

        Ok(Match::None)
    }

    /// Author row of a researcher, created from the profile when missing
    async fn resolve_researcher(
        &self,
        tx: &mut dyn AuthorTx,
        researcher_id: i32,
        rule: MatchRule,
    ) -> AppResult<Resolution> {
        if let Some(author) = tx.author_by_researcher(researcher_id).await? {
            let researcher = tx.researcher_by_id(researcher_id).await?;
            return Ok(Resolution::new(author, researcher, rule, false));
        }

        let researcher = tx.researcher_by_id(researcher_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Researcher with id {} not found", researcher_id))
        })?;

        let new = NewAuthor::for_researcher(&researcher);
        match tx.insert_author(&new).await? {
            InsertResult::Inserted(author) => {
                tracing::info!(
                    "Created author id={} for researcher id={}",
                    author.id,
                    researcher.id
                );
                Ok(Resolution::new(author, Some(researcher), rule, true))
            }
            InsertResult::UniqueViolation(constraint) => {
                let existing = Self::refetch_after_conflict(&mut *tx, &new, &constraint).await?;
                let kind = conflict_kind(&existing, &new);
                Self::adopt_existing(&mut *tx, existing, researcher, rule, kind).await
            }
        }
    }

    /// The researcher's author row collided with an existing one: reuse it,
    /// promoting it when it is still a standalone author. A row that already
    /// belongs to another researcher is never handed out.
    async fn adopt_existing(
        tx: &mut dyn AuthorTx,
        existing: Author,
        researcher: Researcher,
        rule: MatchRule,
        kind: ConflictKind,
    ) -> AppResult<Resolution> {
        match existing.researcher_id {
            Some(linked) if linked == researcher.id => {
                Ok(Resolution::new(existing, Some(researcher), rule, false))
            }
            Some(linked) => {
                tracing::warn!(
                    "Researcher id={} shares its {} with author id={}, linked to researcher id={}",
                    researcher.id,
                    kind,
                    existing.id,
                    linked
                );
                Err(AppError::Validation(format!(
                    "Researcher \"{}\" (id {}) has the same {} as author id {}, which belongs to researcher id {}",
                    researcher.name, researcher.id, kind, existing.id, linked
                )))
            }
            None => match tx.promote_author(existing.id, researcher.id).await? {
                Some(promoted) => {
                    tracing::info!(
                        "Promoted author id={} to researcher id={}",
                        promoted.id,
                        researcher.id
                    );
                    Ok(Resolution::new(promoted, Some(researcher), rule, true))
                }
                None => {
                    let linked = tx.author_by_researcher(researcher.id).await?.ok_or_else(|| {
                        AppError::Internal(format!(
                            "Promotion of author id={} to researcher id={} failed and no linked author exists",
                            existing.id, researcher.id
                        ))
                    })?;
                    Ok(Resolution::new(linked, Some(researcher), rule, false))
                }
            },
        }
    }

    /// Step 6: insert a standalone author, or return the row that beat us to it
    async fn create_standalone(
        &self,
        tx: &mut dyn AuthorTx,
        candidate: &AuthorCandidate,
    ) -> AppResult<Resolution> {
        let new = NewAuthor::standalone(candidate);
        match tx.insert_author(&new).await? {
            InsertResult::Inserted(author) => {
                tracing::info!("Created author id={} \"{}\"", author.id, author.name);
                Ok(Resolution::new(author, None, MatchRule::NewAuthor, true))
            }
            InsertResult::UniqueViolation(constraint) => {
                let existing = Self::refetch_after_conflict(&mut *tx, &new, &constraint).await?;
                let kind = conflict_kind(&existing, &new);
                let researcher = Self::researcher_of(&mut *tx, &existing).await?;
                Ok(Resolution::new(existing, researcher, kind.into(), false))
            }
        }
    }

    /// Re-read the row that won a unique constraint race: researcher link, then ORCID, then email
    async fn refetch_after_conflict(
        tx: &mut dyn AuthorTx,
        new: &NewAuthor,
        constraint: &str,
    ) -> AppResult<Author> {
        tracing::warn!(
            constraint = constraint,
            "Author insert rejected by unique constraint; re-fetching existing row"
        );

        if let Some(researcher_id) = new.researcher_id {
            if let Some(author) = tx.author_by_researcher(researcher_id).await? {
                return Ok(author);
            }
        }
        if let Some(ref orcid) = new.orcid {
            if let Some(author) = tx.author_by_orcid(orcid).await? {
                return Ok(author);
            }
        }
        if let Some(ref email) = new.email {
            if let Some(author) = tx.author_by_email(email).await? {
                return Ok(author);
            }
        }

        Err(AppError::Internal(format!(
            "Unique constraint {} rejected author \"{}\" but no conflicting row was found",
            constraint, new.name
        )))
    }

    async fn researcher_of(tx: &mut dyn AuthorTx, author: &Author) -> AppResult<Option<Researcher>> {
        match author.researcher_id {
            Some(id) => tx.researcher_by_id(id).await,
            None => Ok(None),
        }
    }
}

/// Which identifier an existing row shares with the rejected insert
fn conflict_kind(existing: &Author, new: &NewAuthor) -> ConflictKind {
    if new.orcid.is_some() && existing.orcid == new.orcid {
        ConflictKind::Orcid
    } else {
        ConflictKind::Email
    }
}
