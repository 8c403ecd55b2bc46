//! Publication author assignment

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{PublicationAuthorInput, PublicationAuthorLink},
    repository::AuthorStore,
    services::authors::AuthorService,
};

#[derive(Clone)]
pub struct PublicationsService {
    store: Arc<dyn AuthorStore>,
    authors: AuthorService,
}

impl PublicationsService {
    pub fn new(store: Arc<dyn AuthorStore>, authors: AuthorService) -> Self {
        Self { store, authors }
    }

    /// Resolve the submitted author list and replace the publication's links.
    ///
    /// Resolution and link replacement share one transaction: on any failure
    /// neither new authors nor links are kept.
    pub async fn set_authors(
        &self,
        publication_id: i32,
        inputs: &[PublicationAuthorInput],
    ) -> AppResult<Vec<PublicationAuthorLink>> {
        let prepared = AuthorService::prepare_batch(inputs)?;

        let mut tx = self.store.begin().await?;
        if !tx.publication_exists(publication_id).await? {
            return Err(AppError::NotFound(format!(
                "Publication with id {} not found",
                publication_id
            )));
        }

        let resolved = self.authors.resolve_batch_in(&mut *tx, &prepared).await?;
        let links: Vec<PublicationAuthorLink> = resolved
            .iter()
            .map(|r| PublicationAuthorLink::from_resolved(publication_id, r))
            .collect();

        tx.replace_publication_authors(publication_id, &links).await?;
        tx.commit().await?;

        // publication counts shown in search changed even when no author was created
        self.authors.invalidate_search_cache();

        tracing::info!(
            "Publication id={} now has {} author(s), {} newly created",
            publication_id,
            links.len(),
            resolved.iter().filter(|r| r.created).count()
        );

        Ok(links)
    }
}
