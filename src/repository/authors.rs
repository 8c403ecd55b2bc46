//! PostgreSQL author store.
//!
//! Transactions run at the default READ COMMITTED level. Uniqueness of
//! ORCID, email and researcher link is enforced by partial unique indexes;
//! inserts and promotions run inside a savepoint so a violation can be
//! rolled back and the winning row re-read in the same transaction.

use async_trait::async_trait;
use sqlx::{Acquire, Pool, Postgres, Transaction};

use super::{AuthorStore, AuthorTx, InsertResult};
use crate::{
    error::AppResult,
    models::{Author, AuthorWithCount, NewAuthor, PublicationAuthorLink, Researcher},
};

/// Fuzzy matches beyond this are not useful to a human reviewer
const FUZZY_MATCH_LIMIT: i64 = 5;

/// `%term%` for ILIKE, with wildcards in the term escaped
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorStore for AuthorsRepository {
    async fn begin(&self) -> AppResult<Box<dyn AuthorTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgAuthorTx { tx }))
    }

    async fn get_author(&self, id: i32) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            SELECT id, name, email, affiliation, orcid, researcher_id, created_at, updated_at
            FROM authors
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(author)
    }

    async fn search_researchers(&self, term: &str, limit: i64) -> AppResult<Vec<Researcher>> {
        let rows = sqlx::query_as::<_, Researcher>(
            r#"
            SELECT r.id, r.user_id, u.name, u.email, u.affiliation, r.orcid,
                   r.avatar_url, r.title, r.bio, r.featured
            FROM researchers r
            JOIN users u ON u.id = r.user_id
            WHERE r.active
              AND (u.name ILIKE $1 OR u.email ILIKE $1
                   OR u.affiliation ILIKE $1 OR r.orcid ILIKE $1)
            ORDER BY r.id
            LIMIT $2
            "#,
        )
        .bind(like_pattern(term))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn search_authors(&self, term: &str, limit: i64) -> AppResult<Vec<AuthorWithCount>> {
        let rows = sqlx::query_as::<_, AuthorWithCount>(
            r#"
            SELECT a.id, a.name, a.email, a.affiliation, a.orcid, a.researcher_id,
                   (SELECT COUNT(*) FROM publication_authors pa
                    WHERE pa.author_id = a.id) AS publication_count
            FROM authors a
            WHERE a.name ILIKE $1 OR a.email ILIKE $1
               OR a.affiliation ILIKE $1 OR a.orcid ILIKE $1
            ORDER BY a.id
            LIMIT $2
            "#,
        )
        .bind(like_pattern(term))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction; rolled back on drop unless committed
pub struct PgAuthorTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AuthorTx for PgAuthorTx {
    async fn author_by_id(&mut self, id: i32) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            SELECT id, name, email, affiliation, orcid, researcher_id, created_at, updated_at
            FROM authors
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(author)
    }

    async fn author_by_researcher(&mut self, researcher_id: i32) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            SELECT id, name, email, affiliation, orcid, researcher_id, created_at, updated_at
            FROM authors
            WHERE researcher_id = $1
            "#,
        )
        .bind(researcher_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(author)
    }

    async fn author_by_orcid(&mut self, orcid: &str) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            SELECT id, name, email, affiliation, orcid, researcher_id, created_at, updated_at
            FROM authors
            WHERE orcid = $1
            "#,
        )
        .bind(orcid)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(author)
    }

    async fn author_by_email(&mut self, email: &str) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            SELECT id, name, email, affiliation, orcid, researcher_id, created_at, updated_at
            FROM authors
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(author)
    }

    async fn authors_by_name_affiliation(
        &mut self,
        tokens: &[String],
        affiliation: &str,
    ) -> AppResult<Vec<Author>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            "SELECT id, name, email, affiliation, orcid, researcher_id, created_at, updated_at \
             FROM authors WHERE affiliation ILIKE $1",
        );
        for idx in 0..tokens.len() {
            sql.push_str(&format!(" AND name ILIKE ${}", idx + 2));
        }
        sql.push_str(&format!(" ORDER BY id LIMIT {}", FUZZY_MATCH_LIMIT));

        let mut query = sqlx::query_as::<_, Author>(&sql).bind(like_pattern(affiliation));
        for token in tokens {
            query = query.bind(like_pattern(token));
        }

        let rows = query.fetch_all(&mut *self.tx).await?;
        Ok(rows)
    }

    async fn researcher_by_id(&mut self, id: i32) -> AppResult<Option<Researcher>> {
        let researcher = sqlx::query_as::<_, Researcher>(
            r#"
            SELECT r.id, r.user_id, u.name, u.email, u.affiliation, r.orcid,
                   r.avatar_url, r.title, r.bio, r.featured
            FROM researchers r
            JOIN users u ON u.id = r.user_id
            WHERE r.id = $1 AND r.active
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(researcher)
    }

    async fn researcher_by_orcid(&mut self, orcid: &str) -> AppResult<Option<Researcher>> {
        let researcher = sqlx::query_as::<_, Researcher>(
            r#"
            SELECT r.id, r.user_id, u.name, u.email, u.affiliation, r.orcid,
                   r.avatar_url, r.title, r.bio, r.featured
            FROM researchers r
            JOIN users u ON u.id = r.user_id
            WHERE r.orcid = $1 AND r.active
            "#,
        )
        .bind(orcid)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(researcher)
    }

    async fn researcher_by_email(&mut self, email: &str) -> AppResult<Option<Researcher>> {
        let researcher = sqlx::query_as::<_, Researcher>(
            r#"
            SELECT r.id, r.user_id, u.name, u.email, u.affiliation, r.orcid,
                   r.avatar_url, r.title, r.bio, r.featured
            FROM researchers r
            JOIN users u ON u.id = r.user_id
            WHERE LOWER(u.email) = LOWER($1) AND r.active
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(researcher)
    }

    async fn insert_author(&mut self, author: &NewAuthor) -> AppResult<InsertResult> {
        let mut savepoint = (&mut self.tx).begin().await?;

        let inserted = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (name, email, affiliation, orcid, researcher_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, affiliation, orcid, researcher_id, created_at, updated_at
            "#,
        )
        .bind(&author.name)
        .bind(&author.email)
        .bind(&author.affiliation)
        .bind(&author.orcid)
        .bind(author.researcher_id)
        .fetch_one(&mut *savepoint)
        .await;

        match inserted {
            Ok(row) => {
                savepoint.commit().await?;
                Ok(InsertResult::Inserted(row))
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                savepoint.rollback().await?;
                Ok(InsertResult::UniqueViolation(constraint))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn promote_author(&mut self, author_id: i32, researcher_id: i32) -> AppResult<Option<Author>> {
        let mut savepoint = (&mut self.tx).begin().await?;

        let updated = sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors
            SET researcher_id = $1, updated_at = NOW()
            WHERE id = $2 AND researcher_id IS NULL
            RETURNING id, name, email, affiliation, orcid, researcher_id, created_at, updated_at
            "#,
        )
        .bind(researcher_id)
        .bind(author_id)
        .fetch_optional(&mut *savepoint)
        .await;

        match updated {
            Ok(row) => {
                savepoint.commit().await?;
                Ok(row)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                savepoint.rollback().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publication_exists(&mut self, publication_id: i32) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM publications WHERE id = $1)")
                .bind(publication_id)
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(exists)
    }

    async fn replace_publication_authors(
        &mut self,
        publication_id: i32,
        links: &[PublicationAuthorLink],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM publication_authors WHERE publication_id = $1")
            .bind(publication_id)
            .execute(&mut *self.tx)
            .await?;

        for link in links {
            sqlx::query(
                r#"
                INSERT INTO publication_authors
                    (publication_id, author_id, position, contribution, is_corresponding)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(publication_id)
            .bind(link.author_id)
            .bind(link.position)
            .bind(&link.contribution)
            .bind(link.is_corresponding)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
