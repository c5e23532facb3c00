//! PostgreSQL implementation of [`StoryRepository`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;
use storyhub_core::pagination::PageRequest;
use storyhub_core::types::{ObjectId, Timestamp};

use crate::error::StoreError;
use crate::models::story::{NewStory, StoryContent, StoryDetails};
use crate::repositories::StoryRepository;
use crate::{DbPool, HEALTH_CHECK_TIMEOUT, STORAGE_TIMEOUT};

/// Column list for `story_details` queries.
const DETAILS_COLUMNS: &str = "id, title, genre, description, owner_id, collaborators, \
                               forked_from, created_at, updated_at";

/// Unique index guarding one fork per (source, forker).
const FORK_UNIQUE_INDEX: &str = "uq_story_details_fork";

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

#[derive(Debug, FromRow)]
struct StoryDetailsRow {
    id: String,
    title: String,
    genre: String,
    description: String,
    owner_id: String,
    collaborators: Vec<String>,
    forked_from: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<StoryDetailsRow> for StoryDetails {
    type Error = StoreError;

    fn try_from(row: StoryDetailsRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.parse()?,
            title: row.title,
            genre: row.genre,
            description: row.description,
            owner_id: row.owner_id.parse()?,
            collaborators: parse_ids(row.collaborators)?,
            forked_from: row.forked_from.map(|s| s.parse::<ObjectId>()).transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct StoryContentRow {
    id: String,
    story_id: String,
    content: String,
}

impl TryFrom<StoryContentRow> for StoryContent {
    type Error = StoreError;

    fn try_from(row: StoryContentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id.parse()?),
            story_id: row.story_id.parse()?,
            content: row.content,
        })
    }
}

fn parse_ids(raw: Vec<String>) -> Result<Vec<ObjectId>, StoreError> {
    raw.into_iter()
        .map(|s| s.parse::<ObjectId>().map_err(StoreError::from))
        .collect()
}

fn hex_ids(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(ObjectId::to_hex).collect()
}

fn into_details(rows: Vec<StoryDetailsRow>) -> Result<Vec<StoryDetails>, StoreError> {
    rows.into_iter().map(StoryDetails::try_from).collect()
}

fn is_unique_violation(err: &sqlx::Error, index: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION) && db_err.constraint() == Some(index)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// PgStoryRepo
// ---------------------------------------------------------------------------

/// Story repository backed by a shared [`DbPool`].
///
/// Every operation is bounded by `op_timeout`. Multi-statement operations
/// (`edit_content`, `delete`, `delete_all_by_owner`) each run in a single
/// transaction.
#[derive(Debug, Clone)]
pub struct PgStoryRepo {
    pool: DbPool,
    op_timeout: Duration,
}

impl PgStoryRepo {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            op_timeout: STORAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(pool: DbPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, limit: Duration, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StoreError::Timeout(limit))?
    }

    async fn fetch_page(
        &self,
        filter: &str,
        bind: Option<PageFilter>,
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError> {
        self.bounded(self.op_timeout, async move {
            let (limit_idx, offset_idx) = if bind.is_some() { (2, 3) } else { (1, 2) };
            let query = format!(
                "SELECT {DETAILS_COLUMNS} FROM story_details {filter} \
                 ORDER BY created_at DESC, id DESC LIMIT ${limit_idx} OFFSET ${offset_idx}"
            );
            let mut q = sqlx::query_as::<_, StoryDetailsRow>(&query);
            q = match bind {
                Some(PageFilter::One(value)) => q.bind(value),
                Some(PageFilter::Many(values)) => q.bind(values),
                None => q,
            };
            let rows = q
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await?;
            into_details(rows)
        })
        .await
    }

    async fn story_exists(&self, id: ObjectId) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM story_details WHERE id = $1)")
                .bind(id.to_hex())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

/// Single bind parameter preceding LIMIT/OFFSET in a page query.
enum PageFilter {
    One(String),
    Many(Vec<String>),
}

#[async_trait]
impl StoryRepository for PgStoryRepo {
    async fn create(&self, story: &NewStory) -> Result<ObjectId, StoreError> {
        self.bounded(self.op_timeout, async {
            let id = ObjectId::new();
            let now = Utc::now();
            let result = sqlx::query(
                "INSERT INTO story_details \
                 (id, title, genre, description, owner_id, collaborators, forked_from, \
                  created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
            )
            .bind(id.to_hex())
            .bind(&story.title)
            .bind(&story.genre)
            .bind(&story.description)
            .bind(story.owner_id.to_hex())
            .bind(hex_ids(&story.collaborators))
            .bind(story.forked_from.map(|f| f.to_hex()))
            .bind(now)
            .execute(&self.pool)
            .await;

            match (result, story.forked_from) {
                (Ok(_), _) => Ok(id),
                (Err(e), Some(source_id)) if is_unique_violation(&e, FORK_UNIQUE_INDEX) => {
                    Err(StoreError::DuplicateFork {
                        source_id,
                        owner_id: story.owner_id,
                    })
                }
                (Err(e), _) => Err(e.into()),
            }
        })
        .await
    }

    async fn get_details(&self, id: ObjectId) -> Result<StoryDetails, StoreError> {
        self.bounded(self.op_timeout, async {
            let query = format!("SELECT {DETAILS_COLUMNS} FROM story_details WHERE id = $1");
            let row = sqlx::query_as::<_, StoryDetailsRow>(&query)
                .bind(id.to_hex())
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| StoreError::story_not_found(id))?;
            StoryDetails::try_from(row)
        })
        .await
    }

    async fn get_content(&self, id: ObjectId) -> Result<StoryContent, StoreError> {
        self.bounded(self.op_timeout, async {
            if !self.story_exists(id).await? {
                return Err(StoreError::story_not_found(id));
            }
            let row = sqlx::query_as::<_, StoryContentRow>(
                "SELECT id, story_id, content FROM story_content WHERE story_id = $1",
            )
            .bind(id.to_hex())
            .fetch_optional(&self.pool)
            .await?;
            match row {
                Some(row) => StoryContent::try_from(row),
                None => Ok(StoryContent::empty(id)),
            }
        })
        .await
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<StoryDetails>, StoreError> {
        self.fetch_page("", None, page).await
    }

    async fn list_by_genres(
        &self,
        genres: &[String],
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError> {
        if genres.is_empty() {
            return self.list(page).await;
        }
        self.fetch_page(
            "WHERE genre = ANY($1)",
            Some(PageFilter::Many(genres.to_vec())),
            page,
        )
        .await
    }

    async fn list_by_owner(
        &self,
        owner_id: ObjectId,
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError> {
        self.fetch_page(
            "WHERE owner_id = $1",
            Some(PageFilter::One(owner_id.to_hex())),
            page,
        )
        .await
    }

    async fn list_by_collaborator(
        &self,
        user_id: ObjectId,
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError> {
        self.fetch_page(
            "WHERE $1 = ANY(collaborators)",
            Some(PageFilter::One(user_id.to_hex())),
            page,
        )
        .await
    }

    async fn edit_content(&self, id: ObjectId, body: &str) -> Result<bool, StoreError> {
        self.bounded(self.op_timeout, async {
            let mut tx = self.pool.begin().await?;

            let locked: Option<String> =
                sqlx::query_scalar("SELECT id FROM story_details WHERE id = $1 FOR UPDATE")
                    .bind(id.to_hex())
                    .fetch_optional(&mut *tx)
                    .await?;
            if locked.is_none() {
                return Err(StoreError::story_not_found(id));
            }

            sqlx::query(
                "INSERT INTO story_content (id, story_id, content) VALUES ($1, $2, $3) \
                 ON CONFLICT (story_id) DO UPDATE SET content = EXCLUDED.content",
            )
            .bind(ObjectId::new().to_hex())
            .bind(id.to_hex())
            .bind(body)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE story_details SET updated_at = $2 WHERE id = $1")
                .bind(id.to_hex())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(true)
        })
        .await
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        self.bounded(self.op_timeout, async {
            let mut tx = self.pool.begin().await?;

            let details = sqlx::query("DELETE FROM story_details WHERE id = $1")
                .bind(id.to_hex())
                .execute(&mut *tx)
                .await?;
            if details.rows_affected() == 0 {
                return Err(StoreError::story_not_found(id));
            }

            let content = sqlx::query("DELETE FROM story_content WHERE story_id = $1")
                .bind(id.to_hex())
                .execute(&mut *tx)
                .await?;
            if content.rows_affected() == 0 {
                tracing::debug!(story_id = %id, "Story had no content row to delete");
            }

            tx.commit().await?;
            Ok(true)
        })
        .await
    }

    async fn delete_all_by_owner(&self, owner_id: ObjectId) -> Result<bool, StoreError> {
        self.bounded(self.op_timeout, async {
            let mut tx = self.pool.begin().await?;

            let ids: Vec<String> =
                sqlx::query_scalar("SELECT id FROM story_details WHERE owner_id = $1 FOR UPDATE")
                    .bind(owner_id.to_hex())
                    .fetch_all(&mut *tx)
                    .await?;
            if ids.is_empty() {
                return Ok(true);
            }

            sqlx::query("DELETE FROM story_details WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
            let content = sqlx::query("DELETE FROM story_content WHERE story_id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            tracing::info!(
                owner_id = %owner_id,
                stories = ids.len(),
                contents = content.rows_affected(),
                "Deleted all stories for owner"
            );
            Ok(true)
        })
        .await
    }

    async fn get_collaborators(&self, id: ObjectId) -> Result<Vec<ObjectId>, StoreError> {
        self.bounded(self.op_timeout, async {
            let raw: Option<Vec<String>> =
                sqlx::query_scalar("SELECT collaborators FROM story_details WHERE id = $1")
                    .bind(id.to_hex())
                    .fetch_optional(&self.pool)
                    .await?;
            parse_ids(raw.ok_or_else(|| StoreError::story_not_found(id))?)
        })
        .await
    }

    async fn add_collaborator(
        &self,
        id: ObjectId,
        user_id: ObjectId,
    ) -> Result<StoryDetails, StoreError> {
        self.bounded(self.op_timeout, async {
            let query = format!(
                "UPDATE story_details SET \
                 collaborators = CASE WHEN $2 = ANY(collaborators) THEN collaborators \
                                      ELSE array_append(collaborators, $2) END, \
                 updated_at = $3 \
                 WHERE id = $1 RETURNING {DETAILS_COLUMNS}"
            );
            let row = sqlx::query_as::<_, StoryDetailsRow>(&query)
                .bind(id.to_hex())
                .bind(user_id.to_hex())
                .bind(Utc::now())
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| StoreError::story_not_found(id))?;
            StoryDetails::try_from(row)
        })
        .await
    }

    async fn remove_collaborator(
        &self,
        id: ObjectId,
        user_id: ObjectId,
    ) -> Result<bool, StoreError> {
        self.bounded(self.op_timeout, async {
            let result = sqlx::query(
                "UPDATE story_details SET collaborators = array_remove(collaborators, $2), \
                 updated_at = $3 \
                 WHERE id = $1 AND $2 = ANY(collaborators)",
            )
            .bind(id.to_hex())
            .bind(user_id.to_hex())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
            if result.rows_affected() > 0 {
                return Ok(true);
            }
            if self.story_exists(id).await? {
                Ok(false)
            } else {
                Err(StoreError::story_not_found(id))
            }
        })
        .await
    }

    async fn find_fork(
        &self,
        source_id: ObjectId,
        owner_id: ObjectId,
    ) -> Result<Option<StoryDetails>, StoreError> {
        self.bounded(self.op_timeout, async {
            let query = format!(
                "SELECT {DETAILS_COLUMNS} FROM story_details \
                 WHERE forked_from = $1 AND owner_id = $2 LIMIT 1"
            );
            let row = sqlx::query_as::<_, StoryDetailsRow>(&query)
                .bind(source_id.to_hex())
                .bind(owner_id.to_hex())
                .fetch_optional(&self.pool)
                .await?;
            row.map(StoryDetails::try_from).transpose()
        })
        .await
    }

    async fn insert_content(&self, story_id: ObjectId, body: &str) -> Result<ObjectId, StoreError> {
        self.bounded(self.op_timeout, async {
            let id = ObjectId::new();
            sqlx::query("INSERT INTO story_content (id, story_id, content) VALUES ($1, $2, $3)")
                .bind(id.to_hex())
                .bind(story_id.to_hex())
                .bind(body)
                .execute(&self.pool)
                .await?;
            Ok(id)
        })
        .await
    }

    async fn distinct_owners(&self) -> Result<Vec<ObjectId>, StoreError> {
        self.bounded(self.op_timeout, async {
            let raw: Vec<String> = sqlx::query_scalar("SELECT DISTINCT owner_id FROM story_details")
                .fetch_all(&self.pool)
                .await?;
            parse_ids(raw)
        })
        .await
    }

    async fn story_ids_by_owners(&self, owners: &[ObjectId]) -> Result<Vec<ObjectId>, StoreError> {
        self.bounded(self.op_timeout, async {
            let raw: Vec<String> =
                sqlx::query_scalar("SELECT id FROM story_details WHERE owner_id = ANY($1)")
                    .bind(hex_ids(owners))
                    .fetch_all(&self.pool)
                    .await?;
            parse_ids(raw)
        })
        .await
    }

    async fn delete_details_by_owners(&self, owners: &[ObjectId]) -> Result<u64, StoreError> {
        self.bounded(self.op_timeout, async {
            let result = sqlx::query("DELETE FROM story_details WHERE owner_id = ANY($1)")
                .bind(hex_ids(owners))
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        })
        .await
    }

    async fn delete_content_by_story_ids(&self, story_ids: &[ObjectId]) -> Result<u64, StoreError> {
        self.bounded(self.op_timeout, async {
            let result = sqlx::query("DELETE FROM story_content WHERE story_id = ANY($1)")
                .bind(hex_ids(story_ids))
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        })
        .await
    }

    async fn pull_collaborators(&self, users: &[ObjectId]) -> Result<u64, StoreError> {
        self.bounded(self.op_timeout, async {
            let result = sqlx::query(
                "UPDATE story_details SET collaborators = ARRAY( \
                     SELECT c FROM unnest(collaborators) WITH ORDINALITY AS t(c, ord) \
                     WHERE c <> ALL($1) ORDER BY ord) \
                 WHERE collaborators && $1",
            )
            .bind(hex_ids(users))
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(HEALTH_CHECK_TIMEOUT, async {
            crate::health_check(&self.pool).await?;
            Ok(())
        })
        .await
    }
}
