use std::{cmp::Ordering, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use thiserror::Error;

use crate::{
    models::Post,
    pagination::{Direction, ListQuery, Selection, SortColumn},
};

const POST_COLUMNS: &str = "post_id, author, headline, content, location, value, created_at";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("post id {0} does not fit the post_id column")]
    IdOutOfRange(u64),
}

/// PostRepository
///
/// The storage executor. It runs exactly the intents the post service hands
/// it and performs no authorization or validation of its own.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: &Post) -> Result<(), RepositoryError>;
    async fn fetch_one(&self, id: u64) -> Result<Option<Post>, RepositoryError>;
    async fn fetch_many(&self, query: &ListQuery) -> Result<Vec<Post>, RepositoryError>;
    /// Largest stored id, or 0 when there are no posts.
    async fn max_id(&self) -> Result<u64, RepositoryError>;
}

pub type RepositoryState = Arc<dyn PostRepository>;

/// PostgresPostRepository
///
/// `PostRepository` over the `posts` table. Sort columns and directions come
/// from closed enums; every client-supplied number is a bound parameter.
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                post_id BIGINT PRIMARY KEY,
                author TEXT NOT NULL,
                headline TEXT NOT NULL,
                content TEXT NOT NULL,
                location TEXT NOT NULL,
                value BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Builds the `SELECT` for a listing intent. Range filters page in id order
/// and equal sort keys fall back to id order, so pages never overlap.
pub fn list_posts_query(query: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts"));

    match query.selection {
        Selection::RangeFilter { low, high } => {
            builder.push(" WHERE value BETWEEN ");
            builder.push_bind(low);
            builder.push(" AND ");
            builder.push_bind(high);
            builder.push(" ORDER BY post_id ASC");
        }
        Selection::OrderBy { column, direction } => {
            builder.push(" ORDER BY ");
            builder.push(column.as_sql());
            builder.push(" ");
            builder.push(direction.as_sql());
            builder.push(", post_id ASC");
        }
    }

    builder.push(" LIMIT ");
    builder.push_bind(i64::from(query.limit));
    builder.push(" OFFSET ");
    builder.push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));
    builder
}

fn stored_id(id: u64) -> Result<i64, RepositoryError> {
    i64::try_from(id).map_err(|_| RepositoryError::IdOutOfRange(id))
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn insert(&self, post: &Post) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO posts (post_id, author, headline, content, location, value, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(stored_id(post.id)?)
        .bind(&post.author)
        .bind(&post.headline)
        .bind(&post.content)
        .bind(&post.location)
        .bind(post.value)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_one(&self, id: u64) -> Result<Option<Post>, RepositoryError> {
        // Ids beyond the column range cannot exist.
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE post_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn fetch_many(&self, query: &ListQuery) -> Result<Vec<Post>, RepositoryError> {
        let posts = list_posts_query(query)
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn max_id(&self) -> Result<u64, RepositoryError> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(post_id) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(max.and_then(|id| u64::try_from(id).ok()).unwrap_or(0))
    }
}

/// InMemoryPostRepository
///
/// Process-local `PostRepository` with the same listing semantics as the
/// Postgres one. Used for `STORAGE_BACKEND=memory` and in tests.
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: DashMap<u64, Post>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &Post, b: &Post, column: SortColumn, direction: Direction) -> Ordering {
    let by_column = match column {
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        SortColumn::Value => a.value.cmp(&b.value),
    };
    let by_column = match direction {
        Direction::Asc => by_column,
        Direction::Desc => by_column.reverse(),
    };
    by_column.then(a.id.cmp(&b.id))
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn insert(&self, post: &Post) -> Result<(), RepositoryError> {
        self.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn fetch_one(&self, id: u64) -> Result<Option<Post>, RepositoryError> {
        Ok(self.posts.get(&id).map(|post| post.value().clone()))
    }

    async fn fetch_many(&self, query: &ListQuery) -> Result<Vec<Post>, RepositoryError> {
        let mut posts: Vec<Post> = self.posts.iter().map(|entry| entry.value().clone()).collect();
        posts.sort_by_key(|post| post.id);

        match query.selection {
            Selection::RangeFilter { low, high } => {
                posts.retain(|post| (low..=high).contains(&post.value));
            }
            Selection::OrderBy { column, direction } => {
                posts.sort_by(|a, b| compare(a, b, column, direction));
            }
        }

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(posts.into_iter().skip(offset).take(limit).collect())
    }

    async fn max_id(&self) -> Result<u64, RepositoryError> {
        Ok(self.posts.iter().map(|entry| *entry.key()).max().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(id: u64, value: i64, created_secs: i64) -> Post {
        Post {
            id,
            author: "alice".into(),
            headline: format!("post {id}"),
            content: "c".into(),
            location: "a.png".into(),
            value,
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
        }
    }

    fn list(selection: Selection, limit: u32, offset: u64) -> ListQuery {
        ListQuery {
            selection,
            limit,
            offset,
        }
    }

    #[test]
    fn range_query_binds_bounds() {
        let builder = list_posts_query(&list(Selection::RangeFilter { low: 0, high: 100 }, 10, 0));
        assert_eq!(
            builder.sql(),
            "SELECT post_id, author, headline, content, location, value, created_at FROM posts \
             WHERE value BETWEEN $1 AND $2 ORDER BY post_id ASC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn order_query_uses_fixed_fragments() {
        let builder = list_posts_query(&list(
            Selection::OrderBy {
                column: SortColumn::CreatedAt,
                direction: Direction::Desc,
            },
            5,
            10,
        ));
        assert_eq!(
            builder.sql(),
            "SELECT post_id, author, headline, content, location, value, created_at FROM posts \
             ORDER BY created_at DESC, post_id ASC LIMIT $1 OFFSET $2"
        );
    }

    async fn seeded() -> InMemoryPostRepository {
        let repo = InMemoryPostRepository::new();
        for p in [post(1, 50, 300), post(2, 150, 100), post(3, -5, 200), post(4, 100, 400)] {
            repo.insert(&p).await.unwrap();
        }
        repo
    }

    fn ids(posts: &[Post]) -> Vec<u64> {
        posts.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn range_filter_keeps_closed_interval() {
        let repo = seeded().await;
        let posts = repo
            .fetch_many(&list(Selection::RangeFilter { low: 0, high: 100 }, 10, 0))
            .await
            .unwrap();
        assert_eq!(ids(&posts), vec![1, 4]);
    }

    #[tokio::test]
    async fn order_by_value_descending() {
        let repo = seeded().await;
        let posts = repo
            .fetch_many(&list(
                Selection::OrderBy {
                    column: SortColumn::Value,
                    direction: Direction::Desc,
                },
                10,
                0,
            ))
            .await
            .unwrap();
        assert_eq!(ids(&posts), vec![2, 4, 1, 3]);
    }

    #[tokio::test]
    async fn order_by_date_pages_with_limit_and_offset() {
        let repo = seeded().await;
        let by_date = Selection::OrderBy {
            column: SortColumn::CreatedAt,
            direction: Direction::Asc,
        };
        let first = repo.fetch_many(&list(by_date, 2, 0)).await.unwrap();
        let second = repo.fetch_many(&list(by_date, 2, 2)).await.unwrap();
        let past_end = repo.fetch_many(&list(by_date, 2, 4)).await.unwrap();

        assert_eq!(ids(&first), vec![2, 3]);
        assert_eq!(ids(&second), vec![1, 4]);
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn fetch_one_and_max_id() {
        let repo = seeded().await;
        assert_eq!(repo.fetch_one(3).await.unwrap().map(|p| p.value), Some(-5));
        assert_eq!(repo.fetch_one(99).await.unwrap(), None);
        assert_eq!(repo.max_id().await.unwrap(), 4);
        assert_eq!(InMemoryPostRepository::new().max_id().await.unwrap(), 0);
    }
}
