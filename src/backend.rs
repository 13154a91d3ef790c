use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    ids::PostIdAllocator,
    models::{NewPost, Post},
    pagination::ListQuery,
    repository::{RepositoryError, RepositoryState},
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("post service unavailable: {0}")]
    Unavailable(String),
    #[error("post service call exceeded {0:?}")]
    DeadlineExceeded(Duration),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("unexpected post service response: {0}")]
    Protocol(String),
}

impl From<RepositoryError> for BackendError {
    fn from(err: RepositoryError) -> Self {
        BackendError::Storage(err.to_string())
    }
}

/// PostBackend
///
/// What the gateway needs from the storage tier. Implemented by the
/// in-process `PostService` and by `RemotePostBackend`, which reaches a
/// `PostService` over RPC.
#[async_trait]
pub trait PostBackend: Send + Sync {
    /// Stores the post under a freshly allocated id and returns that id.
    async fn create_post(&self, post: NewPost) -> Result<u64, BackendError>;
    async fn get_post(&self, id: u64) -> Result<Option<Post>, BackendError>;
    async fn list_posts(&self, query: ListQuery) -> Result<Vec<Post>, BackendError>;
}

pub type BackendState = Arc<dyn PostBackend>;

/// PostService
///
/// Owns the id allocator and the repository. Every repository call runs
/// under the storage deadline.
#[derive(Clone)]
pub struct PostService {
    ids: Arc<PostIdAllocator>,
    repo: RepositoryState,
    deadline: Duration,
}

impl PostService {
    pub fn new(repo: RepositoryState, deadline: Duration) -> Self {
        Self {
            ids: Arc::new(PostIdAllocator::new()),
            repo,
            deadline,
        }
    }

    /// Builds a service whose ids continue after the largest stored one.
    pub async fn seeded_from_store(
        repo: RepositoryState,
        deadline: Duration,
    ) -> Result<Self, BackendError> {
        let service = Self::new(repo, deadline);
        let high_water = service.within_deadline(service.repo.max_id()).await?;
        tracing::info!(high_water, "post ids seeded from store");
        Ok(Self {
            ids: Arc::new(PostIdAllocator::starting_after(high_water)),
            ..service
        })
    }

    async fn within_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, BackendError> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result.map_err(BackendError::from),
            Err(_) => Err(BackendError::DeadlineExceeded(self.deadline)),
        }
    }
}

#[async_trait]
impl PostBackend for PostService {
    async fn create_post(&self, post: NewPost) -> Result<u64, BackendError> {
        let id = self.ids.next();
        let post = post.with_id(id);
        self.within_deadline(self.repo.insert(&post)).await?;
        tracing::debug!(id, author = %post.author, "post stored");
        Ok(id)
    }

    async fn get_post(&self, id: u64) -> Result<Option<Post>, BackendError> {
        self.within_deadline(self.repo.fetch_one(id)).await
    }

    async fn list_posts(&self, query: ListQuery) -> Result<Vec<Post>, BackendError> {
        self.within_deadline(self.repo.fetch_many(&query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pagination::{Direction, Selection, SortColumn},
        repository::{InMemoryPostRepository, PostRepository},
    };
    use chrono::Utc;

    fn new_post(author: &str, value: i64) -> NewPost {
        NewPost {
            author: author.into(),
            headline: "h".into(),
            content: "c".into(),
            location: "a.jpg".into(),
            value,
            created_at: Utc::now(),
        }
    }

    fn service() -> PostService {
        PostService::new(Arc::new(InMemoryPostRepository::new()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn created_posts_get_sequential_ids() {
        let svc = service();
        assert_eq!(svc.create_post(new_post("alice", 1)).await.unwrap(), 1);
        assert_eq!(svc.create_post(new_post("bob", 2)).await.unwrap(), 2);

        let stored = svc.get_post(2).await.unwrap().unwrap();
        assert_eq!(stored.author, "bob");
        assert!(svc.get_post(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_goes_through_repository() {
        let svc = service();
        for value in [10, 30, 20] {
            svc.create_post(new_post("alice", value)).await.unwrap();
        }
        let posts = svc
            .list_posts(ListQuery {
                selection: Selection::OrderBy {
                    column: SortColumn::Value,
                    direction: Direction::Desc,
                },
                limit: 2,
                offset: 0,
            })
            .await
            .unwrap();
        let values: Vec<i64> = posts.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![30, 20]);
    }

    #[tokio::test]
    async fn seeding_continues_after_stored_ids() {
        let repo = Arc::new(InMemoryPostRepository::new());
        repo.insert(&new_post("alice", 0).with_id(7)).await.unwrap();

        let svc = PostService::seeded_from_store(repo, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(svc.create_post(new_post("alice", 1)).await.unwrap(), 8);
    }

    struct StalledRepository;

    #[async_trait]
    impl PostRepository for StalledRepository {
        async fn insert(&self, _post: &Post) -> Result<(), RepositoryError> {
            std::future::pending().await
        }
        async fn fetch_one(&self, _id: u64) -> Result<Option<Post>, RepositoryError> {
            std::future::pending().await
        }
        async fn fetch_many(&self, _query: &ListQuery) -> Result<Vec<Post>, RepositoryError> {
            std::future::pending().await
        }
        async fn max_id(&self) -> Result<u64, RepositoryError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_storage_hits_the_deadline() {
        let svc = PostService::new(Arc::new(StalledRepository), Duration::from_millis(20));
        let err = svc.get_post(1).await.unwrap_err();
        assert!(matches!(err, BackendError::DeadlineExceeded(_)));
    }
}
