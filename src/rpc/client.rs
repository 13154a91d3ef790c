use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use super::{CREATE_PATH, GET_PATH, LIST_PATH, RpcFailure};
use crate::{
    backend::{BackendError, PostBackend},
    models::{NewPost, Post, PostIdRequest, PostIdResponse, PostList},
    pagination::ListQuery,
};

/// RemotePostBackend
///
/// `PostBackend` that forwards every intent to a post service over HTTP.
/// The whole call, connect included, is bounded by one fixed deadline and is
/// never retried.
#[derive(Clone)]
pub struct RemotePostBackend {
    http: Client,
    base_url: String,
    deadline: Duration,
}

impl RemotePostBackend {
    pub fn new(base_url: &str, deadline: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(deadline).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            deadline,
        })
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, BackendError> {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|err| self.transport_error(err))
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<RpcFailure>().await {
                Ok(failure) => self.remote_error(failure),
                Err(_) => BackendError::Protocol(format!("status {status}")),
            });
        }
        response.json().await.map_err(|err| self.transport_error(err))
    }

    /// Rebuilds the `BackendError` the post service reported. A remote
    /// deadline is reported with this client's deadline.
    fn remote_error(&self, failure: RpcFailure) -> BackendError {
        match failure.kind.as_str() {
            "deadline_exceeded" => BackendError::DeadlineExceeded(self.deadline),
            "unavailable" => BackendError::Unavailable(failure.message),
            "protocol" => BackendError::Protocol(failure.message),
            _ => BackendError::Storage(failure.message),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::DeadlineExceeded(self.deadline)
        } else if err.is_decode() {
            BackendError::Protocol(err.to_string())
        } else {
            BackendError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl PostBackend for RemotePostBackend {
    async fn create_post(&self, post: NewPost) -> Result<u64, BackendError> {
        let response = self.call(CREATE_PATH, &post).await?;
        let created: PostIdResponse = self.decode(response).await?;
        Ok(created.id)
    }

    async fn get_post(&self, id: u64) -> Result<Option<Post>, BackendError> {
        let response = self.call(GET_PATH, &PostIdRequest { id }).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.decode(response).await.map(Some)
    }

    async fn list_posts(&self, query: ListQuery) -> Result<Vec<Post>, BackendError> {
        let response = self.call(LIST_PATH, &query).await?;
        let list: PostList = self.decode(response).await?;
        Ok(list.posts)
    }
}
