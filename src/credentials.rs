use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("login {0:?} is already registered")]
    Duplicate(String),
    #[error("credential store query exceeded {0:?}")]
    DeadlineExceeded(Duration),
    #[error("credential store error: {0}")]
    Database(#[from] sqlx::Error),
}

/// CredentialStore
///
/// Persists `(login, password_hash)` pairs. Accounts are only ever inserted
/// and read; there is no update or delete.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the login already exists.
    async fn save(&self, login: &str, password_hash: &str) -> Result<(), StoreError>;
    async fn lookup(&self, login: &str) -> Result<Option<String>, StoreError>;
}

pub type CredentialState = Arc<dyn CredentialStore>;

/// PostgresCredentialStore
///
/// Backed by the `users` table. Every query runs under a fixed deadline.
pub struct PostgresCredentialStore {
    pool: PgPool,
    deadline: Duration,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.with_deadline(
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS users (
                    login VARCHAR(50) PRIMARY KEY,
                    password_hash TEXT NOT NULL
                )",
            )
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn with_deadline<T>(
        &self,
        query: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.deadline, query).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::DeadlineExceeded(self.deadline)),
        }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn save(&self, login: &str, password_hash: &str) -> Result<(), StoreError> {
        let insert = sqlx::query("INSERT INTO users (login, password_hash) VALUES ($1, $2)")
            .bind(login)
            .bind(password_hash)
            .execute(&self.pool);

        match self.with_deadline(insert).await {
            Ok(_) => Ok(()),
            Err(StoreError::Database(sqlx::Error::Database(db)))
                if db.is_unique_violation() =>
            {
                Err(StoreError::Duplicate(login.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup(&self, login: &str) -> Result<Option<String>, StoreError> {
        self.with_deadline(
            sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE login = $1")
                .bind(login)
                .fetch_optional(&self.pool),
        )
        .await
    }
}

/// InMemoryCredentialStore
///
/// Process-local store used for `STORAGE_BACKEND=memory` and in tests.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: DashMap<String, String>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn save(&self, login: &str, password_hash: &str) -> Result<(), StoreError> {
        match self.accounts.entry(login.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(login.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(password_hash.to_string());
                Ok(())
            }
        }
    }

    async fn lookup(&self, login: &str) -> Result<Option<String>, StoreError> {
        Ok(self.accounts.get(login).map(|hash| hash.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saved_hash_can_be_looked_up() {
        let store = InMemoryCredentialStore::new();
        store.save("alice", "hash-a").await.unwrap();

        assert_eq!(
            store.lookup("alice").await.unwrap().as_deref(),
            Some("hash-a")
        );
        assert_eq!(store.lookup("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_save_of_a_login_is_a_duplicate() {
        let store = InMemoryCredentialStore::new();
        store.save("alice", "hash-a").await.unwrap();

        let err = store.save("alice", "hash-b").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(login) if login == "alice"));
        assert_eq!(
            store.lookup("alice").await.unwrap().as_deref(),
            Some("hash-a")
        );
    }
}
