//! Secure key-value storage for the bearer token.
//!
//! The platform keychain/keystore lives outside this crate; it is handed to
//! `ReminderSession` as a `TokenStore`. Each call may fail on its own,
//! independently of the network.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "jwt";

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: TokenStore + ?Sized> TokenStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}

/// Outcome of reading the token store.
#[derive(Debug)]
pub enum StoreLookup {
    Found(String),
    NotFound,
    Failed(StoreError),
}

impl From<Result<Option<String>, StoreError>> for StoreLookup {
    fn from(result: Result<Option<String>, StoreError>) -> Self {
        match result {
            Ok(Some(token)) => StoreLookup::Found(token),
            Ok(None) => StoreLookup::NotFound,
            Err(err) => StoreLookup::Failed(err),
        }
    }
}

/// In-process store for tests and hosts without secure storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), value.to_string());
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
