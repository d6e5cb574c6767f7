//! Keyed store abstraction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use vitrine_core::StorageError;

/// One cached credential. The `token` field is ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRow {
    /// Application key (primary key).
    pub application: String,
    /// Encrypted bearer token (base64url).
    pub token: String,
    /// Lifetime in seconds, as reported at exchange time.
    pub expires_in: String,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

/// Storage for [`CredentialRow`]s keyed by application.
#[async_trait]
pub trait KeyedStore: Send + Sync + 'static {
    /// Fetch the row for `application`, if any.
    async fn get(&self, application: &str) -> Result<Option<CredentialRow>, StorageError>;

    /// Insert the row, or replace the existing row for the same application.
    async fn upsert(&self, row: CredentialRow) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: KeyedStore + ?Sized> KeyedStore for Arc<T> {
    async fn get(&self, application: &str) -> Result<Option<CredentialRow>, StorageError> {
        (**self).get(application).await
    }

    async fn upsert(&self, row: CredentialRow) -> Result<(), StorageError> {
        (**self).upsert(row).await
    }
}

/// In-memory keyed store.
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    rows: Arc<RwLock<HashMap<String, CredentialRow>>>,
}

impl MemoryCredentialStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows held.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl KeyedStore for MemoryCredentialStore {
    async fn get(&self, application: &str) -> Result<Option<CredentialRow>, StorageError> {
        Ok(self.rows.read().await.get(application).cloned())
    }

    async fn upsert(&self, row: CredentialRow) -> Result<(), StorageError> {
        self.rows
            .write()
            .await
            .insert(row.application.clone(), row);
        Ok(())
    }
}
