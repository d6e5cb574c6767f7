//! Redis-backed keyed store.
//!
//! Each application's row is a single JSON string under
//! `{prefix}:{application}`; `SET` replaces it in place.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use vitrine_core::StorageError;

use crate::store::{CredentialRow, KeyedStore};

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "vitrine:upstream-credential";

/// Keyed store over a Redis connection manager.
#[derive(Clone)]
pub struct RedisCredentialStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCredentialStore {
    /// Connect to Redis at `url` using the default key prefix.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        Self::connect_with_prefix(url, DEFAULT_KEY_PREFIX).await
    }

    /// Connect to Redis at `url`, namespacing keys under `prefix`.
    pub async fn connect_with_prefix(url: &str, prefix: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        log::info!("Connected upstream credential store to Redis");
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }
}

#[async_trait]
impl KeyedStore for RedisCredentialStore {
    async fn get(&self, application: &str) -> Result<Option<CredentialRow>, StorageError> {
        let key = row_key(&self.prefix, application);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key.as_str()).await.map_err(unavailable)?;
        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
                key: key.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    async fn upsert(&self, row: CredentialRow) -> Result<(), StorageError> {
        let key = row_key(&self.prefix, &row.application);
        let json = serde_json::to_string(&row).map_err(|e| StorageError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key.as_str(), json)
            .await
            .map_err(unavailable)
    }
}

fn row_key(prefix: &str, application: &str) -> String {
    format!("{prefix}:{application}")
}

fn unavailable(error: redis::RedisError) -> StorageError {
    StorageError::Unavailable(error.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_row_key() {
        assert_eq!(
            row_key(DEFAULT_KEY_PREFIX, "commerce-api"),
            "vitrine:upstream-credential:commerce-api"
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_unavailable() {
        let result = RedisCredentialStore::connect("not-a-redis-url").await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_roundtrip_against_live_redis() {
        // Runs only when a Redis instance is provided.
        let Ok(url) = std::env::var("VITRINE_TEST_REDIS_URL") else {
            return;
        };
        let store = RedisCredentialStore::connect_with_prefix(&url, "vitrine-test")
            .await
            .unwrap();
        let row = CredentialRow {
            application: "commerce-api".to_string(),
            token: "ciphertext".to_string(),
            expires_in: "60".to_string(),
            updated_at: Utc::now(),
        };
        store.upsert(row.clone()).await.unwrap();
        let fetched = store.get("commerce-api").await.unwrap().unwrap();
        assert_eq!(fetched.token, "ciphertext");
    }
}
