//! Upstream credential cache.
//!
//! Caches the system-to-system bearer token used to call the identity
//! gateway and the commerce API. Tokens are encrypted with the
//! [`EncryptionCodec`](vitrine_crypto::EncryptionCodec) before they reach the
//! keyed store, and each application has exactly one row, replaced in place
//! on refresh.
//!
//! There is no locking around get-then-refresh: two concurrent misses may
//! both run the exchange and both upsert. The replace is idempotent, so the
//! race only costs a duplicate exchange.

#![forbid(unsafe_code)]

mod bearer;
mod cache;
mod redis_store;
mod store;

pub use bearer::{CredentialExchange, UpstreamBearer};
pub use cache::{CachePolicy, UpstreamCredentialCache};
pub use redis_store::RedisCredentialStore;
pub use store::{CredentialRow, KeyedStore, MemoryCredentialStore};
