//! Credential store: API key records and user documents.
//!
//! The authorization pipeline only reads from these stores. Writes are
//! administrative (key seeding, activation, scope edits) or come from the
//! user registration flow.

mod memory;
mod supabase;

pub use self::memory::MemoryStore;
pub use self::supabase::PostgrestStore;

use crate::{
    models::{ApiKeyRecord, Scope, UserProfile, UserRecord},
    utils::ApiError,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,

    #[error("record not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected store response: {0}")]
    Decode(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::conflict("Record already exists"),
            StoreError::NotFound => ApiError::not_found("Record not found"),
            other => {
                ApiError::internal("Credential store failure").with_detail(other.to_string())
            }
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Exact match on `key` restricted to active records
    async fn find_active(&self, key: &str) -> Result<Option<ApiKeyRecord>, StoreError>;

    async fn insert_api_key(&self, record: ApiKeyRecord) -> Result<(), StoreError>;

    async fn set_active(&self, key: &str, active: bool) -> Result<(), StoreError>;

    async fn set_scopes(&self, key: &str, scopes: BTreeSet<Scope>) -> Result<(), StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Lookup by id that never reads the password hash
    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError>;
}
