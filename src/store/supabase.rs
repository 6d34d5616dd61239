use super::{ApiKeyStore, StoreError, UserStore};
use crate::{
    db::Database,
    models::{ApiKeyRecord, Scope, UserProfile, UserRecord},
};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

const API_KEYS_TABLE: &str = "api_keys";
const USERS_TABLE: &str = "users";
const API_KEY_COLUMNS: &str = "key,version,scopes,active,created_at,updated_at";
const PROFILE_COLUMNS: &str = "id,name,email";
const USER_COLUMNS: &str = "id,name,email,password_hash";

/// Supabase-backed store over PostgREST
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    db: Database,
}

impl PostgrestStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        builder: postgrest::Builder,
    ) -> Result<Vec<T>, StoreError> {
        let response = builder
            .execute()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match status {
            200..=299 => {
                if body.trim().is_empty() {
                    return Ok(Vec::new());
                }
                serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
            }
            409 => Err(StoreError::Duplicate),
            _ => {
                debug!("postgrest responded {}: {}", status, body);
                Err(StoreError::Unavailable(format!("status {status}")))
            }
        }
    }

    async fn patch_key(&self, key: &str, patch: serde_json::Value) -> Result<(), StoreError> {
        let builder = self
            .db
            .client()
            .from(API_KEYS_TABLE)
            .eq("key", key)
            .update(patch.to_string());

        let rows: Vec<serde_json::Value> = self.fetch_rows(builder).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ApiKeyStore for PostgrestStore {
    async fn find_active(&self, key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        let builder = self
            .db
            .client()
            .from(API_KEYS_TABLE)
            .select(API_KEY_COLUMNS)
            .eq("key", key)
            .eq("active", "true");

        let rows: Vec<ApiKeyRecord> = self.fetch_rows(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_api_key(&self, record: ApiKeyRecord) -> Result<(), StoreError> {
        let body =
            serde_json::to_string(&record).map_err(|e| StoreError::Decode(e.to_string()))?;
        let builder = self.db.client().from(API_KEYS_TABLE).insert(body);

        let _: Vec<serde_json::Value> = self.fetch_rows(builder).await?;
        Ok(())
    }

    async fn set_active(&self, key: &str, active: bool) -> Result<(), StoreError> {
        self.patch_key(key, json!({ "active": active, "updated_at": Utc::now() }))
            .await
    }

    async fn set_scopes(&self, key: &str, scopes: BTreeSet<Scope>) -> Result<(), StoreError> {
        self.patch_key(key, json!({ "scopes": scopes, "updated_at": Utc::now() }))
            .await
    }
}

#[async_trait]
impl UserStore for PostgrestStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let builder = self
            .db
            .client()
            .from(USERS_TABLE)
            .select(PROFILE_COLUMNS)
            .eq("id", id.to_string());

        let rows: Vec<UserProfile> = self.fetch_rows(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let builder = self
            .db
            .client()
            .from(USERS_TABLE)
            .select(USER_COLUMNS)
            .eq("email", email.to_lowercase());

        let rows: Vec<UserRecord> = self.fetch_rows(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let body = serde_json::to_string(&user).map_err(|e| StoreError::Decode(e.to_string()))?;
        let builder = self.db.client().from(USERS_TABLE).insert(body);

        let _: Vec<serde_json::Value> = self.fetch_rows(builder).await?;
        Ok(())
    }
}
