use super::{ApiKeyStore, StoreError, UserStore};
use crate::models::{ApiKeyRecord, Scope, UserProfile, UserRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store used in development and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    api_keys: RwLock<HashMap<String, ApiKeyRecord>>,
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update_key<F>(&self, key: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ApiKeyRecord),
    {
        let mut api_keys = self.api_keys.write().await;
        let record = api_keys.get_mut(key).ok_or(StoreError::NotFound)?;
        apply(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn find_active(&self, key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        let api_keys = self.api_keys.read().await;
        Ok(api_keys.get(key).filter(|record| record.active).cloned())
    }

    async fn insert_api_key(&self, record: ApiKeyRecord) -> Result<(), StoreError> {
        let mut api_keys = self.api_keys.write().await;
        if api_keys.contains_key(&record.key) {
            return Err(StoreError::Duplicate);
        }
        api_keys.insert(record.key.clone(), record);
        Ok(())
    }

    async fn set_active(&self, key: &str, active: bool) -> Result<(), StoreError> {
        self.update_key(key, |record| record.active = active).await
    }

    async fn set_scopes(&self, key: &str, scopes: BTreeSet<Scope>) -> Result<(), StoreError> {
        self.update_key(key, |record| record.scopes = scopes).await
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).map(UserRecord::profile))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate);
        }
        users.insert(user.id, user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewApiKey;

    fn record(key: &str) -> ApiKeyRecord {
        NewApiKey::new(key, 1, [Scope::General]).unwrap().into_record()
    }

    #[tokio::test]
    async fn test_find_active_ignores_inactive_and_unknown() {
        let store = MemoryStore::new();
        store.insert_api_key(record("live")).await.unwrap();
        store.insert_api_key(record("dead")).await.unwrap();
        store.set_active("dead", false).await.unwrap();

        assert!(store.find_active("live").await.unwrap().is_some());
        assert!(store.find_active("dead").await.unwrap().is_none());
        assert!(store.find_active("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let store = MemoryStore::new();
        store.insert_api_key(record("dup")).await.unwrap();

        let result = store.insert_api_key(record("dup")).await;
        assert!(matches!(result, Err(StoreError::Duplicate)));
    }

    #[tokio::test]
    async fn test_updates_touch_timestamp() {
        let store = MemoryStore::new();
        let original = record("k");
        let created_at = original.created_at;
        store.insert_api_key(original).await.unwrap();

        store.set_scopes("k", BTreeSet::new()).await.unwrap();
        let updated = store.find_active("k").await.unwrap().unwrap();
        assert!(updated.scopes.is_empty());
        assert!(updated.updated_at >= created_at);

        let missing = store.set_active("nope", true).await;
        assert!(matches!(missing, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_users_unique_by_email() {
        let store = MemoryStore::new();
        let user = UserRecord {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
        };
        store.insert_user(user.clone()).await.unwrap();

        let clash = UserRecord {
            id: Uuid::new_v4(),
            email: "ADA@example.com".to_string(),
            ..user.clone()
        };
        assert!(matches!(
            store.insert_user(clash).await,
            Err(StoreError::Duplicate)
        ));

        let profile = store.find_profile(user.id).await.unwrap().unwrap();
        assert_eq!(profile, user.profile());
        assert!(store.find_by_email("ada@example.com").await.unwrap().is_some());
    }
}
