use crate::{
    models::ApiKeyRecord,
    store::{ApiKeyStore, StoreError},
};
use std::sync::Arc;

/// Resolves a presented API key to its active record.
///
/// Unknown and inactive keys are indistinguishable to the caller.
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    store: Arc<dyn ApiKeyStore>,
}

impl ApiKeyAuthenticator {
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        if key.is_empty() {
            return Ok(None);
        }

        let record = self.store.find_active(key).await?;
        Ok(record.filter(|record| record.active && record.key == key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{NewApiKey, Scope},
        store::{MemoryStore, MockApiKeyStore},
    };

    #[tokio::test]
    async fn test_resolves_only_active_keys() {
        let store = Arc::new(MemoryStore::new());
        for key in ["active-key", "disabled-key"] {
            store
                .insert_api_key(NewApiKey::new(key, 1, [Scope::General]).unwrap().into_record())
                .await
                .unwrap();
        }
        store.set_active("disabled-key", false).await.unwrap();

        let authenticator = ApiKeyAuthenticator::new(store);
        assert!(authenticator.resolve("active-key").await.unwrap().is_some());
        assert!(authenticator.resolve("disabled-key").await.unwrap().is_none());
        assert!(authenticator.resolve("unknown-key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_key_never_hits_store() {
        let mut store = MockApiKeyStore::new();
        store.expect_find_active().never();

        let authenticator = ApiKeyAuthenticator::new(Arc::new(store));
        assert!(authenticator.resolve("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_record_from_store_is_dropped() {
        let mut store = MockApiKeyStore::new();
        store.expect_find_active().once().returning(|key| {
            let mut record = NewApiKey::new(key, 1, [Scope::General]).unwrap().into_record();
            record.active = false;
            Ok(Some(record))
        });

        let authenticator = ApiKeyAuthenticator::new(Arc::new(store));
        assert!(authenticator.resolve("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockApiKeyStore::new();
        store
            .expect_find_active()
            .once()
            .returning(|_| Err(StoreError::Unavailable("connection refused".to_string())));

        let authenticator = ApiKeyAuthenticator::new(Arc::new(store));
        assert!(matches!(
            authenticator.resolve("any").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
