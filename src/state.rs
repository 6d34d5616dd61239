use crate::{
    auth::SessionCodec,
    db::Database,
    store::{ApiKeyStore, MemoryStore, PostgrestStore, UserStore},
    utils::Config,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub users: Arc<dyn UserStore>,
    pub codec: Arc<SessionCodec>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Pick the store backend from configuration
    pub fn from_config(config: Arc<Config>) -> Self {
        match &config.database {
            Some(database) => {
                let store = Arc::new(PostgrestStore::new(Database::new(database)));
                Self::new(store.clone(), store, config)
            }
            None => {
                warn!("No database configured, using in-memory credential store");
                let store = Arc::new(MemoryStore::new());
                Self::new(store.clone(), store, config)
            }
        }
    }

    pub fn new(
        api_keys: Arc<dyn ApiKeyStore>,
        users: Arc<dyn UserStore>,
        config: Arc<Config>,
    ) -> Self {
        let codec = Arc::new(SessionCodec::new(config.jwt.secret.as_deref()));
        if !codec.is_configured() {
            warn!("JWT_SECRET is not set; logins will fail with a configuration error");
        }

        Self {
            api_keys,
            users,
            codec,
            config,
        }
    }
}
