use crate::utils::config::DatabaseConfig;
use postgrest::Postgrest;

/// Database client wrapper for Supabase PostgreSQL
#[derive(Clone)]
pub struct Database {
    client: Postgrest,
    supabase_url: String,
}

impl Database {
    /// Create a new database connection
    pub fn new(config: &DatabaseConfig) -> Self {
        let supabase_url = config.supabase_url.trim_end_matches('/').to_string();
        let client = Postgrest::new(format!("{}/rest/v1", supabase_url))
            .insert_header("apikey", &config.supabase_key)
            .insert_header("Authorization", format!("Bearer {}", config.supabase_key));

        Self {
            client,
            supabase_url,
        }
    }

    /// Get a reference to the PostgREST client
    pub fn client(&self) -> &Postgrest {
        &self.client
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("supabase_url", &self.supabase_url)
            .finish_non_exhaustive()
    }
}
