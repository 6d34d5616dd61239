use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use uuid::Uuid;
use validator::Validate;

/// Capability an API key may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    General,
}

impl Scope {
    pub const ALL: [Scope; 1] = [Scope::General];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "GENERAL",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown scope: {s}"))
    }
}

pub const MAX_API_KEY_LEN: usize = 1024;
pub const MAX_API_KEY_VERSION: u32 = 100;

/// Stored API key. `key` is unique across records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key: String,
    pub version: u32,
    pub scopes: BTreeSet<Scope>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKeyRecord {
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }
}

/// Validated input for seeding a new API key
#[derive(Debug, Clone)]
pub struct NewApiKey {
    key: String,
    version: u32,
    scopes: BTreeSet<Scope>,
}

impl NewApiKey {
    pub fn new(
        key: impl AsRef<str>,
        version: u32,
        scopes: impl IntoIterator<Item = Scope>,
    ) -> Result<Self, String> {
        let key = key.as_ref().trim().to_string();
        if key.is_empty() {
            return Err("api key must not be empty".to_string());
        }
        if key.len() > MAX_API_KEY_LEN {
            return Err(format!("api key exceeds {MAX_API_KEY_LEN} characters"));
        }
        if !(1..=MAX_API_KEY_VERSION).contains(&version) {
            return Err(format!("version must be between 1 and {MAX_API_KEY_VERSION}"));
        }
        let scopes: BTreeSet<Scope> = scopes.into_iter().collect();
        if scopes.is_empty() {
            return Err("at least one scope is required".to_string());
        }

        Ok(Self {
            key,
            version,
            scopes,
        })
    }

    /// Active record stamped with the current time
    pub fn into_record(self) -> ApiKeyRecord {
        let now = Utc::now();
        ApiKeyRecord {
            key: self.key,
            version: self.version,
            scopes: self.scopes,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 32 random bytes as 64 lowercase hex characters
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Full user document, including the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// User as attached to a request. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Registration request
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Login request
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    /// Selects the long-lived session window
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
