use serde::{Deserialize, Serialize};
use std::{env, fmt, str::FromStr};

/// Deployment environment. Controls error detail exposure and cookie flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow::anyhow!("Invalid APP_ENV value: {other}")),
        }
    }
}

/// Application configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: Environment,
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration; `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,
    /// Session token configuration
    pub jwt: JwtConfig,
    /// Request credential locations
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub supabase_url: String,
    pub supabase_key: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: Option<String>,
    pub issuer: String,
    pub audience: String,
    pub session_validity_secs: u64,
    pub remember_validity_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub api_key_header: String,
    pub session_cookie: String,
}

// Secrets stay out of the startup log line.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("jwt", &self.jwt)
            .field("auth", &self.auth)
            .finish()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("session_validity_secs", &self.session_validity_secs)
            .field("remember_validity_secs", &self.remember_validity_secs)
            .finish()
    }
}

pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_SESSION_COOKIE: &str = "jwt";
const DEFAULT_SESSION_VALIDITY_SECS: u64 = 24 * 60 * 60;
const DEFAULT_REMEMBER_VALIDITY_SECS: u64 = 30 * 24 * 60 * 60;

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_origins: vec!["http://localhost:5173".to_string()],
            },
            database: None,
            jwt: JwtConfig {
                secret: None,
                issuer: "keygate".to_string(),
                audience: "keygate-clients".to_string(),
                session_validity_secs: DEFAULT_SESSION_VALIDITY_SECS,
                remember_validity_secs: DEFAULT_REMEMBER_VALIDITY_SECS,
            },
            auth: AuthConfig {
                api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
                session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let database = database_config(
            env::var("SUPABASE_URL").ok(),
            env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
        )?;

        let config = Self {
            environment: match env::var("APP_ENV") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.environment,
            },
            server: ServerConfig {
                host: env::var("HOST").unwrap_or(defaults.server.host),
                port: parse_var("PORT", defaults.server.port)?,
                cors_origins: match env::var("CORS_ORIGINS") {
                    Ok(origins) => origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                    Err(_) => defaults.server.cors_origins,
                },
            },
            database,
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
                issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
                audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt.audience),
                session_validity_secs: parse_var(
                    "SESSION_VALIDITY_SECS",
                    defaults.jwt.session_validity_secs,
                )?,
                remember_validity_secs: parse_var(
                    "REMEMBER_VALIDITY_SECS",
                    defaults.jwt.remember_validity_secs,
                )?,
            },
            auth: AuthConfig {
                api_key_header: env::var("API_KEY_HEADER")
                    .map(|h| h.to_ascii_lowercase())
                    .unwrap_or(defaults.auth.api_key_header),
                session_cookie: env::var("SESSION_COOKIE").unwrap_or(defaults.auth.session_cookie),
            },
        };

        Ok(config)
    }
}

/// Both Supabase settings or neither. Empty values count as unset.
fn database_config(
    supabase_url: Option<String>,
    supabase_key: Option<String>,
) -> anyhow::Result<Option<DatabaseConfig>> {
    let supabase_url = supabase_url.filter(|v| !v.trim().is_empty());
    let supabase_key = supabase_key.filter(|v| !v.trim().is_empty());

    match (supabase_url, supabase_key) {
        (Some(supabase_url), Some(supabase_key)) => Ok(Some(DatabaseConfig {
            supabase_url,
            supabase_key,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(anyhow::anyhow!(
            "SUPABASE_SERVICE_ROLE_KEY is required when SUPABASE_URL is set"
        )),
        (None, Some(_)) => Err(anyhow::anyhow!(
            "SUPABASE_URL is required when SUPABASE_SERVICE_ROLE_KEY is set"
        )),
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid {name} value")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            "development".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert_eq!(" PROD ".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.auth.api_key_header, "x-api-key");
        assert_eq!(config.auth.session_cookie, "jwt");
        assert!(config.jwt.secret.is_none());
        assert!(config.database.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = Config::default();
        config.jwt.secret = Some("super-secret-value".to_string());
        config.database = Some(DatabaseConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_key: "service-role-key".to_string(),
        });

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(!rendered.contains("service-role-key"));
        assert!(rendered.contains("http://localhost:54321"));
    }

    #[test]
    fn test_database_config_requires_both_values() {
        let url = || Some("https://project.supabase.co".to_string());
        let key = || Some("service-role-key".to_string());

        let config = database_config(url(), key()).unwrap().unwrap();
        assert_eq!(config.supabase_url, "https://project.supabase.co");

        assert!(database_config(None, None).unwrap().is_none());
        assert!(database_config(Some(String::new()), Some("  ".to_string()))
            .unwrap()
            .is_none());

        assert!(database_config(url(), None).is_err());
        assert!(database_config(url(), Some(String::new())).is_err());
        assert!(database_config(None, key()).is_err());
        assert!(database_config(Some(String::new()), key()).is_err());
    }
}
