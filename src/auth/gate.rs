//! Request gate pipeline.
//!
//! A route group declares an ordered list of [`Gate`]s at startup. Each
//! request walks the list once: the API key is resolved, the key's scopes
//! are checked, and on user-protected routes the session cookie is verified
//! and the user attached. The first failing gate ends the request with a
//! typed [`ApiError`]; errors from inner stages pass through unchanged.

use super::{
    api_key::ApiKeyAuthenticator,
    identity::RequestIdentity,
    scope::authorize,
    token::{SessionCodec, TokenError},
};
use crate::{
    models::Scope,
    store::{ApiKeyStore, UserStore},
    utils::{ApiError, ApiResult, Config, ErrorKind},
};
use axum::{
    extract::{Request, State},
    http::{header::COOKIE, HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const API_KEY_REQUIRED: &str = "Api key is required";
pub const PERMISSION_DENIED: &str = "Permission denied";
pub const NO_TOKEN: &str = "Not authorized, no token";
pub const TOKEN_FAILED: &str = "Not authorized, token failed";

/// One authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// A valid, active API key must be presented
    ApiKey,
    /// The resolved API key must hold this scope
    Scope(Scope),
    /// A valid session cookie must identify an existing user
    Session,
}

/// Shared collaborators for every gate
pub struct Gatekeeper {
    keys: ApiKeyAuthenticator,
    users: Arc<dyn UserStore>,
    codec: Arc<SessionCodec>,
    api_key_header: HeaderName,
    session_cookie: String,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for Gatekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gatekeeper")
            .field("api_key_header", &self.api_key_header)
            .field("session_cookie", &self.session_cookie)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl Gatekeeper {
    pub fn new(
        api_keys: Arc<dyn ApiKeyStore>,
        users: Arc<dyn UserStore>,
        codec: Arc<SessionCodec>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let api_key_header = HeaderName::try_from(config.auth.api_key_header.as_str())
            .map_err(|_| {
                anyhow::anyhow!("Invalid API key header name: {}", config.auth.api_key_header)
            })?;

        Ok(Self {
            keys: ApiKeyAuthenticator::new(api_keys),
            users,
            codec,
            api_key_header,
            session_cookie: config.auth.session_cookie.clone(),
            issuer: config.jwt.issuer.clone(),
            audience: config.jwt.audience.clone(),
        })
    }

    /// Apply one gate, enriching `identity` or rejecting the request
    pub async fn admit(
        &self,
        gate: Gate,
        headers: &HeaderMap,
        identity: &mut RequestIdentity,
    ) -> ApiResult<()> {
        match gate {
            Gate::ApiKey => {
                let key = headers
                    .get(&self.api_key_header)
                    .and_then(|value| value.to_str().ok())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| ApiError::missing_credential(API_KEY_REQUIRED))?;

                let record = self.keys.resolve(key).await?.ok_or_else(|| {
                    debug!("rejected unknown or inactive api key");
                    ApiError::forbidden(PERMISSION_DENIED)
                })?;

                identity.api_key = Some(record);
                Ok(())
            }
            Gate::Scope(required) => {
                if authorize(identity.api_key.as_ref(), required) {
                    Ok(())
                } else {
                    debug!("api key lacks required scope {}", required);
                    Err(ApiError::forbidden(PERMISSION_DENIED)
                        .with_detail(format!("scope {required} not granted")))
                }
            }
            Gate::Session => {
                let token = session_cookie(headers, &self.session_cookie)
                    .ok_or_else(|| ApiError::unauthorized(NO_TOKEN))?;

                let claims = self
                    .codec
                    .verify(token, &self.issuer, &self.audience)
                    .map_err(|err| match err {
                        TokenError::MissingSecret => ApiError::from(TokenError::MissingSecret),
                        TokenError::Expired => {
                            debug!("session token expired");
                            ApiError::new(ErrorKind::TokenExpired, TOKEN_FAILED)
                        }
                        other => {
                            debug!("session token rejected: {}", other);
                            ApiError::unauthorized(TOKEN_FAILED).with_detail(other.to_string())
                        }
                    })?;

                let user_id = Uuid::parse_str(claims.subject()).map_err(|_| {
                    ApiError::unauthorized(TOKEN_FAILED).with_detail("subject is not a user id")
                })?;

                let user = self.users.find_profile(user_id).await?.ok_or_else(|| {
                    ApiError::unauthorized(TOKEN_FAILED).with_detail("subject has no user")
                })?;

                identity.user = Some(user);
                Ok(())
            }
        }
    }
}

/// An ordered gate list bound to its collaborators
#[derive(Debug)]
pub struct GateChain {
    gatekeeper: Arc<Gatekeeper>,
    gates: Vec<Gate>,
}

impl GateChain {
    pub fn new(gatekeeper: Arc<Gatekeeper>, gates: impl IntoIterator<Item = Gate>) -> Self {
        Self {
            gatekeeper,
            gates: gates.into_iter().collect(),
        }
    }

    /// Run every gate in order and return the resolved identity
    pub async fn run(&self, headers: &HeaderMap) -> ApiResult<RequestIdentity> {
        let mut identity = RequestIdentity::default();
        for gate in &self.gates {
            self.gatekeeper.admit(*gate, headers, &mut identity).await?;
        }
        Ok(identity)
    }
}

/// Middleware running a [`GateChain`] before the route handler
pub async fn enforce_gates(
    State(chain): State<Arc<GateChain>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = chain.run(request.headers()).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Find a non-empty cookie value by name across all `Cookie` headers
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .find(|value| !value.is_empty())
}
