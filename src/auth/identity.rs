use crate::{
    models::{ApiKeyRecord, UserProfile},
    utils::ApiError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Per-request record of what the gates resolved.
///
/// Built fresh for every request and stored in the request extensions.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    pub api_key: Option<ApiKeyRecord>,
    pub user: Option<UserProfile>,
}

/// Extracts the session user attached by the session gate
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .and_then(|identity| identity.user.clone())
            .map(CurrentUser)
            .ok_or_else(|| ApiError::unauthorized("Not authorized, no token"))
    }
}
