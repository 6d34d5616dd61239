//! Session token codec.
//!
//! Tokens are compact HS256 JWTs carrying issuer, audience, subject, an
//! application parameter (`prm`), and `iat`/`exp` in unix seconds. The codec
//! only works on the token string; transport (cookie, header) is the
//! caller's business.

use crate::utils::{ApiError, ErrorKind};
use chrono::Utc;
use jsonwebtoken::{
    crypto, decode, decode_header, encode, errors::ErrorKind as JwtErrorKind, Algorithm,
    DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token generation failure: no signing secret configured")]
    MissingSecret,

    #[error("claim `{0}` must not be empty")]
    EmptyClaim(&'static str),

    #[error("validity window must be positive and representable")]
    InvalidValidity,

    #[error("token expired")]
    Expired,

    #[error("signature does not match payload")]
    InvalidSignature,

    #[error("token is malformed")]
    Malformed,

    #[error("issuer or audience mismatch")]
    ClaimMismatch,

    #[error("signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret => ApiError::configuration("Token generation failure"),
            TokenError::Expired => ApiError::token_expired(),
            TokenError::InvalidSignature | TokenError::Malformed | TokenError::ClaimMismatch => {
                ApiError::new(ErrorKind::Unauthorized, "Invalid token").with_detail(err.to_string())
            }
            TokenError::EmptyClaim(_) | TokenError::InvalidValidity | TokenError::Signing(_) => {
                ApiError::internal("Token generation failure").with_detail(err.to_string())
            }
        }
    }
}

/// Claims of a minted session. `exp == iat + validity`, fixed at mint time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    iss: String,
    aud: String,
    sub: String,
    prm: String,
    iat: i64,
    exp: i64,
}

impl SessionClaims {
    pub fn issuer(&self) -> &str {
        &self.iss
    }

    pub fn audience(&self) -> &str {
        &self.aud
    }

    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn param(&self) -> &str {
        &self.prm
    }

    pub fn issued_at(&self) -> i64 {
        self.iat
    }

    pub fn expires_at(&self) -> i64 {
        self.exp
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Mints and verifies session tokens under one HMAC secret
pub struct SessionCodec {
    keys: Option<SigningKeys>,
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec")
            .field("configured", &self.keys.is_some())
            .finish()
    }
}

impl SessionCodec {
    /// A missing or empty secret yields a codec that refuses all work
    pub fn new(secret: Option<&str>) -> Self {
        let keys = secret.filter(|s| !s.is_empty()).map(|secret| SigningKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        });
        Self { keys }
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    pub fn mint(
        &self,
        issuer: &str,
        audience: &str,
        subject: &str,
        param: &str,
        validity_secs: u64,
    ) -> Result<String, TokenError> {
        self.mint_at(issuer, audience, subject, param, validity_secs, Utc::now().timestamp())
    }

    /// Mint with an explicit issue time (unix seconds)
    pub fn mint_at(
        &self,
        issuer: &str,
        audience: &str,
        subject: &str,
        param: &str,
        validity_secs: u64,
        now: i64,
    ) -> Result<String, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingSecret)?;

        for (name, value) in [("iss", issuer), ("aud", audience), ("sub", subject)] {
            if value.is_empty() {
                return Err(TokenError::EmptyClaim(name));
            }
        }

        let exp = i64::try_from(validity_secs)
            .ok()
            .filter(|validity| *validity > 0)
            .and_then(|validity| now.checked_add(validity))
            .ok_or(TokenError::InvalidValidity)?;

        let claims = SessionClaims {
            iss: issuer.to_string(),
            aud: audience.to_string(),
            sub: subject.to_string(),
            prm: param.to_string(),
            iat: now,
            exp,
        };

        encode(&Header::new(ALGORITHM), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(
        &self,
        token: &str,
        expected_issuer: &str,
        expected_audience: &str,
    ) -> Result<SessionClaims, TokenError> {
        self.verify_at(
            token,
            expected_issuer,
            expected_audience,
            Utc::now().timestamp(),
        )
    }

    /// Verify against an explicit clock. Expired when `now >= exp`.
    pub fn verify_at(
        &self,
        token: &str,
        expected_issuer: &str,
        expected_audience: &str,
        now: i64,
    ) -> Result<SessionClaims, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingSecret)?;

        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        let header_data = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header_data.alg != ALGORITHM {
            return Err(TokenError::InvalidSignature);
        }

        // Signature first, so a forged payload is never parsed as claims.
        let message = format!("{header}.{payload}");
        let signature_ok =
            crypto::verify(signature, message.as_bytes(), &keys.decoding, ALGORITHM)
                .unwrap_or(false);
        if !signature_ok {
            return Err(TokenError::InvalidSignature);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[expected_issuer]);
        validation.set_audience(&[expected_audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let claims = decode::<SessionClaims>(token, &keys.decoding, &validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::InvalidIssuer
                | JwtErrorKind::InvalidAudience
                | JwtErrorKind::MissingRequiredClaim(_) => TokenError::ClaimMismatch,
                JwtErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?
            .claims;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
