//! JWT bearer-token identity for orchard.
//!
//! Tokens are HS256-signed and carry the caller's subject id in `sub`. A
//! token that fails verification resolves to no identity at all, so the
//! request handler treats the caller as unauthenticated.

use std::convert::Infallible;

use anyhow::{anyhow, Context, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use orchard_core::IdentityResolver;
use orchard_types::SubjectId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id of the caller
    pub sub: String,
    /// Expiry (Unix timestamp)
    pub exp: u64,
    /// Audience (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Reasons a bearer token was not accepted.
#[derive(Debug)]
pub enum AuthError {
    NoKeyConfigured,
    InvalidToken(String),
    Expired,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NoKeyConfigured => write!(f, "no verification key configured"),
            AuthError::InvalidToken(msg) => write!(f, "invalid token: {}", msg),
            AuthError::Expired => write!(f, "token expired"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Resolves bearer tokens to subject ids.
#[derive(Clone)]
pub struct JwtIdentityResolver {
    key: Option<DecodingKey>,
    /// Expected audience (optional)
    expected_aud: Option<String>,
    /// Clock skew leeway in seconds (default: 60)
    leeway_secs: u64,
}

impl JwtIdentityResolver {
    /// A resolver that rejects every token until a key is added.
    pub fn new() -> Self {
        Self {
            key: None,
            expected_aud: None,
            leeway_secs: 60,
        }
    }

    pub fn with_secret(secret: impl AsRef<[u8]>) -> Self {
        let mut resolver = Self::new();
        resolver.set_secret(secret);
        resolver
    }

    pub fn set_secret(&mut self, secret: impl AsRef<[u8]>) {
        self.key = Some(DecodingKey::from_secret(secret.as_ref()));
    }

    /// Set expected audience for validation.
    pub fn set_expected_aud(&mut self, aud: impl Into<String>) {
        self.expected_aud = Some(aud.into());
    }

    /// Set clock skew leeway in seconds.
    pub fn set_leeway(&mut self, secs: u64) {
        self.leeway_secs = secs;
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Decode and validate a JWT token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        // Fail closed if no key configured
        let key = self.key.as_ref().ok_or(AuthError::NoKeyConfigured)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        if let Some(ref aud) = self.expected_aud {
            validation.set_audience(&[aud]);
        } else {
            validation.validate_aud = false;
        }

        let token_data = decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                AuthError::InvalidToken("audience mismatch".into())
            }
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".into()));
        }

        Ok(token_data.claims)
    }
}

impl Default for JwtIdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver for JwtIdentityResolver {
    fn resolve(&self, credential: Option<&str>) -> Option<SubjectId> {
        let token = credential?;
        match self.verify(token) {
            Ok(claims) => Some(SubjectId::new(claims.sub)),
            Err(e) => {
                warn!("auth failed: {}", e);
                None
            }
        }
    }
}

/// Configuration for authentication.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token secret (env: ORCHARD_AUTH_SECRET)
    pub secret: Option<String>,
    /// Expected audience (optional)
    pub expected_aud: Option<String>,
    pub leeway_secs: u64,
}

impl AuthConfig {
    pub fn build_resolver(&self) -> JwtIdentityResolver {
        let mut resolver = JwtIdentityResolver::new();
        if let Some(ref secret) = self.secret {
            resolver.set_secret(secret.as_bytes());
        }
        if let Some(ref aud) = self.expected_aud {
            resolver.set_expected_aud(aud);
        }
        resolver.set_leeway(self.leeway_secs);
        resolver
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            expected_aud: None,
            leeway_secs: 60,
        }
    }
}

/// Raw bearer credential from the `Authorization` header, if any.
///
/// Extraction never fails; deciding what the credential means is left to the
/// [`IdentityResolver`].
#[derive(Debug, Clone)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BearerToken(extract_bearer_token(parts).map(str::to_string)))
    }
}

/// Helper to create a user token for testing/CLI
pub fn create_token(
    secret: &[u8],
    sub: &str,
    expires_in_secs: u64,
    aud: Option<&str>,
) -> Result<String> {
    let exp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_secs()
        + expires_in_secs;

    let claims = Claims {
        sub: sub.to_string(),
        exp,
        aud: aud.map(str::to_string),
    };

    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| anyhow!("failed to encode token: {}", e))
}
