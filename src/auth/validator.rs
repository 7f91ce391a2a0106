//! Bearer-token verification — RS-family JWT validation against the
//! issuer's signing keys.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, TokenData, Validation};
use serde::Deserialize;
use tracing::debug;

use super::jwks::JwksCache;
use crate::config::AuthConfig;

/// Error variants for bearer-token verification failures.
///
/// Each variant names the check that failed; the terminal handler renders
/// them all as 401 with a `WWW-Authenticate` challenge.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` header on the request.
    #[error("Missing bearer token")]
    MissingToken,

    /// The token is not a decodable JWT.
    #[error("Malformed token")]
    Malformed,

    /// The token is signed with an algorithm outside the RS family.
    #[error("Disallowed signing algorithm: {0:?}")]
    DisallowedAlgorithm(Algorithm),

    /// The token header carries no `kid`.
    #[error("Token header has no key ID")]
    MissingKeyId,

    /// The `kid` is not in the issuer's key set, even after a refresh.
    #[error("Unknown key ID: {0}")]
    UnknownKeyId(String),

    /// Network or HTTP error while fetching the key set.
    #[error("Signing-key fetch failed: {0}")]
    JwksFetch(String),

    /// The key-set fetch quota is exhausted and the key is not cached.
    #[error("Signing-key fetches rate limited")]
    JwksRateLimited,

    /// Signature verification failed.
    #[error("Invalid signature")]
    BadSignature,

    /// The token is past its expiry.
    #[error("Token expired")]
    Expired,

    /// The `iss` claim does not match the configured issuer.
    #[error("Wrong issuer")]
    WrongIssuer,

    /// The `aud` claim does not match the configured audience.
    #[error("Wrong audience")]
    WrongAudience,
}

/// Claims extracted from a validated access token.
///
/// Immutable once validated; lives for one request.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Subject (opaque caller identifier).
    pub sub: String,
    /// Granted permission strings.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Claims {
    /// Whether the caller holds `permission`.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Verifies bearer tokens and produces validated [`Claims`].
///
/// The seam exists so tests can substitute a fake without a live identity
/// provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return its claims.
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Production verifier: RS-family JWTs checked against the configured
/// issuer and audience, keys resolved through the [`JwksCache`].
pub struct JwtVerifier {
    issuer: String,
    audience: String,
    jwks: Arc<JwksCache>,
}

impl JwtVerifier {
    /// Create a verifier from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer(),
            audience: config.audience.clone(),
            jwks: Arc::new(JwksCache::new(config.jwks_uri(), &config.jwks)),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| AuthError::Malformed)?;

        let alg = match header.alg {
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => header.alg,
            other => return Err(AuthError::DisallowedAlgorithm(other)),
        };

        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let decoding_key = self.jwks.decoding_key(&kid).await?;

        let mut validation = Validation::new(alg);
        validation.leeway = 60; // clock skew tolerance
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data: TokenData<Claims> =
            jsonwebtoken::decode(token, &decoding_key, &validation).map_err(map_jwt_error)?;

        debug!(subject = %token_data.claims.sub, "Token validated");
        Ok(token_data.claims)
    }
}

/// Map `jsonwebtoken` failures onto the variants callers can distinguish.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidIssuer => AuthError::WrongIssuer,
        ErrorKind::InvalidAudience => AuthError::WrongAudience,
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        _ => AuthError::Malformed,
    }
}
