//! Signing-key retrieval — JWKS fetching, caching, and rate limiting.

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use jsonwebtoken::{
    DecodingKey,
    jwk::{AlgorithmParameters, JwkSet},
};
use parking_lot::RwLock;
use tracing::debug;

use super::validator::AuthError;
use crate::config::JwksConfig;

/// Type alias for the fetch rate limiter
type FetchLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Cached key set with its fetch time.
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Cache of the issuer's published signing keys.
///
/// Network fetches are rate limited; when the limiter is exhausted and the
/// needed key is not cached, resolution fails instead of blocking. The lock
/// is never held across an await.
pub struct JwksCache {
    jwks_uri: String,
    http: reqwest::Client,
    cache_enabled: bool,
    ttl: Duration,
    cached: RwLock<Option<CachedJwks>>,
    limiter: FetchLimiter,
}

impl JwksCache {
    /// Create a cache for `jwks_uri` with the configured TTL and fetch quota.
    #[must_use]
    pub fn new(jwks_uri: String, config: &JwksConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            jwks_uri,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            cache_enabled: config.cache,
            ttl: config.cache_ttl,
            cached: RwLock::new(None),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        }
    }

    /// Resolve the RSA decoding key for `kid`.
    ///
    /// Serves from the cache when fresh; otherwise fetches. An unknown `kid`
    /// triggers a single refresh (still subject to the limiter) before failing.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the key set cannot be fetched, the fetch quota
    /// is exhausted, or the key is not in the refreshed set.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(jwks) = self.cached_keys() {
            if let Some(key) = find_key(&jwks, kid) {
                return Ok(key);
            }
        }

        let jwks = self.fetch().await?;
        find_key(&jwks, kid).ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }

    /// The cached key set, if caching is on and the entry is fresh.
    fn cached_keys(&self) -> Option<JwkSet> {
        if !self.cache_enabled {
            return None;
        }
        self.cached
            .read()
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.keys.clone())
    }

    /// Fetch the key set from the issuer, consuming one limiter permit.
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        if self.limiter.check().is_err() {
            return Err(AuthError::JwksRateLimited);
        }

        debug!(uri = %self.jwks_uri, "Fetching JWKS");
        let jwks: JwkSet = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        if self.cache_enabled {
            *self.cached.write() = Some(CachedJwks {
                keys: jwks.clone(),
                fetched_at: Instant::now(),
            });
        }

        Ok(jwks)
    }
}

/// Find an RSA JWK by `kid` and convert it to a `DecodingKey`.
/// Non-RSA keys are skipped: only the RS family is accepted for tokens.
fn find_key(jwks: &JwkSet, kid: &str) -> Option<DecodingKey> {
    jwks.keys
        .iter()
        .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))
        .and_then(|jwk| match &jwk.algorithm {
            AlgorithmParameters::RSA(rsa) => {
                DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok()
            }
            _ => None,
        })
}
