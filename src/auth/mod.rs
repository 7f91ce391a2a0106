//! Bearer-token authentication and scope authorization.
//!
//! # Verification flow
//!
//! 1. [`authenticate`] extracts the `Authorization: Bearer` token.
//! 2. The [`TokenVerifier`] checks algorithm, `kid`, signature (key resolved
//!    through the [`JwksCache`]), expiry, issuer, and audience.
//! 3. Validated [`Claims`] are attached to the request as an extension —
//!    an explicit value threaded through the pipeline, never ambient state.
//! 4. [`authorize_scopes`] compares the granted permissions against the
//!    route's [`ScopeSet`].

mod jwks;
mod middleware;
mod scopes;
mod validator;

pub use jwks::JwksCache;
pub use middleware::{authenticate, authorize_scopes};
pub use scopes::ScopeSet;
pub use validator::{AuthError, Claims, JwtVerifier, TokenVerifier};
