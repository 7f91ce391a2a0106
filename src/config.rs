//! Configuration management

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    /// Variables are set into the process environment for `${VAR}` resolution.
    #[serde(default)]
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Token validation configuration
    pub auth: AuthConfig,
    /// Management API configuration
    pub management: ManagementConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// CORS configuration for browser callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Bearer-token validation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Identity provider base URL, e.g. `https://tenant.example.auth0.com`
    pub issuer_base_url: String,
    /// Expected `aud` claim of inbound tokens
    pub audience: String,
    /// Signing-key retrieval configuration
    pub jwks: JwksConfig,
}

impl AuthConfig {
    /// Expected `iss` claim: the issuer base URL with a trailing slash.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("{}/", self.issuer_base_url.trim_end_matches('/'))
    }

    /// JWKS discovery URI under the issuer.
    #[must_use]
    pub fn jwks_uri(&self) -> String {
        format!(
            "{}/.well-known/jwks.json",
            self.issuer_base_url.trim_end_matches('/')
        )
    }

    /// Token endpoint for the client-credentials grant.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.issuer_base_url.trim_end_matches('/'))
    }
}

/// Signing-key cache and rate-limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwksConfig {
    /// Cache fetched key sets
    pub cache: bool,
    /// Maximum key-set fetches per minute
    pub requests_per_minute: u32,
    /// How long a cached key set stays fresh
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            cache: true,
            requests_per_minute: 5,
            cache_ttl: Duration::from_secs(600),
        }
    }
}

/// Management API access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    /// Management API audience / base URL, e.g. `https://tenant.example.auth0.com/api/v2/`
    pub audience: String,
    /// Client identifier for the client-credentials grant.
    /// Supports `${VAR}` expansion.
    pub client_id: String,
    /// Client secret for the client-credentials grant.
    /// Supports `${VAR}` expansion.
    pub client_secret: String,
    /// Timeout applied to the token exchange and collection fetches
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            audience: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ManagementConfig {
    /// URL of the actions collection.
    #[must_use]
    pub fn actions_url(&self) -> String {
        format!("{}/actions/actions", self.audience.trim_end_matches('/'))
    }

    /// URL of the clients collection.
    #[must_use]
    pub fn clients_url(&self) -> String {
        format!("{}/clients", self.audience.trim_end_matches('/'))
    }
}

impl Config {
    /// Load configuration from an optional YAML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, any source fails to parse,
    /// or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (ACTIONS_GATEWAY_ prefix)
        figment = figment.merge(Env::prefixed("ACTIONS_GATEWAY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Load env files into process environment (before env var expansion)
        config.load_env_files();

        // Expand ${VAR} in credential fields
        config.expand_env_vars();

        config.validate()?;

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in config values
    fn expand_env_vars(&mut self) {
        // Pattern: ${VAR} or ${VAR:-default}
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap();

        for value in [
            &mut self.auth.issuer_base_url,
            &mut self.auth.audience,
            &mut self.management.audience,
            &mut self.management.client_id,
            &mut self.management.client_secret,
        ] {
            *value = Self::expand_string(&re, value);
        }
    }

    /// Expand environment variables in a string
    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }

    /// Reject configurations the pipeline cannot run with.
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("auth.issuer_base_url", &self.auth.issuer_base_url),
            ("auth.audience", &self.auth.audience),
            ("management.audience", &self.management.audience),
            ("management.client_id", &self.management.client_id),
            ("management.client_secret", &self.management.client_secret),
        ] {
            if value.is_empty() {
                return Err(Error::Config(format!("{field} must be set")));
            }
        }

        let issuer = Url::parse(&self.auth.issuer_base_url)
            .map_err(|e| Error::Config(format!("auth.issuer_base_url: {e}")))?;
        if issuer.scheme() != "https" {
            tracing::warn!(issuer = %self.auth.issuer_base_url, "Issuer is not HTTPS");
        }

        Ok(())
    }
}
