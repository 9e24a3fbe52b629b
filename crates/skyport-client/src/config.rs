//! Client configuration loading
//!
//! TOML file with a `[service]` section (base URL, timeout, upload chunk
//! size) and an `[oauth]` section (client identity, endpoints, default
//! scopes, optional credential persistence path). The client secret is
//! never stored in the TOML: it is resolved from the
//! `SKYPORT_CLIENT_SECRET` env var or from `client_secret_file`, env var
//! taking precedence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use skyport_auth::AuthConfig;
use skyport_transport::StreamReader;

/// Root configuration.
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    pub service: ServiceSettings,
    pub oauth: OAuthSettings,
}

/// Service endpoint settings.
#[derive(Debug, Deserialize)]
pub struct ServiceSettings {
    /// Base URL operation paths are joined against
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Chunk size for streamed upload bodies
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// OAuth client identity and endpoints.
#[derive(Debug, Deserialize)]
pub struct OAuthSettings {
    pub client_id: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub redirect_uri: String,
    /// Scopes requested by default for every operation
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Resolved from env/file, never from the TOML itself
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the
    /// SKYPORT_CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    /// Where to persist the credential between sessions; unset disables
    /// persistence
    #[serde(default)]
    pub credential_file: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    StreamReader::DEFAULT_CHUNK_SIZE
}

impl ClientConfig {
    /// Load configuration from a TOML file, then resolve the client
    /// secret from the environment or the configured file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ClientConfig = toml::from_str(&contents)?;
        config.validate()?;

        if let Ok(secret) = std::env::var("SKYPORT_CLIENT_SECRET") {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.oauth.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> common::Result<()> {
        for (name, value) in [
            ("base_url", &self.service.base_url),
            ("authorize_endpoint", &self.oauth.authorize_endpoint),
            ("token_endpoint", &self.oauth.token_endpoint),
            ("redirect_uri", &self.oauth.redirect_uri),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {value}"
                )));
            }
        }
        if self.service.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.service.chunk_size == 0 {
            return Err(common::Error::Config(
                "chunk_size must be greater than 0".into(),
            ));
        }
        if self.oauth.client_id.is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }
        Ok(())
    }

    /// Request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    /// The identity/endpoint slice the authorization flow needs.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            client_id: self.oauth.client_id.clone(),
            client_secret: self
                .oauth
                .client_secret
                .as_ref()
                .map(Secret::expose_cloned),
            authorize_endpoint: self.oauth.authorize_endpoint.clone(),
            token_endpoint: self.oauth.token_endpoint.clone(),
            redirect_uri: self.oauth.redirect_uri.clone(),
        }
    }
}
