//! Issued credential record
//!
//! A credential is immutable once issued: a completing authorization flow
//! builds a new one and the session holder replaces the old value whole.
//! `expires_at_millis` is an absolute unix timestamp in milliseconds,
//! computed at issuance from the token endpoint's `expires_in` seconds
//! delta plus the current time.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::token::TokenResponse;

/// An issued access/refresh token pair with expiry and granted scopes.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token attached to resource requests
    pub access_token: String,
    /// Long-lived opaque token for silent renewal
    pub refresh_token: String,
    /// Expiration as unix timestamp in milliseconds
    pub expires_at_millis: u64,
    /// Scopes the provider granted
    #[serde(default)]
    pub scopes: BTreeSet<String>,
}

impl Credential {
    /// Whether the access token may still be attached to a request.
    /// Strict comparison: a token at or past its expiry is never used.
    pub fn is_usable(&self, now_millis: u64) -> bool {
        self.expires_at_millis > now_millis
    }

    /// Whether every requested scope was granted on this credential.
    pub fn covers_scopes<'a>(&self, requested: impl IntoIterator<Item = &'a str>) -> bool {
        requested.into_iter().all(|s| self.scopes.contains(s))
    }

    /// Build a credential from a token-endpoint response. When the
    /// response omits the `scope` field, the requested scopes are
    /// recorded as granted.
    pub fn from_token_response(
        response: TokenResponse,
        requested_scopes: &[String],
        now_millis: u64,
    ) -> Self {
        let scopes = match response.scope {
            Some(granted) => granted.split_whitespace().map(str::to_owned).collect(),
            None => requested_scopes.iter().cloned().collect(),
        };
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at_millis: now_millis + response.expires_in * 1000,
            scopes,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at_millis", &self.expires_at_millis)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
