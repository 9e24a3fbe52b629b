//! Token endpoint client
//!
//! One POST covers both grant shapes: exchanging an authorization code
//! after consent, and exchanging a stored refresh token silently. The
//! request goes through the transport seam like every other network call,
//! as a form-encoded body; the response events are collected here and
//! parsed into a [`TokenResponse`].

use std::fmt;

use bytes::Bytes;
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use skyport_transport::{Payload, ResponseEvent, Transport, TransportRequest};
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

/// Success response from the token endpoint for both grant types.
///
/// `expires_in` is a delta in seconds from the response time; the caller
/// converts it to an absolute timestamp when building the credential.
/// `scope` is the granted scope list, space separated; providers may omit
/// it when the grant was honored as requested.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Failure body from the token endpoint.
#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// The grant presented to the token endpoint.
pub enum Grant {
    /// Code obtained from a consent redirect
    AuthorizationCode(String),
    /// Stored long-lived refresh token
    RefreshToken(String),
}

impl Grant {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode(_) => "authorization_code",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }
}

// The wrapped values are bearer-equivalent secrets; show only the kind.
impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.grant_type())
    }
}

/// Issue the single token-endpoint request for a flow.
///
/// Transport-level failure maps to `Network`; a non-success status or a
/// payload that does not parse maps to `TokenExchange` with whatever the
/// provider said.
pub async fn request_token(
    transport: &dyn Transport,
    config: &AuthConfig,
    grant: &Grant,
    scopes: &[String],
) -> Result<TokenResponse> {
    let url = Url::parse(&config.token_endpoint).map_err(|e| {
        AuthError::Network(format!(
            "invalid token endpoint {:?}: {e}",
            config.token_endpoint
        ))
    })?;

    let encoded = {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("grant_type", grant.grant_type());
        match grant {
            Grant::AuthorizationCode(code) => form.append_pair("code", code),
            Grant::RefreshToken(token) => form.append_pair("refresh_token", token),
        };
        form.append_pair("client_id", &config.client_id);
        if let Some(secret) = &config.client_secret {
            form.append_pair("client_secret", secret);
        }
        form.append_pair("redirect_uri", &config.redirect_uri);
        if !scopes.is_empty() {
            form.append_pair("scope", &scopes.join(" "));
        }
        form.finish()
    };

    let mut request = TransportRequest::new(Method::POST, url);
    request.body = Payload::Bytes {
        content_type: "application/x-www-form-urlencoded".into(),
        data: Bytes::from(encoded),
    };

    debug!(grant = grant.grant_type(), "requesting token");

    let mut stream = transport.send(request).await?;
    let mut status: Option<StatusCode> = None;
    let mut body: Vec<u8> = Vec::new();
    loop {
        match stream.next_event().await {
            ResponseEvent::Headers { status: s, .. } => status = Some(s),
            ResponseEvent::Chunk(chunk) => body.extend_from_slice(&chunk),
            ResponseEvent::Completed => break,
            ResponseEvent::Failed(e) => return Err(e.into()),
        }
    }

    let status =
        status.ok_or_else(|| AuthError::Network("response ended before headers".into()))?;

    if !status.is_success() {
        let parsed: TokenErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        let description = parsed.error_description.unwrap_or_else(|| {
            if body.is_empty() {
                String::from("<no body>")
            } else {
                String::from_utf8_lossy(&body).into_owned()
            }
        });
        return Err(AuthError::TokenExchange {
            status: Some(status.as_u16()),
            code: parsed.error,
            description,
        });
    }

    serde_json::from_slice::<TokenResponse>(&body).map_err(|e| AuthError::TokenExchange {
        status: Some(status.as_u16()),
        code: None,
        description: format!("invalid token response: {e}"),
    })
}
