//! Authorization URL construction
//!
//! Builds the consent URL handed to the consent UI, and generates the
//! random `state` token the client threads through the redirect for CSRF
//! protection. The authorization server returns `state` unchanged in the
//! callback; verifying it is the consent surface's job, since that is
//! where the redirect lands.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use url::Url;

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

/// Random bytes behind a state token.
const STATE_TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random state token, URL-safe base64
/// encoded (no padding).
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the full authorization URL with all required parameters.
pub fn build_authorization_url(
    config: &AuthConfig,
    scopes: &[String],
    state: &str,
) -> Result<String> {
    let mut url = Url::parse(&config.authorize_endpoint).map_err(|e| {
        AuthError::AuthorizationFailed(format!(
            "invalid authorize endpoint {:?}: {e}",
            config.authorize_endpoint
        ))
    })?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &scopes.join(" "))
        .append_pair("state", state);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            client_id: "client-123".into(),
            client_secret: None,
            authorize_endpoint: "https://login.example.com/oauth/authorize".into(),
            token_endpoint: "https://login.example.com/oauth/token".into(),
            redirect_uri: "https://login.example.com/oauth/desktop".into(),
        }
    }

    #[test]
    fn state_tokens_are_url_safe_and_unique() {
        let a = generate_state_token();
        let b = generate_state_token();
        assert_ne!(a, b, "two state tokens must not collide");
        // 32 bytes → 43 base64url chars, no padding
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "state token must be URL-safe base64: {a}"
        );
    }

    #[test]
    fn authorization_url_contains_required_params() {
        let url = build_authorization_url(
            &config(),
            &["files.read".to_string(), "profile.read".to_string()],
            "state-abc",
        )
        .unwrap();

        assert!(url.starts_with("https://login.example.com/oauth/authorize?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=files.read+profile.read"));
        assert!(url.contains("state=state-abc"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Flogin.example.com%2Foauth%2Fdesktop"));
    }

    #[test]
    fn bad_authorize_endpoint_is_rejected() {
        let mut bad = config();
        bad.authorize_endpoint = "not a url".into();
        let result = build_authorization_url(&bad, &[], "s");
        assert!(matches!(result, Err(AuthError::AuthorizationFailed(_))));
    }
}
