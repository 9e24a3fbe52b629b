//! Error types for authorization flows

use skyport_transport::TransportError;

/// Errors from an authorization attempt.
///
/// A flow reports exactly one of these per attempt; there is no internal
/// retry. `TokenExchange` carries whatever the provider said about the
/// rejection; `code` and `status` are set when the response included them.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user cancelled authorization")]
    UserCancelled,

    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("token exchange failed: {description}")]
    TokenExchange {
        status: Option<u16>,
        code: Option<String>,
        description: String,
    },

    #[error("credential storage failed: {0}")]
    Storage(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),
}

/// Result alias for authorization operations.
pub type Result<T> = std::result::Result<T, AuthError>;

impl From<TransportError> for AuthError {
    fn from(e: TransportError) -> Self {
        AuthError::Network(e.to_string())
    }
}
