//! Operation error types

use serde_json::Value;
use skyport_auth::AuthError;

/// Terminal failure of one operation.
///
/// `Authentication` means the authorization flow failed before any
/// service call was made. `Http` is a response the service did deliver,
/// with the provider's error payload when it parsed. `Stream` is the
/// caller's upload source failing locally; `Network` is everything the
/// wire did wrong.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("service returned HTTP {status}")]
    Http {
        status: u16,
        error: Option<ProviderError>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("upload stream failed: {0}")]
    Stream(String),
}

/// Error payload returned by the service alongside a non-success status.
///
/// Two wire shapes are accepted: the nested object form
/// `{"error":{"code":...,"message":...}}` used by resource endpoints and
/// the flat form `{"error":...,"error_description":...}` used by the
/// identity endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ProviderError {
    /// Parse an error payload out of a response body, if one is there.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(body).ok()?;
        match value.get("error")? {
            Value::String(code) => Some(Self {
                code: Some(code.clone()),
                message: value
                    .get("error_description")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            }),
            Value::Object(fields) => Some(Self {
                code: fields
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                message: fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_flat_identity_shape() {
        let body = br#"{"error":"insufficient_scope","error_description":"needs files.write"}"#;
        let parsed = ProviderError::from_body(body).unwrap();
        assert_eq!(parsed.code.as_deref(), Some("insufficient_scope"));
        assert_eq!(parsed.message.as_deref(), Some("needs files.write"));
    }

    #[test]
    fn parses_the_nested_resource_shape() {
        let body = br#"{"error":{"code":"resource_not_found","message":"no such item"}}"#;
        let parsed = ProviderError::from_body(body).unwrap();
        assert_eq!(parsed.code.as_deref(), Some("resource_not_found"));
        assert_eq!(parsed.message.as_deref(), Some("no such item"));
    }

    #[test]
    fn non_error_bodies_parse_to_none() {
        assert!(ProviderError::from_body(b"").is_none());
        assert!(ProviderError::from_body(b"plain text").is_none());
        assert!(ProviderError::from_body(br#"{"ok":true}"#).is_none());
        assert!(ProviderError::from_body(br#"{"error":42}"#).is_none());
    }

    #[test]
    fn http_error_display_carries_the_status() {
        let err = OperationError::Http {
            status: 403,
            error: ProviderError::from_body(br#"{"error":"insufficient_scope"}"#),
        };
        assert_eq!(err.to_string(), "service returned HTTP 403");
    }

    #[test]
    fn auth_errors_convert_via_from() {
        let err: OperationError = AuthError::UserCancelled.into();
        assert!(matches!(err, OperationError::Authentication(_)));
        assert!(err.to_string().contains("user cancelled"));
    }
}
