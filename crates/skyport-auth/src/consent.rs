//! Consent surface seam
//!
//! The interactive consent screen is an external collaborator: given the
//! authorization URL and scope list it either produces an authorization
//! code, reports that the user backed out, or fails. How the screen is
//! rendered (embedded webview, system browser, device prompt) is opaque
//! to the authorization flow.

use std::future::Future;
use std::pin::Pin;

/// What the consent surface is asked to present.
#[derive(Debug, Clone)]
pub struct ConsentRequest {
    /// Fully built authorization URL (client id, scopes, state included)
    pub authorize_url: String,
    /// Scopes being requested, in request order
    pub scopes: Vec<String>,
    /// Redirect target the authorization server will send the code to
    pub redirect_uri: String,
    /// CSRF state token embedded in the URL; the surface must check the
    /// redirect echoes it back unchanged
    pub state: String,
}

/// Outcome of one consent presentation.
#[derive(Debug, Clone)]
pub enum ConsentOutcome {
    /// The user approved; the redirect carried this authorization code
    Granted { code: String },
    /// The user dismissed the surface without deciding
    Cancelled,
    /// The surface itself failed (load error, invalid redirect, ...)
    Failed(String),
}

/// External consent collaborator.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn ConsentUi>`).
pub trait ConsentUi: Send + Sync {
    fn present<'a>(
        &'a self,
        request: &'a ConsentRequest,
    ) -> Pin<Box<dyn Future<Output = ConsentOutcome> + Send + 'a>>;
}
