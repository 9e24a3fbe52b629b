//! OAuth client identity and endpoint configuration

/// Identity and endpoints an authorization flow needs.
///
/// These identify the registered client application; they are not
/// secrets, with the exception of `client_secret`, which only
/// confidential clients carry. The owning layer builds one of these from
/// its own configuration and hands a clone to each flow.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Registered OAuth client id
    pub client_id: String,
    /// Secret for confidential clients; public clients leave this unset
    pub client_secret: Option<String>,
    /// Consent/authorization endpoint presented to the user
    pub authorize_endpoint: String,
    /// Token endpoint for code exchange and refresh
    pub token_endpoint: String,
    /// Redirect target registered for the client
    pub redirect_uri: String,
}
