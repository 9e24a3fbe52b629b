//! Authorization flow state machine
//!
//! Pure state machine: receives events, returns (new_state, action). The
//! async driver [`AuthFlow::execute`] performs the I/O implied by each
//! action (present consent, call the token endpoint) and feeds the result
//! back in as the next event.
//!
//! One instance covers one authorization attempt. `execute` consumes the
//! flow, so a completed attempt cannot be re-run; a new attempt means a
//! new instance. Concurrent attempts for the same account are not
//! deduplicated here; the layer that owns the shared credential is
//! expected to start at most one flow at a time.

use skyport_transport::Transport;
use tracing::{debug, info, warn};

use crate::authorize;
use crate::config::AuthConfig;
use crate::consent::{ConsentOutcome, ConsentRequest, ConsentUi};
use crate::credential::{Credential, now_millis};
use crate::error::{AuthError, Result};
use crate::token::{Grant, request_token};

/// Flow states.
///
/// `Failed` is reachable from every non-terminal state; both it and
/// `TokenRetrieved` lead to `Completed` once the outcome has been
/// delivered to the caller.
#[derive(Debug)]
pub enum AuthFlowState {
    /// Nothing has happened yet
    NotStarted,
    /// Waiting on the consent surface for an authorization code
    Authorizing,
    /// Token-endpoint exchange in flight (code or refresh grant)
    RefreshingToken,
    /// Exchange succeeded; outcome not yet delivered
    TokenRetrieved,
    /// Flow failed; outcome not yet delivered
    Failed,
    /// Terminal: outcome delivered
    Completed,
}

impl AuthFlowState {
    pub fn label(&self) -> &'static str {
        match self {
            AuthFlowState::NotStarted => "not_started",
            AuthFlowState::Authorizing => "authorizing",
            AuthFlowState::RefreshingToken => "refreshing_token",
            AuthFlowState::TokenRetrieved => "token_retrieved",
            AuthFlowState::Failed => "failed",
            AuthFlowState::Completed => "completed",
        }
    }
}

/// Events that drive flow transitions.
#[derive(Debug)]
pub enum AuthFlowEvent {
    /// Start the flow. `refresh_token` is `Some` only when a prior
    /// credential can be renewed silently (its grant covers the
    /// requested scopes).
    Execute { refresh_token: Option<String> },
    /// Consent surface returned an authorization code
    CodeReceived(String),
    /// User dismissed the consent surface
    ConsentCancelled,
    /// Consent surface failed
    ConsentFailed(String),
    /// Token endpoint issued a credential
    TokenIssued(Credential),
    /// Token request failed (network or rejection)
    TokenRequestFailed(AuthError),
    /// The outcome has been handed to the caller
    CompletionDelivered,
}

/// Actions the driver executes after a transition.
#[derive(Debug)]
pub enum AuthFlowAction {
    /// Hand the consent request to the consent surface
    PresentConsent,
    /// Issue the token-endpoint request with this grant
    RequestToken { grant: Grant },
    /// Deliver the terminal outcome to the caller
    Complete { outcome: Result<Credential> },
    /// No-op
    None,
}

/// Handle a flow transition. Pure function: no I/O.
pub fn handle_event(state: AuthFlowState, event: AuthFlowEvent) -> (AuthFlowState, AuthFlowAction) {
    match (state, event) {
        // --- Entry decision: silent refresh when possible ---
        (
            AuthFlowState::NotStarted,
            AuthFlowEvent::Execute {
                refresh_token: Some(refresh_token),
            },
        ) => (
            AuthFlowState::RefreshingToken,
            AuthFlowAction::RequestToken {
                grant: Grant::RefreshToken(refresh_token),
            },
        ),

        (AuthFlowState::NotStarted, AuthFlowEvent::Execute { refresh_token: None }) => {
            (AuthFlowState::Authorizing, AuthFlowAction::PresentConsent)
        }

        // --- Authorizing ---
        (AuthFlowState::Authorizing, AuthFlowEvent::CodeReceived(code)) => (
            AuthFlowState::RefreshingToken,
            AuthFlowAction::RequestToken {
                grant: Grant::AuthorizationCode(code),
            },
        ),

        (AuthFlowState::Authorizing, AuthFlowEvent::ConsentCancelled) => (
            AuthFlowState::Failed,
            AuthFlowAction::Complete {
                outcome: Err(AuthError::UserCancelled),
            },
        ),

        (AuthFlowState::Authorizing, AuthFlowEvent::ConsentFailed(reason)) => (
            AuthFlowState::Failed,
            AuthFlowAction::Complete {
                outcome: Err(AuthError::AuthorizationFailed(reason)),
            },
        ),

        // --- RefreshingToken ---
        (AuthFlowState::RefreshingToken, AuthFlowEvent::TokenIssued(credential)) => (
            AuthFlowState::TokenRetrieved,
            AuthFlowAction::Complete {
                outcome: Ok(credential),
            },
        ),

        (AuthFlowState::RefreshingToken, AuthFlowEvent::TokenRequestFailed(error)) => (
            AuthFlowState::Failed,
            AuthFlowAction::Complete {
                outcome: Err(error),
            },
        ),

        // --- Outcome delivered ---
        (
            AuthFlowState::TokenRetrieved | AuthFlowState::Failed,
            AuthFlowEvent::CompletionDelivered,
        ) => (AuthFlowState::Completed, AuthFlowAction::None),

        // --- Invalid/unhandled transition: stay put ---
        (state, _event) => (state, AuthFlowAction::None),
    }
}

/// One authorization attempt.
///
/// Decides between interactive consent and silent refresh, drives the
/// machine above, and resolves to the issued credential or the single
/// terminal error.
pub struct AuthFlow {
    config: AuthConfig,
    scopes: Vec<String>,
}

impl AuthFlow {
    pub fn new(config: AuthConfig, scopes: Vec<String>) -> Self {
        Self { config, scopes }
    }

    /// Run the flow to completion. `prior` is the credential being
    /// replaced, if any; its refresh token is used for silent renewal
    /// when its grant covers the requested scopes.
    pub async fn execute(
        self,
        transport: &dyn Transport,
        consent: &dyn ConsentUi,
        prior: Option<&Credential>,
    ) -> Result<Credential> {
        let refresh_token = prior
            .filter(|c| c.covers_scopes(self.scopes.iter().map(String::as_str)))
            .map(|c| c.refresh_token.clone());

        let mut state = AuthFlowState::NotStarted;
        let mut event = AuthFlowEvent::Execute { refresh_token };

        loop {
            let (next, action) = handle_event(state, event);
            state = next;
            debug!(state = state.label(), "authorization flow transition");

            event = match action {
                AuthFlowAction::PresentConsent => {
                    let request = self.consent_request()?;
                    match consent.present(&request).await {
                        ConsentOutcome::Granted { code } => AuthFlowEvent::CodeReceived(code),
                        ConsentOutcome::Cancelled => AuthFlowEvent::ConsentCancelled,
                        ConsentOutcome::Failed(reason) => AuthFlowEvent::ConsentFailed(reason),
                    }
                }
                AuthFlowAction::RequestToken { grant } => {
                    match request_token(transport, &self.config, &grant, &self.scopes).await {
                        Ok(response) => AuthFlowEvent::TokenIssued(Credential::from_token_response(
                            response,
                            &self.scopes,
                            now_millis(),
                        )),
                        Err(e) => AuthFlowEvent::TokenRequestFailed(e),
                    }
                }
                AuthFlowAction::Complete { outcome } => {
                    let (terminal, _) = handle_event(state, AuthFlowEvent::CompletionDelivered);
                    state = terminal;
                    match &outcome {
                        Ok(_) => info!(state = state.label(), "authorization flow succeeded"),
                        Err(e) => warn!(state = state.label(), error = %e, "authorization flow failed"),
                    }
                    return outcome;
                }
                AuthFlowAction::None => {
                    return Err(AuthError::AuthorizationFailed(
                        "authorization flow stalled".into(),
                    ));
                }
            };
        }
    }

    fn consent_request(&self) -> Result<ConsentRequest> {
        let state = authorize::generate_state_token();
        let authorize_url = authorize::build_authorization_url(&self.config, &self.scopes, &state)?;
        Ok(ConsentRequest {
            authorize_url,
            scopes: self.scopes.clone(),
            redirect_uri: self.config.redirect_uri.clone(),
            state,
        })
    }
}
