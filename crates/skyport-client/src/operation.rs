//! Operation lifecycle state machine
//!
//! Pure state machine: receives events, returns (new_state, action). The
//! executor performs the I/O implied by each action and feeds results
//! back in. The caller-visible lifecycle is Idle → Executing →
//! {Completed, Failed, Cancelled}; "Executing" is refined here into the
//! three in-flight states so cancellation and transport events land
//! precisely.
//!
//! Response bytes accumulate in the `Receiving` state. Progressive
//! operations emit success chunks to the observer instead of
//! accumulating them; error responses always accumulate so the
//! provider's error payload can be captured.

use bytes::Bytes;
use skyport_auth::AuthError;
use skyport_transport::TransportError;

use crate::error::{OperationError, ProviderError};

/// Operation states. The first four are non-terminal.
#[derive(Debug)]
pub enum OperationState {
    /// Constructed, not yet executed
    Idle,
    /// Waiting for a usable credential (may involve a full auth flow)
    ResolvingCredential,
    /// Request submitted, response headers not yet seen
    AwaitingResponse,
    /// Headers seen; body chunks arriving
    Receiving { status: u16, buffer: Vec<u8> },
    /// Terminal: result delivered
    Completed,
    /// Terminal: error delivered
    Failed,
    /// Terminal: caller aborted
    Cancelled,
}

impl OperationState {
    pub fn label(&self) -> &'static str {
        match self {
            OperationState::Idle => "idle",
            OperationState::ResolvingCredential => "resolving_credential",
            OperationState::AwaitingResponse => "awaiting_response",
            OperationState::Receiving { .. } => "receiving",
            OperationState::Completed => "completed",
            OperationState::Failed => "failed",
            OperationState::Cancelled => "cancelled",
        }
    }

    /// Caller-visible "Executing": any in-flight state.
    pub fn is_executing(&self) -> bool {
        matches!(
            self,
            OperationState::ResolvingCredential
                | OperationState::AwaitingResponse
                | OperationState::Receiving { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Completed | OperationState::Failed | OperationState::Cancelled
        )
    }
}

/// Events that drive operation transitions.
#[derive(Debug)]
pub enum OperationEvent {
    /// Start executing
    Execute,
    /// A usable credential is attached; the request can be sent
    CredentialReady,
    /// The authorization flow failed; no request was sent
    CredentialDenied(AuthError),
    /// Response headers arrived
    HeadersReceived { status: u16 },
    /// A response body chunk arrived
    ChunkReceived(Bytes),
    /// Response body ended normally
    ResponseEnded,
    /// The exchange failed at the transport level
    TransportFailed(TransportError),
    /// The caller asked to cancel
    CancelRequested,
}

/// Actions the executor performs after a transition.
#[derive(Debug)]
pub enum OperationAction {
    /// Obtain a usable credential (running an auth flow if needed)
    ResolveCredential,
    /// Build and submit the request
    SendRequest,
    /// Forward a chunk to the observer (progressive download)
    EmitProgress(Bytes),
    /// Deliver the accumulated body as the result
    CompleteSuccess { body: Bytes },
    /// Deliver the terminal error
    Fail(OperationError),
    /// Abort any in-flight exchange and report cancellation
    AcknowledgeCancel,
    /// No-op
    None,
}

/// Handle an operation transition. Pure function: no I/O.
///
/// `progressive` is the per-operation download policy fixed at
/// construction.
pub fn handle_event(
    state: OperationState,
    event: OperationEvent,
    progressive: bool,
) -> (OperationState, OperationAction) {
    match (state, event) {
        // --- Idle ---
        (OperationState::Idle, OperationEvent::Execute) => (
            OperationState::ResolvingCredential,
            OperationAction::ResolveCredential,
        ),

        // --- ResolvingCredential ---
        (OperationState::ResolvingCredential, OperationEvent::CredentialReady) => {
            (OperationState::AwaitingResponse, OperationAction::SendRequest)
        }

        (OperationState::ResolvingCredential, OperationEvent::CredentialDenied(error)) => (
            OperationState::Failed,
            OperationAction::Fail(OperationError::Authentication(error)),
        ),

        // --- AwaitingResponse ---
        (OperationState::AwaitingResponse, OperationEvent::HeadersReceived { status }) => (
            OperationState::Receiving {
                status,
                buffer: Vec::new(),
            },
            OperationAction::None,
        ),

        // --- Receiving ---
        (
            OperationState::Receiving { status, mut buffer },
            OperationEvent::ChunkReceived(chunk),
        ) => {
            if progressive && is_success(status) {
                (
                    OperationState::Receiving { status, buffer },
                    OperationAction::EmitProgress(chunk),
                )
            } else {
                buffer.extend_from_slice(&chunk);
                (
                    OperationState::Receiving { status, buffer },
                    OperationAction::None,
                )
            }
        }

        (OperationState::Receiving { status, buffer }, OperationEvent::ResponseEnded) => {
            if is_success(status) {
                (
                    OperationState::Completed,
                    OperationAction::CompleteSuccess {
                        body: Bytes::from(buffer),
                    },
                )
            } else {
                (
                    OperationState::Failed,
                    OperationAction::Fail(OperationError::Http {
                        status,
                        error: ProviderError::from_body(&buffer),
                    }),
                )
            }
        }

        // --- Transport failure while in flight ---
        (
            OperationState::AwaitingResponse | OperationState::Receiving { .. },
            OperationEvent::TransportFailed(error),
        ) => (
            OperationState::Failed,
            OperationAction::Fail(transport_failure(error)),
        ),

        // --- Cancellation: only while executing ---
        (
            OperationState::ResolvingCredential
            | OperationState::AwaitingResponse
            | OperationState::Receiving { .. },
            OperationEvent::CancelRequested,
        ) => (OperationState::Cancelled, OperationAction::AcknowledgeCancel),

        // --- Anything else (cancel before execute, events after a
        // terminal state) leaves the state untouched ---
        (state, _event) => (state, OperationAction::None),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Local upload-read failures are the caller's stream misbehaving;
/// everything else the wire did wrong is a network error.
fn transport_failure(error: TransportError) -> OperationError {
    match error {
        TransportError::Stream(msg) => OperationError::Stream(msg),
        other => OperationError::Network(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiving(status: u16, buffer: &[u8]) -> OperationState {
        OperationState::Receiving {
            status,
            buffer: buffer.to_vec(),
        }
    }

    #[test]
    fn happy_path_walks_every_state() {
        let (state, action) = handle_event(OperationState::Idle, OperationEvent::Execute, false);
        assert!(matches!(state, OperationState::ResolvingCredential));
        assert!(matches!(action, OperationAction::ResolveCredential));

        let (state, action) = handle_event(state, OperationEvent::CredentialReady, false);
        assert!(matches!(state, OperationState::AwaitingResponse));
        assert!(matches!(action, OperationAction::SendRequest));

        let (state, action) =
            handle_event(state, OperationEvent::HeadersReceived { status: 200 }, false);
        assert!(matches!(state, OperationState::Receiving { status: 200, .. }));
        assert!(matches!(action, OperationAction::None));

        let (state, _) = handle_event(
            state,
            OperationEvent::ChunkReceived(Bytes::from_static(b"hello ")),
            false,
        );
        let (state, _) = handle_event(
            state,
            OperationEvent::ChunkReceived(Bytes::from_static(b"world")),
            false,
        );

        let (state, action) = handle_event(state, OperationEvent::ResponseEnded, false);
        assert!(matches!(state, OperationState::Completed));
        match action {
            OperationAction::CompleteSuccess { body } => {
                assert_eq!(body.as_ref(), b"hello world")
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn auth_failure_fails_without_a_request() {
        let (state, action) = handle_event(
            OperationState::ResolvingCredential,
            OperationEvent::CredentialDenied(skyport_auth::AuthError::UserCancelled),
            false,
        );
        assert!(matches!(state, OperationState::Failed));
        assert!(matches!(
            action,
            OperationAction::Fail(OperationError::Authentication(_))
        ));
    }

    #[test]
    fn error_status_captures_the_provider_payload() {
        let state = receiving(403, b"");
        let (state, _) = handle_event(
            state,
            OperationEvent::ChunkReceived(Bytes::from_static(
                br#"{"error":"insufficient_scope"}"#,
            )),
            false,
        );
        let (state, action) = handle_event(state, OperationEvent::ResponseEnded, false);

        assert!(matches!(state, OperationState::Failed));
        match action {
            OperationAction::Fail(OperationError::Http { status, error }) => {
                assert_eq!(status, 403);
                assert_eq!(
                    error.unwrap().code.as_deref(),
                    Some("insufficient_scope")
                );
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn progressive_success_chunks_are_emitted_not_accumulated() {
        let state = receiving(200, b"");
        let (state, action) = handle_event(
            state,
            OperationEvent::ChunkReceived(Bytes::from_static(b"chunk-1")),
            true,
        );
        match action {
            OperationAction::EmitProgress(chunk) => assert_eq!(chunk.as_ref(), b"chunk-1"),
            other => panic!("unexpected action: {other:?}"),
        }

        let (_, action) = handle_event(state, OperationEvent::ResponseEnded, true);
        match action {
            OperationAction::CompleteSuccess { body } => assert!(body.is_empty()),
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn progressive_error_responses_still_accumulate() {
        let state = receiving(500, b"");
        let (state, action) = handle_event(
            state,
            OperationEvent::ChunkReceived(Bytes::from_static(b"{\"error\":\"oops\"}")),
            true,
        );
        assert!(matches!(action, OperationAction::None));

        let (_, action) = handle_event(state, OperationEvent::ResponseEnded, true);
        match action {
            OperationAction::Fail(OperationError::Http { status: 500, error }) => {
                assert_eq!(error.unwrap().code.as_deref(), Some("oops"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn upload_stream_failure_maps_to_stream_error() {
        let (state, action) = handle_event(
            OperationState::AwaitingResponse,
            OperationEvent::TransportFailed(skyport_transport::TransportError::Stream(
                "source died".into(),
            )),
            false,
        );
        assert!(matches!(state, OperationState::Failed));
        assert!(matches!(
            action,
            OperationAction::Fail(OperationError::Stream(_))
        ));
    }

    #[test]
    fn mid_body_transport_failure_maps_to_network_error() {
        let state = receiving(200, b"partial");
        let (state, action) = handle_event(
            state,
            OperationEvent::TransportFailed(skyport_transport::TransportError::Body(
                "connection reset".into(),
            )),
            false,
        );
        assert!(matches!(state, OperationState::Failed));
        assert!(matches!(
            action,
            OperationAction::Fail(OperationError::Network(_))
        ));
    }

    #[test]
    fn cancel_is_honored_from_every_executing_state() {
        for state in [
            OperationState::ResolvingCredential,
            OperationState::AwaitingResponse,
            receiving(200, b"partial"),
        ] {
            assert!(state.is_executing());
            let (state, action) = handle_event(state, OperationEvent::CancelRequested, false);
            assert!(matches!(state, OperationState::Cancelled));
            assert!(matches!(action, OperationAction::AcknowledgeCancel));
        }
    }

    #[test]
    fn cancel_before_execute_is_a_no_op() {
        let (state, action) =
            handle_event(OperationState::Idle, OperationEvent::CancelRequested, false);
        assert!(matches!(state, OperationState::Idle));
        assert!(matches!(action, OperationAction::None));
    }

    #[test]
    fn terminal_states_are_inert() {
        for state in [
            OperationState::Completed,
            OperationState::Failed,
            OperationState::Cancelled,
        ] {
            assert!(state.is_terminal());
            let label = state.label();
            let (state, action) = handle_event(
                state,
                OperationEvent::ChunkReceived(Bytes::from_static(b"late")),
                false,
            );
            assert_eq!(state.label(), label);
            assert!(matches!(action, OperationAction::None));

            let (state, action) = handle_event(state, OperationEvent::CancelRequested, false);
            assert_eq!(state.label(), label);
            assert!(matches!(action, OperationAction::None));
        }
    }
}
