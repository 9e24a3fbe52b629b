//! Operation executor
//!
//! One task per operation: drives the pure state machine in
//! `operation`, performing the I/O each action implies: credential
//! resolution (possibly a full authorization flow), request construction
//! and submission, and the response event loop. The cancel signal is a
//! watch channel checked at every suspension point; the executor
//! guarantees exactly one terminal observer callback.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use skyport_auth::{AuthError, AuthFlow, Credential, now_millis};
use skyport_transport::{
    Payload, ResponseEvent, TransportError, TransportRequest,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::ClientInner;
use crate::error::OperationError;
use crate::observer::{OperationInfo, OperationObserver};
use crate::operation::{self, OperationAction, OperationEvent, OperationState};

/// Everything an executor task needs about one operation.
pub(crate) struct OperationContext {
    pub(crate) info: Arc<OperationInfo>,
    pub(crate) payload: Payload,
    pub(crate) progressive: bool,
    pub(crate) scopes: Vec<String>,
}

#[tracing::instrument(
    skip_all,
    fields(operation_id = %ctx.info.id, method = %ctx.info.method, path = %ctx.info.path)
)]
pub(crate) async fn run_operation(
    inner: Arc<ClientInner>,
    ctx: OperationContext,
    observer: Arc<dyn OperationObserver>,
    mut cancel: watch::Receiver<bool>,
) {
    let OperationContext {
        info,
        payload,
        progressive,
        scopes,
    } = ctx;

    let (mut state, action) =
        operation::handle_event(OperationState::Idle, OperationEvent::Execute, progressive);
    if !matches!(action, OperationAction::ResolveCredential) {
        warn!(action = ?action, "unexpected action at start");
        return;
    }

    // Credential resolution, cancellable. No transport exchange exists
    // yet, so cancellation here has nothing to abort.
    let mut credential_slot: Option<Arc<Credential>> = None;
    let event = tokio::select! {
        _ = cancelled(&mut cancel) => OperationEvent::CancelRequested,
        resolved = resolve_credential(&inner, &scopes) => match resolved {
            Ok(credential) => {
                credential_slot = Some(credential);
                OperationEvent::CredentialReady
            }
            Err(e) => OperationEvent::CredentialDenied(e),
        },
    };

    let (next, action) = operation::handle_event(state, event, progressive);
    state = next;
    match action {
        OperationAction::SendRequest => {}
        OperationAction::Fail(error) => {
            warn!(state = state.label(), error = %error, "operation failed");
            observer.on_failed(&info, error);
            return;
        }
        OperationAction::AcknowledgeCancel => {
            info!(state = state.label(), "operation cancelled");
            observer.on_cancelled(&info);
            return;
        }
        other => {
            warn!(action = ?other, "unexpected action after credential resolution");
            return;
        }
    }

    let Some(credential) = credential_slot else {
        observer.on_failed(
            &info,
            OperationError::Network("credential resolution produced no credential".into()),
        );
        return;
    };

    // Request construction is a local failure path: nothing was sent.
    let request = match build_request(&inner, &info, payload, &credential) {
        Ok(request) => request,
        Err(e) => {
            let (next, action) =
                operation::handle_event(state, OperationEvent::TransportFailed(e), progressive);
            state = next;
            if let OperationAction::Fail(error) = action {
                warn!(state = state.label(), error = %error, "operation failed");
                observer.on_failed(&info, error);
            }
            return;
        }
    };

    let submitted = tokio::select! {
        _ = cancelled(&mut cancel) => None,
        result = inner.transport.send(request) => Some(result),
    };
    let mut stream = match submitted {
        None => {
            let (next, action) =
                operation::handle_event(state, OperationEvent::CancelRequested, progressive);
            state = next;
            if matches!(action, OperationAction::AcknowledgeCancel) {
                info!(state = state.label(), "operation cancelled");
                observer.on_cancelled(&info);
            }
            return;
        }
        Some(Ok(stream)) => stream,
        Some(Err(e)) => {
            let (next, action) =
                operation::handle_event(state, OperationEvent::TransportFailed(e), progressive);
            state = next;
            if let OperationAction::Fail(error) = action {
                warn!(state = state.label(), error = %error, "operation failed");
                observer.on_failed(&info, error);
            }
            return;
        }
    };

    // Response event loop. The machine decides everything; this loop
    // only performs the actions.
    loop {
        let event = tokio::select! {
            _ = cancelled(&mut cancel) => OperationEvent::CancelRequested,
            response_event = stream.next_event() => match response_event {
                ResponseEvent::Headers { status, .. } => OperationEvent::HeadersReceived {
                    status: status.as_u16(),
                },
                ResponseEvent::Chunk(chunk) => OperationEvent::ChunkReceived(chunk),
                ResponseEvent::Completed => OperationEvent::ResponseEnded,
                ResponseEvent::Failed(e) => OperationEvent::TransportFailed(e),
            },
        };

        let (next, action) = operation::handle_event(state, event, progressive);
        state = next;
        match action {
            OperationAction::None => {}
            OperationAction::EmitProgress(chunk) => observer.on_progress(&info, &chunk),
            OperationAction::CompleteSuccess { body } => {
                info!(state = state.label(), bytes = body.len(), "operation completed");
                observer.on_completed(&info, body);
                return;
            }
            OperationAction::Fail(error) => {
                warn!(state = state.label(), error = %error, "operation failed");
                observer.on_failed(&info, error);
                return;
            }
            OperationAction::AcknowledgeCancel => {
                stream.abort();
                info!(state = state.label(), "operation cancelled");
                observer.on_cancelled(&info);
                return;
            }
            other => {
                warn!(action = ?other, "unexpected action in response loop");
                return;
            }
        }
    }
}

/// Resolve a usable credential, running an authorization flow when the
/// shared one is missing or expired. The gate collapses concurrent
/// refresh needs into one flow: waiters re-check the session after
/// acquiring and reuse the freshly published credential.
pub(crate) async fn resolve_credential(
    inner: &ClientInner,
    scopes: &[String],
) -> Result<Arc<Credential>, AuthError> {
    if let Some(current) = inner.session.current() {
        if current.is_usable(now_millis()) {
            debug!("credential current, skipping authorization");
            return Ok(current);
        }
    }

    let _gate = inner.auth_gate.lock().await;
    if let Some(current) = inner.session.current() {
        if current.is_usable(now_millis()) {
            debug!("credential refreshed by a concurrent operation");
            return Ok(current);
        }
    }

    let prior = inner.session.current();
    debug!("credential missing or expired, starting authorization flow");
    let flow = AuthFlow::new(inner.auth_config.clone(), scopes.to_vec());
    let credential = flow
        .execute(
            inner.transport.as_ref(),
            inner.consent.as_ref(),
            prior.as_deref(),
        )
        .await?;

    if let Some(store) = &inner.store {
        if let Err(e) = store.save(&credential).await {
            warn!(error = %e, "failed to persist refreshed credential");
        }
    }
    Ok(inner.session.publish(credential))
}

/// Join the operation path against the base service URL and attach the
/// bearer credential.
fn build_request(
    inner: &ClientInner,
    info: &OperationInfo,
    payload: Payload,
    credential: &Credential,
) -> Result<TransportRequest, TransportError> {
    let url = inner
        .base_url
        .join(info.path.trim_start_matches('/'))
        .map_err(|e| TransportError::InvalidRequest(format!("joining path {:?}: {e}", info.path)))?;

    let mut request = TransportRequest::new(info.method.clone(), url);
    let bearer = format!("Bearer {}", credential.access_token);
    let mut value = HeaderValue::from_str(&bearer)
        .map_err(|e| TransportError::InvalidRequest(format!("authorization header: {e}")))?;
    value.set_sensitive(true);
    request.headers.insert(AUTHORIZATION, value);
    request.body = payload;
    Ok(request)
}

/// Resolves when the caller has requested cancellation; never resolves
/// otherwise (a dropped handle means the operation runs to completion).
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
