//! Client facade
//!
//! Owns the pieces every operation shares: the base service URL, the
//! transport and consent collaborators, the session holder with the
//! current credential, optional on-disk credential persistence, and the
//! gate that collapses concurrent refresh needs into one authorization
//! flow. `execute` spawns one task per operation and returns a handle
//! for cancellation.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use skyport_auth::{
    AuthConfig, ConsentUi, Credential, CredentialFile, SessionHolder,
};
use skyport_transport::{HttpTransport, Payload, StreamReader, Transport};
use tokio::io::AsyncRead;
use tokio::sync::{Mutex, watch};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::executor::{OperationContext, run_operation};
use crate::observer::{OperationInfo, OperationObserver};

/// One logical call against the service, described before execution.
///
/// The body is either in-memory bytes (default content type
/// `application/json`) or a streaming source (default
/// `application/octet-stream`); both defaults can be overridden. The
/// progressive flag routes response chunks to `on_progress` instead of
/// the accumulator.
pub struct OperationRequest {
    method: Method,
    path: String,
    payload: Payload,
    progressive: bool,
    scopes: Vec<String>,
    user_state: Option<Arc<dyn Any + Send + Sync>>,
}

impl OperationRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: Payload::Empty,
            progressive: false,
            scopes: Vec::new(),
            user_state: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach an in-memory body.
    pub fn body(mut self, data: impl Into<Bytes>) -> Self {
        self.payload = Payload::Bytes {
            content_type: "application/json".into(),
            data: data.into(),
        };
        self
    }

    /// Attach a streaming body. Bytes are read from the source in
    /// bounded chunks as the connection accepts them.
    pub fn stream(mut self, reader: StreamReader) -> Self {
        self.payload = Payload::Stream {
            content_type: "application/octet-stream".into(),
            reader,
        };
        self
    }

    /// Override the content type of the attached body. No effect on an
    /// empty payload.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        match &mut self.payload {
            Payload::Empty => {}
            Payload::Bytes { content_type: ct, .. } | Payload::Stream { content_type: ct, .. } => {
                *ct = content_type.into();
            }
        }
        self
    }

    /// Deliver response chunks through `on_progress` as they arrive
    /// instead of accumulating them.
    pub fn progressive(mut self) -> Self {
        self.progressive = true;
        self
    }

    /// Additional scopes this operation needs beyond the client's
    /// defaults.
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = String>) -> Self {
        self.scopes.extend(scopes);
        self
    }

    /// Opaque value passed through to every observer callback.
    pub fn user_state(mut self, state: Arc<dyn Any + Send + Sync>) -> Self {
        self.user_state = Some(state);
        self
    }
}

/// Shared state behind a [`Client`], referenced by every operation task.
pub(crate) struct ClientInner {
    pub(crate) base_url: Url,
    pub(crate) chunk_size: usize,
    pub(crate) default_scopes: Vec<String>,
    pub(crate) auth_config: AuthConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) consent: Arc<dyn ConsentUi>,
    pub(crate) session: SessionHolder,
    pub(crate) store: Option<CredentialFile>,
    pub(crate) auth_gate: Mutex<()>,
}

/// Handle to an executing operation.
///
/// Dropping the handle does not cancel the operation; it runs to its
/// terminal callback regardless.
pub struct OperationHandle {
    info: Arc<OperationInfo>,
    cancel: watch::Sender<bool>,
    join: tokio::task::JoinHandle<()>,
}

impl OperationHandle {
    pub fn id(&self) -> Uuid {
        self.info.id
    }

    /// Request cooperative cancellation. A no-op once the operation has
    /// reached a terminal state.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the operation's terminal callback to have fired.
    pub async fn wait(self) {
        let _ = self.join.await;
    }
}

/// Authenticated client for the Skyport service.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Build a client over caller-supplied transport and consent
    /// collaborators. The configuration is validated the same way
    /// [`ClientConfig::load`] validates a file.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        consent: Arc<dyn ConsentUi>,
    ) -> common::Result<Self> {
        config.validate()?;

        let mut base_url = Url::parse(&config.service.base_url)
            .map_err(|e| common::Error::Config(format!("invalid base_url: {e}")))?;
        // Relative joins resolve against the last path segment; a
        // trailing slash keeps the configured prefix.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let store = config.oauth.credential_file.clone().map(CredentialFile::new);
        let inner = ClientInner {
            base_url,
            chunk_size: config.service.chunk_size,
            default_scopes: config.oauth.scopes.clone(),
            auth_config: config.auth_config(),
            transport,
            consent,
            session: SessionHolder::new(),
            store,
            auth_gate: Mutex::new(()),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Build a client with the reqwest-backed transport, using the
    /// configured request timeout.
    pub fn with_http_transport(
        config: ClientConfig,
        consent: Arc<dyn ConsentUi>,
    ) -> common::Result<Self> {
        let timeout = Duration::from_secs(config.service.timeout_secs);
        let transport = HttpTransport::new(timeout)
            .map_err(|e| common::Error::Config(format!("building transport: {e}")))?;
        Self::new(config, Arc::new(transport), consent)
    }

    /// Load a persisted credential into the session, if the client has a
    /// credential file and it holds one. Returns whether a credential
    /// was restored.
    pub async fn restore_session(&self) -> skyport_auth::Result<bool> {
        let Some(store) = &self.inner.store else {
            return Ok(false);
        };
        match store.load().await? {
            Some(credential) => {
                self.inner.session.publish(credential);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Install an externally obtained credential as the current session.
    pub fn publish_credential(&self, credential: Credential) -> Arc<Credential> {
        self.inner.session.publish(credential)
    }

    /// Snapshot of the current credential, if any.
    pub fn current_credential(&self) -> Option<Arc<Credential>> {
        self.inner.session.current()
    }

    /// Drop the session credential, and the persisted one if present.
    pub async fn sign_out(&self) -> skyport_auth::Result<()> {
        self.inner.session.clear();
        if let Some(store) = &self.inner.store {
            store.clear().await?;
        }
        Ok(())
    }

    /// Wrap an upload source with the client's configured chunk size.
    pub fn upload_reader(&self, source: impl AsyncRead + Send + Unpin + 'static) -> StreamReader {
        StreamReader::with_chunk_size(source, self.inner.chunk_size)
    }

    /// Start executing an operation. The returned handle cancels or
    /// joins it; all results arrive through the observer.
    pub fn execute(
        &self,
        request: OperationRequest,
        observer: Arc<dyn OperationObserver>,
    ) -> OperationHandle {
        let info = Arc::new(OperationInfo {
            id: Uuid::new_v4(),
            method: request.method,
            path: request.path,
            user_state: request.user_state,
        });

        let mut scopes = self.inner.default_scopes.clone();
        for scope in request.scopes {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }

        debug!(
            operation_id = %info.id,
            method = %info.method,
            path = %info.path,
            "starting operation"
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let ctx = OperationContext {
            info: info.clone(),
            payload: request.payload,
            progressive: request.progressive,
            scopes,
        };
        let join = tokio::spawn(run_operation(
            self.inner.clone(),
            ctx,
            observer,
            cancel_rx,
        ));

        OperationHandle {
            info,
            cancel: cancel_tx,
            join,
        }
    }

    /// Cancel an operation by handle. Equivalent to
    /// [`OperationHandle::cancel`].
    pub fn cancel(&self, handle: &OperationHandle) {
        handle.cancel();
    }
}
