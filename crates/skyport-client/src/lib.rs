//! Skyport service client
//!
//! Executes authenticated HTTP operations against the Skyport service:
//! request/response calls, streamed uploads, and progressive downloads,
//! with cooperative cancellation. When the shared credential is missing
//! or expired, an operation transparently runs an authorization flow
//! (consent or silent refresh) before touching the service; concurrent
//! refresh needs are collapsed into a single in-flight flow.
//!
//! The operation lifecycle is a state machine (`operation::handle_event`,
//! pure) driven by an executor task per operation. Callers observe an
//! operation through [`OperationObserver`]: zero or more progress
//! callbacks followed by exactly one terminal callback (completed,
//! failed, or cancelled).

pub mod client;
pub mod config;
pub mod error;
mod executor;
pub mod observer;
pub mod operation;

pub use client::{Client, OperationHandle, OperationRequest};
pub use config::{ClientConfig, OAuthSettings, ServiceSettings};
pub use error::{OperationError, ProviderError};
pub use observer::{OperationInfo, OperationObserver};
