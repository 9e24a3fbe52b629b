//! Observer contract for operation callbacks
//!
//! Callers watch an operation through this trait rather than polling.
//! The contract is strict: zero or more `on_progress` calls, then exactly
//! one terminal call, `on_completed`, `on_failed`, or `on_cancelled`,
//! and nothing after that. Progress fires only for operations flagged as
//! progressive downloads.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use uuid::Uuid;

use crate::error::OperationError;

/// Identity of one operation, handed to every callback.
///
/// `user_state` is an opaque value the caller attached at construction;
/// the client passes it through untouched.
pub struct OperationInfo {
    pub id: Uuid,
    pub method: Method,
    pub path: String,
    pub user_state: Option<Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for OperationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationInfo")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("user_state", &self.user_state.is_some())
            .finish()
    }
}

/// Caller-supplied callbacks for one operation.
pub trait OperationObserver: Send + Sync {
    /// A response chunk arrived on a progressive-download operation.
    /// Chunks arrive in wire order.
    fn on_progress(&self, _operation: &OperationInfo, _chunk: &Bytes) {}

    /// The operation finished with a success status. `body` is the raw
    /// accumulated response; progressive downloads deliver their bytes
    /// through `on_progress` instead and complete with an empty body.
    fn on_completed(&self, operation: &OperationInfo, body: Bytes);

    /// The operation failed. Progress already delivered stands.
    fn on_failed(&self, operation: &OperationInfo, error: OperationError);

    /// The operation was cancelled by the caller.
    fn on_cancelled(&self, operation: &OperationInfo);
}
