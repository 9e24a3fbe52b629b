//! Shared credential holder
//!
//! The single swap point for the credential shared by concurrent
//! operations. Readers get an `Arc` snapshot; a completing authorization
//! flow publishes a replacement whole. An operation that read the old
//! credential keeps using its snapshot; operations starting after the
//! publish see the new one.

use std::sync::{Arc, PoisonError, RwLock};

use crate::credential::Credential;

/// Copy-on-write holder for the current credential.
#[derive(Default)]
pub struct SessionHolder {
    current: RwLock<Option<Arc<Credential>>>,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(credential))),
        }
    }

    /// Snapshot of the current credential, if any.
    pub fn current(&self) -> Option<Arc<Credential>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the shared credential and return the published snapshot.
    pub fn publish(&self, credential: Credential) -> Arc<Credential> {
        let published = Arc::new(credential);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(published.clone());
        published
    }

    /// Drop the shared credential (sign-out).
    pub fn clear(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
