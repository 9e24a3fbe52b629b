//! On-disk credential persistence
//!
//! Stores the current credential as a JSON file so a later session can
//! renew silently from the saved refresh token instead of asking the user
//! again. Writes are atomic (temp file + rename) to prevent corruption on
//! crash, the file is 0600 since it holds tokens, and a tokio Mutex
//! serializes writers. One credential per file; account multiplexing is
//! deliberately not supported.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::credential::Credential;
use crate::error::{AuthError, Result};

/// Single-credential file store.
pub struct CredentialFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored credential. A missing file is an empty store, not
    /// an error.
    pub async fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no stored credential");
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AuthError::Storage(format!("reading credential file: {e}")))?;
        let credential: Credential = serde_json::from_str(&contents)
            .map_err(|e| AuthError::CredentialParse(format!("parsing credential file: {e}")))?;
        info!(path = %self.path.display(), "loaded stored credential");
        Ok(Some(credential))
    }

    /// Persist a credential, replacing any previous one.
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let json = serde_json::to_string_pretty(credential)
            .map_err(|e| AuthError::CredentialParse(format!("serializing credential: {e}")))?;

        let dir = self
            .path
            .parent()
            .ok_or_else(|| AuthError::Storage("credential path has no parent directory".into()))?;
        let tmp_path = dir.join(format!(".credential.tmp.{}", std::process::id()));

        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(|e| AuthError::Storage(format!("writing temp credential file: {e}")))?;

        // 0600: the file holds bearer-equivalent tokens (unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&tmp_path, perms)
                .await
                .map_err(|e| {
                    AuthError::Storage(format!("setting credential file permissions: {e}"))
                })?;
        }

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| AuthError::Storage(format!("renaming temp credential file: {e}")))?;

        debug!(path = %self.path.display(), "persisted credential");
        Ok(())
    }

    /// Remove the stored credential (sign-out). Removing an already-empty
    /// store is fine.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "cleared stored credential");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Storage(format!(
                "removing credential file: {e}"
            ))),
        }
    }
}
