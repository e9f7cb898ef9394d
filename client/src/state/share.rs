//! Share-token cache.
//!
//! Redeeming a conversation share token yields an access token; the console
//! caches those under `shareToken_<token>` keys in a JSON file so revisiting
//! a shared conversation does not redeem again.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::ClientError;

/// File-backed map of `shareToken_<token>` keys to cached access tokens.
#[derive(Debug)]
pub struct ShareTokenCache {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl ShareTokenCache {
    /// Load the cache file, starting empty when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(error) if error.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(error) => return Err(ClientError::Cache(error)),
        };
        Ok(Self { path, entries })
    }

    /// Cached access token for a share token, if present.
    #[must_use]
    pub fn get(&self, share_token: &str) -> Option<&str> {
        self.entries.get(&Self::key(share_token)).map(String::as_str)
    }

    /// Store an access token and persist the cache file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn put(&mut self, share_token: &str, access_token: &str) -> Result<(), ClientError> {
        self.entries
            .insert(Self::key(share_token), access_token.to_owned());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    fn key(share_token: &str) -> String {
        format!("shareToken_{share_token}")
    }
}

#[cfg(test)]
#[path = "share_test.rs"]
mod tests;
