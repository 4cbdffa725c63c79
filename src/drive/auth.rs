//! Authenticated session handle.
//!
//! The interactive OAuth flow happens outside this tool; it must leave behind
//! a bearer token, supplied either directly in the settings (or the
//! `DRIVEUP_API__ACCESS_TOKEN` environment overlay) or via a token file.

use crate::config::ApiSettings;
use crate::error::UploadError;
use std::fmt;

/// An authenticated session against the remote store.
#[derive(Clone)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    /// Build a session from the configured token source.
    pub fn from_settings(api: &ApiSettings) -> Result<Self, UploadError> {
        if let Some(token) = &api.access_token {
            if !token.is_empty() {
                return Ok(Self::new(token.clone()));
            }
        }
        if let Some(path) = &api.token_file {
            let token = std::fs::read_to_string(path)?;
            let token = token.trim();
            if token.is_empty() {
                return Err(UploadError::ConfigError(format!(
                    "token file {:?} is empty",
                    path
                )));
            }
            return Ok(Self::new(token));
        }
        Err(UploadError::ConfigError(
            "no access token configured: set api.access_token or api.token_file".to_string(),
        ))
    }

    /// The bearer token for Authorization headers.
    pub fn bearer(&self) -> &str {
        &self.access_token
    }
}

// Never leak the token through Debug output.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .finish()
    }
}
