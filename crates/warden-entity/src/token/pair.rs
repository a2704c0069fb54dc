//! Token values handed back to callers.

use serde::{Deserialize, Serialize};

/// The access/refresh pair returned by login and refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    /// Short-lived bearer token.
    pub access_token: String,
    /// Single-use renewal token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}
