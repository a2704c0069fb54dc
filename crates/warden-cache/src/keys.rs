//! Key builders for every ephemeral-store entry Warden writes.
//!
//! Keys are unprefixed here; the Redis provider applies the configured
//! `key_prefix` on the way in and strips it from scan results.

use uuid::Uuid;

const CLAIMS: &str = "session:claims:";
const ACCOUNT: &str = "session:account:";

/// Key of the claim set stored for a token fingerprint.
pub fn session_claims(fingerprint: &str) -> String {
    format!("{CLAIMS}{fingerprint}")
}

/// Key of the set of live fingerprints for an account.
pub fn account_sessions(account_id: Uuid) -> String {
    format!("{ACCOUNT}{account_id}")
}

/// Pattern matching every per-account session index.
pub fn account_sessions_pattern() -> String {
    format!("{ACCOUNT}*")
}

/// Recover the account id from a per-account index key.
pub fn parse_account_sessions(key: &str) -> Option<Uuid> {
    key.strip_prefix(ACCOUNT)
        .and_then(|id| Uuid::parse_str(id).ok())
}
