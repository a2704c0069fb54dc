//! # warden-auth
//!
//! Token issuance, session persistence, and the session lifecycle for
//! Warden.
//!
//! ## Modules
//!
//! - `jwt` — Signed access/refresh tokens and token fingerprints
//! - `password` — Argon2id password hashing
//! - `principal` — Account lookup and tenant gate seams
//! - `store` — Durable and ephemeral token stores behind one repository
//! - `session` — Session lifecycle manager and retention sweeper

pub mod error;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod session;
pub mod store;

pub use error::{AuthError, TokenFault};
pub use jwt::{ClaimSet, JwtDecoder, JwtEncoder, fingerprint};
pub use password::PasswordHasher;
pub use principal::{PrincipalStore, TenantGate};
pub use session::{HealthReport, RetentionSweeper, SessionManager, SweepReport, SweeperHandle};
pub use store::{
    ActiveSession, DurableTokenStore, MemoryDurableStore, SessionStore, TokenRepository,
};
