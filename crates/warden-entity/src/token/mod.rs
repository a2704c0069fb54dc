//! Durable token records and issued token values.

pub mod model;
pub mod pair;

pub use model::{BlacklistEntry, RefreshTokenRecord, RevocationReason};
pub use pair::AuthTokens;
