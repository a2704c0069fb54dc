//! Two-store token persistence.
//!
//! Refresh records and the revocation blacklist live in a durable store;
//! live claim sets and the per-account session index live in the ephemeral
//! cache. [`TokenRepository`] presents both behind one handle.

pub mod composite;
pub mod durable;
pub mod memory;
pub mod session;

pub use composite::TokenRepository;
pub use durable::DurableTokenStore;
pub use memory::MemoryDurableStore;
pub use session::{ActiveSession, OrphanSweep, SessionStore};
