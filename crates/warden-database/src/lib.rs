//! # warden-database
//!
//! PostgreSQL connection management and the concrete repositories backing
//! the durable token store, account lookups, and tenant status checks.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
