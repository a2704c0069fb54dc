//! # warden-core
//!
//! Core crate for Warden. Contains the configuration schemas, the
//! ephemeral-store backend trait, and the unified error system shared by
//! every other Warden crate.
//!
//! This crate has **no** internal dependencies on other Warden crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
