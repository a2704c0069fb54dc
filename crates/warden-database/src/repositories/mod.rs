//! Repository implementations for Warden entities.

pub mod account;
pub mod tenant;
pub mod token;

pub use account::AccountRepository;
pub use tenant::TenantRepository;
pub use token::TokenRecordRepository;
