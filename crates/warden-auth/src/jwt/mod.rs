//! Signed bearer tokens: claims, signing, verification, and fingerprints.

pub mod claims;
pub mod decoder;
pub mod encoder;
pub mod fingerprint;

pub use claims::{ClaimSet, RefreshClaims, TokenType};
pub use decoder::JwtDecoder;
pub use encoder::JwtEncoder;
pub use fingerprint::fingerprint;
