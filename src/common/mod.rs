//! Types shared by the issuance and redemption sides.

pub mod errors;
pub mod group;
pub mod keys;
