//! # btd
//!
//! A blind token issuance and redemption server built on a batched,
//! verifiable oblivious PRF over an elliptic curve group.
//!
//! Clients blind curve points, the server evaluates them under its primary
//! scalar key and returns a single batched DLEQ proof for the whole batch.
//! Unblinded tokens are later redeemed by presenting the token preimage and
//! a MAC tag bound to the HTTP host and path they are spent against.
//!
//! The crate contains:
//!
//!  - The cryptographic core: [`issuance`], [`dleq`], [`redemption`] and the
//!    key material in [`common::keys`]
//!  - The JSON wire envelope in [`wire`]
//!  - The TCP service, metrics and configuration in [`service`] and
//!    [`config`]

#![warn(missing_docs)]
#![deny(unreachable_pub)]
#![deny(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod common;
pub mod config;
pub mod dleq;
pub mod issuance;
pub mod redemption;
pub mod service;
#[cfg(feature = "test-utils")]
pub mod test_utils;
pub mod wire;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

pub use common::group::Group;
pub use p384::NistP384;

/// Maximum number of tokens per issuance batch unless configured otherwise.
pub const DEFAULT_MAX_TOKENS: usize = 100;

/// Identity of a redeemed token, used for double-spend tracking.
pub type TokenId = [u8; 32];

/// Derives the spend-tracking identity of a token preimage.
#[must_use]
pub fn token_id(preimage: &[u8]) -> TokenId {
    Sha256::digest(preimage).into()
}

/// Spend store for tracking redeemed tokens and preventing double spending.
///
/// Implements a three-state machine: **absent → reserved → committed**, with
/// **reserved → absent** via [`release`](SpendStore::release).
///
/// # Security contract
///
/// - [`reserve`](SpendStore::reserve) is atomic: exactly one concurrent
///   caller wins the race, so a token cannot be spent twice by racing two
///   redemptions.
/// - [`release`](SpendStore::release) releases a reservation when the tag
///   does not verify, so a forged tag cannot burn somebody else's token.
/// - [`commit`](SpendStore::commit) finalizes a token after successful
///   verification.
///
/// The store requires interior mutability.
#[async_trait]
pub trait SpendStore: Send + Sync {
    /// Atomically transitions a token from absent to reserved.
    ///
    /// Returns `true` if newly reserved, `false` if already reserved
    /// or committed.
    async fn reserve(&self, token_id: &TokenId) -> bool;

    /// Transitions a token from reserved to committed.
    async fn commit(&self, token_id: &TokenId);

    /// Transitions a token from reserved back to absent.
    async fn release(&self, token_id: &TokenId);
}
