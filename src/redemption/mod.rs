//! # Token redemption
//!
//! A token is redeemed by presenting its preimage `t` and a tag binding it to
//! the request:
//!
//! ```text
//! T   = HashToCurve(t)
//! N   = k * T
//! key = SHA256("hash_derive_key" || I2OSP(len(t), 8) || t || N)
//! tag = HMAC-SHA256(key, "hash_request_binding" || I2OSP(len(host), 8) || host
//!                                              || I2OSP(len(path), 8) || path)
//! ```
//!
//! The client knows `N` from unblinding the signed point; the server
//! recomputes it under each configured key.

pub mod server;

use hmac::{
    Hmac, Mac,
    digest::{Key, KeyInit},
};
use sha2::{Digest, Sha256};

use crate::common::{errors::GroupError, group::Group};

const HASH_TO_CURVE_DST: &[u8] = b"btd-v1-hash-to-curve";
const DERIVE_KEY_LABEL: &[u8] = b"hash_derive_key";
const REQUEST_BINDING_LABEL: &[u8] = b"hash_request_binding";

/// Length of a request binding tag.
pub const TAG_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// The resource a token is spent against.
///
/// On the server this always comes from the connection envelope, never from
/// the client payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingContext {
    host: String,
    path: String,
}

impl BindingContext {
    /// Creates a binding context.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A redemption attempt: the token preimage and the presented tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemRequest {
    /// Token preimage `t`
    pub preimage: Vec<u8>,
    /// Request binding tag
    pub tag: Vec<u8>,
}

/// Maps a token preimage to its curve point `T`.
pub(crate) fn token_point<G: Group>(preimage: &[u8]) -> Result<G::Elem, GroupError> {
    G::hash_to_curve(&[preimage], HASH_TO_CURVE_DST)
}

/// Derives the MAC key shared between the token holder and the server.
pub(crate) fn derive_key<G: Group>(preimage: &[u8], shared: &G::Elem) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DERIVE_KEY_LABEL);
    hasher.update((preimage.len() as u64).to_be_bytes());
    hasher.update(preimage);
    hasher.update(G::serialize_elem(shared));
    hasher.finalize().into()
}

/// Computes the tag binding a redemption to `binding`.
pub(crate) fn request_binding(key: &[u8; 32], binding: &BindingContext) -> [u8; TAG_LEN] {
    // HMAC zero-pads keys shorter than the block size
    let mut mac_key = Key::<HmacSha256>::default();
    mac_key[..key.len()].copy_from_slice(key);
    let mut mac = <HmacSha256 as KeyInit>::new(&mac_key);
    mac.update(REQUEST_BINDING_LABEL);
    for field in [binding.host.as_bytes(), binding.path.as_bytes()] {
        mac.update(&(field.len() as u64).to_be_bytes());
        mac.update(field);
    }
    mac.finalize().into_bytes().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_key_matches_slice_key() {
        let key = [0x42; 32];
        let binding = BindingContext::new("example.com", "/");
        let mut reference = <HmacSha256 as Mac>::new_from_slice(&key).unwrap();
        reference.update(REQUEST_BINDING_LABEL);
        reference.update(&11u64.to_be_bytes());
        reference.update(b"example.com");
        reference.update(&1u64.to_be_bytes());
        reference.update(b"/");
        let expected: [u8; 32] = reference.finalize().into_bytes().into();
        assert_eq!(request_binding(&key, &binding), expected);
    }

    #[test]
    fn binding_fields_do_not_shift() {
        let key = [7; 32];
        assert_ne!(
            request_binding(&key, &BindingContext::new("ab", "c")),
            request_binding(&key, &BindingContext::new("a", "bc"))
        );
    }
}
