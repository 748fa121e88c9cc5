//! # Batched token issuance
//!
//! The server signs a batch of blinded points under its primary key and
//! proves, with one [`BatchProof`], that every point was signed with the key
//! committed to by `(G, H)`.

pub mod client;
pub mod server;

use std::fmt::Debug;

use crate::{
    common::group::Group,
    dleq::BatchProof,
    wire::{Base64Bytes, IssueResponse},
};

/// Signed points of one batch, in request order, and the proof covering them.
pub struct IssuedBatch<G: Group> {
    pub(crate) signed: Vec<G::Elem>,
    pub(crate) proof: BatchProof<G>,
}

impl<G: Group> Debug for IssuedBatch<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedBatch")
            .field("signed", &self.signed)
            .field("proof", &self.proof)
            .finish()
    }
}

impl<G: Group> IssuedBatch<G> {
    /// Returns the signed points.
    pub fn signed(&self) -> &[G::Elem] {
        &self.signed
    }

    /// Returns the batch proof.
    pub const fn proof(&self) -> &BatchProof<G> {
        &self.proof
    }

    /// Encodes the batch for the wire.
    #[must_use]
    pub fn to_response(&self) -> IssueResponse {
        IssueResponse {
            sigs: self
                .signed
                .iter()
                .map(|z| Base64Bytes(G::serialize_elem(z)))
                .collect(),
            proof: Base64Bytes(self.proof.to_bytes()),
        }
    }
}
