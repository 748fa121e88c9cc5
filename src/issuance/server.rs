//! Server-side implementation of batched issuance.

use std::fmt::Debug;
use std::sync::Arc;

use rand::{CryptoRng, RngCore};

use crate::{
    common::{errors::IssueError, group::Group, keys::KeyMaterial},
    dleq::BatchProof,
};

use super::IssuedBatch;

/// Batch blind evaluator. Signs with the primary key only.
pub struct Issuer<G: Group> {
    keys: Arc<KeyMaterial<G>>,
    max_tokens: usize,
}

impl<G: Group> Debug for Issuer<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Issuer")
            .field("keys", &self.keys)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl<G: Group> Clone for Issuer<G> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
            max_tokens: self.max_tokens,
        }
    }
}

impl<G: Group> Issuer<G> {
    /// Creates an issuer accepting batches of at most `max_tokens` points.
    #[must_use]
    pub const fn new(keys: Arc<KeyMaterial<G>>, max_tokens: usize) -> Self {
        Self { keys, max_tokens }
    }

    /// Returns the configured batch limit.
    #[must_use]
    pub const fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Decodes and signs a batch of serialized blinded points.
    ///
    /// # Errors
    /// Returns [`IssueError::EmptyBatch`], [`IssueError::BatchSizeExceeded`]
    /// or [`IssueError::InvalidPoint`] for a bad batch. No arithmetic happens
    /// before every point has been decoded and validated.
    pub fn issue<R: RngCore + CryptoRng, B: AsRef<[u8]>>(
        &self,
        rng: &mut R,
        blinded: &[B],
    ) -> Result<IssuedBatch<G>, IssueError> {
        self.check_batch_size(blinded.len())?;
        let points = blinded
            .iter()
            .enumerate()
            .map(|(index, bytes)| {
                G::deserialize_elem(bytes.as_ref()).map_err(|_| IssueError::InvalidPoint { index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.sign(rng, &points)
    }

    /// Signs a batch of already decoded blinded points.
    ///
    /// # Errors
    /// Same as [`issue`](Self::issue); identity elements are rejected as
    /// invalid points.
    pub fn evaluate<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        blinded: &[G::Elem],
    ) -> Result<IssuedBatch<G>, IssueError> {
        self.check_batch_size(blinded.len())?;
        if let Some(index) = blinded.iter().position(G::is_identity) {
            return Err(IssueError::InvalidPoint { index });
        }
        self.sign(rng, blinded)
    }

    fn check_batch_size(&self, size: usize) -> Result<(), IssueError> {
        if size == 0 {
            return Err(IssueError::EmptyBatch);
        }
        if size > self.max_tokens {
            return Err(IssueError::BatchSizeExceeded {
                size,
                max: self.max_tokens,
            });
        }
        Ok(())
    }

    fn sign<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        blinded: &[G::Elem],
    ) -> Result<IssuedBatch<G>, IssueError> {
        let key = self.keys.primary();
        let commitment = self.keys.commitment();
        let signed: Vec<G::Elem> = blinded.iter().map(|m| *m * *key).collect();

        let proof = BatchProof::prove(rng, key, commitment, blinded, &signed)
            .map_err(|_| IssueError::ProofGeneration)?;
        proof
            .verify(commitment, blinded, &signed)
            .map_err(|_| IssueError::ProofVerificationFailed)?;

        Ok(IssuedBatch { signed, proof })
    }
}
