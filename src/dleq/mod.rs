//! # Batched DLEQ proofs
//!
//! Proves that a batch of pairs `(M_i, Z_i)` satisfies `Z_i = k * M_i` for the
//! same `k` as the commitment `H = k * G`, with a proof whose size does not
//! depend on the batch size.
//!
//! The pairs are folded into two composite points with coefficients derived
//! from a hash of the public inputs, and a single Chaum-Pedersen proof is run
//! over the composites:
//!
//! ```text
//! seed   = SHA256(transcript(G, H, n, M_1, Z_1, ..., M_n, Z_n))
//! c_i    = HashToScalar(seed || I2OSP(i, 8))
//! M*     = sum(c_i * M_i),   Z* = sum(c_i * Z_i)
//! A      = r * G,            B  = r * M*
//! e      = HashToScalar(transcript(G, H, M*, Z*, A, B))
//! s      = r + e * k
//! ```
//!
//! The verifier accepts iff `s * G == A + e * H` and `s * M* == B + e * Z*`.

pub(crate) mod transcript;

use std::fmt::Debug;

use p384::elliptic_curve::subtle::ConstantTimeEq;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::common::{errors::ProofError, group::Group, keys::Commitment};

use self::transcript::Transcript;

const SEED_DOMAIN: &[u8] = b"btd-v1-dleq-seed";
const CHALLENGE_DOMAIN: &[u8] = b"btd-v1-dleq-challenge";
const COMPOSITE_DST: &[u8] = b"btd-v1-dleq-composite";
const CHALLENGE_DST: &[u8] = b"btd-v1-dleq-challenge";

/// Batch proof `(A, B, s)`; the challenge is recomputed by the verifier.
pub struct BatchProof<G: Group> {
    a: G::Elem,
    b: G::Elem,
    s: G::Scalar,
}

impl<G: Group> Clone for BatchProof<G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G: Group> Copy for BatchProof<G> {}

impl<G: Group> Debug for BatchProof<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProof")
            .field("a", &self.a)
            .field("b", &self.b)
            .field("s", &self.s)
            .finish()
    }
}

impl<G: Group> BatchProof<G> {
    /// Length of a serialized proof.
    pub const LEN: usize = 2 * G::ELEM_LEN + G::SCALAR_LEN;

    /// Proves that every `signed[i] == key * blinded[i]` and
    /// `commitment.h == key * commitment.g`.
    ///
    /// # Errors
    /// Returns an error if the batch is empty or its halves differ in length.
    pub fn prove<R: RngCore + CryptoRng>(
        rng: &mut R,
        key: &G::Scalar,
        commitment: &Commitment<G>,
        blinded: &[G::Elem],
        signed: &[G::Elem],
    ) -> Result<Self, ProofError> {
        let nonce = G::random_scalar(rng);
        Self::prove_internal(key, commitment, blinded, signed, nonce)
    }

    /// Proves with a caller-chosen nonce.
    ///
    /// # Errors
    /// Returns an error if the batch is empty or its halves differ in length.
    #[cfg(feature = "kat")]
    pub fn prove_with_nonce(
        key: &G::Scalar,
        commitment: &Commitment<G>,
        blinded: &[G::Elem],
        signed: &[G::Elem],
        nonce: G::Scalar,
    ) -> Result<Self, ProofError> {
        Self::prove_internal(key, commitment, blinded, signed, nonce)
    }

    fn prove_internal(
        key: &G::Scalar,
        commitment: &Commitment<G>,
        blinded: &[G::Elem],
        signed: &[G::Elem],
        nonce: G::Scalar,
    ) -> Result<Self, ProofError> {
        let (m, z) = composites(commitment, blinded, signed)?;
        let a = commitment.g * nonce;
        let b = m * nonce;
        let e = challenge(commitment, &m, &z, &a, &b)?;
        let s = nonce + e * *key;
        Ok(Self { a, b, s })
    }

    /// Verifies the proof against the batch and the commitment.
    ///
    /// # Errors
    /// Returns [`ProofError::ProofVerificationFailed`] if the proof does not
    /// hold, or a shape error if the batch is empty or unbalanced.
    pub fn verify(
        &self,
        commitment: &Commitment<G>,
        blinded: &[G::Elem],
        signed: &[G::Elem],
    ) -> Result<(), ProofError> {
        let (m, z) = composites(commitment, blinded, signed)?;
        let e = challenge(commitment, &m, &z, &self.a, &self.b)?;

        let key_relation = (commitment.g * self.s).ct_eq(&(self.a + commitment.h * e));
        let batch_relation = (m * self.s).ct_eq(&(self.b + z * e));

        if bool::from(key_relation & batch_relation) {
            Ok(())
        } else {
            Err(ProofError::ProofVerificationFailed)
        }
    }

    /// Serializes the proof as `A || B || s`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.extend_from_slice(&G::serialize_elem(&self.a));
        bytes.extend_from_slice(&G::serialize_elem(&self.b));
        bytes.extend_from_slice(&G::serialize_scalar(&self.s));
        bytes
    }

    /// Deserializes a proof produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    /// Returns [`ProofError::InvalidEncoding`] if the length is wrong or a
    /// component does not decode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        if bytes.len() != Self::LEN {
            return Err(ProofError::InvalidEncoding);
        }
        let (a, rest) = bytes.split_at(G::ELEM_LEN);
        let (b, s) = rest.split_at(G::ELEM_LEN);
        Ok(Self {
            a: G::deserialize_elem(a).map_err(|_| ProofError::InvalidEncoding)?,
            b: G::deserialize_elem(b).map_err(|_| ProofError::InvalidEncoding)?,
            s: G::deserialize_scalar(s).map_err(|_| ProofError::InvalidEncoding)?,
        })
    }
}

/// Folds the batch into the composite points `(M*, Z*)`.
fn composites<G: Group>(
    commitment: &Commitment<G>,
    blinded: &[G::Elem],
    signed: &[G::Elem],
) -> Result<(G::Elem, G::Elem), ProofError> {
    if blinded.len() != signed.len() {
        return Err(ProofError::LengthMismatch);
    }
    if blinded.is_empty() {
        return Err(ProofError::EmptyBatch);
    }

    let mut transcript = Transcript::new(SEED_DOMAIN);
    transcript.append_elem::<G>(b"G", &commitment.g);
    transcript.append_elem::<G>(b"H", &commitment.h);
    transcript.append_message(b"n", &(blinded.len() as u64).to_be_bytes());
    for (m, z) in blinded.iter().zip(signed) {
        transcript.append_elem::<G>(b"M", m);
        transcript.append_elem::<G>(b"Z", z);
    }
    let seed = Sha256::digest(transcript.as_bytes());

    let mut m_composite = G::identity_elem();
    let mut z_composite = G::identity_elem();
    for (i, (m, z)) in blinded.iter().zip(signed).enumerate() {
        let index = (i as u64).to_be_bytes();
        let c = G::hash_to_scalar(&[seed.as_slice(), index.as_slice()], COMPOSITE_DST)?;
        m_composite = m_composite + *m * c;
        z_composite = z_composite + *z * c;
    }
    Ok((m_composite, z_composite))
}

fn challenge<G: Group>(
    commitment: &Commitment<G>,
    m: &G::Elem,
    z: &G::Elem,
    a: &G::Elem,
    b: &G::Elem,
) -> Result<G::Scalar, ProofError> {
    let mut transcript = Transcript::new(CHALLENGE_DOMAIN);
    transcript.append_elem::<G>(b"G", &commitment.g);
    transcript.append_elem::<G>(b"H", &commitment.h);
    transcript.append_elem::<G>(b"M", m);
    transcript.append_elem::<G>(b"Z", z);
    transcript.append_elem::<G>(b"A", a);
    transcript.append_elem::<G>(b"B", b);
    Ok(G::hash_to_scalar(&[transcript.as_bytes()], CHALLENGE_DST)?)
}
