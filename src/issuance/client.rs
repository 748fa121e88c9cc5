//! Client-side implementation of batched issuance.

use std::fmt::Debug;

use rand::{CryptoRng, RngCore};

use crate::{
    common::{
        errors::{IssueTokenError, IssueTokenRequestError},
        group::Group,
        keys::Commitment,
    },
    dleq::BatchProof,
    redemption::{BindingContext, RedeemRequest, derive_key, request_binding, token_point},
    wire::{Base64Bytes, IssueResponse, Request},
};

/// Length of a token preimage.
pub const PREIMAGE_LEN: usize = 32;

/// Issuance client bound to the server's published commitment.
pub struct Client<G: Group> {
    commitment: Commitment<G>,
}

impl<G: Group> Debug for Client<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("commitment", &self.commitment)
            .finish()
    }
}

/// Client state between sending a batch and receiving its signatures.
pub struct TokenState<G: Group> {
    preimages: Vec<[u8; PREIMAGE_LEN]>,
    blinds: Vec<G::Scalar>,
    blinded: Vec<G::Elem>,
}

impl<G: Group> Debug for TokenState<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("tokens", &self.preimages.len())
            .field("blinded", &self.blinded)
            .finish_non_exhaustive()
    }
}

impl<G: Group> TokenState<G> {
    /// Returns the blinded points to send to the server.
    pub fn blinded(&self) -> &[G::Elem] {
        &self.blinded
    }

    /// Builds the `Issue` request for the blinded points.
    #[must_use]
    pub fn request(&self) -> Request {
        Request::Issue(
            self.blinded
                .iter()
                .map(|m| Base64Bytes(G::serialize_elem(m)))
                .collect(),
        )
    }
}

/// An unblinded token, ready to be redeemed once.
pub struct UnblindedToken<G: Group> {
    preimage: [u8; PREIMAGE_LEN],
    shared: G::Elem,
}

impl<G: Group> Debug for UnblindedToken<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnblindedToken")
            .field("preimage", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl<G: Group> UnblindedToken<G> {
    /// Returns the token preimage `t`.
    pub const fn preimage(&self) -> &[u8; PREIMAGE_LEN] {
        &self.preimage
    }

    /// Builds the redemption for a request against `binding`.
    #[must_use]
    pub fn redeem_request(&self, binding: &BindingContext) -> RedeemRequest {
        let mac_key = derive_key::<G>(&self.preimage, &self.shared);
        RedeemRequest {
            preimage: self.preimage.to_vec(),
            tag: request_binding(&mac_key, binding).to_vec(),
        }
    }
}

impl<G: Group> Client<G> {
    /// Creates a client for the given commitment.
    #[must_use]
    pub const fn new(commitment: Commitment<G>) -> Self {
        Self { commitment }
    }

    /// Generates and blinds `count` fresh tokens.
    ///
    /// # Errors
    /// Returns an error if a token cannot be mapped to the curve.
    pub fn issue_request<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> Result<TokenState<G>, IssueTokenRequestError> {
        let mut state = TokenState {
            preimages: Vec::with_capacity(count),
            blinds: Vec::with_capacity(count),
            blinded: Vec::with_capacity(count),
        };
        for _ in 0..count {
            let mut preimage = [0u8; PREIMAGE_LEN];
            rng.fill_bytes(&mut preimage);
            let point = token_point::<G>(&preimage)
                .map_err(|_| IssueTokenRequestError::BlindingError)?;
            let blind = G::random_scalar(rng);
            state.preimages.push(preimage);
            state.blinds.push(blind);
            state.blinded.push(point * blind);
        }
        Ok(state)
    }

    /// Verifies the batch proof and unblinds the signed points.
    ///
    /// # Errors
    /// Returns [`IssueTokenError::InvalidTokenResponse`] if the batch does
    /// not match the request or the proof does not verify.
    pub fn issue_tokens(
        &self,
        state: &TokenState<G>,
        signed: &[G::Elem],
        proof: &BatchProof<G>,
    ) -> Result<Vec<UnblindedToken<G>>, IssueTokenError> {
        if signed.len() != state.blinded.len() {
            return Err(IssueTokenError::InvalidTokenResponse);
        }
        proof
            .verify(&self.commitment, &state.blinded, signed)
            .map_err(|_| IssueTokenError::InvalidTokenResponse)?;

        state
            .preimages
            .iter()
            .zip(&state.blinds)
            .zip(signed)
            .map(|((preimage, blind), z)| {
                let unblind =
                    G::invert_scalar(blind).ok_or(IssueTokenError::InvalidTokenResponse)?;
                Ok(UnblindedToken {
                    preimage: *preimage,
                    shared: *z * unblind,
                })
            })
            .collect()
    }

    /// Decodes an issuance response and unblinds its tokens.
    ///
    /// # Errors
    /// Returns [`IssueTokenError::InvalidTokenResponse`] if a point or the
    /// proof does not decode, or as for [`issue_tokens`](Self::issue_tokens).
    pub fn issue_tokens_from_response(
        &self,
        state: &TokenState<G>,
        response: &IssueResponse,
    ) -> Result<Vec<UnblindedToken<G>>, IssueTokenError> {
        let signed = response
            .sigs
            .iter()
            .map(|z| G::deserialize_elem(z.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| IssueTokenError::InvalidTokenResponse)?;
        let proof = BatchProof::from_bytes(response.proof.as_ref())
            .map_err(|_| IssueTokenError::InvalidTokenResponse)?;
        self.issue_tokens(state, &signed, &proof)
    }
}
