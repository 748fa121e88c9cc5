//! Server-side implementation of token redemption.

use std::fmt::Debug;
use std::sync::Arc;

use p384::elliptic_curve::subtle::{Choice, ConstantTimeEq};

use crate::{
    SpendStore,
    common::{errors::RedeemError, group::Group, keys::KeyMaterial},
    token_id,
};

use super::{BindingContext, RedeemRequest, derive_key, request_binding, token_point};

/// Redemption verifier. Accepts tokens signed under any configured key.
pub struct Verifier<G: Group> {
    keys: Arc<KeyMaterial<G>>,
}

impl<G: Group> Debug for Verifier<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier").field("keys", &self.keys).finish()
    }
}

impl<G: Group> Clone for Verifier<G> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<G: Group> Verifier<G> {
    /// Creates a verifier over the given keys.
    #[must_use]
    pub const fn new(keys: Arc<KeyMaterial<G>>) -> Self {
        Self { keys }
    }

    /// Checks the request binding tag of a token against every key.
    ///
    /// Every key is tried and the tags are compared in constant time, so the
    /// time taken does not reveal which key matched or where a tag differed.
    ///
    /// # Errors
    /// Returns [`RedeemError::VerifyFailed`] if no key reproduces the tag.
    pub fn redeem(
        &self,
        request: &RedeemRequest,
        binding: &BindingContext,
    ) -> Result<(), RedeemError> {
        let point =
            token_point::<G>(&request.preimage).map_err(|_| RedeemError::VerifyFailed)?;

        let mut matched = Choice::from(0);
        for key in self.keys.keys() {
            let shared = point * *key;
            let mac_key = derive_key::<G>(&request.preimage, &shared);
            let expected = request_binding(&mac_key, binding);
            matched |= expected.as_slice().ct_eq(request.tag.as_slice());
        }

        if bool::from(matched) {
            Ok(())
        } else {
            Err(RedeemError::VerifyFailed)
        }
    }

    /// Redeems a token at most once against `store`.
    ///
    /// The token is reserved before its tag is checked. A failed check
    /// releases the reservation, a successful one commits it.
    ///
    /// # Errors
    /// Returns [`RedeemError::DoubleSpending`] if the token was already
    /// redeemed, or [`RedeemError::VerifyFailed`] as for
    /// [`redeem`](Self::redeem).
    pub async fn redeem_once<S: SpendStore + ?Sized>(
        &self,
        store: &S,
        request: &RedeemRequest,
        binding: &BindingContext,
    ) -> Result<(), RedeemError> {
        let id = token_id(&request.preimage);
        if !store.reserve(&id).await {
            return Err(RedeemError::DoubleSpending);
        }
        match self.redeem(request, binding) {
            Ok(()) => {
                store.commit(&id).await;
                Ok(())
            }
            Err(err) => {
                store.release(&id).await;
                Err(err)
            }
        }
    }
}
