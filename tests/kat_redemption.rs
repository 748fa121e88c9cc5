use std::sync::Arc;

use btd::{
    common::{
        errors::RedeemError,
        keys::{Commitment, KeyMaterial},
    },
    redemption::{BindingContext, RedeemRequest, server::Verifier},
    test_utils::toy_group::{ToyGroup, ToyScalar},
};

const PREIMAGE: &[u8] = b"btd known answer token";
// T = g^8, N = T^7 = g
const TAG_KEY_7: &str = "ad3beddfefc65ded2d0f67d388ce51f52daa2b3b84a18c87cdc321d2c7a93845";
// N = T^4 = g^10
const TAG_KEY_4: &str = "557fa1b1cb4b0036e3ad059f237b6c2602d950c4a90db2a58736040dacffc1b6";

fn verifier(keys: &[u8]) -> Verifier<ToyGroup> {
    let keys: Vec<ToyScalar> = keys.iter().map(|k| ToyGroup::scalar(*k)).collect();
    let commitment = Commitment::new(ToyGroup::elem(1), ToyGroup::elem(keys[0].value()));
    Verifier::new(Arc::new(KeyMaterial::new(keys, commitment).unwrap()))
}

fn request(tag: &str) -> RedeemRequest {
    RedeemRequest {
        preimage: PREIMAGE.to_vec(),
        tag: hex::decode(tag).unwrap(),
    }
}

#[test]
fn kat_redemption() {
    let binding = BindingContext::new("example.com", "/index.html");

    assert!(verifier(&[7]).redeem(&request(TAG_KEY_7), &binding).is_ok());
    assert!(verifier(&[4]).redeem(&request(TAG_KEY_4), &binding).is_ok());
    assert!(verifier(&[4, 7]).redeem(&request(TAG_KEY_7), &binding).is_ok());
    assert!(verifier(&[7, 4]).redeem(&request(TAG_KEY_4), &binding).is_ok());

    assert_eq!(
        verifier(&[4]).redeem(&request(TAG_KEY_7), &binding),
        Err(RedeemError::VerifyFailed)
    );
    let other = BindingContext::new("example.com", "/index.htm");
    assert_eq!(
        verifier(&[7]).redeem(&request(TAG_KEY_7), &other),
        Err(RedeemError::VerifyFailed)
    );
}
