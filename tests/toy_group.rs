use std::sync::Arc;

use btd::{
    Group,
    common::{
        errors::ProofError,
        keys::{Commitment, KeyMaterial},
    },
    dleq::BatchProof,
    issuance::{client::Client, server::Issuer},
    redemption::{BindingContext, server::Verifier},
    test_utils::toy_group::ToyGroup,
};
use rand::rngs::OsRng;

fn toy_keys() -> (Arc<KeyMaterial<ToyGroup>>, Commitment<ToyGroup>) {
    // k0 = 7, G = g, H = g^7
    let commitment = Commitment::new(ToyGroup::elem(1), ToyGroup::elem(7));
    let keys = KeyMaterial::new(vec![ToyGroup::scalar(7)], commitment).unwrap();
    (Arc::new(keys), commitment)
}

#[test]
fn toy_scenario() {
    let (keys, commitment) = toy_keys();
    let issuer = Issuer::new(keys, 100);

    let blinded = [ToyGroup::elem(3)];
    let batch = issuer.evaluate(&mut OsRng, &blinded).unwrap();

    // Z = g^21 = g^10
    assert_eq!(batch.signed(), &[ToyGroup::elem(10)]);
    assert_eq!(batch.signed()[0].value(), 12);
    assert!(
        batch
            .proof()
            .verify(&commitment, &blinded, batch.signed())
            .is_ok()
    );
    assert_eq!(
        batch
            .proof()
            .verify(&commitment, &blinded, &[ToyGroup::elem(9)]),
        Err(ProofError::ProofVerificationFailed)
    );
}

#[test]
fn toy_scenario_every_nonce() {
    let key = ToyGroup::scalar(7);
    let (_, commitment) = toy_keys();
    let blinded = [ToyGroup::elem(3)];
    let signed = [ToyGroup::elem(10)];

    for nonce in 1..11 {
        let proof = BatchProof::prove_with_nonce(
            &key,
            &commitment,
            &blinded,
            &signed,
            ToyGroup::scalar(nonce),
        )
        .unwrap();
        assert!(proof.verify(&commitment, &blinded, &signed).is_ok());
        assert_eq!(
            proof.verify(&commitment, &blinded, &[ToyGroup::elem(9)]),
            Err(ProofError::ProofVerificationFailed)
        );
    }
}

#[test]
fn toy_known_answer() {
    let (_, commitment) = toy_keys();
    let proof = BatchProof::prove_with_nonce(
        &ToyGroup::scalar(7),
        &commitment,
        &[ToyGroup::elem(3)],
        &[ToyGroup::elem(10)],
        ToyGroup::scalar(3),
    )
    .unwrap();
    // A = g^3, B = M*^3, s = 3 + e * 7
    assert_eq!(proof.to_bytes(), vec![8, 9, 7]);
    let decoded = BatchProof::<ToyGroup>::from_bytes(&[8, 9, 7]).unwrap();
    assert_eq!(decoded.to_bytes(), proof.to_bytes());
}

#[test]
fn toy_batches_up_to_max() {
    let (keys, commitment) = toy_keys();
    let issuer = Issuer::new(Arc::clone(&keys), 100);
    let client = Client::new(commitment);
    let verifier = Verifier::new(keys);
    let binding = BindingContext::new("example.com", "/");

    for n in 1..=100 {
        let state = client.issue_request(&mut OsRng, n).unwrap();
        let batch = issuer.evaluate(&mut OsRng, state.blinded()).unwrap();
        for (m, z) in state.blinded().iter().zip(batch.signed()) {
            assert_eq!(*z, *m * ToyGroup::scalar(7));
        }
        let tokens = client
            .issue_tokens(&state, batch.signed(), batch.proof())
            .unwrap();
        assert_eq!(tokens.len(), n);
        let request = tokens[n - 1].redeem_request(&binding);
        assert!(verifier.redeem(&request, &binding).is_ok());
    }
}

#[test]
fn toy_rejects_identity() {
    let (keys, _) = toy_keys();
    let issuer = Issuer::new(keys, 100);
    assert!(
        issuer
            .evaluate(
                &mut OsRng,
                &[ToyGroup::elem(3), ToyGroup::identity_elem()]
            )
            .is_err()
    );
    assert!(issuer.issue(&mut OsRng, &[[1u8]]).is_err());
}
