use std::sync::Arc;

use btd::{
    DEFAULT_MAX_TOKENS, Group, NistP384,
    common::{
        errors::{IssueError, IssueTokenError, ProofError},
        keys::{Commitment, KeyMaterial},
    },
    dleq::BatchProof,
    issuance::{client::Client, server::Issuer},
    wire::{Base64Bytes, Request},
};
use rand::rngs::OsRng;

fn fresh_keys() -> KeyMaterial<NistP384> {
    let key = NistP384::random_scalar(&mut OsRng);
    KeyMaterial::new(vec![key], Commitment::from_key(&key)).unwrap()
}

fn setup() -> (Issuer<NistP384>, Client<NistP384>, Commitment<NistP384>) {
    let keys = fresh_keys();
    let commitment = *keys.commitment();
    (
        Issuer::new(Arc::new(keys), DEFAULT_MAX_TOKENS),
        Client::new(commitment),
        commitment,
    )
}

fn issue_contents(request: Request) -> Vec<Base64Bytes> {
    match request {
        Request::Issue(contents) => contents,
        Request::Redeem(..) => panic!("expected an issue request"),
    }
}

#[test]
fn issuance_cycle() {
    let (issuer, client, _) = setup();

    for n in [1, 2, 17, DEFAULT_MAX_TOKENS] {
        // Client: blind fresh tokens
        let state = client.issue_request(&mut OsRng, n).unwrap();
        let contents = issue_contents(state.request());
        assert_eq!(contents.len(), n);

        // Server: sign the encoded batch
        let batch = issuer.issue(&mut OsRng, &contents).unwrap();
        assert_eq!(batch.signed().len(), n);

        // Client: verify the proof and unblind
        let response = batch.to_response();
        let tokens = client
            .issue_tokens_from_response(&state, &response)
            .unwrap();
        assert_eq!(tokens.len(), n);
    }
}

#[test]
fn batch_size_limits() {
    let (issuer, client, _) = setup();
    let empty: Vec<Base64Bytes> = Vec::new();
    assert_eq!(
        issuer.issue(&mut OsRng, &empty).unwrap_err(),
        IssueError::EmptyBatch
    );

    let state = client
        .issue_request(&mut OsRng, DEFAULT_MAX_TOKENS + 1)
        .unwrap();
    assert_eq!(
        issuer.evaluate(&mut OsRng, state.blinded()).unwrap_err(),
        IssueError::BatchSizeExceeded {
            size: DEFAULT_MAX_TOKENS + 1,
            max: DEFAULT_MAX_TOKENS,
        }
    );

    let small = Issuer::new(Arc::new(fresh_keys()), 2);
    let state = client.issue_request(&mut OsRng, 3).unwrap();
    assert!(matches!(
        small.evaluate(&mut OsRng, state.blinded()),
        Err(IssueError::BatchSizeExceeded { size: 3, max: 2 })
    ));
    assert!(small.evaluate(&mut OsRng, &state.blinded()[..2]).is_ok());
}

#[test]
fn invalid_points_are_rejected_before_signing() {
    let (issuer, client, _) = setup();
    let state = client.issue_request(&mut OsRng, 3).unwrap();
    let mut contents = issue_contents(state.request());

    let mut off_curve = [0xff; 49];
    off_curve[0] = 0x02;
    contents[1] = Base64Bytes(off_curve.to_vec());
    assert_eq!(
        issuer.issue(&mut OsRng, &contents).unwrap_err(),
        IssueError::InvalidPoint { index: 1 }
    );

    // SEC1 identity encoding
    contents[1] = Base64Bytes(vec![0]);
    assert_eq!(
        issuer.issue(&mut OsRng, &contents).unwrap_err(),
        IssueError::InvalidPoint { index: 1 }
    );

    let mut blinded = state.blinded().to_vec();
    blinded[2] = NistP384::identity_elem();
    assert_eq!(
        issuer.evaluate(&mut OsRng, &blinded).unwrap_err(),
        IssueError::InvalidPoint { index: 2 }
    );
}

#[test]
fn tampered_batches_fail_verification() {
    let (issuer, client, _) = setup();
    let state = client.issue_request(&mut OsRng, 5).unwrap();
    let batch = issuer.evaluate(&mut OsRng, state.blinded()).unwrap();

    // Altered signed point
    let mut signed = batch.signed().to_vec();
    signed[3] = signed[3] + NistP384::base_elem();
    assert_eq!(
        client
            .issue_tokens(&state, &signed, batch.proof())
            .unwrap_err(),
        IssueTokenError::InvalidTokenResponse
    );

    // Reordered signed points
    let mut signed = batch.signed().to_vec();
    signed.swap(0, 1);
    assert!(client.issue_tokens(&state, &signed, batch.proof()).is_err());

    // Truncated batch
    assert!(
        client
            .issue_tokens(&state, &batch.signed()[..4], batch.proof())
            .is_err()
    );

    // Proof from another key
    let (other_issuer, _, _) = setup();
    let other = other_issuer.evaluate(&mut OsRng, state.blinded()).unwrap();
    assert!(
        client
            .issue_tokens(&state, other.signed(), other.proof())
            .is_err()
    );
}

#[test]
fn changed_input_needs_fresh_proof() {
    let (issuer, client, commitment) = setup();
    let state = client.issue_request(&mut OsRng, 4).unwrap();
    let first = issuer.evaluate(&mut OsRng, state.blinded()).unwrap();

    let mut blinded = state.blinded().to_vec();
    blinded[0] = NistP384::base_elem() * NistP384::random_scalar(&mut OsRng);
    let second = issuer.evaluate(&mut OsRng, &blinded).unwrap();

    assert!(
        second
            .proof()
            .verify(&commitment, &blinded, second.signed())
            .is_ok()
    );
    assert_eq!(
        first
            .proof()
            .verify(&commitment, &blinded, second.signed()),
        Err(ProofError::ProofVerificationFailed)
    );
}

#[test]
fn proof_encoding() {
    let (issuer, client, _) = setup();
    let state = client.issue_request(&mut OsRng, 2).unwrap();
    let batch = issuer.evaluate(&mut OsRng, state.blinded()).unwrap();

    let bytes = batch.proof().to_bytes();
    assert_eq!(bytes.len(), BatchProof::<NistP384>::LEN);
    let decoded = BatchProof::<NistP384>::from_bytes(&bytes).unwrap();
    assert!(
        client
            .issue_tokens(&state, batch.signed(), &decoded)
            .is_ok()
    );

    assert_eq!(
        BatchProof::<NistP384>::from_bytes(&bytes[1..]).unwrap_err(),
        ProofError::InvalidEncoding
    );
    let mut bad_scalar = bytes.clone();
    let scalar_start = 2 * NistP384::ELEM_LEN;
    bad_scalar[scalar_start..].fill(0xff);
    assert_eq!(
        BatchProof::<NistP384>::from_bytes(&bad_scalar).unwrap_err(),
        ProofError::InvalidEncoding
    );
}

#[test]
fn proof_shape_errors() {
    let (issuer, client, commitment) = setup();
    let state = client.issue_request(&mut OsRng, 2).unwrap();
    let batch = issuer.evaluate(&mut OsRng, state.blinded()).unwrap();

    assert_eq!(
        batch
            .proof()
            .verify(&commitment, state.blinded(), &batch.signed()[..1]),
        Err(ProofError::LengthMismatch)
    );
    assert_eq!(
        batch.proof().verify(&commitment, &[], &[]),
        Err(ProofError::EmptyBatch)
    );
}
