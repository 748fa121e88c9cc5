//! Prime-order group abstraction used by the protocol engine.

use std::fmt::Debug;
use std::ops::{Add, Mul};

use p384::elliptic_curve::{
    Field, PrimeField,
    group::Group as _,
    hash2curve::{ExpandMsgXmd, GroupDigest},
    sec1::{FromEncodedPoint, ToEncodedPoint},
    subtle::ConstantTimeEq,
};
use p384::{AffinePoint, EncodedPoint, FieldBytes, NistP384, NonZeroScalar, ProjectivePoint};
use rand::{CryptoRng, RngCore};
use sha2::Sha384;

use super::errors::GroupError;

/// A prime-order group with hashing, encoding and a random scalar source.
///
/// Element addition is the group operation, and multiplying an element by a
/// scalar is repeated addition. Decoding an element must reject anything that
/// is not a valid, non-identity member of the group.
pub trait Group: Debug + Send + Sync + 'static {
    /// Group element
    type Elem: Copy
        + Debug
        + PartialEq
        + ConstantTimeEq
        + Send
        + Sync
        + Add<Output = Self::Elem>
        + Mul<Self::Scalar, Output = Self::Elem>;
    /// Scalar modulo the group order
    type Scalar: Copy
        + Debug
        + ConstantTimeEq
        + Send
        + Sync
        + Add<Output = Self::Scalar>
        + Mul<Output = Self::Scalar>;

    /// Length of a serialized element
    const ELEM_LEN: usize;
    /// Length of a serialized scalar
    const SCALAR_LEN: usize;

    /// Returns the fixed generator of the group.
    fn base_elem() -> Self::Elem;

    /// Returns the identity element.
    fn identity_elem() -> Self::Elem;

    /// Samples a uniformly random non-zero scalar.
    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Scalar;

    /// Inverts a scalar, returning `None` for zero.
    fn invert_scalar(scalar: &Self::Scalar) -> Option<Self::Scalar>;

    /// Hashes the concatenation of `input` to a group element.
    ///
    /// # Errors
    /// Returns an error if the domain separation tag is unusable.
    fn hash_to_curve(input: &[&[u8]], dst: &[u8]) -> Result<Self::Elem, GroupError>;

    /// Hashes the concatenation of `input` to a scalar.
    ///
    /// # Errors
    /// Returns an error if the domain separation tag is unusable.
    fn hash_to_scalar(input: &[&[u8]], dst: &[u8]) -> Result<Self::Scalar, GroupError>;

    /// Serializes an element to exactly [`Self::ELEM_LEN`] bytes.
    fn serialize_elem(elem: &Self::Elem) -> Vec<u8>;

    /// Decodes and validates an element.
    ///
    /// # Errors
    /// Returns [`GroupError::InvalidElement`] if the bytes are not a valid,
    /// non-identity element.
    fn deserialize_elem(bytes: &[u8]) -> Result<Self::Elem, GroupError>;

    /// Serializes a scalar to exactly [`Self::SCALAR_LEN`] bytes.
    fn serialize_scalar(scalar: &Self::Scalar) -> Vec<u8>;

    /// Decodes a canonical scalar.
    ///
    /// # Errors
    /// Returns [`GroupError::InvalidScalar`] if the bytes are not canonical.
    fn deserialize_scalar(bytes: &[u8]) -> Result<Self::Scalar, GroupError>;

    /// Returns true if the element is the identity, in constant time.
    fn is_identity(elem: &Self::Elem) -> bool {
        bool::from(elem.ct_eq(&Self::identity_elem()))
    }
}

impl Group for NistP384 {
    type Elem = ProjectivePoint;
    type Scalar = p384::Scalar;

    // SEC1 compressed points
    const ELEM_LEN: usize = 49;
    const SCALAR_LEN: usize = 48;

    fn base_elem() -> ProjectivePoint {
        ProjectivePoint::GENERATOR
    }

    fn identity_elem() -> ProjectivePoint {
        ProjectivePoint::IDENTITY
    }

    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> p384::Scalar {
        *NonZeroScalar::random(rng)
    }

    fn invert_scalar(scalar: &p384::Scalar) -> Option<p384::Scalar> {
        Option::from(Field::invert(scalar))
    }

    fn hash_to_curve(input: &[&[u8]], dst: &[u8]) -> Result<ProjectivePoint, GroupError> {
        <NistP384 as GroupDigest>::hash_from_bytes::<ExpandMsgXmd<Sha384>>(input, &[dst])
            .map_err(|_| GroupError::HashToGroup)
    }

    fn hash_to_scalar(input: &[&[u8]], dst: &[u8]) -> Result<p384::Scalar, GroupError> {
        <NistP384 as GroupDigest>::hash_to_scalar::<ExpandMsgXmd<Sha384>>(input, &[dst])
            .map_err(|_| GroupError::HashToGroup)
    }

    fn serialize_elem(elem: &ProjectivePoint) -> Vec<u8> {
        AffinePoint::from(*elem)
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    fn deserialize_elem(bytes: &[u8]) -> Result<ProjectivePoint, GroupError> {
        let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| GroupError::InvalidElement)?;
        let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
        let point = ProjectivePoint::from(affine.ok_or(GroupError::InvalidElement)?);
        if bool::from(point.is_identity()) {
            return Err(GroupError::InvalidElement);
        }
        Ok(point)
    }

    fn serialize_scalar(scalar: &p384::Scalar) -> Vec<u8> {
        scalar.to_repr().to_vec()
    }

    fn deserialize_scalar(bytes: &[u8]) -> Result<p384::Scalar, GroupError> {
        if bytes.len() != Self::SCALAR_LEN {
            return Err(GroupError::InvalidScalar);
        }
        let repr = FieldBytes::clone_from_slice(bytes);
        Option::from(p384::Scalar::from_repr(repr)).ok_or(GroupError::InvalidScalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn p384_rejects_identity_and_garbage() {
        assert_eq!(
            NistP384::deserialize_elem(&[0u8]),
            Err(GroupError::InvalidElement)
        );
        let mut off_field = [0xff; 49];
        off_field[0] = 0x02;
        assert_eq!(
            NistP384::deserialize_elem(&off_field),
            Err(GroupError::InvalidElement)
        );
        assert_eq!(
            NistP384::deserialize_elem(&[]),
            Err(GroupError::InvalidElement)
        );
    }

    #[test]
    fn p384_accepts_compressed_and_uncompressed() {
        let point = NistP384::base_elem() * NistP384::random_scalar(&mut OsRng);
        let compressed = NistP384::serialize_elem(&point);
        assert_eq!(compressed.len(), NistP384::ELEM_LEN);
        assert_eq!(NistP384::deserialize_elem(&compressed), Ok(point));

        let uncompressed = AffinePoint::from(point).to_encoded_point(false);
        assert_eq!(
            NistP384::deserialize_elem(uncompressed.as_bytes()),
            Ok(point)
        );
    }

    #[test]
    fn p384_scalar_encoding_is_strict() {
        let scalar = NistP384::random_scalar(&mut OsRng);
        let bytes = NistP384::serialize_scalar(&scalar);
        assert_eq!(bytes.len(), NistP384::SCALAR_LEN);
        assert!(bool::from(
            NistP384::deserialize_scalar(&bytes).unwrap().ct_eq(&scalar)
        ));
        assert_eq!(
            NistP384::deserialize_scalar(&bytes[1..]).err(),
            Some(GroupError::InvalidScalar)
        );
        assert_eq!(
            NistP384::deserialize_scalar(&[0xff; 48]).err(),
            Some(GroupError::InvalidScalar)
        );
    }
}
