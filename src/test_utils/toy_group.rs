//! A toy prime-order group for deterministic tests.
//!
//! Elements are the order-11 subgroup of the multiplicative group modulo 23,
//! generated by `2`. Writing the group additively, `a + b` is `a * b mod 23`
//! and `x * k` is `x^k mod 23`, so discrete logarithms are known by
//! construction: [`ToyGroup::elem(e)`](ToyGroup::elem) is `g^e`.
//!
//! Offers no security whatsoever.

use std::ops::{Add, Mul};

use p384::elliptic_curve::subtle::{Choice, ConstantTimeEq};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::common::{errors::GroupError, group::Group};

const MODULUS: u16 = 23;
const ORDER: u8 = 11;
const GENERATOR: u8 = 2;

/// The toy group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToyGroup;

/// Element of the toy group, a residue modulo 23.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToyElem(u8);

/// Scalar of the toy group, a residue modulo 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToyScalar(u8);

impl ToyGroup {
    /// Returns `g^exponent`.
    #[must_use]
    pub fn elem(exponent: u8) -> ToyElem {
        ToyElem(GENERATOR) * Self::scalar(exponent)
    }

    /// Returns `value mod 11` as a scalar.
    #[must_use]
    pub const fn scalar(value: u8) -> ToyScalar {
        ToyScalar(value % ORDER)
    }
}

impl ToyElem {
    /// Returns the residue modulo 23.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl ToyScalar {
    /// Returns the residue modulo 11.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl Add for ToyElem {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self((u16::from(self.0) * u16::from(rhs.0) % MODULUS) as u8)
    }
}

impl Mul<ToyScalar> for ToyElem {
    type Output = Self;

    fn mul(self, rhs: ToyScalar) -> Self {
        let mut acc = ToyElem(1);
        for _ in 0..rhs.0 {
            acc = acc + self;
        }
        acc
    }
}

impl Add for ToyScalar {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self((self.0 + rhs.0) % ORDER)
    }
}

impl Mul for ToyScalar {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self((u16::from(self.0) * u16::from(rhs.0) % u16::from(ORDER)) as u8)
    }
}

impl ConstantTimeEq for ToyElem {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

impl ConstantTimeEq for ToyScalar {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

impl Group for ToyGroup {
    type Elem = ToyElem;
    type Scalar = ToyScalar;

    const ELEM_LEN: usize = 1;
    const SCALAR_LEN: usize = 1;

    fn base_elem() -> ToyElem {
        ToyElem(GENERATOR)
    }

    fn identity_elem() -> ToyElem {
        ToyElem(1)
    }

    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> ToyScalar {
        ToyScalar(1 + (rng.next_u32() % u32::from(ORDER - 1)) as u8)
    }

    fn invert_scalar(scalar: &ToyScalar) -> Option<ToyScalar> {
        if scalar.0 == 0 {
            return None;
        }
        // Fermat: k^(q - 2) is the inverse modulo the prime q
        let mut acc = ToyScalar(1);
        for _ in 0..ORDER - 2 {
            acc = acc * *scalar;
        }
        Some(acc)
    }

    fn hash_to_curve(input: &[&[u8]], dst: &[u8]) -> Result<ToyElem, GroupError> {
        Ok(Self::base_elem() * Self::hash_to_scalar(input, dst)?)
    }

    /// Never returns zero, so hashed coefficients cannot cancel a batch entry.
    fn hash_to_scalar(input: &[&[u8]], dst: &[u8]) -> Result<ToyScalar, GroupError> {
        if dst.is_empty() {
            return Err(GroupError::HashToGroup);
        }
        let mut hasher = Sha256::new();
        hasher.update((dst.len() as u64).to_be_bytes());
        hasher.update(dst);
        for msg in input {
            hasher.update(msg);
        }
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let value = u64::from_be_bytes(head) % u64::from(ORDER - 1);
        Ok(ToyScalar(1 + value as u8))
    }

    fn serialize_elem(elem: &ToyElem) -> Vec<u8> {
        vec![elem.0]
    }

    fn deserialize_elem(bytes: &[u8]) -> Result<ToyElem, GroupError> {
        let [value] = bytes else {
            return Err(GroupError::InvalidElement);
        };
        let elem = ToyElem(*value);
        let in_subgroup = u16::from(*value) < MODULUS && elem * ToyScalar(ORDER) == ToyElem(1);
        if *value <= 1 || !in_subgroup {
            return Err(GroupError::InvalidElement);
        }
        Ok(elem)
    }

    fn serialize_scalar(scalar: &ToyScalar) -> Vec<u8> {
        vec![scalar.0]
    }

    fn deserialize_scalar(bytes: &[u8]) -> Result<ToyScalar, GroupError> {
        match bytes {
            [value] if *value < ORDER => Ok(ToyScalar(*value)),
            _ => Err(GroupError::InvalidScalar),
        }
    }
}
