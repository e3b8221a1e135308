//! secp256k1 ECDSA verification on emulated field arithmetic.
//!
//! Coordinates live in secp256k1's base field and scalars in its group order,
//! both emulated over BN254 limbs. Points are affine. A step that would land
//! on the point at infinity, or add two points sharing an x-coordinate,
//! leaves the system unsatisfiable rather than producing a wrong point.

use super::keccak::{keccak256, reverse_bytes};
use anonclaim_types::ETH_ADDRESS_SIZE;
use ark_bn254::Fr;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInteger, Field, One, PrimeField};
use ark_r1cs_std::fields::nonnative::NonNativeFieldVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use ark_secp256k1::{Affine as SecpAffine, Fq as SecpBase, Fr as SecpScalar};

pub type BaseVar = NonNativeFieldVar<SecpBase, Fr>;
pub type ScalarVar = NonNativeFieldVar<SecpScalar, Fr>;

pub const UINT256_BITS: usize = 256;

const OFFSET_SEED: &[u8] = b"anonclaim/ecdsa/offset";

#[derive(Clone)]
pub struct PointVar {
    pub x: BaseVar,
    pub y: BaseVar,
}

impl PointVar {
    pub fn constant(point: SecpAffine) -> Self {
        Self {
            x: BaseVar::constant(point.x),
            y: BaseVar::constant(point.y),
        }
    }

    /// Allocates `(x, y)` and enforces `y² = x³ + 7`.
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        point: Option<(SecpBase, SecpBase)>,
    ) -> Result<Self, SynthesisError> {
        let x = BaseVar::new_witness(cs.clone(), || {
            point.map(|p| p.0).ok_or(SynthesisError::AssignmentMissing)
        })?;
        let y = BaseVar::new_witness(cs, || {
            point.map(|p| p.1).ok_or(SynthesisError::AssignmentMissing)
        })?;

        let rhs = &x.square()? * &x + SecpBase::from(7u64);
        y.square()?.enforce_equal(&rhs)?;
        Ok(Self { x, y })
    }

    /// `self + other` for points with distinct x-coordinates.
    pub fn add_distinct(&self, other: &Self) -> Result<Self, SynthesisError> {
        let lambda = (&other.y - &self.y) * (&other.x - &self.x).inverse()?;
        let x = lambda.square()? - &self.x - &other.x;
        let y = &lambda * &(&self.x - &x) - &self.y;
        Ok(Self { x, y })
    }

    pub fn double(&self) -> Result<Self, SynthesisError> {
        let lambda = (self.x.square()? * SecpBase::from(3u64)) * self.y.double()?.inverse()?;
        let x = lambda.square()? - &self.x.double()?;
        let y = &lambda * &(&self.x - &x) - &self.y;
        Ok(Self { x, y })
    }

    pub fn conditionally_select(
        cond: &Boolean<Fr>,
        if_true: &Self,
        if_false: &Self,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            x: BaseVar::conditionally_select(cond, &if_true.x, &if_false.x)?,
            y: BaseVar::conditionally_select(cond, &if_true.y, &if_false.y)?,
        })
    }

    /// Little-endian bits of `keccak256(x ‖ y)[12..]`, the Ethereum address
    /// of this key.
    pub fn eth_address_bits(&self) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
        let mut encoded = reverse_bytes(&uint256_bits(&self.x)?);
        encoded.extend(reverse_bytes(&uint256_bits(&self.y)?));

        let mut bits = reverse_bytes(&keccak256(&encoded)?);
        bits.truncate(ETH_ADDRESS_SIZE * 8);
        Ok(bits)
    }
}

/// Canonical little-endian bits of an emulated element, padded or cut to
/// 256. Bits past 256 are zero once the value is below the modulus.
pub fn uint256_bits<F: PrimeField>(
    value: &NonNativeFieldVar<F, Fr>,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    let mut bits = value.to_bits_le()?;

    let mut modulus_minus_one = F::MODULUS;
    modulus_minus_one.sub_with_borrow(&F::BigInt::from(1u64));
    Boolean::enforce_smaller_or_equal_than_le(&bits, modulus_minus_one)?;

    bits.resize(UINT256_BITS, Boolean::constant(false));
    Ok(bits)
}

/// `Σ bits[i]·2^i mod n`
pub fn scalar_from_bits(bits: &[Boolean<Fr>]) -> Result<ScalarVar, SynthesisError> {
    let mut acc = ScalarVar::zero();
    let mut power = SecpScalar::one();
    for bit in bits {
        acc = acc + ScalarVar::conditionally_select(
            bit,
            &ScalarVar::constant(power),
            &ScalarVar::zero(),
        )?;
        power.double_in_place();
    }
    Ok(acc)
}

/// Offset the accumulator starts from, and the negation of where that offset
/// ends up after `bits` doublings.
fn offset_points(bits: usize) -> (SecpAffine, SecpAffine) {
    let seed = SecpScalar::from_be_bytes_mod_order(blake3::hash(OFFSET_SEED).as_bytes());
    let offset = (SecpAffine::generator() * seed).into_affine();
    let shifted = offset * SecpScalar::from(2u64).pow([bits as u64]);
    (offset, (-shifted).into_affine())
}

/// `a·G + b·Q`, interleaving both scalars in one double-and-add pass.
/// Scalars are little-endian bit vectors of equal length.
pub fn double_scalar_mul(
    a_bits: &[Boolean<Fr>],
    b_bits: &[Boolean<Fr>],
    q: &PointVar,
) -> Result<PointVar, SynthesisError> {
    if a_bits.len() != b_bits.len() {
        return Err(SynthesisError::Unsatisfiable);
    }

    let g = PointVar::constant(SecpAffine::generator());
    let g_plus_q = g.add_distinct(q)?;
    let (offset, correction) = offset_points(a_bits.len());

    let mut acc = PointVar::constant(offset);
    for (a, b) in a_bits.iter().zip(b_bits).rev() {
        acc = acc.double()?;

        let with_q = PointVar::conditionally_select(a, &g_plus_q, q)?;
        let addend = PointVar::conditionally_select(b, &with_q, &g)?;
        let sum = acc.add_distinct(&addend)?;
        acc = PointVar::conditionally_select(&a.or(b)?, &sum, &acc)?;
    }

    acc.add_distinct(&PointVar::constant(correction))
}

/// Enforces that `(r, s)` verifies under `public_key` for a 256-bit message
/// hash given as little-endian bits. `r_bits` are the canonical bits of `r`.
pub fn enforce_signature(
    digest_bits: &[Boolean<Fr>],
    r: &ScalarVar,
    r_bits: &[Boolean<Fr>],
    s: &ScalarVar,
    public_key: &PointVar,
) -> Result<(), SynthesisError> {
    if digest_bits.len() != UINT256_BITS || r_bits.len() != UINT256_BITS {
        return Err(SynthesisError::Unsatisfiable);
    }
    r.enforce_not_equal(&ScalarVar::zero())?;

    let z = scalar_from_bits(digest_bits)?;
    let s_inv = s.inverse()?;
    let u1 = &z * &s_inv;
    let u2 = r * &s_inv;

    let point = double_scalar_mul(&uint256_bits(&u1)?, &uint256_bits(&u2)?, public_key)?;

    // R.x must equal r as an integer; R.x in [n, p) is not accepted.
    let x_bits = uint256_bits(&point.x)?;
    for (x_bit, r_bit) in x_bits.iter().zip(r_bits) {
        x_bit.enforce_equal(r_bit)?;
    }
    Ok(())
}
