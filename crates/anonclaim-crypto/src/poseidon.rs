//! Poseidon hash over the BN254 scalar field.
//!
//! Every leaf, tree node, commitment and nullifier in anonclaim goes through
//! this module, and the circuit gadget uses the same configuration, so the two
//! sides can never drift apart.
//!
//! ## Parameters
//! - Field: BN254 Fr
//! - Width: 3 (rate=2, capacity=1)
//! - Full rounds: 8
//! - Partial rounds: 57
//! - S-box: x^5
//! - Round constants: Grain LFSR (arkworks standard)
//!
//! The output is the first element squeezed from the sponge.

use anonclaim_types::{ClaimError, ClaimResult, FieldBytes, FIELD_BYTES_SIZE};
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use ark_ff::{BigInteger, PrimeField};
use std::sync::OnceLock;

static POSEIDON_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    POSEIDON_CONFIG.get_or_init(|| {
        let rate = 2;
        let alpha = 5u64;
        let full_rounds = 8;
        let partial_rounds = 57;
        let field_bits = Fr::MODULUS_BIT_SIZE as u64;

        let (ark, mds) =
            find_poseidon_ark_and_mds::<Fr>(field_bits, rate, full_rounds, partial_rounds, 0);

        PoseidonConfig {
            full_rounds: full_rounds as usize,
            partial_rounds: partial_rounds as usize,
            alpha,
            ark,
            mds,
            rate,
            capacity: 1,
        }
    })
}

pub fn hash_fields(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(poseidon_config());
    for input in inputs {
        sponge.absorb(input);
    }
    let output: Vec<Fr> = sponge.squeeze_field_elements(1);
    output[0]
}

/// Tree nodes.
pub fn hash2(left: Fr, right: Fr) -> Fr {
    hash_fields(&[left, right])
}

/// Commitments and nullifiers.
pub fn hash3(a: Fr, b: Fr, c: Fr) -> Fr {
    hash_fields(&[a, b, c])
}

/// Snapshot leaves.
pub fn hash4(a: Fr, b: Fr, c: Fr, d: Fr) -> Fr {
    hash_fields(&[a, b, c, d])
}

pub fn fr_to_field_bytes(f: &Fr) -> FieldBytes {
    let be = f.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_BYTES_SIZE];
    out[FIELD_BYTES_SIZE - be.len()..].copy_from_slice(&be);
    FieldBytes(out)
}

/// Strict decoding: encodings of values at or above the field modulus are
/// rejected instead of being reduced.
pub fn field_bytes_to_fr(bytes: &FieldBytes, what: &'static str) -> ClaimResult<Fr> {
    let f = Fr::from_be_bytes_mod_order(bytes.as_bytes());
    if fr_to_field_bytes(&f) != *bytes {
        return Err(ClaimError::overflow(what, Fr::MODULUS_BIT_SIZE as usize));
    }
    Ok(f)
}

/// For values known to be narrower than the modulus (addresses, limbs).
pub fn fr_from_be_bytes(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let a = Fr::from(12345u64);
        let b = Fr::from(67890u64);

        assert_eq!(hash2(a, b), hash2(a, b));
        assert_ne!(hash2(a, b), hash2(b, a));
    }

    #[test]
    fn test_arity_separation() {
        let one = Fr::from(1u64);
        let zero = Fr::from(0u64);

        assert_ne!(hash2(one, zero), hash3(one, zero, zero));
        assert_ne!(hash3(one, one, one), hash4(one, one, one, zero));
    }

    #[test]
    fn test_hash4_order_sensitive() {
        let inputs = [1u64, 2, 3, 4].map(Fr::from);
        let forward = hash4(inputs[0], inputs[1], inputs[2], inputs[3]);
        let reversed = hash4(inputs[3], inputs[2], inputs[1], inputs[0]);
        assert_ne!(forward, reversed);
        assert_eq!(forward, hash_fields(&inputs));
    }

    #[test]
    fn test_field_bytes_roundtrip() {
        let original = Fr::from(0xdeadbeefu64);
        let bytes = fr_to_field_bytes(&original);
        assert_eq!(bytes, FieldBytes::from_u64(0xdeadbeef));
        assert_eq!(field_bytes_to_fr(&bytes, "value").unwrap(), original);

        let h = hash2(original, original);
        assert_eq!(field_bytes_to_fr(&fr_to_field_bytes(&h), "hash").unwrap(), h);
    }

    #[test]
    fn test_non_canonical_rejected() {
        let all_ones = FieldBytes([0xff; 32]);
        assert_eq!(
            field_bytes_to_fr(&all_ones, "utility id"),
            Err(ClaimError::overflow("utility id", 254))
        );

        let modulus = Fr::MODULUS.to_bytes_be();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&modulus);
        assert!(field_bytes_to_fr(&FieldBytes(bytes), "value").is_err());
    }
}
