//! Constraint system for the claim relation over BN254.
//!
//! Public inputs, in allocation order: snapshot root, claim commitment, claim
//! nullifier, utility id, phase, collection.
//!
//! The signature is verified in-circuit against the personal-sign digest of
//! `utilityId ‖ collection ‖ tokenId`, and the leaf owner is the keccak
//! address of the verifying key. `r` feeds the commitment and nullifier from
//! the same canonical bits the verification uses.

use super::ecdsa::{enforce_signature, uint256_bits, PointVar, ScalarVar, UINT256_BITS};
use super::keccak::{constant_bytes, keccak256, reverse_bytes};
use super::relation::ClaimOutputs;
use super::witness::ClaimWitness;
use crate::poseidon::{field_bytes_to_fr, fr_from_be_bytes, poseidon_config};
use crate::secp256k1_ops::personal_message_prefix;
use anonclaim_types::{
    ClaimError, ClaimResult, FieldBytes, CLAIM_MESSAGE_SIZE, ETH_ADDRESS_SIZE, SNAPSHOT_TREE_DEPTH,
};
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_ff::PrimeField;
use ark_r1cs_std::{
    alloc::AllocVar, boolean::Boolean, eq::EqGadget, fields::fp::FpVar, select::CondSelectGadget,
    ToBitsGadget,
};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError,
};
use ark_secp256k1::{Fq as SecpBase, Fr as SecpScalar};

const LIMB_BITS: usize = 128;
const ADDRESS_BITS: usize = ETH_ADDRESS_SIZE * 8;

#[derive(Clone)]
pub struct ClaimCircuit {
    snapshot_root: Option<Fr>,
    claim_commitment: Option<Fr>,
    claim_nullifier: Option<Fr>,
    utility_id: Option<Fr>,
    phase: Option<Fr>,
    collection: Option<Fr>,

    collection_bytes: Option<[u8; ETH_ADDRESS_SIZE]>,
    token_id: [Option<u128>; 2],
    signature_r: Option<SecpScalar>,
    signature_s: Option<SecpScalar>,
    public_key: Option<(SecpBase, SecpBase)>,
    path_siblings: Vec<Option<Fr>>,
    path_positions: Vec<Option<bool>>,
}

impl ClaimCircuit {
    pub fn new(witness: &ClaimWitness, outputs: &ClaimOutputs) -> ClaimResult<Self> {
        let utility_id = field_bytes_to_fr(&FieldBytes(witness.utility_id.0), "utility id")?;
        let r = witness.signature.r_bytes()?;
        let s = witness.signature.s_bytes()?;
        let public_key = witness.signature.public_key()?;
        let (key_x, key_y) = public_key.as_bytes().split_at(32);

        Ok(Self {
            snapshot_root: Some(outputs.snapshot_root),
            claim_commitment: Some(outputs.claim_commitment),
            claim_nullifier: Some(outputs.claim_nullifier),
            utility_id: Some(utility_id),
            phase: Some(Fr::from(witness.phase.wire())),
            collection: Some(fr_from_be_bytes(&witness.collection.0)),
            collection_bytes: Some(witness.collection.0),
            token_id: witness.token_id.map(Some),
            signature_r: Some(SecpScalar::from_be_bytes_mod_order(&r)),
            signature_s: Some(SecpScalar::from_be_bytes_mod_order(&s)),
            public_key: Some((
                SecpBase::from_be_bytes_mod_order(key_x),
                SecpBase::from_be_bytes_mod_order(key_y),
            )),
            path_siblings: witness.path.siblings.iter().copied().map(Some).collect(),
            path_positions: (0..SNAPSHOT_TREE_DEPTH)
                .map(|level| Some(witness.path.is_right(level)))
                .collect(),
        })
    }

    /// Shape-only instance for key generation.
    pub fn empty() -> Self {
        Self {
            snapshot_root: None,
            claim_commitment: None,
            claim_nullifier: None,
            utility_id: None,
            phase: None,
            collection: None,
            collection_bytes: None,
            token_id: [None; 2],
            signature_r: None,
            signature_s: None,
            public_key: None,
            path_siblings: vec![None; SNAPSHOT_TREE_DEPTH],
            path_positions: vec![None; SNAPSHOT_TREE_DEPTH],
        }
    }

    /// Overrides one public input and leaves every witness as it was.
    #[cfg(test)]
    pub(crate) fn with_public_input(mut self, index: usize, value: Fr) -> Self {
        match index {
            0 => self.snapshot_root = Some(value),
            1 => self.claim_commitment = Some(value),
            2 => self.claim_nullifier = Some(value),
            3 => self.utility_id = Some(value),
            4 => self.phase = Some(value),
            5 => self.collection = Some(value),
            _ => panic!("no public input {}", index),
        }
        self
    }
}

impl ConstraintSynthesizer<Fr> for ClaimCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let snapshot_root = FpVar::new_input(cs.clone(), || {
            self.snapshot_root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let claim_commitment = FpVar::new_input(cs.clone(), || {
            self.claim_commitment.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let claim_nullifier = FpVar::new_input(cs.clone(), || {
            self.claim_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let utility_id = FpVar::new_input(cs.clone(), || {
            self.utility_id.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let phase = FpVar::new_input(cs.clone(), || {
            self.phase.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let collection = FpVar::new_input(cs.clone(), || {
            self.collection.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // 160-bit range check on the public collection.
        let collection_bits = alloc_address_bits(cs.clone(), self.collection_bytes)?;
        Boolean::le_bits_to_fp_var(&collection_bits)?.enforce_equal(&collection)?;

        let token_hi_bits = alloc_limb_bits(cs.clone(), self.token_id[0])?;
        let token_lo_bits = alloc_limb_bits(cs.clone(), self.token_id[1])?;
        let token_hi = Boolean::le_bits_to_fp_var(&token_hi_bits)?;
        let token_lo = Boolean::le_bits_to_fp_var(&token_lo_bits)?;

        let signature_r = ScalarVar::new_witness(cs.clone(), || {
            self.signature_r.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let signature_s = ScalarVar::new_witness(cs.clone(), || {
            self.signature_s.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let public_key = PointVar::new_witness(cs.clone(), self.public_key)?;

        let r_bits = uint256_bits(&signature_r)?;
        let r_lo = Boolean::le_bits_to_fp_var(&r_bits[..LIMB_BITS])?;
        let r_hi = Boolean::le_bits_to_fp_var(&r_bits[LIMB_BITS..])?;

        let mut utility_bits = utility_id.to_bits_le()?;
        utility_bits.resize(UINT256_BITS, Boolean::constant(false));
        let token_bits = [token_lo_bits, token_hi_bits].concat();

        let mut message = constant_bytes(&personal_message_prefix(CLAIM_MESSAGE_SIZE));
        message.extend(reverse_bytes(&utility_bits));
        message.extend(reverse_bytes(&collection_bits));
        message.extend(reverse_bytes(&token_bits));
        let digest = reverse_bytes(&keccak256(&message)?);

        enforce_signature(&digest, &signature_r, &r_bits, &signature_s, &public_key)?;
        let owner = Boolean::le_bits_to_fp_var(&public_key.eth_address_bits()?)?;

        let mut siblings = Vec::with_capacity(SNAPSHOT_TREE_DEPTH);
        for sibling in &self.path_siblings {
            siblings.push(FpVar::new_witness(cs.clone(), || {
                sibling.ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        let mut positions = Vec::with_capacity(SNAPSHOT_TREE_DEPTH);
        for position in &self.path_positions {
            positions.push(Boolean::new_witness(cs.clone(), || {
                position.ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        let leaf = poseidon_hash_var(
            cs.clone(),
            &[collection.clone(), token_hi, token_lo, owner],
        )?;
        let computed_root = merkle_root_var(cs.clone(), &leaf, &siblings, &positions)?;
        computed_root.enforce_equal(&snapshot_root)?;

        let computed_commitment =
            poseidon_hash_var(cs.clone(), &[utility_id, r_hi.clone(), r_lo.clone()])?;
        computed_commitment.enforce_equal(&claim_commitment)?;

        let computed_nullifier = poseidon_hash_var(cs, &[phase, r_hi, r_lo])?;
        computed_nullifier.enforce_equal(&claim_nullifier)?;

        Ok(())
    }
}

/// Little-endian bits of a 128-bit limb.
fn alloc_limb_bits(
    cs: ConstraintSystemRef<Fr>,
    value: Option<u128>,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    (0..LIMB_BITS)
        .map(|i| {
            Boolean::new_witness(cs.clone(), || {
                value
                    .map(|v| (v >> i) & 1 == 1)
                    .ok_or(SynthesisError::AssignmentMissing)
            })
        })
        .collect()
}

/// Little-endian bits of a big-endian address.
fn alloc_address_bits(
    cs: ConstraintSystemRef<Fr>,
    value: Option<[u8; ETH_ADDRESS_SIZE]>,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    (0..ADDRESS_BITS)
        .map(|i| {
            Boolean::new_witness(cs.clone(), || {
                value
                    .map(|bytes| (bytes[ETH_ADDRESS_SIZE - 1 - i / 8] >> (i % 8)) & 1 == 1)
                    .ok_or(SynthesisError::AssignmentMissing)
            })
        })
        .collect()
}

pub fn poseidon_hash_var(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, poseidon_config());
    sponge.absorb(&inputs)?;

    let output = sponge.squeeze_field_elements(1)?;
    Ok(output[0].clone())
}

pub fn merkle_root_var(
    cs: ConstraintSystemRef<Fr>,
    leaf: &FpVar<Fr>,
    siblings: &[FpVar<Fr>],
    is_right: &[Boolean<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut current = leaf.clone();

    for (sibling, right) in siblings.iter().zip(is_right) {
        let left_node = FpVar::conditionally_select(right, sibling, &current)?;
        let right_node = FpVar::conditionally_select(right, &current, sibling)?;
        current = poseidon_hash_var(cs.clone(), &[left_node, right_node])?;
    }

    Ok(current)
}

/// Synthesizes the circuit against a fresh constraint system and reports
/// whether the assignment satisfies it.
pub fn is_satisfied(circuit: ClaimCircuit) -> ClaimResult<bool> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit
        .generate_constraints(cs.clone())
        .map_err(|e| ClaimError::Unsatisfiable(e.to_string()))?;
    cs.is_satisfied()
        .map_err(|e| ClaimError::Unsatisfiable(e.to_string()))
}
