#![deny(unsafe_code)]
#![warn(clippy::all)]

//! Cryptography for anonymous utility claims: Poseidon over BN254, secp256k1
//! claim signatures, the limb law, snapshot leaves and trees, the claim
//! relation and its proof backends.

pub mod backend;
pub mod circuit;
pub mod leaf;
pub mod limbs;
pub mod poseidon;
pub mod secp256k1_ops;
pub mod signer;
pub mod tree;

pub use backend::{prove_batch, prove_claim, DevBackend, Groth16Backend, ProofSystem};
pub use circuit::{ClaimOutputs, ClaimWitness};
pub use leaf::{encode_leaf, encode_leaf_bytes};
pub use poseidon::{field_bytes_to_fr, fr_to_field_bytes, hash2, hash3, hash4};
pub use secp256k1_ops::{
    derive_eth_address, derive_eth_address_from_private, derive_public_key, generate_private_key,
    keccak256, personal_message_hash,
};
pub use signer::{claim_message, ClaimSigner, SignatureLimbs};
pub use tree::{InclusionPath, Snapshot, SnapshotTree};

pub fn random_bytes<const N: usize>() -> [u8; N] {
    use rand::RngCore;
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
