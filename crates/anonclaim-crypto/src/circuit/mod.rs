//! The claim relation: witness assembly, native evaluation and the R1CS.

pub mod ecdsa;
pub mod keccak;
pub mod r1cs;
pub mod relation;
pub mod witness;

pub use r1cs::ClaimCircuit;
pub use relation::{claim_commitment, claim_nullifier, evaluate, ClaimOutputs};
pub use witness::ClaimWitness;

/// Full claim-circuit syntheses hold gigabytes each; tests take this lock to
/// run them one at a time.
#[cfg(test)]
pub(crate) fn synthesis_guard() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
