//! Proof backends behind a single prove/verify interface.

mod dev;
mod groth16;

pub use dev::DevBackend;
pub use groth16::Groth16Backend;

use crate::circuit::ClaimWitness;
use crate::tree::InclusionPath;
use anonclaim_types::{
    ClaimError, ClaimProof, ClaimPublicSignals, ClaimResult, ClaimSignature, Phase, ProofPoints,
    Token, UtilityId,
};
use std::num::NonZeroUsize;
use std::thread;
use tracing::debug;

pub trait ProofSystem: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fails with `Unsatisfiable` when no proof exists for the witness.
    fn prove(&self, witness: &ClaimWitness) -> ClaimResult<ClaimProof>;

    /// `Ok(false)` for any proof that does not verify, including malformed
    /// points. `Err` is reserved for backend faults.
    fn verify(&self, points: &ProofPoints, signals: &ClaimPublicSignals) -> ClaimResult<bool>;
}

/// Assembles the witness for one claimant and proves it.
pub fn prove_claim(
    backend: &dyn ProofSystem,
    utility_id: UtilityId,
    phase: Phase,
    token: &Token,
    signature: &ClaimSignature,
    path: &InclusionPath,
) -> ClaimResult<ClaimProof> {
    let witness = ClaimWitness::assemble(utility_id, phase, token, signature, path)?;
    let proof = backend.prove(&witness)?;
    debug!(
        "{} proof for utility {} phase {}: nullifier {}",
        backend.name(),
        utility_id,
        phase,
        proof.public_signals.claim_nullifier.short_hex()
    );
    Ok(proof)
}

/// Proves independent witnesses on scoped worker threads. Results keep the
/// input order.
pub fn prove_batch(backend: &dyn ProofSystem, witnesses: &[ClaimWitness]) -> Vec<ClaimResult<ClaimProof>> {
    if witnesses.is_empty() {
        return Vec::new();
    }

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(witnesses.len());
    let chunk_size = (witnesses.len() + workers - 1) / workers;

    thread::scope(|scope| {
        let handles: Vec<_> = witnesses
            .chunks(chunk_size)
            .map(|chunk| {
                let handle = scope.spawn(move || {
                    chunk.iter().map(|w| backend.prove(w)).collect::<Vec<_>>()
                });
                (chunk.len(), handle)
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|(len, handle)| {
                handle.join().unwrap_or_else(|_| {
                    (0..len)
                        .map(|_| Err(ClaimError::Internal("prover thread panicked".into())))
                        .collect()
                })
            })
            .collect()
    })
}
