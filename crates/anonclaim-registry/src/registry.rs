use crate::store::RegistryStore;
use crate::types::{ClaimMutation, CommitmentStatus, CreateUtility, UtilityKind, UtilityRecord};
use anonclaim_crypto::{field_bytes_to_fr, ProofSystem};
use anonclaim_types::{ClaimError, ClaimProof, ClaimResult, FieldBytes, Phase, UtilityId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Register,
    Enter,
    Vote,
}

impl Step {
    fn check_phase(self, phase: Phase) -> ClaimResult<()> {
        let matches = match self {
            Step::Register => phase == Phase::Register,
            Step::Enter => phase == Phase::Enter,
            Step::Vote => phase.vote_option().is_some(),
        };
        if matches {
            Ok(())
        } else {
            Err(ClaimError::InvalidPhase(format!(
                "{:?} does not accept a {} proof",
                self, phase
            )))
        }
    }
}

/// Per-utility claim state machine.
///
/// Every mutating call runs its checks and its write while holding the store
/// lock, so two proofs sharing a nullifier cannot both pass the consumed check.
pub struct ClaimRegistry<S: RegistryStore> {
    store: Mutex<S>,
    backend: Arc<dyn ProofSystem>,
    unit_price: u128,
}

impl<S: RegistryStore> ClaimRegistry<S> {
    pub fn new(store: S, backend: Arc<dyn ProofSystem>) -> Self {
        Self {
            store: Mutex::new(store),
            backend,
            unit_price: 0,
        }
    }

    /// Price per registration seat, charged at creation.
    pub fn with_unit_price(mut self, unit_price: u128) -> Self {
        self.unit_price = unit_price;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn unit_price(&self) -> u128 {
        self.unit_price
    }

    pub fn creation_fee(&self, capacity: u64) -> u128 {
        self.unit_price.saturating_mul(u128::from(capacity))
    }

    pub async fn create_utility(&self, request: CreateUtility, payment: u128) -> ClaimResult<UtilityRecord> {
        let mut store = self.store.lock().await;

        if store.utility(&request.id)?.is_some() {
            warn!("Rejected utility {}: already exists", request.id);
            return Err(ClaimError::DuplicateUtility);
        }
        let required = self.creation_fee(request.capacity);
        if payment < required {
            warn!("Rejected utility {}: paid {} of {}", request.id, payment, required);
            return Err(ClaimError::InsufficientPayment {
                required,
                provided: payment,
            });
        }
        if request.kind == (UtilityKind::Poll { options: 0 }) {
            return Err(ClaimError::InvalidPhase("a poll needs at least one option".into()));
        }
        // Ids and roots travel as public inputs, so both must be field elements.
        field_bytes_to_fr(&FieldBytes::from_bytes(*request.id.as_bytes()), "utility id")?;
        field_bytes_to_fr(&request.snapshot_root, "snapshot root")?;

        let record = UtilityRecord::new(request);
        store.commit(ClaimMutation::create(record.clone()))?;
        info!(
            "Created utility {} ({:?}, capacity {}, root {})",
            record.id,
            record.kind,
            record.capacity,
            record.snapshot_root.short_hex()
        );
        Ok(record)
    }

    pub async fn register_claim(&self, proof: &ClaimProof) -> ClaimResult<UtilityRecord> {
        self.submit(proof, Step::Register).await
    }

    pub async fn enter_claim(&self, proof: &ClaimProof) -> ClaimResult<UtilityRecord> {
        self.submit(proof, Step::Enter).await
    }

    pub async fn cast_vote(&self, proof: &ClaimProof) -> ClaimResult<UtilityRecord> {
        self.submit(proof, Step::Vote).await
    }

    pub async fn validate_registration(&self, proof: &ClaimProof) -> ClaimResult<()> {
        self.validate(proof, Step::Register).await
    }

    pub async fn validate_entrance(&self, proof: &ClaimProof) -> ClaimResult<()> {
        self.validate(proof, Step::Enter).await
    }

    pub async fn validate_vote(&self, proof: &ClaimProof) -> ClaimResult<()> {
        self.validate(proof, Step::Vote).await
    }

    async fn validate(&self, proof: &ClaimProof, step: Step) -> ClaimResult<()> {
        let verified = self.verify(proof)?;
        let store = self.store.lock().await;
        self.check(&*store, proof, step, verified).map(|_| ())
    }

    async fn submit(&self, proof: &ClaimProof, step: Step) -> ClaimResult<UtilityRecord> {
        // Verification is pure; only its outcome is ordered behind the lookup.
        let verified = self.verify(proof)?;
        let signals = &proof.public_signals;

        let mut store = self.store.lock().await;
        let mutation = match self.check(&*store, proof, step, verified) {
            Ok(mutation) => mutation,
            Err(e) => {
                warn!(
                    "Rejected {:?} for utility {} (nullifier {}): {}",
                    step,
                    signals.utility_id,
                    signals.claim_nullifier.short_hex(),
                    e
                );
                return Err(e);
            }
        };

        let record = mutation.record.clone();
        store.commit(mutation)?;
        info!(
            "Accepted {} for utility {} (commitment {})",
            signals.phase,
            signals.utility_id,
            signals.claim_commitment.short_hex()
        );
        Ok(record)
    }

    fn verify(&self, proof: &ClaimProof) -> ClaimResult<bool> {
        let verified = self.backend.verify(&proof.points, &proof.public_signals)?;
        debug!(
            "{} verification of nullifier {}: {}",
            self.backend.name(),
            proof.public_signals.claim_nullifier.short_hex(),
            verified
        );
        Ok(verified)
    }

    fn check(&self, store: &S, proof: &ClaimProof, step: Step, verified: bool) -> ClaimResult<ClaimMutation> {
        let signals = &proof.public_signals;
        let id = signals.utility_id;

        let mut record = store
            .utility(&id)?
            .filter(|r| r.created)
            .ok_or(ClaimError::UnknownUtility)?;
        if !verified {
            return Err(ClaimError::InvalidProof);
        }
        step.check_phase(signals.phase)?;
        record.accepts(signals.phase)?;
        if signals.snapshot_root != record.snapshot_root {
            return Err(ClaimError::InvalidSnapshot);
        }

        let nullifier = signals.claim_nullifier;
        let commitment = signals.claim_commitment;
        let consumed = store.is_nullifier_consumed(&id, &nullifier)?;
        let status = store.commitment_status(&id, &commitment)?;

        match step {
            Step::Register => {
                if consumed || status.is_some() {
                    return Err(ClaimError::DuplicateRegistration);
                }
                if record.is_full() {
                    return Err(ClaimError::RegistrationFull);
                }
                record.registration_count += 1;
                Ok(ClaimMutation {
                    record,
                    nullifier: Some(nullifier),
                    commitment: Some((commitment, CommitmentStatus::Registered)),
                })
            }
            Step::Enter => {
                if status.is_none() {
                    return Err(ClaimError::UnknownRegistration);
                }
                if consumed {
                    return Err(ClaimError::DuplicateEntrance);
                }
                record.entrance_count += 1;
                Ok(ClaimMutation {
                    record,
                    nullifier: Some(nullifier),
                    commitment: None,
                })
            }
            Step::Vote => {
                match status {
                    None => return Err(ClaimError::UnknownRegistration),
                    Some(CommitmentStatus::Voted(_)) => return Err(ClaimError::DuplicateVote),
                    Some(CommitmentStatus::Registered) if consumed => {
                        return Err(ClaimError::DuplicateVote)
                    }
                    Some(CommitmentStatus::Registered) => {}
                }
                let option = signals
                    .phase
                    .vote_option()
                    .ok_or_else(|| ClaimError::Internal("vote step without an option".into()))?;
                let tally = usize::try_from(option)
                    .ok()
                    .and_then(|o| o.checked_sub(1))
                    .and_then(|i| record.vote_counts.get_mut(i))
                    .ok_or_else(|| ClaimError::Internal(format!("no tally for option {}", option)))?;
                *tally += 1;
                Ok(ClaimMutation {
                    record,
                    nullifier: Some(nullifier),
                    commitment: Some((commitment, CommitmentStatus::Voted(option))),
                })
            }
        }
    }

    pub async fn utility(&self, id: &UtilityId) -> ClaimResult<UtilityRecord> {
        self.store
            .lock()
            .await
            .utility(id)?
            .filter(|r| r.created)
            .ok_or(ClaimError::UnknownUtility)
    }

    pub async fn utilities(&self) -> ClaimResult<Vec<UtilityRecord>> {
        let store = self.store.lock().await;
        let mut ids = store.utility_ids()?;
        ids.sort();
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = store.utility(&id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub async fn is_created(&self, id: &UtilityId) -> ClaimResult<bool> {
        Ok(self.store.lock().await.utility(id)?.is_some_and(|r| r.created))
    }

    pub async fn snapshot_root(&self, id: &UtilityId) -> ClaimResult<FieldBytes> {
        Ok(self.utility(id).await?.snapshot_root)
    }

    pub async fn metadata_ref(&self, id: &UtilityId) -> ClaimResult<String> {
        Ok(self.utility(id).await?.metadata_ref)
    }

    pub async fn capacity(&self, id: &UtilityId) -> ClaimResult<u64> {
        Ok(self.utility(id).await?.capacity)
    }

    pub async fn registration_count(&self, id: &UtilityId) -> ClaimResult<u64> {
        Ok(self.utility(id).await?.registration_count)
    }

    pub async fn entrance_count(&self, id: &UtilityId) -> ClaimResult<u64> {
        Ok(self.utility(id).await?.entrance_count)
    }

    pub async fn vote_count(&self, id: &UtilityId) -> ClaimResult<u64> {
        Ok(self.utility(id).await?.vote_count())
    }

    pub async fn vote_result(&self, id: &UtilityId, option: u32) -> ClaimResult<u64> {
        self.utility(id)
            .await?
            .vote_result(option)
            .ok_or_else(|| ClaimError::InvalidPhase(format!("utility has no option {}", option)))
    }

    pub async fn is_nullifier_consumed(&self, id: &UtilityId, nullifier: &FieldBytes) -> ClaimResult<bool> {
        self.store.lock().await.is_nullifier_consumed(id, nullifier)
    }

    pub async fn is_registered(&self, id: &UtilityId, commitment: &FieldBytes) -> ClaimResult<bool> {
        Ok(self.store.lock().await.commitment_status(id, commitment)?.is_some())
    }
}
