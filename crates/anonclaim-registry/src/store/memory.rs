use super::{scoped_key, RegistryStore};
use crate::types::{ClaimMutation, CommitmentStatus, UtilityRecord};
use anonclaim_types::{ClaimError, ClaimResult, FieldBytes, UtilityId};
use std::collections::{HashMap, HashSet};

type ScopedKey = [u8; 64];

#[derive(Debug, Default)]
pub struct MemoryStore {
    utilities: HashMap<UtilityId, UtilityRecord>,
    nullifiers: HashSet<ScopedKey>,
    commitments: HashMap<ScopedKey, CommitmentStatus>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryStore {
    fn utility(&self, id: &UtilityId) -> ClaimResult<Option<UtilityRecord>> {
        Ok(self.utilities.get(id).cloned())
    }

    fn utility_ids(&self) -> ClaimResult<Vec<UtilityId>> {
        Ok(self.utilities.keys().copied().collect())
    }

    fn is_nullifier_consumed(&self, id: &UtilityId, nullifier: &FieldBytes) -> ClaimResult<bool> {
        Ok(self.nullifiers.contains(&scoped_key(id, nullifier)))
    }

    fn commitment_status(
        &self,
        id: &UtilityId,
        commitment: &FieldBytes,
    ) -> ClaimResult<Option<CommitmentStatus>> {
        Ok(self.commitments.get(&scoped_key(id, commitment)).copied())
    }

    fn commit(&mut self, mutation: ClaimMutation) -> ClaimResult<()> {
        let id = mutation.record.id;
        let nullifier = mutation.nullifier.map(|n| scoped_key(&id, &n));
        if let Some(key) = nullifier {
            if self.nullifiers.contains(&key) {
                return Err(ClaimError::Storage("nullifier already consumed".into()));
            }
        }

        // Nothing below can fail.
        if let Some(key) = nullifier {
            self.nullifiers.insert(key);
        }
        if let Some((commitment, status)) = mutation.commitment {
            self.commitments.insert(scoped_key(&id, &commitment), status);
        }
        self.utilities.insert(id, mutation.record);
        Ok(())
    }
}
