//! Registry persistence. The registry serialises access; a store only has to
//! apply each `ClaimMutation` all or nothing.

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::types::{ClaimMutation, CommitmentStatus, UtilityRecord};
use anonclaim_types::{ClaimResult, FieldBytes, UtilityId, FIELD_BYTES_SIZE, UINT256_SIZE};

pub trait RegistryStore: Send {
    fn utility(&self, id: &UtilityId) -> ClaimResult<Option<UtilityRecord>>;

    fn utility_ids(&self) -> ClaimResult<Vec<UtilityId>>;

    fn is_nullifier_consumed(&self, id: &UtilityId, nullifier: &FieldBytes) -> ClaimResult<bool>;

    fn commitment_status(
        &self,
        id: &UtilityId,
        commitment: &FieldBytes,
    ) -> ClaimResult<Option<CommitmentStatus>>;

    /// Writes the record, consumes the nullifier and sets the commitment status
    /// in one step. Fails without writing anything if the nullifier is
    /// already consumed.
    fn commit(&mut self, mutation: ClaimMutation) -> ClaimResult<()>;
}

/// Nullifiers and commitments are scoped to their utility.
pub(crate) fn scoped_key(id: &UtilityId, value: &FieldBytes) -> [u8; UINT256_SIZE + FIELD_BYTES_SIZE] {
    let mut key = [0u8; UINT256_SIZE + FIELD_BYTES_SIZE];
    key[..UINT256_SIZE].copy_from_slice(id.as_bytes());
    key[UINT256_SIZE..].copy_from_slice(value.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CreateUtility;
    use anonclaim_types::ClaimError;

    fn record(id: u64) -> UtilityRecord {
        UtilityRecord::new(CreateUtility::event(UtilityId::from_u64(id), FieldBytes::from_u64(77), 5))
    }

    /// Behaviour every store must share.
    fn exercise(store: &mut dyn RegistryStore) {
        let id = UtilityId::from_u64(1);
        assert_eq!(store.utility(&id).unwrap(), None);

        store.commit(ClaimMutation::create(record(1))).unwrap();
        store.commit(ClaimMutation::create(record(2))).unwrap();
        let stored = store.utility(&id).unwrap().unwrap();
        assert_eq!(stored.snapshot_root, FieldBytes::from_u64(77));
        assert_eq!(stored.capacity, 5);

        let mut ids = store.utility_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec![UtilityId::from_u64(1), UtilityId::from_u64(2)]);

        let nullifier = FieldBytes::from_u64(10);
        let commitment = FieldBytes::from_u64(20);
        let mut updated = store.utility(&id).unwrap().unwrap();
        updated.registration_count = 1;
        store
            .commit(ClaimMutation {
                record: updated.clone(),
                nullifier: Some(nullifier),
                commitment: Some((commitment, CommitmentStatus::Registered)),
            })
            .unwrap();

        assert!(store.is_nullifier_consumed(&id, &nullifier).unwrap());
        assert!(!store
            .is_nullifier_consumed(&UtilityId::from_u64(2), &nullifier)
            .unwrap());
        assert_eq!(
            store.commitment_status(&id, &commitment).unwrap(),
            Some(CommitmentStatus::Registered)
        );
        assert_eq!(store.utility(&id).unwrap().unwrap().registration_count, 1);

        // A replayed nullifier leaves every tree untouched.
        let mut replay = updated;
        replay.registration_count = 2;
        let result = store.commit(ClaimMutation {
            record: replay,
            nullifier: Some(nullifier),
            commitment: Some((FieldBytes::from_u64(21), CommitmentStatus::Registered)),
        });
        assert!(matches!(result, Err(ClaimError::Storage(_))));
        assert_eq!(store.utility(&id).unwrap().unwrap().registration_count, 1);
        assert_eq!(
            store.commitment_status(&id, &FieldBytes::from_u64(21)).unwrap(),
            None
        );
    }

    #[test]
    fn test_memory_store() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn test_sled_store() {
        exercise(&mut SledStore::in_memory().unwrap());
    }

    #[test]
    fn test_scoped_key() {
        let key = scoped_key(&UtilityId::from_u64(1), &FieldBytes::from_u64(2));
        assert_eq!(key[31], 1);
        assert_eq!(key[63], 2);
    }
}
