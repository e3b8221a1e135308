use anonclaim_types::{ClaimError, ClaimResult, FieldBytes, Phase, UtilityId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UtilityKind {
    /// Claimants register, then enter once.
    Event,
    /// Claimants register, then vote once for an option in `1..=options`.
    Poll { options: u32 },
}

impl UtilityKind {
    fn tally_len(&self) -> usize {
        match self {
            UtilityKind::Event => 0,
            UtilityKind::Poll { options } => *options as usize,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUtility {
    pub id: UtilityId,
    pub metadata_ref: String,
    pub capacity: u64,
    pub snapshot_root: FieldBytes,
    pub kind: UtilityKind,
}

impl CreateUtility {
    pub fn event(id: UtilityId, snapshot_root: FieldBytes, capacity: u64) -> Self {
        Self {
            id,
            metadata_ref: String::new(),
            capacity,
            snapshot_root,
            kind: UtilityKind::Event,
        }
    }

    pub fn poll(id: UtilityId, snapshot_root: FieldBytes, capacity: u64, options: u32) -> Self {
        Self {
            kind: UtilityKind::Poll { options },
            ..Self::event(id, snapshot_root, capacity)
        }
    }

    pub fn with_metadata(mut self, metadata_ref: impl Into<String>) -> Self {
        self.metadata_ref = metadata_ref.into();
        self
    }
}

/// Persisted state of one utility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityRecord {
    pub id: UtilityId,
    pub metadata_ref: String,
    pub snapshot_root: FieldBytes,
    pub capacity: u64,
    pub kind: UtilityKind,
    pub registration_count: u64,
    pub entrance_count: u64,
    /// Index `k - 1` holds the tally of option `k`.
    pub vote_counts: Vec<u64>,
    pub created: bool,
    pub created_at: i64,
}

impl UtilityRecord {
    pub fn new(request: CreateUtility) -> Self {
        Self {
            vote_counts: vec![0; request.kind.tally_len()],
            id: request.id,
            metadata_ref: request.metadata_ref,
            snapshot_root: request.snapshot_root,
            capacity: request.capacity,
            kind: request.kind,
            registration_count: 0,
            entrance_count: 0,
            created: true,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.registration_count >= self.capacity
    }

    /// Total votes over all options.
    pub fn vote_count(&self) -> u64 {
        self.vote_counts.iter().sum()
    }

    pub fn vote_result(&self, option: u32) -> Option<u64> {
        let index = usize::try_from(option).ok()?.checked_sub(1)?;
        self.vote_counts.get(index).copied()
    }

    /// Checks that `phase` is a follow-up step this utility accepts.
    pub fn accepts(&self, phase: Phase) -> ClaimResult<()> {
        match (self.kind, phase) {
            (_, Phase::Register) => Ok(()),
            (UtilityKind::Event, Phase::Enter) => Ok(()),
            (UtilityKind::Poll { options }, Phase::Vote(option)) if (1..=options).contains(&option) => {
                Ok(())
            }
            (UtilityKind::Poll { options }, Phase::Vote(option)) => Err(ClaimError::InvalidPhase(
                format!("option {} outside 1..={}", option, options),
            )),
            (UtilityKind::Event, _) => Err(ClaimError::InvalidPhase(format!(
                "event utility does not accept {}",
                phase
            ))),
            (UtilityKind::Poll { .. }, _) => Err(ClaimError::InvalidPhase(format!(
                "poll utility does not accept {}",
                phase
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentStatus {
    Registered,
    Voted(u32),
}

/// Everything one accepted operation writes. Stores apply it all or nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimMutation {
    pub record: UtilityRecord,
    pub nullifier: Option<FieldBytes>,
    pub commitment: Option<(FieldBytes, CommitmentStatus)>,
}

impl ClaimMutation {
    pub fn create(record: UtilityRecord) -> Self {
        Self {
            record,
            nullifier: None,
            commitment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tallies() {
        let request = CreateUtility::poll(UtilityId::from_u64(1), FieldBytes::from_u64(9), 10, 3)
            .with_metadata("ipfs://poll");
        let mut record = UtilityRecord::new(request);
        assert_eq!(record.vote_counts, vec![0, 0, 0]);
        assert_eq!(record.metadata_ref, "ipfs://poll");
        assert!(record.created);

        record.vote_counts[1] = 4;
        record.vote_counts[2] = 1;
        assert_eq!(record.vote_count(), 5);
        assert_eq!(record.vote_result(2), Some(4));
        assert_eq!(record.vote_result(0), None);
        assert_eq!(record.vote_result(4), None);
    }

    #[test]
    fn test_accepts_phases() {
        let event = UtilityRecord::new(CreateUtility::event(
            UtilityId::from_u64(1),
            FieldBytes::zero(),
            1,
        ));
        assert!(event.accepts(Phase::Register).is_ok());
        assert!(event.accepts(Phase::Enter).is_ok());
        assert!(matches!(event.accepts(Phase::Vote(1)), Err(ClaimError::InvalidPhase(_))));

        let poll = UtilityRecord::new(CreateUtility::poll(
            UtilityId::from_u64(2),
            FieldBytes::zero(),
            1,
            2,
        ));
        assert!(poll.accepts(Phase::Vote(1)).is_ok());
        assert!(poll.accepts(Phase::Vote(2)).is_ok());
        assert!(matches!(poll.accepts(Phase::Vote(3)), Err(ClaimError::InvalidPhase(_))));
        assert!(matches!(poll.accepts(Phase::Enter), Err(ClaimError::InvalidPhase(_))));
    }

    #[test]
    fn test_full() {
        let mut record = UtilityRecord::new(CreateUtility::event(
            UtilityId::from_u64(1),
            FieldBytes::zero(),
            2,
        ));
        assert!(!record.is_full());
        record.registration_count = 2;
        assert!(record.is_full());
    }
}
