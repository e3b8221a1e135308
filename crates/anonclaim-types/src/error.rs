use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("DuplicateUtility: a utility with this id already exists")]
    DuplicateUtility,

    #[error("UnknownUtility: no utility with this id has been created")]
    UnknownUtility,

    #[error("InvalidSnapshot: proof root does not match the published snapshot root")]
    InvalidSnapshot,

    #[error("InvalidProof: proof failed cryptographic verification")]
    InvalidProof,

    #[error("DuplicateRegistration: registration nullifier already consumed")]
    DuplicateRegistration,

    #[error("DuplicateEntrance: entrance nullifier already consumed")]
    DuplicateEntrance,

    #[error("DuplicateVote: vote already cast for this claim")]
    DuplicateVote,

    #[error("RegistrationFull: utility capacity reached")]
    RegistrationFull,

    #[error("UnknownRegistration: claim commitment has not been registered")]
    UnknownRegistration,

    #[error("EncodingOverflow: {what} does not fit in {bits} bits")]
    EncodingOverflow { what: &'static str, bits: usize },

    #[error("Invalid phase: {0}")]
    InvalidPhase(String),

    #[error("Insufficient payment: required {required}, got {provided}")]
    InsufficientPayment { required: u128, provided: u128 },

    #[error("Snapshot tree full: {0}")]
    TreeFull(String),

    #[error("Unsatisfiable claim witness: {0}")]
    Unsatisfiable(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClaimError {
    /// True for the registry's protocol rejections. These are terminal for the
    /// attempted operation and leave registry state untouched.
    pub fn is_protocol_rejection(&self) -> bool {
        matches!(
            self,
            ClaimError::DuplicateUtility
                | ClaimError::UnknownUtility
                | ClaimError::InvalidSnapshot
                | ClaimError::InvalidProof
                | ClaimError::DuplicateRegistration
                | ClaimError::DuplicateEntrance
                | ClaimError::DuplicateVote
                | ClaimError::RegistrationFull
                | ClaimError::UnknownRegistration
                | ClaimError::InvalidPhase(_)
                | ClaimError::InsufficientPayment { .. }
        )
    }

    pub fn overflow(what: &'static str, bits: usize) -> Self {
        ClaimError::EncodingOverflow { what, bits }
    }
}

pub type ClaimResult<T> = Result<T, ClaimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_rejections() {
        assert!(ClaimError::DuplicateRegistration.is_protocol_rejection());
        assert!(ClaimError::RegistrationFull.is_protocol_rejection());
        assert!(!ClaimError::Storage("disk".into()).is_protocol_rejection());
        assert!(!ClaimError::overflow("token id", 256).is_protocol_rejection());
    }

    #[test]
    fn test_error_names_in_messages() {
        assert!(ClaimError::InvalidSnapshot.to_string().starts_with("InvalidSnapshot"));
        assert_eq!(
            ClaimError::overflow("collection", 160).to_string(),
            "EncodingOverflow: collection does not fit in 160 bits"
        );
    }
}
