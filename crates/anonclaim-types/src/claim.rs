use crate::address::EthAddress;
use crate::constants::*;
use crate::error::{ClaimError, ClaimResult};
use crate::field::{be_bytes_to_decimal, parse_uint_be, FieldBytes};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! uint256_newtype {
    ($name:ident, $what:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; UINT256_SIZE]);

        impl $name {
            pub fn from_bytes(bytes: [u8; UINT256_SIZE]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; UINT256_SIZE] {
                &self.0
            }

            pub fn from_u64(value: u64) -> Self {
                Self(FieldBytes::from_u64(value).0)
            }

            /// Decimal or `0x` hex.
            pub fn parse(s: &str) -> ClaimResult<Self> {
                Ok(Self(parse_uint_be::<UINT256_SIZE>(s, $what)?))
            }

            pub fn to_decimal(&self) -> String {
                be_bytes_to_decimal(&self.0)
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_decimal())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_decimal())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ClaimError;

            fn from_str(s: &str) -> ClaimResult<Self> {
                Self::parse(s)
            }
        }

        impl_string_serde!($name, to_decimal, parse);
    };
}

uint256_newtype!(TokenId, "token id");
uint256_newtype!(UtilityId, "utility id");

/// One ownership record of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub collection: EthAddress,
    pub token_id: TokenId,
    pub owner: EthAddress,
}

/// Claim step a proof is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum Phase {
    Register,
    Enter,
    /// 1-based poll option.
    Vote(u32),
}

impl Phase {
    pub fn wire(&self) -> u64 {
        match self {
            Phase::Register => PHASE_REGISTER,
            Phase::Enter => PHASE_ENTER,
            Phase::Vote(option) => VOTE_PHASE_OFFSET + u64::from(*option),
        }
    }

    pub fn from_wire(value: u64) -> ClaimResult<Self> {
        match value {
            0 => Err(ClaimError::InvalidPhase("phase 0 is not assigned".into())),
            PHASE_REGISTER => Ok(Phase::Register),
            PHASE_ENTER => Ok(Phase::Enter),
            v => u32::try_from(v - VOTE_PHASE_OFFSET)
                .map(Phase::Vote)
                .map_err(|_| ClaimError::InvalidPhase(format!("vote option out of range: {}", v))),
        }
    }

    pub fn vote_option(&self) -> Option<u32> {
        match self {
            Phase::Vote(option) => Some(*option),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Register => write!(f, "register"),
            Phase::Enter => write!(f, "enter"),
            Phase::Vote(option) => write!(f, "vote {}", option),
        }
    }
}

impl TryFrom<u64> for Phase {
    type Error = ClaimError;

    fn try_from(value: u64) -> ClaimResult<Self> {
        Phase::from_wire(value)
    }
}

impl From<Phase> for u64 {
    fn from(phase: Phase) -> u64 {
        phase.wire()
    }
}

/// Public inputs and outputs of a claim proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPublicSignals {
    pub snapshot_root: FieldBytes,
    pub claim_commitment: FieldBytes,
    pub claim_nullifier: FieldBytes,
    pub utility_id: UtilityId,
    pub phase: Phase,
    pub collection: EthAddress,
}

impl ClaimPublicSignals {
    /// Verifier input order: root, commitment, nullifier, utility id, phase,
    /// collection.
    pub fn to_wire(&self) -> [FieldBytes; PUBLIC_INPUT_COUNT] {
        [
            self.snapshot_root,
            self.claim_commitment,
            self.claim_nullifier,
            FieldBytes(self.utility_id.0),
            FieldBytes::from_u64(self.phase.wire()),
            FieldBytes(self.collection.to_word()),
        ]
    }
}

/// Backend-defined proof elements. Groth16 stores compressed curve points.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    #[serde(with = "crate::encoding::hex_vec")]
    pub a: Vec<u8>,
    #[serde(with = "crate::encoding::hex_vec")]
    pub b: Vec<u8>,
    #[serde(with = "crate::encoding::hex_vec")]
    pub c: Vec<u8>,
}

impl fmt::Debug for ProofPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProofPoints(a={}B, b={}B, c={}B)",
            self.a.len(),
            self.b.len(),
            self.c.len()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimProof {
    pub points: ProofPoints,
    pub public_signals: ClaimPublicSignals,
}
