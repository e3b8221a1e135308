use crate::constants::{ETH_ADDRESS_SIZE, FIELD_BYTES_SIZE};
use crate::error::{ClaimError, ClaimResult};
use std::fmt;

/// 160-bit account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EthAddress(pub [u8; ETH_ADDRESS_SIZE]);

impl EthAddress {
    pub fn from_bytes(bytes: [u8; ETH_ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ETH_ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> ClaimResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| ClaimError::InvalidAddress(e.to_string()))?;
        if bytes.len() != ETH_ADDRESS_SIZE {
            return Err(ClaimError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ETH_ADDRESS_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; ETH_ADDRESS_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Left-padded to a 32-byte big-endian word.
    pub fn to_word(&self) -> [u8; FIELD_BYTES_SIZE] {
        let mut word = [0u8; FIELD_BYTES_SIZE];
        word[FIELD_BYTES_SIZE - ETH_ADDRESS_SIZE..].copy_from_slice(&self.0);
        word
    }

    pub fn zero() -> Self {
        Self([0u8; ETH_ADDRESS_SIZE])
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({})", self.to_hex())
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for EthAddress {
    fn default() -> Self {
        Self::zero()
    }
}

impl_string_serde!(EthAddress, to_hex, from_hex);
