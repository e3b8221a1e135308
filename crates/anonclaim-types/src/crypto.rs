use crate::constants::*;
use crate::error::{ClaimError, ClaimResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

#[derive(Clone)]
pub struct Secp256k1PrivateKey(pub [u8; SECP256K1_PRIVATE_KEY_SIZE]);

impl Secp256k1PrivateKey {
    pub fn from_bytes(bytes: [u8; SECP256K1_PRIVATE_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SECP256K1_PRIVATE_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> ClaimResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = hex::decode(s).map_err(|e| ClaimError::InvalidKey(e.to_string()))?;
        if bytes.len() != SECP256K1_PRIVATE_KEY_SIZE {
            bytes.zeroize();
            return Err(ClaimError::InvalidKey("Invalid private key length".into()));
        }
        let mut arr = [0u8; SECP256K1_PRIVATE_KEY_SIZE];
        arr.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(arr))
    }
}

impl fmt::Debug for Secp256k1PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1PrivateKey([REDACTED])")
    }
}

impl Drop for Secp256k1PrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Affine point `x ‖ y`, 32 bytes each, without the SEC1 tag byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UncompressedPublicKey(pub [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE]);

impl UncompressedPublicKey {
    pub fn from_bytes(bytes: [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Accepts the 65-byte SEC1 form (`0x04 ‖ x ‖ y`).
    pub fn from_sec1(bytes: &[u8]) -> ClaimResult<Self> {
        match bytes {
            [0x04, rest @ ..] if rest.len() == UNCOMPRESSED_PUBLIC_KEY_SIZE => {
                let mut arr = [0u8; UNCOMPRESSED_PUBLIC_KEY_SIZE];
                arr.copy_from_slice(rest);
                Ok(Self(arr))
            }
            _ => Err(ClaimError::InvalidKey(
                "expected 65-byte uncompressed SEC1 public key".into(),
            )),
        }
    }

    pub fn to_sec1(&self) -> [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE + 1] {
        let mut out = [0u8; UNCOMPRESSED_PUBLIC_KEY_SIZE + 1];
        out[0] = 0x04;
        out[1..].copy_from_slice(&self.0);
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> ClaimResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| ClaimError::InvalidKey(e.to_string()))?;
        if bytes.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
            return Err(ClaimError::InvalidKey("Invalid public key length".into()));
        }
        let mut arr = [0u8; UNCOMPRESSED_PUBLIC_KEY_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for UncompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UncompressedPublicKey({}...)", &self.to_hex()[..18])
    }
}

impl_string_serde!(UncompressedPublicKey, to_hex, from_hex);

/// Recoverable ECDSA signature over a claim message together with the key
/// recovered from it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSignature {
    #[serde(with = "crate::encoding::hex_array")]
    pub r: [u8; 32],
    #[serde(with = "crate::encoding::hex_array")]
    pub s: [u8; 32],
    pub v: u8,
    pub public_key: UncompressedPublicKey,
}

impl ClaimSignature {
    /// `r ‖ s ‖ v`
    pub fn to_rsv(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }
}

impl fmt::Debug for ClaimSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClaimSignature(r={}..., v={})",
            hex::encode(&self.r[..4]),
            self.v
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_key_redacted() {
        let key = Secp256k1PrivateKey::from_bytes([7u8; 32]);
        assert_eq!(format!("{:?}", key), "Secp256k1PrivateKey([REDACTED])");
        let parsed = Secp256k1PrivateKey::from_hex(&format!("0x{}", key.to_hex())).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
        assert!(Secp256k1PrivateKey::from_hex("abcd").is_err());
    }

    #[test]
    fn test_public_key_sec1() {
        let mut sec1 = [0x11u8; 65];
        sec1[0] = 0x04;
        let key = UncompressedPublicKey::from_sec1(&sec1).unwrap();
        assert_eq!(key.to_sec1(), sec1);

        sec1[0] = 0x02;
        assert!(UncompressedPublicKey::from_sec1(&sec1).is_err());
        assert!(UncompressedPublicKey::from_sec1(&sec1[..33]).is_err());
    }

    #[test]
    fn test_signature_json() {
        let sig = ClaimSignature {
            r: [1u8; 32],
            s: [2u8; 32],
            v: 27,
            public_key: UncompressedPublicKey::from_bytes([3u8; 64]),
        };
        let json = serde_json::to_string(&sig).unwrap();
        let back: ClaimSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
        assert_eq!(sig.to_rsv()[64], 27);
    }
}
