use crate::constants::FIELD_BYTES_SIZE;
use crate::error::{ClaimError, ClaimResult};
use std::fmt;

/// Big-endian encoding of a BN254 scalar field element.
///
/// This type does not know the field modulus; canonicality is checked where the
/// bytes are turned back into a field element (`anonclaim-crypto`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldBytes(pub [u8; FIELD_BYTES_SIZE]);

impl FieldBytes {
    pub fn from_bytes(bytes: [u8; FIELD_BYTES_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FIELD_BYTES_SIZE] {
        &self.0
    }

    pub fn zero() -> Self {
        Self([0u8; FIELD_BYTES_SIZE])
    }

    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; FIELD_BYTES_SIZE];
        bytes[FIELD_BYTES_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// First four bytes, for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    pub fn from_hex(s: &str) -> ClaimResult<Self> {
        Ok(Self(parse_uint_be::<FIELD_BYTES_SIZE>(s, "field element")?))
    }

    pub fn to_decimal(&self) -> String {
        be_bytes_to_decimal(&self.0)
    }
}

impl fmt::Debug for FieldBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldBytes({})", self.to_hex())
    }
}

impl fmt::Display for FieldBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl_string_serde!(FieldBytes, to_hex, from_hex);

/// Parses a non-negative integer written as `0x`-prefixed hex or as decimal
/// into `N` big-endian bytes. Values needing more than `8 * N` bits fail with
/// `EncodingOverflow`.
pub fn parse_uint_be<const N: usize>(s: &str, what: &'static str) -> ClaimResult<[u8; N]> {
    let s = s.trim();
    if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return parse_hex_be::<N>(hex_digits, what);
    }
    parse_decimal_be::<N>(s, what)
}

fn parse_hex_be<const N: usize>(digits: &str, what: &'static str) -> ClaimResult<[u8; N]> {
    if digits.is_empty() {
        return Err(ClaimError::Serialization(format!("empty hex {}", what)));
    }
    let trimmed = digits.trim_start_matches('0');
    let padded = if trimmed.len() % 2 == 1 {
        format!("0{}", trimmed)
    } else {
        trimmed.to_string()
    };
    let bytes = hex::decode(&padded)
        .map_err(|e| ClaimError::Serialization(format!("invalid hex {}: {}", what, e)))?;
    if bytes.len() > N {
        return Err(ClaimError::overflow(what, N * 8));
    }
    let mut out = [0u8; N];
    out[N - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

fn parse_decimal_be<const N: usize>(digits: &str, what: &'static str) -> ClaimResult<[u8; N]> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ClaimError::Serialization(format!(
            "invalid decimal {}: {:?}",
            what, digits
        )));
    }

    let mut out = [0u8; N];
    for digit in digits.bytes() {
        let mut carry = u16::from(digit - b'0');
        for byte in out.iter_mut().rev() {
            let acc = u16::from(*byte) * 10 + carry;
            *byte = (acc & 0xff) as u8;
            carry = acc >> 8;
        }
        if carry != 0 {
            return Err(ClaimError::overflow(what, N * 8));
        }
    }
    Ok(out)
}

/// Renders big-endian bytes as an unsigned decimal string.
pub fn be_bytes_to_decimal(bytes: &[u8]) -> String {
    let mut work = bytes.to_vec();
    let mut digits = Vec::new();

    while work.iter().any(|&b| b != 0) {
        let mut remainder = 0u16;
        for byte in work.iter_mut() {
            let acc = (remainder << 8) | u16::from(*byte);
            *byte = (acc / 10) as u8;
            remainder = acc % 10;
        }
        digits.push(b'0' + remainder as u8);
    }

    if digits.is_empty() {
        return "0".to_string();
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
