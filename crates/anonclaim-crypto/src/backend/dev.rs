use super::ProofSystem;
use crate::circuit::{evaluate, ClaimWitness};
use anonclaim_types::{
    ClaimError, ClaimProof, ClaimPublicSignals, ClaimResult, FieldBytes, ProofPoints,
    PUBLIC_INPUT_COUNT,
};
use std::fmt;
use zeroize::Zeroize;

const TAG_A: &[u8] = b"anonclaim/dev/a";
const TAG_B: &[u8] = b"anonclaim/dev/b";
const TAG_C: &[u8] = b"anonclaim/dev/c";

/// Keyed BLAKE3 attestations over the public inputs.
///
/// `prove` still runs the full native relation, so it refuses the same
/// witnesses Groth16 would. The "proof" is only as trustworthy as the key:
/// anyone holding it can attest arbitrary public inputs, and it hides
/// nothing. Use it for local pipelines and tests.
pub struct DevBackend {
    key: [u8; 32],
}

impl DevBackend {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn random() -> Self {
        Self::new(crate::random_bytes::<32>())
    }

    pub fn from_hex(s: &str) -> ClaimResult<Self> {
        let s = s.trim();
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| ClaimError::InvalidKey(e.to_string()))?;
        let key = <[u8; 32]>::try_from(bytes.as_slice())
            .map_err(|_| ClaimError::InvalidKey("dev key must be 32 bytes".into()))?;
        Ok(Self::new(key))
    }

    pub fn key_hex(&self) -> String {
        hex::encode(self.key)
    }

    fn tag(&self, label: &[u8], wire: &[FieldBytes; PUBLIC_INPUT_COUNT]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(label);
        for input in wire {
            hasher.update(input.as_bytes());
        }
        *hasher.finalize().as_bytes()
    }
}

impl fmt::Debug for DevBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevBackend([REDACTED])")
    }
}

impl Drop for DevBackend {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl ProofSystem for DevBackend {
    fn name(&self) -> &'static str {
        "dev"
    }

    fn prove(&self, witness: &ClaimWitness) -> ClaimResult<ClaimProof> {
        let outputs = evaluate(witness)?;
        let public_signals = outputs.public_signals(witness);
        let wire = public_signals.to_wire();

        Ok(ClaimProof {
            points: ProofPoints {
                a: self.tag(TAG_A, &wire).to_vec(),
                b: self.tag(TAG_B, &wire).to_vec(),
                c: self.tag(TAG_C, &wire).to_vec(),
            },
            public_signals,
        })
    }

    fn verify(&self, points: &ProofPoints, signals: &ClaimPublicSignals) -> ClaimResult<bool> {
        let wire = signals.to_wire();
        let a = crate::constant_time_eq(&points.a, &self.tag(TAG_A, &wire));
        let b = crate::constant_time_eq(&points.b, &self.tag(TAG_B, &wire));
        let c = crate::constant_time_eq(&points.c, &self.tag(TAG_C, &wire));
        Ok(a & b & c)
    }
}
