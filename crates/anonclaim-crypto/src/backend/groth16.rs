use super::ProofSystem;
use crate::circuit::{evaluate, r1cs, ClaimCircuit, ClaimWitness};
use crate::poseidon::field_bytes_to_fr;
use anonclaim_types::{ClaimError, ClaimProof, ClaimPublicSignals, ClaimResult, ProofPoints};
use ark_bn254::{Bn254, Fr, G1Affine, G2Affine};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::{thread_rng, CryptoRng, RngCore};
use tracing::{debug, info};

/// Groth16 over BN254 for the claim circuit.
///
/// A proof shows possession of a secp256k1 signature over the claim message
/// by the key whose address owns the leaf; the signature verification and
/// the address derivation are both constrained. The circuit carries emulated
/// secp256k1 arithmetic and two keccak permutations, so setup and proving
/// take minutes and gigabytes rather than seconds.
pub struct Groth16Backend {
    proving_key: Option<ProvingKey<Bn254>>,
    verifying_key: VerifyingKey<Bn254>,
    prepared: PreparedVerifyingKey<Bn254>,
}

impl Groth16Backend {
    /// Circuit-specific setup. Whoever runs it learns the toxic waste.
    pub fn setup<R: RngCore + CryptoRng>(rng: &mut R) -> ClaimResult<Self> {
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(ClaimCircuit::empty(), rng)
            .map_err(|e| ClaimError::Crypto(format!("groth16 setup failed: {}", e)))?;
        info!(
            "Generated Groth16 keys ({} public inputs)",
            vk.gamma_abc_g1.len() - 1
        );
        Self::with_keys(Some(pk), vk)
    }

    pub fn from_proving_key(bytes: &[u8]) -> ClaimResult<Self> {
        let pk = ProvingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| ClaimError::InvalidKey(format!("proving key: {}", e)))?;
        let vk = pk.vk.clone();
        Self::with_keys(Some(pk), vk)
    }

    pub fn verifier_only(vk_bytes: &[u8]) -> ClaimResult<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes)
            .map_err(|e| ClaimError::InvalidKey(format!("verifying key: {}", e)))?;
        Self::with_keys(None, vk)
    }

    fn with_keys(proving_key: Option<ProvingKey<Bn254>>, vk: VerifyingKey<Bn254>) -> ClaimResult<Self> {
        let prepared = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| ClaimError::InvalidKey(e.to_string()))?;
        Ok(Self {
            proving_key,
            verifying_key: vk,
            prepared,
        })
    }

    pub fn can_prove(&self) -> bool {
        self.proving_key.is_some()
    }

    pub fn export_proving_key(&self) -> ClaimResult<Vec<u8>> {
        let pk = self
            .proving_key
            .as_ref()
            .ok_or_else(|| ClaimError::Config("backend holds no proving key".into()))?;
        let mut bytes = Vec::new();
        pk.serialize_compressed(&mut bytes)
            .map_err(|e| ClaimError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    pub fn export_verifying_key(&self) -> ClaimResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| ClaimError::Serialization(e.to_string()))?;
        Ok(bytes)
    }
}

fn encode_point<P: CanonicalSerialize>(point: &P) -> ClaimResult<Vec<u8>> {
    let mut bytes = Vec::new();
    point
        .serialize_compressed(&mut bytes)
        .map_err(|e| ClaimError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode_proof(points: &ProofPoints) -> Option<Proof<Bn254>> {
    Some(Proof {
        a: G1Affine::deserialize_compressed(points.a.as_slice()).ok()?,
        b: G2Affine::deserialize_compressed(points.b.as_slice()).ok()?,
        c: G1Affine::deserialize_compressed(points.c.as_slice()).ok()?,
    })
}

fn public_inputs(signals: &ClaimPublicSignals) -> ClaimResult<Vec<Fr>> {
    signals
        .to_wire()
        .iter()
        .map(|input| field_bytes_to_fr(input, "public input"))
        .collect()
}

impl ProofSystem for Groth16Backend {
    fn name(&self) -> &'static str {
        "groth16"
    }

    fn prove(&self, witness: &ClaimWitness) -> ClaimResult<ClaimProof> {
        let pk = self
            .proving_key
            .as_ref()
            .ok_or_else(|| ClaimError::Config("verifier-only backend cannot prove".into()))?;

        let outputs = evaluate(witness)?;
        let circuit = ClaimCircuit::new(witness, &outputs)?;
        if !r1cs::is_satisfied(circuit.clone())? {
            return Err(ClaimError::Unsatisfiable(
                "constraint system rejected the witness".into(),
            ));
        }

        let proof = Groth16::<Bn254>::prove(pk, circuit, &mut thread_rng())
            .map_err(|e| ClaimError::Crypto(format!("groth16 prove failed: {}", e)))?;
        debug!("Groth16 proof generated");

        Ok(ClaimProof {
            points: ProofPoints {
                a: encode_point(&proof.a)?,
                b: encode_point(&proof.b)?,
                c: encode_point(&proof.c)?,
            },
            public_signals: outputs.public_signals(witness),
        })
    }

    fn verify(&self, points: &ProofPoints, signals: &ClaimPublicSignals) -> ClaimResult<bool> {
        let Some(proof) = decode_proof(points) else {
            debug!("Rejecting malformed proof points");
            return Ok(false);
        };
        let Ok(inputs) = public_inputs(signals) else {
            debug!("Rejecting non-canonical public inputs");
            return Ok(false);
        };

        Groth16::<Bn254>::verify_with_processed_vk(&self.prepared, &inputs, &proof)
            .map_err(|e| ClaimError::Crypto(format!("groth16 verify failed: {}", e)))
    }
}
