//! Native evaluation of the claim relation.
//!
//! This is the reference the constraint system must agree with. Provers run
//! it first so a bad witness fails with a reason instead of an unsatisfied
//! constraint index. It is stricter in one place, demanding low-s, and looser
//! in another: a signature whose `R.x` lies in `[n, p)` passes here and fails
//! in-circuit, which honest signing hits with negligible probability.

use super::witness::ClaimWitness;
use crate::leaf::encode_leaf;
use crate::poseidon::{field_bytes_to_fr, fr_to_field_bytes, hash3};
use crate::secp256k1_ops::{derive_eth_address, verify_ecdsa};
use crate::signer::claim_digest;
use anonclaim_types::{
    ClaimError, ClaimPublicSignals, ClaimResult, EthAddress, FieldBytes, Phase, Token, UtilityId,
};
use ark_bn254::Fr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimOutputs {
    pub owner: EthAddress,
    pub leaf: Fr,
    pub snapshot_root: Fr,
    pub claim_commitment: Fr,
    pub claim_nullifier: Fr,
}

impl ClaimOutputs {
    pub fn public_signals(&self, witness: &ClaimWitness) -> ClaimPublicSignals {
        ClaimPublicSignals {
            snapshot_root: fr_to_field_bytes(&self.snapshot_root),
            claim_commitment: fr_to_field_bytes(&self.claim_commitment),
            claim_nullifier: fr_to_field_bytes(&self.claim_nullifier),
            utility_id: witness.utility_id,
            phase: witness.phase,
            collection: witness.collection,
        }
    }
}

/// `Hash3(utilityId, r_hi, r_lo)`
pub fn claim_commitment(utility_id: &UtilityId, r: [u128; 2]) -> ClaimResult<Fr> {
    let utility = field_bytes_to_fr(&FieldBytes(utility_id.0), "utility id")?;
    Ok(hash3(utility, Fr::from(r[0]), Fr::from(r[1])))
}

/// `Hash3(phase, r_hi, r_lo)`
pub fn claim_nullifier(phase: Phase, r: [u128; 2]) -> Fr {
    hash3(Fr::from(phase.wire()), Fr::from(r[0]), Fr::from(r[1]))
}

pub fn evaluate(witness: &ClaimWitness) -> ClaimResult<ClaimOutputs> {
    super::witness::check_public_inputs(&witness.utility_id, witness.phase)?;

    let token_id = witness.token_id()?;
    let r = witness.signature.r_bytes()?;
    let s = witness.signature.s_bytes()?;
    let public_key = witness.signature.public_key()?;

    let digest = claim_digest(&witness.utility_id, &witness.collection, &token_id);
    verify_ecdsa(&r, &s, &public_key, &digest)
        .map_err(|e| ClaimError::Unsatisfiable(format!("signature check failed: {}", e)))?;

    let owner = derive_eth_address(&public_key);
    let leaf = encode_leaf(&Token {
        collection: witness.collection,
        token_id,
        owner,
    })?;
    let snapshot_root = witness.path.compute_root(leaf);

    Ok(ClaimOutputs {
        owner,
        leaf,
        snapshot_root,
        claim_commitment: claim_commitment(&witness.utility_id, witness.signature.r)?,
        claim_nullifier: claim_nullifier(witness.phase, witness.signature.r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secp256k1_ops::generate_private_key;
    use crate::signer::ClaimSigner;
    use crate::tree::SnapshotTree;
    use anonclaim_types::TokenId;

    struct Fixture {
        witness: ClaimWitness,
        tree: SnapshotTree,
        token: Token,
    }

    fn fixture() -> Fixture {
        let signers: Vec<ClaimSigner> = (0..3)
            .map(|_| ClaimSigner::new(generate_private_key()).unwrap())
            .collect();
        let tokens: Vec<Token> = signers
            .iter()
            .enumerate()
            .map(|(i, s)| Token {
                collection: EthAddress::from_bytes([0xab; 20]),
                token_id: TokenId::from_u64(i as u64 + 10),
                owner: s.address(),
            })
            .collect();
        let tree = SnapshotTree::from_tokens(&tokens).unwrap();

        let utility = UtilityId::from_u64(9);
        let token = tokens[1];
        let sig = signers[1].sign(&utility, &token.collection, &token.token_id).unwrap();
        let witness = ClaimWitness::assemble(
            utility,
            Phase::Register,
            &token,
            &sig,
            &tree.create_proof(1).unwrap(),
        )
        .unwrap();
        Fixture {
            witness,
            tree,
            token,
        }
    }

    #[test]
    fn test_outputs_match_tree() {
        let f = fixture();
        let outputs = evaluate(&f.witness).unwrap();
        assert_eq!(outputs.owner, f.token.owner);
        assert_eq!(outputs.leaf, f.tree.leaf(1).unwrap());
        assert_eq!(outputs.snapshot_root, f.tree.root());

        let signals = outputs.public_signals(&f.witness);
        assert_eq!(signals.snapshot_root, f.tree.root_bytes());
        assert_eq!(signals.phase, Phase::Register);
    }

    #[test]
    fn test_commitment_stable_nullifier_differs() {
        let f = fixture();
        let register = evaluate(&f.witness).unwrap();
        let enter = evaluate(&f.witness.with_phase(Phase::Enter).unwrap()).unwrap();
        let vote = evaluate(&f.witness.with_phase(Phase::Vote(1)).unwrap()).unwrap();

        assert_eq!(register.claim_commitment, enter.claim_commitment);
        assert_eq!(register.claim_commitment, vote.claim_commitment);
        assert_ne!(register.claim_nullifier, enter.claim_nullifier);
        assert_ne!(enter.claim_nullifier, vote.claim_nullifier);
        assert_eq!(register.snapshot_root, enter.snapshot_root);
    }

    #[test]
    fn test_tampered_utility_unsatisfiable() {
        let mut witness = fixture().witness;
        witness.utility_id = UtilityId::from_u64(10);
        assert!(matches!(evaluate(&witness), Err(ClaimError::Unsatisfiable(_))));
    }

    #[test]
    fn test_tampered_token_unsatisfiable() {
        let mut witness = fixture().witness;
        witness.token_id[1] += 1;
        assert!(matches!(evaluate(&witness), Err(ClaimError::Unsatisfiable(_))));
    }

    #[test]
    fn test_wrong_path_changes_root() {
        let f = fixture();
        let mut witness = f.witness;
        witness.path = f.tree.create_proof(0).unwrap();
        let outputs = evaluate(&witness).unwrap();
        assert_ne!(outputs.snapshot_root, f.tree.root());
    }

    #[test]
    fn test_vote_zero_rejected() {
        let mut witness = fixture().witness;
        witness.phase = Phase::Vote(0);
        assert!(matches!(evaluate(&witness), Err(ClaimError::InvalidPhase(_))));
    }
}
