use crate::limbs;
use crate::poseidon::field_bytes_to_fr;
use crate::secp256k1_ops::derive_eth_address;
use crate::signer::SignatureLimbs;
use crate::tree::InclusionPath;
use anonclaim_types::{
    ClaimError, ClaimResult, ClaimSignature, EthAddress, FieldBytes, Phase, Token, TokenId,
    UtilityId,
};

/// Everything one claimant feeds the prover for one phase. Built per request
/// and never shared between claimants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimWitness {
    pub utility_id: UtilityId,
    pub phase: Phase,
    pub collection: EthAddress,
    pub token_id: [u128; 2],
    pub signature: SignatureLimbs,
    pub path: InclusionPath,
}

impl ClaimWitness {
    /// Checks the inputs a prover can check locally before any constraint is
    /// built: value widths, a usable phase, and that the signing key owns the
    /// token.
    pub fn assemble(
        utility_id: UtilityId,
        phase: Phase,
        token: &Token,
        signature: &ClaimSignature,
        path: &InclusionPath,
    ) -> ClaimResult<Self> {
        check_public_inputs(&utility_id, phase)?;

        let signer = derive_eth_address(&signature.public_key);
        if signer != token.owner {
            return Err(ClaimError::Unsatisfiable(format!(
                "signer {} does not own token {} (owner {})",
                signer, token.token_id, token.owner
            )));
        }

        let token_limbs = limbs::split_named(token.token_id.as_bytes(), 256, 2, "token id")?;

        Ok(Self {
            utility_id,
            phase,
            collection: token.collection,
            token_id: [token_limbs[0], token_limbs[1]],
            signature: SignatureLimbs::from_signature(signature)?,
            path: path.clone(),
        })
    }

    pub fn token_id(&self) -> ClaimResult<TokenId> {
        Ok(TokenId(limbs::join_array(&self.token_id, 256)?))
    }

    /// Same signature and path, different phase.
    pub fn with_phase(&self, phase: Phase) -> ClaimResult<Self> {
        check_public_inputs(&self.utility_id, phase)?;
        Ok(Self {
            phase,
            ..self.clone()
        })
    }
}

pub(crate) fn check_public_inputs(utility_id: &UtilityId, phase: Phase) -> ClaimResult<()> {
    field_bytes_to_fr(&FieldBytes(utility_id.0), "utility id")?;
    if phase == Phase::Vote(0) {
        return Err(ClaimError::InvalidPhase("vote options start at 1".into()));
    }
    Ok(())
}
