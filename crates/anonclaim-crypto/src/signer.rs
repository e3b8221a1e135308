use crate::limbs;
use crate::secp256k1_ops::{
    derive_eth_address, derive_public_key, personal_message_hash, recover_public_key,
    sign_recoverable,
};
use anonclaim_types::{
    ClaimError, ClaimResult, ClaimSignature, EthAddress, Secp256k1PrivateKey, TokenId,
    UncompressedPublicKey, UtilityId, CLAIM_MESSAGE_SIZE, ETH_ADDRESS_SIZE, UINT256_SIZE,
};
use tracing::debug;

/// `utilityId (32) ‖ collection (20) ‖ tokenId (32)`, each left-padded.
pub fn claim_message(
    utility: &UtilityId,
    collection: &EthAddress,
    token_id: &TokenId,
) -> [u8; CLAIM_MESSAGE_SIZE] {
    let mut message = [0u8; CLAIM_MESSAGE_SIZE];
    message[..UINT256_SIZE].copy_from_slice(utility.as_bytes());
    message[UINT256_SIZE..UINT256_SIZE + ETH_ADDRESS_SIZE].copy_from_slice(collection.as_bytes());
    message[UINT256_SIZE + ETH_ADDRESS_SIZE..].copy_from_slice(token_id.as_bytes());
    message
}

pub fn claim_digest(utility: &UtilityId, collection: &EthAddress, token_id: &TokenId) -> [u8; 32] {
    personal_message_hash(&claim_message(utility, collection, token_id))
}

/// Off-chain signer held by a token owner.
pub struct ClaimSigner {
    key: Secp256k1PrivateKey,
    public_key: UncompressedPublicKey,
    address: EthAddress,
}

impl ClaimSigner {
    pub fn new(key: Secp256k1PrivateKey) -> ClaimResult<Self> {
        let public_key = derive_public_key(&key)?;
        let address = derive_eth_address(&public_key);
        Ok(Self {
            key,
            public_key,
            address,
        })
    }

    pub fn address(&self) -> EthAddress {
        self.address
    }

    pub fn public_key(&self) -> &UncompressedPublicKey {
        &self.public_key
    }

    /// Signs the claim message. The signature is checked by recovering the
    /// key from it; a mismatch fails with `InvalidSignature`.
    pub fn sign(
        &self,
        utility: &UtilityId,
        collection: &EthAddress,
        token_id: &TokenId,
    ) -> ClaimResult<ClaimSignature> {
        let digest = claim_digest(utility, collection, token_id);
        let (r, s, v) = sign_recoverable(&self.key, &digest)?;

        let recovered = recover_public_key(&r, &s, v, &digest)?;
        if recovered != self.public_key {
            return Err(ClaimError::InvalidSignature(
                "recovered key does not match signer".into(),
            ));
        }

        debug!(
            "Signed claim for utility {} as {}",
            utility,
            self.address.to_hex()
        );

        Ok(ClaimSignature {
            r,
            s,
            v,
            public_key: recovered,
        })
    }
}

/// Signature components split into 128-bit limbs, most-significant first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureLimbs {
    pub r: [u128; 2],
    pub s: [u128; 2],
    pub public_key: [u128; 4],
}

impl SignatureLimbs {
    pub fn from_signature(signature: &ClaimSignature) -> ClaimResult<Self> {
        Ok(Self {
            r: to_array(limbs::split_named(&signature.r, 256, 2, "signature r")?)?,
            s: to_array(limbs::split_named(&signature.s, 256, 2, "signature s")?)?,
            public_key: to_array(limbs::split_named(
                signature.public_key.as_bytes(),
                512,
                4,
                "public key",
            )?)?,
        })
    }

    pub fn r_bytes(&self) -> ClaimResult<[u8; 32]> {
        limbs::join_array(&self.r, 256)
    }

    pub fn s_bytes(&self) -> ClaimResult<[u8; 32]> {
        limbs::join_array(&self.s, 256)
    }

    pub fn public_key(&self) -> ClaimResult<UncompressedPublicKey> {
        Ok(UncompressedPublicKey::from_bytes(limbs::join_array(
            &self.public_key,
            512,
        )?))
    }
}

fn to_array<const N: usize>(limbs: Vec<u128>) -> ClaimResult<[u128; N]> {
    <[u128; N]>::try_from(limbs)
        .map_err(|v| ClaimError::Internal(format!("expected {} limbs, got {}", N, v.len())))
}
