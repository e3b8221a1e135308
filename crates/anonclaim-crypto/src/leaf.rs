use crate::limbs;
use crate::poseidon::{fr_from_be_bytes, hash4};
use anonclaim_types::{
    ClaimError, ClaimResult, EthAddress, Token, TokenId, ETH_ADDRESS_SIZE, UINT256_SIZE,
};
use ark_bn254::Fr;

/// Field inputs of a snapshot leaf: collection, token id high and low limbs,
/// owner.
pub fn leaf_inputs(token: &Token) -> ClaimResult<[Fr; 4]> {
    let token_limbs = limbs::split_named(token.token_id.as_bytes(), 256, 2, "token id")?;
    Ok([
        fr_from_be_bytes(token.collection.as_bytes()),
        Fr::from(token_limbs[0]),
        Fr::from(token_limbs[1]),
        fr_from_be_bytes(token.owner.as_bytes()),
    ])
}

pub fn encode_leaf(token: &Token) -> ClaimResult<Fr> {
    let [collection, hi, lo, owner] = leaf_inputs(token)?;
    Ok(hash4(collection, hi, lo, owner))
}

/// Byte-slice entry point. Leading zero bytes are accepted; any significant
/// bit past 160/256/160 fails with `EncodingOverflow`.
pub fn encode_leaf_bytes(collection: &[u8], token_id: &[u8], owner: &[u8]) -> ClaimResult<Fr> {
    let token = Token {
        collection: EthAddress(fit::<ETH_ADDRESS_SIZE>(collection, "collection")?),
        token_id: TokenId(fit::<UINT256_SIZE>(token_id, "token id")?),
        owner: EthAddress(fit::<ETH_ADDRESS_SIZE>(owner, "owner")?),
    };
    encode_leaf(&token)
}

fn fit<const N: usize>(bytes: &[u8], what: &'static str) -> ClaimResult<[u8; N]> {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > N {
        return Err(ClaimError::overflow(what, N * 8));
    }
    let mut out = [0u8; N];
    out[N - significant.len()..].copy_from_slice(significant);
    Ok(out)
}
