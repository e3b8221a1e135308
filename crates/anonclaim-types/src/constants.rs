pub const SNAPSHOT_TREE_DEPTH: usize = 16;

pub const SNAPSHOT_CAPACITY: usize = 1 << SNAPSHOT_TREE_DEPTH;

pub const FIELD_BYTES_SIZE: usize = 32;

pub const UINT256_SIZE: usize = 32;

pub const ETH_ADDRESS_SIZE: usize = 20;

pub const SECP256K1_PRIVATE_KEY_SIZE: usize = 32;

/// x ‖ y without the 0x04 SEC1 tag.
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 64;

/// utilityId (32) ‖ collection (20) ‖ tokenId (32).
pub const CLAIM_MESSAGE_SIZE: usize = UINT256_SIZE + ETH_ADDRESS_SIZE + UINT256_SIZE;

/// Limb width for values wider than the proving field.
pub const LIMB_BITS: usize = 128;

pub const PHASE_REGISTER: u64 = 1;

pub const PHASE_ENTER: u64 = 2;

/// Vote option `k` (1-based) travels as phase `VOTE_PHASE_OFFSET + k`.
pub const VOTE_PHASE_OFFSET: u64 = 2;

/// [snapshotRoot, claimCommitment, claimNullifier, utilityId, phase, collection]
pub const PUBLIC_INPUT_COUNT: usize = 6;
