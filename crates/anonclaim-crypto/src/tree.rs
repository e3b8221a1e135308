//! Depth-16 append-only Poseidon Merkle tree over snapshot leaves.

use crate::leaf::encode_leaf;
use crate::poseidon::{field_bytes_to_fr, fr_to_field_bytes, hash2};
use anonclaim_types::{
    ClaimError, ClaimResult, FieldBytes, Token, SNAPSHOT_CAPACITY, SNAPSHOT_TREE_DEPTH,
};
use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static ZEROS: OnceLock<[Fr; SNAPSHOT_TREE_DEPTH + 1]> = OnceLock::new();

/// `zeros()[k]` is the root of an empty subtree of height `k`.
pub fn zeros() -> &'static [Fr; SNAPSHOT_TREE_DEPTH + 1] {
    ZEROS.get_or_init(|| {
        let mut zeros = [Fr::from(0u64); SNAPSHOT_TREE_DEPTH + 1];
        for k in 0..SNAPSHOT_TREE_DEPTH {
            zeros[k + 1] = hash2(zeros[k], zeros[k]);
        }
        zeros
    })
}

/// Sibling path for one leaf. Bit `k` of `positions` is set when the running
/// node at level `k` is the right child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PathRepr", try_from = "PathRepr")]
pub struct InclusionPath {
    pub siblings: [Fr; SNAPSHOT_TREE_DEPTH],
    pub positions: u16,
}

impl InclusionPath {
    pub fn is_right(&self, level: usize) -> bool {
        (self.positions >> level) & 1 == 1
    }

    pub fn compute_root(&self, leaf: Fr) -> Fr {
        self.siblings
            .iter()
            .enumerate()
            .fold(leaf, |node, (level, sibling)| {
                if self.is_right(level) {
                    hash2(*sibling, node)
                } else {
                    hash2(node, *sibling)
                }
            })
    }

    pub fn verify(&self, leaf: Fr, root: Fr) -> bool {
        self.compute_root(leaf) == root
    }

    /// Leaf index encoded by the direction bits.
    pub fn index(&self) -> usize {
        usize::from(self.positions)
    }
}

#[derive(Serialize, Deserialize)]
struct PathRepr {
    siblings: Vec<FieldBytes>,
    positions: u16,
}

impl From<InclusionPath> for PathRepr {
    fn from(path: InclusionPath) -> Self {
        Self {
            siblings: path.siblings.iter().map(fr_to_field_bytes).collect(),
            positions: path.positions,
        }
    }
}

impl TryFrom<PathRepr> for InclusionPath {
    type Error = ClaimError;

    fn try_from(repr: PathRepr) -> ClaimResult<Self> {
        if repr.siblings.len() != SNAPSHOT_TREE_DEPTH {
            return Err(ClaimError::Serialization(format!(
                "inclusion path needs {} siblings, got {}",
                SNAPSHOT_TREE_DEPTH,
                repr.siblings.len()
            )));
        }
        let mut siblings = [Fr::from(0u64); SNAPSHOT_TREE_DEPTH];
        for (slot, bytes) in siblings.iter_mut().zip(&repr.siblings) {
            *slot = field_bytes_to_fr(bytes, "path sibling")?;
        }
        Ok(Self {
            siblings,
            positions: repr.positions,
        })
    }
}

/// Incremental tree. `layers[0]` holds the leaves, `layers[k]` the nodes at
/// height `k` that have at least one non-empty descendant.
#[derive(Clone, Debug)]
pub struct SnapshotTree {
    layers: Vec<Vec<Fr>>,
}

impl Default for SnapshotTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotTree {
    pub fn new() -> Self {
        Self {
            layers: vec![Vec::new(); SNAPSHOT_TREE_DEPTH + 1],
        }
    }

    pub fn from_leaves<I: IntoIterator<Item = Fr>>(leaves: I) -> ClaimResult<Self> {
        let mut tree = Self::new();
        for leaf in leaves {
            tree.insert(leaf)?;
        }
        Ok(tree)
    }

    /// Leaves in file order.
    pub fn from_tokens(tokens: &[Token]) -> ClaimResult<Self> {
        let leaves = tokens.iter().map(encode_leaf).collect::<ClaimResult<Vec<_>>>()?;
        Self::from_leaves(leaves)
    }

    pub fn insert(&mut self, leaf: Fr) -> ClaimResult<usize> {
        let index = self.layers[0].len();
        if index >= SNAPSHOT_CAPACITY {
            return Err(ClaimError::TreeFull(format!(
                "depth {} tree holds {} leaves",
                SNAPSHOT_TREE_DEPTH, SNAPSHOT_CAPACITY
            )));
        }
        self.layers[0].push(leaf);

        let zeros = zeros();
        let mut node_index = index;
        for level in 0..SNAPSHOT_TREE_DEPTH {
            let parent_index = node_index / 2;
            let left = self.layers[level][parent_index * 2];
            let right = self.layers[level]
                .get(parent_index * 2 + 1)
                .copied()
                .unwrap_or(zeros[level]);
            let parent = hash2(left, right);

            let upper = &mut self.layers[level + 1];
            if parent_index < upper.len() {
                upper[parent_index] = parent;
            } else {
                upper.push(parent);
            }
            node_index = parent_index;
        }

        Ok(index)
    }

    pub fn root(&self) -> Fr {
        self.layers[SNAPSHOT_TREE_DEPTH]
            .first()
            .copied()
            .unwrap_or(zeros()[SNAPSHOT_TREE_DEPTH])
    }

    pub fn root_bytes(&self) -> FieldBytes {
        fr_to_field_bytes(&self.root())
    }

    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    pub fn leaf(&self, index: usize) -> Option<Fr> {
        self.layers[0].get(index).copied()
    }

    pub fn create_proof(&self, index: usize) -> ClaimResult<InclusionPath> {
        if index >= self.len() {
            return Err(ClaimError::Internal(format!(
                "leaf index {} out of range ({} leaves)",
                index,
                self.len()
            )));
        }

        let zeros = zeros();
        let mut siblings = [Fr::from(0u64); SNAPSHOT_TREE_DEPTH];
        let mut positions = 0u16;
        let mut node_index = index;

        for (level, sibling) in siblings.iter_mut().enumerate() {
            if node_index % 2 == 1 {
                positions |= 1 << level;
            }
            *sibling = self.layers[level]
                .get(node_index ^ 1)
                .copied()
                .unwrap_or(zeros[level]);
            node_index /= 2;
        }

        Ok(InclusionPath {
            siblings,
            positions,
        })
    }
}

/// Ownership list published by an organizer. Leaf `i` is `tokens[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tokens: Vec<Token>,
}

impl Snapshot {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn from_json(json: &str) -> ClaimResult<Self> {
        serde_json::from_str(json).map_err(|e| ClaimError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> ClaimResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ClaimError::Serialization(e.to_string()))
    }

    pub fn tree(&self) -> ClaimResult<SnapshotTree> {
        SnapshotTree::from_tokens(&self.tokens)
    }

    pub fn index_of(&self, token: &Token) -> Option<usize> {
        self.tokens.iter().position(|t| t == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anonclaim_types::{EthAddress, TokenId};

    fn leaves(n: u64) -> Vec<Fr> {
        (1..=n).map(|i| hash2(Fr::from(i), Fr::from(i))).collect()
    }

    /// Full recomputation from the leaf layer.
    fn naive_root(leaves: &[Fr]) -> Fr {
        let zeros = zeros();
        let mut level = leaves.to_vec();
        for zero in zeros.iter().take(SNAPSHOT_TREE_DEPTH) {
            if level.is_empty() {
                return zeros[SNAPSHOT_TREE_DEPTH];
            }
            level = level
                .chunks(2)
                .map(|pair| hash2(pair[0], pair.get(1).copied().unwrap_or(*zero)))
                .collect();
        }
        level[0]
    }

    #[test]
    fn test_empty_root() {
        let tree = SnapshotTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), zeros()[SNAPSHOT_TREE_DEPTH]);
        assert_eq!(zeros()[0], Fr::from(0u64));
    }

    #[test]
    fn test_incremental_matches_naive() {
        let leaves = leaves(11);
        let mut tree = SnapshotTree::new();
        for (i, leaf) in leaves.iter().enumerate() {
            assert_eq!(tree.insert(*leaf).unwrap(), i);
            assert_eq!(tree.root(), naive_root(&leaves[..=i]));
        }
        assert_eq!(tree.len(), 11);
    }

    #[test]
    fn test_proofs_verify() {
        let leaves = leaves(5);
        let tree = SnapshotTree::from_leaves(leaves.clone()).unwrap();
        let root = tree.root();

        for (i, leaf) in leaves.iter().enumerate() {
            let path = tree.create_proof(i).unwrap();
            assert_eq!(path.index(), i);
            assert!(path.verify(*leaf, root));
        }

        let path = tree.create_proof(0).unwrap();
        assert!(!path.verify(leaves[1], root));
        assert!(!path.verify(leaves[0], hash2(root, root)));
    }

    #[test]
    fn test_positions_bits() {
        let tree = SnapshotTree::from_leaves(leaves(6)).unwrap();
        let path = tree.create_proof(5).unwrap();
        // 5 = 0b101: right child at levels 0 and 2
        assert_eq!(path.positions, 0b101);
        assert!(path.is_right(0));
        assert!(!path.is_right(1));
        assert_eq!(path.siblings[0], tree.leaf(4).unwrap());
        assert_eq!(path.siblings[3], zeros()[3]);
    }

    #[test]
    fn test_order_matters() {
        let mut leaves = leaves(4);
        let root = SnapshotTree::from_leaves(leaves.clone()).unwrap().root();

        leaves.swap(1, 2);
        let swapped = SnapshotTree::from_leaves(leaves.clone()).unwrap().root();
        assert_ne!(root, swapped);

        leaves.pop();
        let shorter = SnapshotTree::from_leaves(leaves).unwrap().root();
        assert_ne!(root, shorter);
    }

    #[test]
    fn test_proof_out_of_range() {
        let tree = SnapshotTree::from_leaves(leaves(2)).unwrap();
        assert!(matches!(tree.create_proof(2), Err(ClaimError::Internal(_))));
    }

    #[test]
    fn test_tree_full() {
        let mut tree = SnapshotTree::new();
        tree.layers[0] = vec![Fr::from(0u64); SNAPSHOT_CAPACITY];
        assert!(matches!(tree.insert(Fr::from(1u64)), Err(ClaimError::TreeFull(_))));
    }

    #[test]
    fn test_path_json() {
        let tree = SnapshotTree::from_leaves(leaves(3)).unwrap();
        let path = tree.create_proof(2).unwrap();
        let json = serde_json::to_string(&path).unwrap();
        let back: InclusionPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);

        let truncated = r#"{"siblings":["0x00"],"positions":0}"#;
        assert!(serde_json::from_str::<InclusionPath>(truncated).is_err());
    }

    #[test]
    fn test_snapshot_from_tokens() {
        let tokens: Vec<Token> = (0..3u8)
            .map(|i| Token {
                collection: EthAddress::from_bytes([0xc0; 20]),
                token_id: TokenId::from_u64(u64::from(i)),
                owner: EthAddress::from_bytes([i; 20]),
            })
            .collect();
        let snapshot = Snapshot::new(tokens.clone());
        let json = snapshot.to_json().unwrap();
        let parsed = Snapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snapshot);

        let tree = parsed.tree().unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(parsed.index_of(&tokens[2]), Some(2));
        assert_eq!(tree.leaf(2).unwrap(), encode_leaf(&tokens[2]).unwrap());
    }
}
