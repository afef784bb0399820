//! Binary Merkle tree over BLAKE3
//!
//! Leaves and interior nodes are domain separated so a leaf can never be
//! replayed as a node. An unpaired node at the end of a level is promoted to
//! the next level unchanged.

use alloy_primitives::B256;
use blake3::Hasher as Blake3;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hash a leaf's encoded data
pub fn leaf_hash(data: &[u8]) -> B256 {
    let mut hasher = Blake3::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(data);
    B256::from(*hasher.finalize().as_bytes())
}

/// Hash two child nodes into their parent
pub fn node_hash(left: &B256, right: &B256) -> B256 {
    let mut hasher = Blake3::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left.as_slice());
    hasher.update(right.as_slice());
    B256::from(*hasher.finalize().as_bytes())
}

/// Compute the root of a tree whose leaves are already hashed
pub fn root(leaves: impl IntoIterator<Item = B256>) -> B256 {
    let mut level: Vec<B256> = leaves.into_iter().collect();
    if level.is_empty() {
        return B256::from(*blake3::hash(b"").as_bytes());
    }

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => node_hash(left, right),
                // odd node is promoted
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}
