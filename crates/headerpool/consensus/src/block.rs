//! Blocks, headers and transactions
//!
//! A [`Header`] commits to a block through its Merkle root: the miner payouts
//! followed by the transactions, each hashed as a leaf of its encoding.

use alloy_primitives::{Address, B256, B64, Bytes, U256};
use std::fmt;

use crate::merkle;

/// Size of an encoded header in bytes
pub const HEADER_SIZE: usize = 80;

/// Block identifier, the BLAKE3 hash of the encoded header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub B256);

impl BlockId {
    /// The all-zero id, used as the parent of the first block
    pub const ZERO: Self = Self(B256::ZERO);

    /// Interpret the id as a big-endian integer
    pub fn to_u256(&self) -> U256 {
        U256::from_be_bytes(self.0.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<B256> for BlockId {
    fn from(hash: B256) -> Self {
        Self(hash)
    }
}

/// Proof-of-work header
///
/// Layout of the 80-byte encoding:
///
/// ```text
/// parent_id (32) | nonce (8) | timestamp (8, LE) | merkle_root (32)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Header {
    /// Id of the block this one extends
    pub parent_id: BlockId,
    /// Field varied by the miner
    pub nonce: B64,
    /// Seconds since the unix epoch
    pub timestamp: u64,
    /// Merkle root over payouts and transactions
    pub merkle_root: B256,
}

impl Header {
    /// Encode into the fixed 80-byte layout
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..32].copy_from_slice(self.parent_id.0.as_slice());
        out[32..40].copy_from_slice(self.nonce.as_slice());
        out[40..48].copy_from_slice(&self.timestamp.to_le_bytes());
        out[48..].copy_from_slice(self.merkle_root.as_slice());
        out
    }

    /// Decode from the fixed 80-byte layout
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&bytes[40..48]);
        Self {
            parent_id: BlockId(B256::from_slice(&bytes[..32])),
            nonce: B64::from_slice(&bytes[32..40]),
            timestamp: u64::from_le_bytes(timestamp),
            merkle_root: B256::from_slice(&bytes[48..]),
        }
    }

    /// Hash of the encoded header
    pub fn id(&self) -> BlockId {
        BlockId(B256::from(*blake3::hash(&self.encode()).as_bytes()))
    }

    /// Copy of this header with a different nonce
    pub const fn with_nonce(mut self, nonce: B64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Copy of this header with the nonce cleared
    ///
    /// Everything except the nonce is fixed at issuance, so this is the form
    /// under which an issued header is remembered.
    pub const fn without_nonce(self) -> Self {
        self.with_nonce(B64::ZERO)
    }
}

/// A payout to a miner address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Payout {
    /// Amount paid
    pub value: U256,
    /// Receiving address
    pub address: Address,
}

impl Payout {
    /// Create a new payout
    pub const fn new(value: U256, address: Address) -> Self {
        Self { value, address }
    }

    /// Append the binary encoding
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_be_bytes::<32>());
        out.extend_from_slice(self.address.as_slice());
    }
}

/// A transaction
///
/// Only the parts the miner cares about are modelled: outputs and arbitrary
/// data. A transaction carrying nothing but arbitrary data is valid and is how
/// otherwise identical blocks are made to hash differently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Transaction {
    /// Value outputs
    pub outputs: Vec<Payout>,
    /// Opaque data entries
    pub arbitrary_data: Vec<Bytes>,
}

impl Transaction {
    /// Create a transaction that only carries one arbitrary data entry
    pub fn arbitrary(data: impl Into<Bytes>) -> Self {
        Self { outputs: Vec::new(), arbitrary_data: vec![data.into()] }
    }

    /// Append the binary encoding
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            output.encode(out);
        }
        out.extend_from_slice(&(self.arbitrary_data.len() as u64).to_le_bytes());
        for data in &self.arbitrary_data {
            out.extend_from_slice(&(data.len() as u64).to_le_bytes());
            out.extend_from_slice(data);
        }
    }

    /// Hash of the encoded transaction
    pub fn id(&self) -> B256 {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        B256::from(*blake3::hash(&buf).as_bytes())
    }
}

/// Merkle root over `payouts` followed by `transactions`
pub fn merkle_root<'a>(
    payouts: impl IntoIterator<Item = &'a Payout>,
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> B256 {
    let mut leaves = Vec::new();
    let mut buf = Vec::new();
    for payout in payouts {
        buf.clear();
        payout.encode(&mut buf);
        leaves.push(merkle::leaf_hash(&buf));
    }
    for tx in transactions {
        buf.clear();
        tx.encode(&mut buf);
        leaves.push(merkle::leaf_hash(&buf));
    }
    merkle::root(leaves)
}

/// A full block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Id of the parent block
    pub parent_id: BlockId,
    /// Seconds since the unix epoch
    pub timestamp: u64,
    /// Proof-of-work nonce
    pub nonce: B64,
    /// Miner payouts
    pub miner_payouts: Vec<Payout>,
    /// Transactions in block order
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Merkle root committing to payouts and transactions
    pub fn merkle_root(&self) -> B256 {
        merkle_root(&self.miner_payouts, &self.transactions)
    }

    /// Derive the header for this block
    pub fn header(&self) -> Header {
        Header {
            parent_id: self.parent_id,
            nonce: self.nonce,
            timestamp: self.timestamp,
            merkle_root: self.merkle_root(),
        }
    }

    /// Block id
    pub fn id(&self) -> BlockId {
        self.header().id()
    }
}
