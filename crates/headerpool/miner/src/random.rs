//! Randomizing transactions
//!
//! Headers minted from the same template only differ through the transaction
//! placed in slot 0. Each one carries a tag, a per-generator sequence number
//! and 32 random bytes.

use alloy_primitives::Bytes;
use headerpool_consensus::Transaction;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of every randomizing payload
pub const RANDOM_TX_TAG: &[u8; 16] = b"headerpool/work\0";

const RANDOM_BYTES: usize = 32;

/// Produces arbitrary-data transactions that are distinct from every other one
/// this generator has produced
#[derive(Debug, Default)]
pub struct RandomTransactionGenerator {
    sequence: AtomicU64,
}

impl RandomTransactionGenerator {
    /// Create a new generator
    pub const fn new() -> Self {
        Self { sequence: AtomicU64::new(0) }
    }

    /// Produce the next randomizing transaction
    pub fn next_transaction(&self) -> Transaction {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let entropy: [u8; RANDOM_BYTES] = rand::random();

        let mut payload = Vec::with_capacity(RANDOM_TX_TAG.len() + 8 + RANDOM_BYTES);
        payload.extend_from_slice(RANDOM_TX_TAG);
        payload.extend_from_slice(&sequence.to_le_bytes());
        payload.extend_from_slice(&entropy);
        Transaction::arbitrary(Bytes::from(payload))
    }
}
