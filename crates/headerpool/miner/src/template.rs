//! Block template and the collaborators around it
//!
//! A block template holds everything about a block that the issuer fixes:
//! parent, timestamp, payouts and the pending transactions. Slot 0 of the
//! transaction list is not stored; it is filled with a randomizing transaction
//! for every header minted from the template.

use alloy_primitives::{Address, B64, U256};
use headerpool_consensus::{
    block::merkle_root, Block, BlockId, Header, Payout, Target, Transaction,
};
use std::iter;
use std::sync::Arc;

use crate::{BlockRejection, TemplateError};

/// Block template for header issuance
///
/// Immutable once built and shared by every header minted from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTemplate {
    /// Parent block id
    pub parent_id: BlockId,
    /// Height of the block being built, for diagnostics
    pub height: u64,
    /// Timestamp (seconds since epoch)
    pub timestamp: u64,
    /// Miner payouts
    pub miner_payouts: Vec<Payout>,
    /// Transactions following slot 0
    pub transactions: Vec<Transaction>,
}

impl BlockTemplate {
    /// Create an empty template on top of `parent_id`
    pub const fn new(parent_id: BlockId, height: u64, timestamp: u64) -> Self {
        Self {
            parent_id,
            height,
            timestamp,
            miner_payouts: Vec::new(),
            transactions: Vec::new(),
        }
    }

    /// Header for this template with `random_tx` in slot 0 and a zero nonce
    pub fn header_with(&self, random_tx: &Transaction) -> Header {
        Header {
            parent_id: self.parent_id,
            nonce: B64::ZERO,
            timestamp: self.timestamp,
            merkle_root: merkle_root(
                &self.miner_payouts,
                iter::once(random_tx).chain(&self.transactions),
            ),
        }
    }

    /// Full block with `random_tx` in slot 0
    pub fn block_with(&self, random_tx: Transaction, nonce: B64) -> Block {
        let mut transactions = Vec::with_capacity(self.transactions.len() + 1);
        transactions.push(random_tx);
        transactions.extend_from_slice(&self.transactions);

        Block {
            parent_id: self.parent_id,
            timestamp: self.timestamp,
            nonce,
            miner_payouts: self.miner_payouts.clone(),
            transactions,
        }
    }
}

/// Builder for creating block templates
#[derive(Debug, Default)]
pub struct BlockTemplateBuilder {
    template: BlockTemplate,
}

impl BlockTemplateBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parent block
    pub fn parent(mut self, id: BlockId, height: u64) -> Self {
        self.template.parent_id = id;
        self.template.height = height + 1;
        self
    }

    /// Set the timestamp
    pub fn timestamp(mut self, ts: u64) -> Self {
        self.template.timestamp = ts;
        self
    }

    /// Add a miner payout
    pub fn payout(mut self, value: U256, address: Address) -> Self {
        self.template.miner_payouts.push(Payout::new(value, address));
        self
    }

    /// Add a pending transaction
    pub fn transaction(mut self, tx: Transaction) -> Self {
        self.template.transactions.push(tx);
        self
    }

    /// Add several pending transactions
    pub fn transactions(mut self, txs: impl IntoIterator<Item = Transaction>) -> Self {
        self.template.transactions.extend(txs);
        self
    }

    /// Build the template
    pub fn build(self) -> BlockTemplate {
        self.template
    }
}

/// Builds block templates from the current chain state
pub trait TemplateSource {
    /// Build a template on the current tip, with the target it must meet
    ///
    /// Called with the cache lock held; may block.
    fn build_template(&self) -> Result<(BlockTemplate, Target), TemplateError>;
}

/// Accepts solved blocks into the chain
pub trait BlockSink {
    /// Submit a fully reconstructed block
    fn accept_block(&self, block: Block) -> Result<(), BlockRejection>;
}

impl<T: TemplateSource + ?Sized> TemplateSource for Arc<T> {
    fn build_template(&self) -> Result<(BlockTemplate, Target), TemplateError> {
        (**self).build_template()
    }
}

impl<T: BlockSink + ?Sized> BlockSink for Arc<T> {
    fn accept_block(&self, block: Block) -> Result<(), BlockRejection> {
        (**self).accept_block(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, B256};

    fn template() -> BlockTemplate {
        BlockTemplateBuilder::new()
            .parent(BlockId(B256::repeat_byte(3)), 0)
            .timestamp(1000)
            .payout(U256::from(50u64), Address::repeat_byte(9))
            .transaction(Transaction::arbitrary(Bytes::from_static(b"pending")))
            .build()
    }

    #[test]
    fn test_template_builder() {
        let template = template();
        assert_eq!(template.height, 1);
        assert_eq!(template.timestamp, 1000);
        assert_eq!(template.miner_payouts.len(), 1);
        assert_eq!(template.transactions.len(), 1);
    }

    #[test]
    fn test_header_matches_block() {
        let template = template();
        let random_tx = Transaction::arbitrary(Bytes::from_static(b"slot zero"));

        let header = template.header_with(&random_tx);
        let block = template.block_with(random_tx, B64::ZERO);

        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.header(), header);
    }

    #[test]
    fn test_slot_zero_distinguishes_headers() {
        let template = template();
        let a = template.header_with(&Transaction::arbitrary(Bytes::from_static(b"a")));
        let b = template.header_with(&Transaction::arbitrary(Bytes::from_static(b"b")));
        assert_eq!(a.parent_id, b.parent_id);
        assert_ne!(a.merkle_root, b.merkle_root);
    }
}
