//! Headerpool consensus primitives
//!
//! This crate provides the chain types the header cache works with:
//! - [`Header`]: the fixed 80-byte proof-of-work header
//! - [`Block`]: parent, timestamp, payouts and transactions
//! - [`Target`]: the difficulty threshold a header id must fall below

pub mod block;
pub mod merkle;
pub mod pow;

pub use block::{Block, BlockId, Header, Payout, Transaction, HEADER_SIZE};
pub use pow::{verify_pow, Target};

/// Consensus errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    /// Header id is not below the target
    #[error("header {id} does not meet target {target}")]
    TargetNotMet {
        /// Id of the offending header
        id: BlockId,
        /// Target it was checked against
        target: Target,
    },
}
