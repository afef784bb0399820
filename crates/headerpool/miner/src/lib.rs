//! Headerpool miner
//!
//! This crate hands out proof-of-work headers to mining workers, remembers
//! enough to rebuild the full block when a worker reports a solved nonce, and
//! forgets stale headers once they fall out of a fixed-size window.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HEADER CACHE                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Template batch                                          │   │
//! │   │  • One template per `headers_per_block_memory` headers   │   │
//! │   │  • Shared by every header minted from it                 │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                              │                                  │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Issuance window                                         │   │
//! │   │  • Random transaction spliced into slot 0 per header     │   │
//! │   │  • FIFO ring of `header_for_work_memory` headers         │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                              │                                  │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Submission                                              │   │
//! │   │  • Rebuild block, recheck header and target              │   │
//! │   │  • Hand block to the chain, consume the entry            │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod cache;
pub mod config;
pub mod dev;
pub mod error;
pub mod random;
pub mod template;
pub mod worker;

pub use cache::{CacheStats, HeaderCache};
pub use config::HeaderCacheConfig;
pub use dev::DevChain;
pub use error::{BlockRejection, ConfigError, HeaderCacheError, TemplateError};
pub use random::RandomTransactionGenerator;
pub use template::{BlockSink, BlockTemplate, BlockTemplateBuilder, TemplateSource};
pub use worker::{MiningConfig, MiningResult, MiningWorker};

use thiserror::Error;

/// Nonce grinding errors
#[derive(Debug, Error)]
pub enum MiningError {
    /// No solution found within nonce range
    #[error("No solution found in nonce range {start}..{end}")]
    NoSolution {
        /// First nonce tried
        start: u64,
        /// Nonce the search stopped at
        end: u64,
    },

    /// Mining was cancelled
    #[error("Mining cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mining_error() {
        let err = MiningError::NoSolution { start: 0, end: 1000 };
        assert!(err.to_string().contains("No solution"));
    }
}
