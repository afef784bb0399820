//! Header cache error types

use headerpool_consensus::{BlockId, Target};
use thiserror::Error;

/// Failure reported by a [`TemplateSource`](crate::TemplateSource)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// There is no block to build on
    #[error("no parent block to build on")]
    NoParent,

    /// Transaction pool could not produce a transaction set
    #[error("transaction pool error: {0}")]
    TransactionPool(String),

    /// Any other builder failure
    #[error("{0}")]
    Other(String),
}

/// Reason a [`BlockSink`](crate::BlockSink) refused a block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("block {id} rejected: {reason}")]
pub struct BlockRejection {
    /// Id of the rejected block
    pub id: BlockId,
    /// Collaborator supplied reason
    pub reason: String,
}

impl BlockRejection {
    /// Create a new rejection
    pub fn new(id: BlockId, reason: impl Into<String>) -> Self {
        Self { id, reason: reason.into() }
    }
}

/// Errors returned by [`HeaderCache`](crate::HeaderCache) operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderCacheError {
    /// The template builder failed; retry later
    #[error("block template unavailable: {0}")]
    TemplateUnavailable(#[source] TemplateError),

    /// Header was never issued, has been evicted, or was already consumed
    #[error("header is stale or was never issued")]
    StaleOrInvalidHeader,

    /// Rebuilt block does not reproduce the submitted header
    #[error("header mismatch: submitted {submitted}, rebuilt {rebuilt}")]
    HeaderMismatch {
        /// Id of the submitted header
        submitted: BlockId,
        /// Id of the header recomputed from cached material
        rebuilt: BlockId,
    },

    /// Submitted header does not satisfy the target of its template
    #[error("header {id} does not meet target {target}")]
    TargetNotMet {
        /// Id of the submitted header
        id: BlockId,
        /// Target active when the template was built
        target: Target,
    },

    /// Chain acceptance refused the block
    #[error(transparent)]
    Rejected(#[from] BlockRejection),
}

/// Invalid [`HeaderCacheConfig`](crate::HeaderCacheConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Window must hold at least one header
    #[error("header_for_work_memory must be greater than zero")]
    ZeroWindow,

    /// Each template must be used for at least one header
    #[error("headers_per_block_memory must be greater than zero")]
    ZeroBatch,

    /// A batch cannot be larger than the window
    #[error("headers_per_block_memory ({batch}) exceeds header_for_work_memory ({window})")]
    BatchExceedsWindow {
        /// Configured batch size
        batch: usize,
        /// Configured window size
        window: usize,
    },

    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_passes_through_verbatim() {
        let rejection = BlockRejection::new(BlockId::ZERO, "orphan");
        let err = HeaderCacheError::from(rejection.clone());
        assert_eq!(err.to_string(), rejection.to_string());
        assert_eq!(err, HeaderCacheError::Rejected(rejection));
    }

    #[test]
    fn test_template_unavailable_display() {
        let err = HeaderCacheError::TemplateUnavailable(TemplateError::NoParent);
        assert!(err.to_string().contains("no parent block"));
    }
}
