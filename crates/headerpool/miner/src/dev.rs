//! In-memory development chain
//!
//! Plays both collaborator roles for local mining and tests: it builds
//! templates on its current tip and extends the tip with blocks that connect
//! and meet the fixed target.

use alloy_primitives::{Address, U256};
use headerpool_consensus::{verify_pow, Block, BlockId, Payout, Target};
use parking_lot::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::{BlockRejection, BlockSink, BlockTemplate, TemplateError, TemplateSource};

/// Reward paid to the miner of every block
pub const BLOCK_REWARD: u64 = 50;

#[derive(Debug, Default)]
struct ChainState {
    tip: BlockId,
    blocks: Vec<Block>,
}

/// Chain kept entirely in memory with a constant target
#[derive(Debug)]
pub struct DevChain {
    target: Target,
    payout_address: Address,
    state: RwLock<ChainState>,
}

impl DevChain {
    /// Create an empty chain whose first block builds on [`BlockId::ZERO`]
    pub fn new(target: Target, payout_address: Address) -> Self {
        Self { target, payout_address, state: RwLock::new(ChainState::default()) }
    }

    /// Id of the latest block
    pub fn tip(&self) -> BlockId {
        self.state.read().tip
    }

    /// Number of blocks on top of the zero parent
    pub fn height(&self) -> u64 {
        self.state.read().blocks.len() as u64
    }

    /// Copies of all accepted blocks in chain order
    pub fn blocks(&self) -> Vec<Block> {
        self.state.read().blocks.clone()
    }

    /// Target every block must meet
    pub const fn target(&self) -> Target {
        self.target
    }
}

impl TemplateSource for DevChain {
    fn build_template(&self) -> Result<(BlockTemplate, Target), TemplateError> {
        let state = self.state.read();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| TemplateError::Other(err.to_string()))?
            .as_secs();

        let mut template = BlockTemplate::new(state.tip, state.blocks.len() as u64 + 1, timestamp);
        template
            .miner_payouts
            .push(Payout::new(U256::from(BLOCK_REWARD), self.payout_address));
        Ok((template, self.target))
    }
}

impl BlockSink for DevChain {
    fn accept_block(&self, block: Block) -> Result<(), BlockRejection> {
        let header = block.header();
        let id = header.id();

        let mut state = self.state.write();
        if block.parent_id != state.tip {
            return Err(BlockRejection::new(id, format!("parent {} is not the tip", block.parent_id)));
        }
        verify_pow(&header, &self.target).map_err(|err| BlockRejection::new(id, err.to_string()))?;

        state.tip = id;
        state.blocks.push(block);
        debug!(target: "headerpool::dev", block = %id, height = state.blocks.len(), "Extended chain");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeaderCache, HeaderCacheConfig, HeaderCacheError, MiningConfig, MiningWorker};
    use std::sync::Arc;

    fn chain() -> Arc<DevChain> {
        Arc::new(DevChain::new(Target::from_difficulty(U256::from(8u64)), Address::repeat_byte(1)))
    }

    #[test]
    fn test_template_builds_on_tip() {
        let chain = chain();
        let (template, target) = chain.build_template().unwrap();
        assert_eq!(template.parent_id, BlockId::ZERO);
        assert_eq!(template.height, 1);
        assert_eq!(template.miner_payouts.len(), 1);
        assert_eq!(target, chain.target());
    }

    #[test]
    fn test_mine_through_cache() {
        let chain = chain();
        let cache =
            HeaderCache::new(HeaderCacheConfig::new(8, 4), Arc::clone(&chain), Arc::clone(&chain))
                .unwrap();
        let worker = MiningWorker::new(MiningConfig::default());

        for height in 1..=3 {
            let (header, target) = cache.request_work().unwrap();
            let solved = worker.solve(header, &target).unwrap();
            let id = cache.submit_header(solved.header).unwrap();
            assert_eq!(chain.tip(), id);
            assert_eq!(chain.height(), height);
        }

        let blocks = chain.blocks();
        assert_eq!(blocks[1].parent_id, blocks[0].id());
        assert_eq!(blocks[2].parent_id, blocks[1].id());
    }

    #[test]
    fn test_stale_parent_passes_rejection_through() {
        let chain = chain();
        let cache =
            HeaderCache::new(HeaderCacheConfig::new(8, 4), Arc::clone(&chain), Arc::clone(&chain))
                .unwrap();
        let worker = MiningWorker::new(MiningConfig::default());

        // two headers from the same template, so both build on the genesis parent
        let (first, target) = cache.request_work().unwrap();
        let second = cache.request_header().unwrap();

        cache.submit_header(worker.solve(first, &target).unwrap().header).unwrap();
        let err = cache.submit_header(worker.solve(second, &target).unwrap().header).unwrap_err();
        assert!(matches!(err, HeaderCacheError::Rejected(ref r) if r.reason.contains("not the tip")));
        assert_eq!(chain.height(), 1);
        // the rejected header stays outstanding
        assert!(cache.contains(&second));
    }

    #[test]
    fn test_rejects_unmet_target() {
        let chain = Arc::new(DevChain::new(Target::new(U256::ZERO), Address::ZERO));
        let (template, _) = chain.build_template().unwrap();
        let block = template.block_with(Default::default(), Default::default());
        assert!(chain.accept_block(block).is_err());
        assert_eq!(chain.tip(), BlockId::ZERO);
    }
}
