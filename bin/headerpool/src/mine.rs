//! Mining command
//!
//! Wires a [`DevChain`] to a [`HeaderCache`] and runs concurrent workers that
//! each loop over request, solve and submit until enough blocks are mined.

use alloy_primitives::{Address, U256};
use clap::Parser;
use headerpool_consensus::Target;
use headerpool_miner::{
    DevChain, HeaderCache, HeaderCacheConfig, HeaderCacheError, MiningConfig, MiningError,
    MiningWorker,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

type DevCache = HeaderCache<Arc<DevChain>, Arc<DevChain>>;

/// Pause before asking for work again after the template source failed
const TEMPLATE_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Mining command arguments
#[derive(Debug, Parser)]
pub(crate) struct MineArgs {
    /// Address receiving block rewards
    #[arg(long, default_value = "0x0000000000000000000000000000000000000001")]
    pub(crate) miner: Address,

    /// JSON file with header cache settings
    #[arg(long, env = "HEADERPOOL_CONFIG")]
    pub(crate) config: Option<PathBuf>,

    /// Outstanding headers remembered (overrides the config file)
    #[arg(long)]
    pub(crate) header_memory: Option<usize>,

    /// Headers minted per block template (overrides the config file)
    #[arg(long)]
    pub(crate) headers_per_template: Option<usize>,

    /// Number of concurrent workers (0 = auto-detect)
    #[arg(long, short = 'w', default_value = "0")]
    pub(crate) workers: usize,

    /// Difficulty of the development chain
    #[arg(long, short = 'd', default_value = "100000")]
    pub(crate) difficulty: u64,

    /// Number of blocks to mine
    #[arg(long, short = 'n', default_value = "1")]
    pub(crate) blocks: u64,

    /// Seconds a worker grinds one header before asking for a new one
    #[arg(long, default_value = "30")]
    pub(crate) timeout: u64,
}

impl MineArgs {
    fn cache_config(&self) -> eyre::Result<HeaderCacheConfig> {
        let mut config = match &self.config {
            Some(path) => HeaderCacheConfig::load(path)?,
            None => HeaderCacheConfig::default(),
        };
        if let Some(window) = self.header_memory {
            config.header_for_work_memory = window;
        }
        if let Some(batch) = self.headers_per_template {
            config.headers_per_block_memory = batch;
        }
        Ok(config)
    }

    /// Run the miner
    pub(crate) async fn run(self) -> eyre::Result<()> {
        let workers = if self.workers == 0 { num_cpus::get() } else { self.workers };
        let config = self.cache_config()?;
        let target = Target::from_difficulty(U256::from(self.difficulty));

        let chain = Arc::new(DevChain::new(target, self.miner));
        let cache = Arc::new(HeaderCache::new(config, Arc::clone(&chain), Arc::clone(&chain))?);
        let worker = MiningWorker::new(MiningConfig::with_timeout(Duration::from_secs(self.timeout)));

        info!(
            target: "headerpool::mine",
            miner = %self.miner,
            workers,
            difficulty = self.difficulty,
            window = config.header_for_work_memory,
            batch = config.headers_per_block_memory,
            "Starting miner"
        );

        let start = Instant::now();
        let mut tasks = JoinSet::new();
        for index in 0..workers {
            tasks.spawn(mine_until(
                index,
                Arc::clone(&cache),
                Arc::clone(&chain),
                worker.clone(),
                self.blocks,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            joined??;
            // first worker to see the goal reached stops the others
            worker.cancel();
        }

        let stats = cache.stats();
        info!(
            target: "headerpool::mine",
            blocks = chain.height(),
            tip = %chain.tip(),
            headers_issued = stats.headers_issued,
            templates_built = stats.templates_built,
            stale = stats.stale_submissions,
            rejected = stats.rejected_blocks,
            hashes = worker.hash_count(),
            elapsed_ms = start.elapsed().as_millis(),
            "Mining complete"
        );
        Ok(())
    }
}

/// Worker loop: request, solve and submit until the chain reaches `goal`
async fn mine_until(
    index: usize,
    cache: Arc<DevCache>,
    chain: Arc<DevChain>,
    worker: MiningWorker,
    goal: u64,
) -> eyre::Result<()> {
    while chain.height() < goal {
        let (header, target) = match cache.request_work() {
            Ok(work) => work,
            Err(err @ HeaderCacheError::TemplateUnavailable(_)) => {
                warn!(target: "headerpool::mine", worker = index, error = %err, "No work available");
                tokio::time::sleep(TEMPLATE_RETRY_DELAY).await;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let solved = match worker.solve_async(header, target).await {
            Ok(solved) => solved,
            Err(MiningError::Cancelled) => break,
            Err(err @ MiningError::NoSolution { .. }) => {
                debug!(target: "headerpool::mine", worker = index, error = %err, "Giving up on header");
                continue;
            }
        };

        match cache.submit_header(solved.header) {
            Ok(id) => info!(
                target: "headerpool::mine",
                worker = index,
                block = %id,
                height = chain.height(),
                hashes = solved.hashes_computed,
                hashrate = format!("{:.2} H/s", solved.hashrate()),
                "Block mined"
            ),
            // another worker moved the tip or the header aged out
            Err(err @ (HeaderCacheError::StaleOrInvalidHeader | HeaderCacheError::Rejected(_))) => {
                debug!(target: "headerpool::mine", worker = index, error = %err, "Submission discarded");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(blocks: u64) -> MineArgs {
        MineArgs {
            miner: Address::ZERO,
            config: None,
            header_memory: Some(16),
            headers_per_template: Some(4),
            workers: 2,
            difficulty: 16,
            blocks,
            timeout: 10,
        }
    }

    #[test]
    fn test_cli_overrides() {
        let config = args(1).cache_config().unwrap();
        assert_eq!(config, HeaderCacheConfig::new(16, 4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mine_blocks() {
        // difficulty 16 is solved within a few dozen hashes
        args(3).run().await.unwrap();
    }

    #[test]
    fn test_parse_args() {
        let args = MineArgs::try_parse_from(["mine", "--blocks", "5", "--header-memory", "100"]).unwrap();
        assert_eq!(args.blocks, 5);
        assert_eq!(args.header_memory, Some(100));
        assert_eq!(args.headers_per_template, None);
    }
}
