//! Mining worker implementation
//!
//! Grinds the nonce of an issued header until its id falls below the target.
//! The cache never calls this itself; it is the in-process stand-in for an
//! external miner.

use alloy_primitives::B64;
use headerpool_consensus::{BlockId, Header, Target};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::MiningError;

/// Mining configuration
#[derive(Debug, Clone)]
pub struct MiningConfig {
    /// Nonces to try per batch before checking for cancellation
    pub batch_size: u64,
    /// Maximum time to mine before giving up (None = forever)
    pub max_duration: Option<Duration>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self { batch_size: 10_000, max_duration: None }
    }
}

impl MiningConfig {
    /// Create config that gives up after `max_duration`
    pub fn with_timeout(max_duration: Duration) -> Self {
        Self { max_duration: Some(max_duration), ..Default::default() }
    }
}

/// Result of successful mining
#[derive(Debug, Clone)]
pub struct MiningResult {
    /// Header with the winning nonce
    pub header: Header,
    /// Its id (below the target)
    pub id: BlockId,
    /// Number of hashes computed
    pub hashes_computed: u64,
    /// Time taken to find solution
    pub duration: Duration,
}

impl MiningResult {
    /// Get hashrate in H/s
    pub fn hashrate(&self) -> f64 {
        self.hashes_computed as f64 / self.duration.as_secs_f64()
    }
}

/// Mining worker that searches for valid nonces
///
/// Cloning shares the cancellation flag and the hash counter.
#[derive(Debug, Clone)]
pub struct MiningWorker {
    config: MiningConfig,
    cancelled: Arc<AtomicBool>,
    total_hashes: Arc<AtomicU64>,
}

impl MiningWorker {
    /// Create a new mining worker
    pub fn new(config: MiningConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
            total_hashes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cancel ongoing mining
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Reset cancellation flag
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.total_hashes.store(0, Ordering::SeqCst);
    }

    /// Get current hash count
    pub fn hash_count(&self) -> u64 {
        self.total_hashes.load(Ordering::Relaxed)
    }

    /// Grind `header`'s nonce until it meets `target` (blocking)
    pub fn solve(&self, header: Header, target: &Target) -> Result<MiningResult, MiningError> {
        let start = Instant::now();
        let start_nonce: u64 = rand::random();
        let mut nonce = start_nonce;
        let mut hashes = 0u64;

        debug!(
            target: "headerpool::worker",
            parent = %header.parent_id,
            threshold = %target,
            "Starting nonce search"
        );

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(MiningError::Cancelled);
            }

            if let Some(max_dur) = self.config.max_duration {
                if start.elapsed() > max_dur {
                    return Err(MiningError::NoSolution { start: start_nonce, end: nonce });
                }
            }

            let mut batch = 0u64;
            for _ in 0..self.config.batch_size {
                let candidate = header.with_nonce(B64::new(nonce.to_be_bytes()));
                let id = candidate.id();
                batch += 1;

                if target.is_met_by(&id) {
                    hashes += batch;
                    self.total_hashes.fetch_add(batch, Ordering::Relaxed);
                    let duration = start.elapsed();

                    info!(
                        target: "headerpool::worker",
                        header = %id,
                        nonce,
                        hashes,
                        duration_ms = duration.as_millis(),
                        "Header solved"
                    );

                    return Ok(MiningResult { header: candidate, id, hashes_computed: hashes, duration });
                }

                nonce = nonce.wrapping_add(1);
            }

            hashes += batch;
            self.total_hashes.fetch_add(batch, Ordering::Relaxed);
        }
    }

    /// Grind on the blocking thread pool
    pub async fn solve_async(&self, header: Header, target: Target) -> Result<MiningResult, MiningError> {
        let worker = self.clone();
        tokio::task::spawn_blocking(move || worker.solve(header, &target))
            .await
            .map_err(|_| MiningError::Cancelled)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    #[test]
    fn test_mining_config() {
        let config = MiningConfig::default();
        assert_eq!(config.batch_size, 10_000);
        assert!(config.max_duration.is_none());
    }

    #[test]
    fn test_solve_easy_target() {
        let target = Target::from_difficulty(U256::from(16u64));
        let worker = MiningWorker::new(MiningConfig::with_timeout(Duration::from_secs(10)));

        let result = worker.solve(Header::default(), &target).unwrap();
        assert!(target.is_met_by(&result.id));
        assert_eq!(result.header.id(), result.id);
        assert_eq!(result.header.without_nonce(), Header::default());
        assert!(result.hashes_computed > 0);
    }

    #[test]
    fn test_impossible_target_times_out() {
        let worker = MiningWorker::new(MiningConfig {
            batch_size: 100,
            max_duration: Some(Duration::from_millis(20)),
        });
        let result = worker.solve(Header::default(), &Target::new(U256::ZERO));
        assert!(matches!(result, Err(MiningError::NoSolution { .. })));
        assert!(worker.hash_count() > 0);
    }

    #[test]
    fn test_hashes_counted_across_batches() {
        let target = Target::from_difficulty(U256::from(256u64));
        let worker = MiningWorker::new(MiningConfig { batch_size: 1, max_duration: None });
        worker.solve(Header::default(), &target).unwrap();

        worker.reset();
        let result = worker.solve(Header::default(), &target).unwrap();
        assert_eq!(result.hashes_computed, worker.hash_count());
        assert!(target.is_met_by(&result.id));
    }

    #[test]
    fn test_cancelled_before_start() {
        let worker = MiningWorker::new(MiningConfig::default());
        worker.cancel();
        let result = worker.solve(Header::default(), &Target::MAX);
        assert!(matches!(result, Err(MiningError::Cancelled)));

        worker.reset();
        assert!(worker.solve(Header::default(), &Target::MAX).is_ok());
    }

    #[tokio::test]
    async fn test_solve_async() {
        let target = Target::from_difficulty(U256::from(8u64));
        let worker = MiningWorker::new(MiningConfig::default());
        let result = worker.solve_async(Header::default(), target).await.unwrap();
        assert!(target.is_met_by(&result.id));
    }
}
