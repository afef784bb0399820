//! Header issuance cache
//!
//! Maps every outstanding header to the material needed to rebuild its block:
//! a shared template and the randomizing transaction spliced into slot 0.
//!
//! Headers are remembered in issuance order in a ring of
//! `header_for_work_memory` slots. Issuing into an occupied slot evicts the
//! header that was there, so the oldest header is always the first to go and
//! memory stays bounded no matter how fast headers are requested. A template
//! is dropped once the last header minted from it has been evicted.
//!
//! The map, the ring, the write cursor and the current batch all live behind a
//! single lock. Template construction happens while holding it, so concurrent
//! callers can never build two templates for one batch.

use alloy_primitives::B64;
use headerpool_consensus::{Block, BlockId, Header, Target, Transaction};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::{
    BlockSink, BlockTemplate, ConfigError, HeaderCacheConfig, HeaderCacheError,
    RandomTransactionGenerator, TemplateSource,
};

/// Counters describing cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Headers handed out
    pub headers_issued: u64,
    /// Templates obtained from the template source
    pub templates_built: u64,
    /// Blocks the sink accepted
    pub blocks_accepted: u64,
    /// Submissions for unknown, evicted or consumed headers
    pub stale_submissions: u64,
    /// Submissions that failed the header or target check
    pub invalid_submissions: u64,
    /// Valid blocks the sink refused
    pub rejected_blocks: u64,
}

/// A template together with the target that was active when it was built
#[derive(Debug)]
struct TemplateBatch {
    template: BlockTemplate,
    target: Target,
}

/// Reconstruction material for one issued header
#[derive(Debug)]
struct CacheEntry {
    batch: Arc<TemplateBatch>,
    random_tx: Transaction,
    /// Ring slot the header was written to
    slot: usize,
}

impl CacheEntry {
    fn rebuild(&self, nonce: B64) -> Block {
        self.batch.template.block_with(self.random_tx.clone(), nonce)
    }
}

#[derive(Debug)]
struct CacheState {
    /// Issued headers, keyed with the nonce cleared
    entries: HashMap<Header, CacheEntry>,
    /// Last `header_for_work_memory` issued headers in issuance order
    ring: Vec<Option<Header>>,
    /// Next ring slot to write
    cursor: usize,
    /// Template headers are currently minted from
    batch: Option<Arc<TemplateBatch>>,
    /// Headers minted from `batch` so far
    batch_issued: usize,
    stats: CacheStats,
}

impl CacheState {
    fn new(window: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(window),
            ring: vec![None; window],
            cursor: 0,
            batch: None,
            batch_issued: 0,
            stats: CacheStats::default(),
        }
    }

    /// Whether `key` still occupies the ring slot it was issued into
    fn occupies(&self, key: &Header, slot: usize) -> bool {
        self.ring[slot].as_ref() == Some(key)
    }
}

/// Bounded, thread-safe header issuance cache
///
/// `S` builds block templates, `K` takes solved blocks.
#[derive(Debug)]
pub struct HeaderCache<S, K> {
    config: HeaderCacheConfig,
    source: S,
    sink: K,
    random: RandomTransactionGenerator,
    state: Mutex<CacheState>,
}

impl<S: TemplateSource, K: BlockSink> HeaderCache<S, K> {
    /// Create a new cache
    pub fn new(config: HeaderCacheConfig, source: S, sink: K) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            sink,
            random: RandomTransactionGenerator::new(),
            state: Mutex::new(CacheState::new(config.header_for_work_memory)),
        })
    }

    /// Configuration the cache was built with
    pub const fn config(&self) -> &HeaderCacheConfig {
        &self.config
    }

    /// Template source
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Block sink
    pub const fn sink(&self) -> &K {
        &self.sink
    }

    /// Issue a new header to mine
    pub fn request_header(&self) -> Result<Header, HeaderCacheError> {
        self.request_work().map(|(header, _)| header)
    }

    /// Issue a new header together with the target it has to meet
    pub fn request_work(&self) -> Result<(Header, Target), HeaderCacheError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let batch = self.current_batch(state)?;
        let random_tx = self.random.next_transaction();
        let header = batch.template.header_with(&random_tx);
        let target = batch.target;

        let slot = state.cursor;
        if let Some(evicted) = state.ring[slot].replace(header) {
            state.entries.remove(&evicted);
            trace!(target: "headerpool::cache", slot, evicted = %evicted.id(), "Evicted header");
        }
        let previous = state.entries.insert(header, CacheEntry { batch, random_tx, slot });
        debug_assert!(previous.is_none(), "randomizing transactions never repeat");

        state.cursor = (slot + 1) % self.config.header_for_work_memory;
        state.batch_issued += 1;
        state.stats.headers_issued += 1;

        trace!(target: "headerpool::cache", slot, header = %header.id(), "Issued header");
        Ok((header, target))
    }

    /// Template batch to mint the next header from, building a new one if the
    /// current batch is used up
    ///
    /// On failure the batch counter is left untouched.
    fn current_batch(&self, state: &mut CacheState) -> Result<Arc<TemplateBatch>, HeaderCacheError> {
        if let Some(batch) = &state.batch {
            if state.batch_issued < self.config.headers_per_block_memory {
                return Ok(Arc::clone(batch));
            }
        }

        let (template, target) = self.source.build_template().map_err(|err| {
            warn!(target: "headerpool::cache", error = %err, "Failed to build block template");
            HeaderCacheError::TemplateUnavailable(err)
        })?;

        debug!(
            target: "headerpool::cache",
            parent = %template.parent_id,
            height = template.height,
            transactions = template.transactions.len(),
            threshold = %target,
            "Built new block template"
        );

        let batch = Arc::new(TemplateBatch { template, target });
        state.batch = Some(Arc::clone(&batch));
        state.batch_issued = 0;
        state.stats.templates_built += 1;
        Ok(batch)
    }

    /// Submit a header with a solved nonce
    ///
    /// Rebuilds the block, checks it reproduces `header` and meets the target
    /// of its template, then hands it to the sink. The entry is consumed when
    /// the sink accepts the block; on any failure the cache is left as it was.
    pub fn submit_header(&self, header: Header) -> Result<BlockId, HeaderCacheError> {
        let key = header.without_nonce();

        let (block, id, entry) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            // Claim the entry so a concurrent duplicate sees it as stale.
            let Some(entry) = state.entries.remove(&key) else {
                state.stats.stale_submissions += 1;
                debug!(
                    target: "headerpool::cache",
                    header = %header.id(),
                    "Stale or unknown header submitted"
                );
                return Err(HeaderCacheError::StaleOrInvalidHeader);
            };

            let block = entry.rebuild(header.nonce);
            let rebuilt = block.header();
            if rebuilt != header {
                state.entries.insert(key, entry);
                state.stats.invalid_submissions += 1;
                let (submitted, rebuilt) = (header.id(), rebuilt.id());
                warn!(
                    target: "headerpool::cache",
                    %submitted,
                    %rebuilt,
                    "Submitted header does not match its block"
                );
                return Err(HeaderCacheError::HeaderMismatch { submitted, rebuilt });
            }

            let id = rebuilt.id();
            let target = entry.batch.target;
            if !target.is_met_by(&id) {
                state.entries.insert(key, entry);
                state.stats.invalid_submissions += 1;
                debug!(
                    target: "headerpool::cache",
                    header = %id,
                    threshold = %target,
                    "Submitted header does not meet target"
                );
                return Err(HeaderCacheError::TargetNotMet { id, target });
            }

            (block, id, entry)
        };

        let height = entry.batch.template.height;
        match self.sink.accept_block(block) {
            Ok(()) => {
                let mut state = self.state.lock();
                if state.occupies(&key, entry.slot) {
                    state.ring[entry.slot] = None;
                }
                // Further headers have to build on the new tip.
                state.batch = None;
                state.stats.blocks_accepted += 1;
                drop(state);

                info!(target: "headerpool::cache", block = %id, height, "Block accepted");
                Ok(id)
            }
            Err(rejection) => {
                let mut state = self.state.lock();
                if state.occupies(&key, entry.slot) {
                    state.entries.insert(key, entry);
                }
                state.stats.rejected_blocks += 1;
                drop(state);

                warn!(
                    target: "headerpool::cache",
                    block = %id,
                    reason = %rejection.reason,
                    "Block rejected"
                );
                Err(rejection.into())
            }
        }
    }

    /// Rebuild the block for an issued header without consuming it
    pub fn reconstruct_block(&self, header: &Header) -> Option<Block> {
        let state = self.state.lock();
        state.entries.get(&header.without_nonce()).map(|entry| entry.rebuild(header.nonce))
    }

    /// Make the next request build a fresh template
    ///
    /// Call when the chain tip changes. Headers already issued stay valid
    /// until they age out.
    pub fn refresh_template(&self) {
        let mut state = self.state.lock();
        if state.batch.take().is_some() {
            debug!(target: "headerpool::cache", "Retired current block template");
        }
    }

    /// Whether `header` is still outstanding. The nonce is ignored.
    pub fn contains(&self, header: &Header) -> bool {
        self.state.lock().entries.contains_key(&header.without_nonce())
    }

    /// Number of outstanding headers
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether no header is outstanding
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct templates referenced by outstanding headers
    pub fn live_templates(&self) -> usize {
        let state = self.state.lock();
        state
            .entries
            .values()
            .map(|entry| Arc::as_ptr(&entry.batch))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Activity counters
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}
