//! Header cache configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::ConfigError;

/// Default number of outstanding headers remembered
pub const DEFAULT_HEADER_FOR_WORK_MEMORY: usize = 10_000;

/// Default number of headers minted from one template
pub const DEFAULT_HEADERS_PER_BLOCK_MEMORY: usize = 1_000;

/// Sizing of the issuance window
///
/// Fixed when the cache is constructed. `header_for_work_memory` bounds memory
/// and sets the staleness window; `header_for_work_memory /
/// headers_per_block_memory` is the number of templates retained at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderCacheConfig {
    /// Total outstanding headers retained
    pub header_for_work_memory: usize,
    /// Headers issued per template before a new one is built
    pub headers_per_block_memory: usize,
}

impl Default for HeaderCacheConfig {
    fn default() -> Self {
        Self {
            header_for_work_memory: DEFAULT_HEADER_FOR_WORK_MEMORY,
            headers_per_block_memory: DEFAULT_HEADERS_PER_BLOCK_MEMORY,
        }
    }
}

impl HeaderCacheConfig {
    /// Create a config with explicit sizes
    pub const fn new(header_for_work_memory: usize, headers_per_block_memory: usize) -> Self {
        Self { header_for_work_memory, headers_per_block_memory }
    }

    /// Parse a config from JSON, filling in defaults for missing fields
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check the sizes are usable
    ///
    /// A batch size that does not divide the window is accepted, but the
    /// oldest template is then only partially retained.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.header_for_work_memory == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.headers_per_block_memory == 0 {
            return Err(ConfigError::ZeroBatch);
        }
        if self.headers_per_block_memory > self.header_for_work_memory {
            return Err(ConfigError::BatchExceedsWindow {
                batch: self.headers_per_block_memory,
                window: self.header_for_work_memory,
            });
        }
        if self.header_for_work_memory % self.headers_per_block_memory != 0 {
            warn!(
                target: "headerpool::config",
                window = self.header_for_work_memory,
                batch = self.headers_per_block_memory,
                "Batch size does not divide window size"
            );
        }
        Ok(())
    }

    /// Upper bound on templates referenced by the window at once
    ///
    /// Holds as long as no batch is retired early. A window that starts and
    /// ends on batch boundaries references exactly `window / batch` templates;
    /// one that straddles them can touch one more.
    pub const fn max_live_templates(&self) -> usize {
        if self.header_for_work_memory == 0 || self.headers_per_block_memory == 0 {
            return 0;
        }
        (self.header_for_work_memory - 1).div_ceil(self.headers_per_block_memory) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HeaderCacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_live_templates(), 11);
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(HeaderCacheConfig::new(0, 1).validate(), Err(ConfigError::ZeroWindow)));
        assert!(matches!(HeaderCacheConfig::new(10, 0).validate(), Err(ConfigError::ZeroBatch)));
        assert!(matches!(
            HeaderCacheConfig::new(5, 10).validate(),
            Err(ConfigError::BatchExceedsWindow { batch: 10, window: 5 })
        ));
    }

    #[test]
    fn test_uneven_batch_is_allowed() {
        let config = HeaderCacheConfig::new(10, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.max_live_templates(), 4);
        assert_eq!(HeaderCacheConfig::new(10, 5).max_live_templates(), 3);
        assert_eq!(HeaderCacheConfig::new(1, 1).max_live_templates(), 1);
    }

    #[test]
    fn test_from_json() {
        let config = HeaderCacheConfig::from_json(r#"{"headers_per_block_memory": 5}"#).unwrap();
        assert_eq!(config.header_for_work_memory, DEFAULT_HEADER_FOR_WORK_MEMORY);
        assert_eq!(config.headers_per_block_memory, 5);

        // default batch is larger than this window
        assert!(matches!(
            HeaderCacheConfig::from_json(r#"{"header_for_work_memory": 10}"#),
            Err(ConfigError::BatchExceedsWindow { batch: 1_000, window: 10 })
        ));
        assert!(matches!(
            HeaderCacheConfig::from_json(r#"{"window": 10}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
