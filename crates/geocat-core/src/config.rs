//! Catalog configuration.

use std::path::PathBuf;

/// Default number of cached store handles and resource descriptors.
pub const DEFAULT_POOL_CAPACITY: usize = 512;

/// Configuration for a catalog and its sled-backed persister.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Path to the catalog data directory.
    pub path: PathBuf,

    /// Page cache capacity in bytes.
    pub cache_capacity: u64,

    /// Flush interval in milliseconds. None means flush on every write.
    pub flush_every_ms: Option<u64>,

    /// Enable zstd compression.
    pub compression: bool,

    /// Temporary database (deleted on drop).
    pub temporary: bool,

    /// Capacity of each resource pool cache.
    pub pool_capacity: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./geocat_data"),
            cache_capacity: 64 * 1024 * 1024, // 64MB
            flush_every_ms: Some(500),
            compression: true,
            temporary: false,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl CatalogConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a temporary configuration for testing.
    pub fn temporary() -> Self {
        Self {
            path: PathBuf::from(""),
            temporary: true,
            ..Default::default()
        }
    }

    /// Set the page cache capacity.
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Set the flush interval; `None` flushes on every write.
    pub fn with_flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }

    /// Enable or disable compression.
    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    /// Set the resource pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Convert to sled configuration.
    pub(crate) fn to_sled_config(&self) -> sled::Config {
        let mut config = sled::Config::new()
            .cache_capacity(self.cache_capacity)
            .use_compression(self.compression)
            .flush_every_ms(self.flush_every_ms);

        if self.temporary {
            config = config.temporary(true);
        } else {
            config = config.path(&self.path);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = CatalogConfig::new("/tmp/catalog")
            .with_pool_capacity(8)
            .with_flush_every_ms(None);
        assert_eq!(config.path, PathBuf::from("/tmp/catalog"));
        assert_eq!(config.pool_capacity, 8);
        assert_eq!(config.flush_every_ms, None);
        assert!(!config.temporary);
        assert!(CatalogConfig::temporary().temporary);
    }
}
