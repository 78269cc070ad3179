//! A page-aligned buffer cache sitting between a random-access client and
//! a block-oriented storage backend.
//!
//! The cache holds a bounded pool of fixed-size page buffers, indexed by a
//! power-of-two hash table for O(1) lookup and threaded through a single
//! replacement list (LRU or FIFO) for eviction. Client requests that don't
//! land on page boundaries are decomposed by the request splitter into a
//! head segment, a run of middle pages, and a tail segment; middle-page
//! reads coalesce contiguous cache misses into one backend call, and
//! middle-page writes bypass the cache entirely, invalidating whatever was
//! resident first.
//!
//! The cache assumes a single-threaded or cooperatively-scheduled caller:
//! there is no internal locking, and the `BUSY` flag is a structural marker
//! (a page involved in an in-flight backend call is not an eviction
//! candidate), not a mutex.
//!
//! ```no_run
//! use pagevault::{CacheConfig, PageCache, backend::MemoryBackend};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MemoryBackend::new(4096, 0);
//! let mut cache = PageCache::open(CacheConfig::default(), backend)?;
//!
//! cache.write(0, &[1u8; 4096])?;
//! let mut buf = [0u8; 4096];
//! cache.read(0, &mut buf)?;
//! cache.close()?;
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod file_backend;
pub(crate) mod eoa;
pub(crate) mod hash_table;
pub(crate) mod header;
pub(crate) mod invalidate;
pub(crate) mod loader;
pub(crate) mod pool;
pub(crate) mod replacement;
pub(crate) mod splitter;
pub mod stats;

pub use address::{Address, UNDEFINED_ADDRESS};
pub use backend::StorageBackend;
pub use cache::PageCache;
pub use config::{CacheConfig, ReplacementPolicyKind};
pub use error::CacheError;
pub use stats::CacheStats;
