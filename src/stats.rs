//! The cache root's statistics block. Purely observational - nothing here
//! feeds back into cache behavior.

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
	pub hash_hits: u64,
	pub hash_misses: u64,
	pub max_bucket_depth: usize,
	pub total_flushed: u64,
	pub evictions: u64,
	pub coalesced_reads: u64,
}
