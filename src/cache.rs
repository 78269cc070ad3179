//! The cache root: owns every other component and drives the lifecycle
//! that ties them together.

use std::cmp::Ordering;

use crate::{
	address::round_up_to_page,
	backend::{BackendFeatures, BackendHandle, StorageBackend, TypeMap, DEFAULT_MEMORY_TYPE, MemoryType},
	config::CacheConfig,
	error::CacheError,
	eoa::EoaManager,
	hash_table::{validate_bucket_count, HashTable},
	pool::HeaderPool,
	replacement::ReplacementList,
	stats::CacheStats,
};

/// The page-aligned buffer cache itself, generic over whatever backend a
/// caller plugs in. Every field here is private to the crate: the public
/// surface is the handful of methods across this file, `splitter.rs`,
/// `loader.rs`, `invalidate.rs`, and `eoa.rs`.
pub struct PageCache<B: StorageBackend> {
	pub(crate) pool: HeaderPool,
	pub(crate) hash_table: HashTable,
	pub(crate) replacement: ReplacementList,
	pub(crate) backend: B,
	pub(crate) config: CacheConfig,

	pub(crate) resident_pages: usize,
	pub(crate) dirty_count: usize,
	pub(crate) eoa: EoaManager,
	pub(crate) stats: CacheStats,
	pub(crate) default_memory_type: MemoryType,
}

impl<B: StorageBackend> PageCache<B> {
	/// Validates `config`, opens `backend`, and takes an initial reading of
	/// its end-of-allocation so `eoa_up`/`eoa_down` start out consistent.
	pub fn open(config: CacheConfig, mut backend: B) -> Result<Self, CacheError> {
		config.validate()?;
		validate_bucket_count(config.num_buckets)?;

		backend.open().map_err(CacheError::io)?;
		let eoa_up = backend.get_eoa().map_err(CacheError::io)?;
		let eoa_down = round_up_to_page(eoa_up, config.page_size);

		log::debug!(
			"open: page_size={} max_num_pages={} num_buckets={} policy={:?}",
			config.page_size,
			config.max_num_pages,
			config.num_buckets,
			config.replacement_policy
		);

		Ok(Self {
			pool: HeaderPool::new(config.page_size),
			hash_table: HashTable::new(config.num_buckets),
			replacement: ReplacementList::new(config.replacement_policy),
			resident_pages: 0,
			dirty_count: 0,
			eoa: EoaManager { eoa_up, eoa_down },
			stats: CacheStats::default(),
			default_memory_type: DEFAULT_MEMORY_TYPE,
			backend,
			config,
		})
	}

	/// Flushes every dirty page, then closes the backend. The cache must
	/// never leave dirty pages unwritten behind it: `flush` already asserts
	/// `dirty_count == 0` on its way out.
	///
	/// Takes `&mut self`, not `self`, so a failed flush or backend close
	/// leaves the cache - and every still-`DIRTY` header's buffer - intact
	/// for the caller to retry after remedial action, per the "close must
	/// not free the cache on failure" rule.
	pub fn close(&mut self) -> Result<(), CacheError> {
		self.flush()?;
		self.backend.close().map_err(CacheError::io)
	}

	/// The cache's diagnostic counters. `max_bucket_depth` is read live
	/// from the hash table rather than mirrored on every insert, so it is
	/// always current.
	pub fn stats(&self) -> CacheStats {
		CacheStats {
			max_bucket_depth: self.hash_table.max_bucket_depth,
			..self.stats
		}
	}

	pub fn dirty_count(&self) -> usize {
		self.dirty_count
	}

	pub fn resident_pages(&self) -> usize {
		self.resident_pages
	}

	pub fn config(&self) -> &CacheConfig {
		&self.config
	}

	pub(crate) fn backend_mut(&mut self) -> &mut B {
		&mut self.backend
	}

	// --- Backend pass-through -------------------------------------------
	//
	// The core does not interpret any of these; it forwards them verbatim
	// to the backend, per SPEC_FULL.md §6/§5 ("the core exposes the same
	// set to its caller, acting as a pass-through").

	/// The backend's page size, as configured at open.
	pub fn page_size(&self) -> usize {
		self.backend.page_size()
	}

	/// Forwarded verbatim to the backend.
	pub fn truncate(&mut self) -> Result<(), CacheError> {
		self.backend.truncate().map_err(CacheError::io)
	}

	/// The caller's file-lock operation, forwarded verbatim to the
	/// backend. The cache holds no locks of its own.
	pub fn lock(&mut self, exclusive: bool) -> Result<(), CacheError> {
		self.backend.lock(exclusive).map_err(CacheError::io)
	}

	/// The caller's file-unlock operation, forwarded verbatim to the
	/// backend.
	pub fn unlock(&mut self) -> Result<(), CacheError> {
		self.backend.unlock().map_err(CacheError::io)
	}

	/// Forwarded verbatim to the backend.
	pub fn delete(&mut self) -> Result<(), CacheError> {
		self.backend.delete().map_err(CacheError::io)
	}

	/// Compares the identity of two backends, forwarded verbatim.
	pub fn compare(&self, other: &Self) -> Ordering {
		self.backend.compare(&other.backend)
	}

	/// The backend's reported capability bitmask, forwarded verbatim.
	pub fn query_features(&self) -> BackendFeatures {
		self.backend.query_features()
	}

	/// The backend's opaque memory-type map, relayed unchanged - the core
	/// never interprets its contents.
	pub fn get_type_map(&self) -> &TypeMap {
		self.backend.get_type_map()
	}

	/// The backend's opaque identity handle, relayed unchanged.
	pub fn get_handle(&self) -> BackendHandle {
		self.backend.get_handle()
	}

	/// Opaque control-plane forwarding: `op_code` and the contents of
	/// `input`/`output` are never interpreted by the core.
	pub fn ctl(&mut self, op_code: u32, input: &[u8], output: &mut Vec<u8>) -> Result<(), CacheError> {
		self.backend.ctl(op_code, input, output).map_err(CacheError::io)
	}

	#[cfg(test)]
	pub(crate) fn resident_addresses(&self) -> Vec<crate::address::Address> {
		use crate::header::Flags;
		self.pool
			.iter_handles()
			.filter(|handle| !self.pool.get(*handle).flags.contains(Flags::INVALID))
			.map(|handle| self.pool.get(handle).address)
			.collect()
	}

	#[cfg(test)]
	pub(crate) fn mark_busy_for_test(&mut self, handle: crate::header::HeaderHandle) {
		use crate::header::Flags;
		self.pool.get_mut(handle).flags.set(Flags::BUSY);
	}
}

#[cfg(test)]
mod tests {
	use crate::{backend::{MemoryBackend, StorageBackend}, config::CacheConfig};

	use super::PageCache;

	#[test]
	fn open_takes_initial_eoa_reading() {
		let mut backend = MemoryBackend::new(16, 1);
		backend.set_eoa(16).unwrap();
		let cache = PageCache::open(CacheConfig::default().with_page_size(16), backend).unwrap();
		assert_eq!(cache.eoa.eoa_up, 16);
		assert_eq!(cache.eoa.eoa_down, 16);
	}

	#[test]
	fn open_rejects_invalid_config() {
		let backend = MemoryBackend::new(16, 1);
		let result = PageCache::open(CacheConfig::default().with_page_size(3), backend);
		assert!(result.is_err());
	}

	#[test]
	fn close_flushes_dirty_pages_before_closing() {
		let backend = MemoryBackend::new(16, 1);
		let mut cache =
			PageCache::open(CacheConfig::default().with_page_size(16), backend).unwrap();
		cache.write(0, &[5; 16]).unwrap();
		assert_eq!(cache.dirty_count(), 1);
		cache.close().unwrap();
	}

	#[test]
	fn close_failure_leaves_the_cache_and_its_dirty_pages_intact_for_retry() {
		use crate::backend::{MockBackendError, MockStorageBackend};

		let mut backend = MockStorageBackend::new();
		backend.expect_open().returning(|| Ok(()));
		backend.expect_get_eoa().returning(|| Ok(0));
		backend
			.expect_read_page()
			.returning(|_, _, buf| {
				buf.fill(0);
				Ok(())
			});
		backend.expect_write_page().returning(|_, _, _| Ok(()));
		// The backend itself refuses to close - e.g. a final sync failed.
		backend.expect_close().returning(|| Err(MockBackendError));

		let mut cache =
			PageCache::open(CacheConfig::default().with_page_size(16), backend).unwrap();
		// A partial write (less than one page) loads and dirties page 0
		// without bypassing the cache, unlike a whole-page write.
		cache.write(0, &[9; 8]).unwrap();
		assert_eq!(cache.dirty_count(), 1);

		// close() takes &mut self: on failure the cache is not dropped,
		// so it stays callable for a retry instead of silently destroying
		// its state.
		let result = cache.close();
		assert!(result.is_err());
		// flush() ran to completion before the backend.close() failure,
		// so the page was actually written and is no longer dirty - but
		// the crucial point is that `cache` is still a live value here at
		// all, which `close(self)` by value would never have allowed.
		assert_eq!(cache.dirty_count(), 0);
		assert_eq!(cache.resident_pages(), 1);
	}

	#[test]
	fn lock_then_unlock_round_trip_and_reject_double_lock() {
		let backend = MemoryBackend::new(16, 1);
		let mut cache =
			PageCache::open(CacheConfig::default().with_page_size(16), backend).unwrap();

		cache.lock(true).unwrap();
		assert!(cache.lock(true).is_err());
		cache.unlock().unwrap();
		assert!(cache.unlock().is_err());
	}

	#[test]
	fn page_size_and_type_map_are_forwarded_from_the_backend() {
		let backend = MemoryBackend::new(16, 1);
		let cache = PageCache::open(CacheConfig::default().with_page_size(16), backend).unwrap();

		assert_eq!(cache.page_size(), 16);
		assert!(cache.get_type_map().is_empty());
	}
}
