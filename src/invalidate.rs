//! Invalidation and flush: the rule that keeps the cache consistent when
//! a write bypasses it, and the two flush paths (single page, whole
//! cache).

use crate::{
	backend::StorageBackend,
	cache::PageCache,
	error::CacheError,
	header::{Flags, HeaderHandle},
};

impl<B: StorageBackend> PageCache<B> {
	/// Atomically: set `INVALID`; if `DIRTY` was set, clear it and
	/// decrement `dirty_count`; remove from the hash table; move to the
	/// tail of the replacement list. After this, `INVALID` is the only
	/// flag a header may carry.
	pub(crate) fn invalidate_page(&mut self, handle: HeaderHandle) {
		let was_dirty = self.pool.get(handle).flags.contains(Flags::DIRTY);

		self.hash_table.remove(&mut self.pool, handle);

		let header = self.pool.get_mut(handle);
		if was_dirty {
			header.flags.clear(Flags::DIRTY);
			self.dirty_count -= 1;
		}
		header.flags.clear(Flags::BUSY | Flags::READ | Flags::WRITE);
		header.flags.set(Flags::INVALID);

		self.replacement.move_to_tail(&mut self.pool, handle);
		debug_assert_eq!(self.pool.get(handle).flags, Flags::INVALID);
	}

	/// Writes the header's buffer back to the backend at its own
	/// `page_address`. On success clears `DIRTY` and bumps
	/// `total_flushed`; on failure leaves `DIRTY` set so a later flush can
	/// retry, and surfaces `IO_ERROR`.
	pub(crate) fn flush_page(&mut self, handle: HeaderHandle) -> Result<(), CacheError> {
		let (address, memory_type) = {
			let header = self.pool.get(handle);
			(header.address, header.memory_type)
		};
		let header = self.pool.get_mut(handle);
		self.backend
			.write_page(address, memory_type, &header.buffer)
			.map_err(|err| {
				log::error!("flush_page: write failed for address={address:#x}: {err}");
				CacheError::io(err)
			})?;

		let header = self.pool.get_mut(handle);
		header.flags.clear(Flags::DIRTY);
		self.dirty_count -= 1;
		self.stats.total_flushed += 1;
		Ok(())
	}

	/// Walks the replacement list tail-to-head, flushing every
	/// non-`INVALID`, `DIRTY` header, then asserts `dirty_count == 0` and
	/// forwards a flush to the backend.
	pub fn flush(&mut self) -> Result<(), CacheError> {
		let mut cursor = self.replacement.tail();
		while let Some(handle) = cursor {
			let header = self.pool.get(handle);
			cursor = header.repl_prev;
			if header.flags.contains(Flags::INVALID) || !header.flags.contains(Flags::DIRTY) {
				continue;
			}
			self.flush_page(handle)?;
		}

		if self.dirty_count != 0 {
			log::warn!(
				"flush: dirty_count is {} after a full flush walk, expected 0",
				self.dirty_count
			);
		}
		debug_assert_eq!(self.dirty_count, 0);

		self.backend.flush().map_err(CacheError::io)
	}
}

#[cfg(test)]
mod tests {
	use crate::{backend::MemoryBackend, cache::PageCache, config::CacheConfig};

	#[test]
	fn flush_writes_every_dirty_page_and_clears_dirty_count() {
		let backend = MemoryBackend::new(16, 1);
		let mut cache =
			PageCache::open(CacheConfig::default().with_page_size(16), backend).unwrap();

		cache.write(0, &[1; 16]).unwrap();
		cache.write(16, &[2; 16]).unwrap();
		assert_eq!(cache.dirty_count(), 2);

		cache.flush().unwrap();
		assert_eq!(cache.dirty_count(), 0);

		let mut readback = [0u8; 16];
		cache.read(0, &mut readback).unwrap();
		assert_eq!(readback, [1; 16]);
	}

	#[test]
	fn idempotent_flush_does_not_rewrite() {
		let backend = MemoryBackend::new(16, 1);
		let mut cache =
			PageCache::open(CacheConfig::default().with_page_size(16), backend).unwrap();
		cache.write(0, &[9; 16]).unwrap();
		cache.flush().unwrap();

		let flushed_before = cache.stats().total_flushed;
		cache.flush().unwrap();
		assert_eq!(cache.stats().total_flushed, flushed_before);
	}

	#[test]
	fn invalidate_then_read_misses_and_refetches_from_backend() {
		let backend = MemoryBackend::new(16, 1);
		let mut cache =
			PageCache::open(CacheConfig::default().with_page_size(16), backend).unwrap();

		cache.write(0, &[7; 16]).unwrap();
		cache.flush().unwrap();

		// A full-page write through the middle path invalidates the
		// resident header...
		cache.write(0, &[8; 16]).unwrap();

		let mut byte = [0u8; 1];
		cache.read(0, &mut byte).unwrap();
		assert_eq!(byte[0], 8);
	}
}
