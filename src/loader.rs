//! The page loader and evictor: brings a page into residency, choosing and
//! recycling a victim header when the pool is already full.

use crate::{
	address::Address,
	backend::StorageBackend,
	cache::PageCache,
	error::CacheError,
	header::{Flags, HeaderHandle},
};

impl<B: StorageBackend> PageCache<B> {
	/// Returns a header holding the current backend contents of the page
	/// at `address`, inserted into both index structures with all flags
	/// clear. Never returns a header that collides with an existing valid
	/// header.
	pub(crate) fn load_page(&mut self, address: Address) -> Result<HeaderHandle, CacheError> {
		let hash_code = self.hash_table.hash_code(address, self.config.page_size);

		let (handle, is_new) = if self.pool.len() < self.config.max_num_pages {
			let handle = self.pool.allocate(address, hash_code, self.default_memory_type);
			(handle, true)
		} else {
			let handle = self.evict()?;
			self.pool.get_mut(handle).reset(address, hash_code, self.default_memory_type);
			(handle, false)
		};

		{
			let header = self.pool.get_mut(handle);
			self
				.backend
				.read_page(address, header.memory_type, &mut header.buffer)
				.map_err(CacheError::io)?;
		}

		self.replacement.prepend(&mut self.pool, handle);
		self.hash_table.insert(&mut self.pool, handle);
		if is_new {
			self.resident_pages += 1;
		}

		log::trace!("load_page: address={address:#x} handle={handle:?} new={is_new}");
		Ok(handle)
	}

	/// Walks the replacement list from tail toward head, skipping `BUSY`
	/// headers, flushing the first non-busy dirty victim, then fully
	/// detaching it from both index structures and resetting its flags.
	/// Fails with `EXHAUSTED` if every resident header is busy.
	pub(crate) fn evict(&mut self) -> Result<HeaderHandle, CacheError> {
		let mut cursor = self.replacement.tail();
		let victim = loop {
			let Some(handle) = cursor else {
				return Err(CacheError::Exhausted);
			};
			let header = self.pool.get(handle);
			if header.flags.contains(Flags::BUSY) {
				cursor = header.repl_prev;
				continue;
			}
			break handle;
		};

		if self.pool.get(victim).flags.contains(Flags::DIRTY) {
			self.flush_page(victim)?;
		}

		self.replacement.remove(&mut self.pool, victim);
		if !self.pool.get(victim).flags.contains(Flags::INVALID) {
			self.hash_table.remove(&mut self.pool, victim);
		}
		let header = self.pool.get_mut(victim);
		header.flags = Flags::empty();

		self.stats.evictions += 1;
		log::debug!("evict: chose handle={victim:?} address={:#x}", self.pool.get(victim).address);
		Ok(victim)
	}
}
