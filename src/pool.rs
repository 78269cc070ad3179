//! The page header pool: owns every header ever created for this cache,
//! indexed by stable [`HeaderHandle`]s so the hash table and replacement
//! list can cross-link headers without shared ownership.

use crate::{
	address::Address,
	backend::MemoryType,
	header::{HeaderHandle, PageHeader},
};

pub(crate) struct HeaderPool {
	page_size: usize,
	slots: Vec<PageHeader>,
}

impl HeaderPool {
	pub fn new(page_size: usize) -> Self {
		Self {
			page_size,
			slots: Vec::new(),
		}
	}

	#[inline]
	pub fn page_size(&self) -> usize {
		self.page_size
	}

	/// Number of headers owned by the pool. Headers are never freed
	/// individually between open and close, so this only grows, up to
	/// `max_num_pages`, and is exactly `resident_pages`.
	#[inline]
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Allocates a brand-new header. Callers must check `len() <
	/// max_num_pages` first; the pool itself does not enforce the bound so
	/// that it stays a plain arena.
	pub fn allocate(&mut self, address: Address, hash_code: usize, memory_type: MemoryType) -> HeaderHandle {
		let mut header = PageHeader::new(self.page_size);
		header.reset(address, hash_code, memory_type);
		self.slots.push(header);
		HeaderHandle((self.slots.len() - 1) as u32)
	}

	#[inline]
	pub fn get(&self, handle: HeaderHandle) -> &PageHeader {
		&self.slots[handle.0 as usize]
	}

	#[inline]
	pub fn get_mut(&mut self, handle: HeaderHandle) -> &mut PageHeader {
		&mut self.slots[handle.0 as usize]
	}

	pub fn iter_handles(&self) -> impl Iterator<Item = HeaderHandle> + '_ {
		(0..self.slots.len() as u32).map(HeaderHandle)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn allocate_grows_and_reports_length() {
		let mut pool = HeaderPool::new(16);
		assert_eq!(pool.len(), 0);
		let h0 = pool.allocate(0, 0, 0);
		let h1 = pool.allocate(16, 0, 0);
		assert_eq!(pool.len(), 2);
		assert_eq!(pool.get(h0).address, 0);
		assert_eq!(pool.get(h1).address, 16);
	}

	#[test]
	fn recycled_header_keeps_its_handle() {
		let mut pool = HeaderPool::new(16);
		let handle = pool.allocate(0, 0, 0);
		pool.get_mut(handle).buffer.fill(0xAB);
		pool.get_mut(handle).reset(32, 2, 0);
		assert_eq!(pool.get(handle).address, 32);
		assert_eq!(pool.get(handle).hash_code, 2);
		// The buffer is reused in place, not reallocated.
		assert!(pool.get(handle).buffer.iter().all(|b| *b == 0xAB));
	}
}
