//! The hash-table index of resident, valid pages. Buckets are intrusive
//! doubly linked lists threaded through [`PageHeader`]'s `bucket_prev`/
//! `bucket_next` links; the table itself only stores bucket heads.

use crate::{
	address::Address,
	error::CacheError,
	header::{Flags, HeaderHandle},
	pool::HeaderPool,
};

pub(crate) struct HashTable {
	buckets: Vec<Option<HeaderHandle>>,
	/// Deepest bucket chain ever observed, surfaced as a diagnostic stat.
	pub max_bucket_depth: usize,
}

impl HashTable {
	pub fn new(num_buckets: usize) -> Self {
		Self {
			buckets: vec![None; num_buckets],
			max_bucket_depth: 0,
		}
	}

	#[inline]
	pub fn num_buckets(&self) -> usize {
		self.buckets.len()
	}

	/// `(page_address >> log2(page_size)) mod num_buckets`, a shift plus
	/// mask since both operands are powers of two.
	#[inline]
	pub fn hash_code(&self, address: Address, page_size: usize) -> usize {
		let shifted = address >> page_size.trailing_zeros();
		(shifted as usize) & (self.buckets.len() - 1)
	}

	/// Prepends `handle` to its bucket. The header's `hash_code` must
	/// already equal the bucket its `address` hashes to.
	pub fn insert(&mut self, pool: &mut HeaderPool, handle: HeaderHandle) {
		let bucket = pool.get(handle).hash_code;
		let old_head = self.buckets[bucket];

		{
			let header = pool.get_mut(handle);
			debug_assert!(!header.flags.contains(Flags::INVALID));
			header.bucket_prev = None;
			header.bucket_next = old_head;
		}
		if let Some(old_head) = old_head {
			pool.get_mut(old_head).bucket_prev = Some(handle);
		}
		self.buckets[bucket] = Some(handle);

		let depth = self.bucket_depth(pool, bucket);
		if depth > self.max_bucket_depth {
			self.max_bucket_depth = depth;
		}
	}

	/// Unlinks `handle` from its bucket and clears its bucket links. A
	/// no-op on a header that is not currently indexed (e.g. already
	/// `INVALID`).
	pub fn remove(&mut self, pool: &mut HeaderPool, handle: HeaderHandle) {
		let (bucket, prev, next) = {
			let header = pool.get(handle);
			(header.hash_code, header.bucket_prev, header.bucket_next)
		};

		match prev {
			Some(prev) => pool.get_mut(prev).bucket_next = next,
			None => {
				// `handle` was the bucket head only if it still is; a header
				// that was never inserted (prev/next both None, and not the
				// recorded head) must not clobber an unrelated chain.
				if self.buckets[bucket] == Some(handle) {
					self.buckets[bucket] = next;
				}
			}
		}
		if let Some(next) = next {
			pool.get_mut(next).bucket_prev = prev;
		}

		let header = pool.get_mut(handle);
		header.bucket_prev = None;
		header.bucket_next = None;
	}

	/// Walks the bucket for `address`, returning the first header whose
	/// address matches. Intra-bucket order is otherwise unspecified.
	pub fn search(
		&self,
		pool: &HeaderPool,
		bucket: usize,
		address: Address,
	) -> (Option<HeaderHandle>, usize) {
		let mut depth = 0;
		let mut cursor = self.buckets[bucket];
		while let Some(handle) = cursor {
			depth += 1;
			let header = pool.get(handle);
			if header.address == address {
				return (Some(handle), depth);
			}
			cursor = header.bucket_next;
		}
		(None, depth)
	}

	fn bucket_depth(&self, pool: &HeaderPool, bucket: usize) -> usize {
		let mut depth = 0;
		let mut cursor = self.buckets[bucket];
		while let Some(handle) = cursor {
			depth += 1;
			cursor = pool.get(handle).bucket_next;
		}
		depth
	}
}

/// Validates that `num_buckets` is usable as a hash table size
/// (power-of-two), surfacing `CONFIG_ERROR` otherwise.
pub(crate) fn validate_bucket_count(num_buckets: usize) -> Result<(), CacheError> {
	if !crate::address::is_power_of_two(num_buckets) {
		return Err(CacheError::Config(format!(
			"num_buckets {num_buckets} is not a power of two"
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn new_pool_with(page_size: usize, addresses: &[Address]) -> (HeaderPool, Vec<HeaderHandle>) {
		let mut pool = HeaderPool::new(page_size);
		let handles = addresses
			.iter()
			.map(|addr| pool.allocate(*addr, 0, 0))
			.collect();
		(pool, handles)
	}

	#[test]
	fn hash_code_is_shift_and_mask() {
		let table = HashTable::new(16);
		assert_eq!(table.hash_code(0, 4096), 0);
		assert_eq!(table.hash_code(4096, 4096), 1);
		assert_eq!(table.hash_code(16 * 4096, 4096), 0);
	}

	#[test]
	fn insert_then_search_finds_header() {
		let (mut pool, handles) = new_pool_with(16, &[0, 16, 32]);
		let mut table = HashTable::new(4);
		for (h, addr) in handles.iter().zip([0u64, 16, 32]) {
			pool.get_mut(*h).hash_code = table.hash_code(addr, 16);
			table.insert(&mut pool, *h);
		}

		let (found, _) = table.search(&pool, table.hash_code(16, 16), 16);
		assert_eq!(found, Some(handles[1]));
	}

	#[test]
	fn remove_detaches_from_bucket() {
		let (mut pool, handles) = new_pool_with(16, &[0, 16]);
		let mut table = HashTable::new(4);
		for h in &handles {
			table.insert(&mut pool, *h);
		}
		table.remove(&mut pool, handles[0]);
		let (found, _) = table.search(&pool, 0, 0);
		assert_eq!(found, None);
		assert!(pool.get(handles[0]).bucket_next.is_none());
	}

	#[test]
	fn removing_bucket_head_advances_head() {
		let (mut pool, handles) = new_pool_with(16, &[0, 0]);
		// Force both into the same bucket by hash code.
		pool.get_mut(handles[0]).hash_code = 0;
		pool.get_mut(handles[1]).hash_code = 0;
		let mut table = HashTable::new(4);
		table.insert(&mut pool, handles[0]);
		table.insert(&mut pool, handles[1]);

		// handles[1] was inserted last and is the current head.
		table.remove(&mut pool, handles[1]);
		let (found, _) = table.search(&pool, 0, 0);
		assert_eq!(found, Some(handles[0]));
	}
}
