//! Page headers: one fixed-size slot per resident page, doubly linked
//! into both the hash table and the replacement list.

use crate::{address::Address, backend::MemoryType};

/// Stable index into the [`crate::pool::HeaderPool`]. Never reused in a way
/// that changes its meaning mid-operation: recycling a header keeps its
/// handle, only the contents change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderHandle(pub(crate) u32);

/// The five independent header flags, packed into one bitset so the
/// set/clear/contains idioms stay cheap. `INVALID` excludes `DIRTY` and
/// `READ` excludes `WRITE`; both relations are enforced as debug
/// assertions at the point a header's flags are mutated, never silently
/// fixed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
	pub const DIRTY: Flags = Flags(1 << 0);
	pub const BUSY: Flags = Flags(1 << 1);
	pub const READ: Flags = Flags(1 << 2);
	pub const WRITE: Flags = Flags(1 << 3);
	pub const INVALID: Flags = Flags(1 << 4);

	#[inline]
	pub const fn empty() -> Self {
		Flags(0)
	}

	#[inline]
	pub fn contains(self, other: Flags) -> bool {
		self.0 & other.0 == other.0
	}

	#[inline]
	pub fn set(&mut self, other: Flags) {
		self.0 |= other.0;
		self.assert_consistent();
	}

	#[inline]
	pub fn clear(&mut self, other: Flags) {
		self.0 &= !other.0;
	}

	fn assert_consistent(&self) {
		debug_assert!(
			!(self.contains(Flags::INVALID) && self.contains(Flags::DIRTY)),
			"a header must never be both INVALID and DIRTY"
		);
		debug_assert!(
			!(self.contains(Flags::READ) && self.contains(Flags::WRITE)),
			"a header must never be both READ and WRITE"
		);
	}
}

impl std::ops::BitOr for Flags {
	type Output = Flags;
	fn bitor(self, rhs: Flags) -> Flags {
		Flags(self.0 | rhs.0)
	}
}

/// One resident page slot: content buffer plus the metadata and list
/// links. Simultaneously a node of the hash bucket list (unless
/// `INVALID`) and of the replacement list (always).
pub(crate) struct PageHeader {
	pub address: Address,
	pub hash_code: usize,
	pub flags: Flags,
	pub memory_type: MemoryType,
	pub buffer: Box<[u8]>,

	pub bucket_prev: Option<HeaderHandle>,
	pub bucket_next: Option<HeaderHandle>,

	pub repl_prev: Option<HeaderHandle>,
	pub repl_next: Option<HeaderHandle>,
}

impl PageHeader {
	pub fn new(page_size: usize) -> Self {
		Self {
			address: 0,
			hash_code: 0,
			flags: Flags::empty(),
			memory_type: 0,
			buffer: vec![0u8; page_size].into_boxed_slice(),
			bucket_prev: None,
			bucket_next: None,
			repl_prev: None,
			repl_next: None,
		}
	}

	/// Recycles this header for a newly chosen (address, hash_code),
	/// clearing flags and both sets of list links. Called only once the
	/// header has been unlinked from both index structures.
	pub fn reset(&mut self, address: Address, hash_code: usize, memory_type: MemoryType) {
		debug_assert!(self.bucket_prev.is_none() && self.bucket_next.is_none());
		self.address = address;
		self.hash_code = hash_code;
		self.flags = Flags::empty();
		self.memory_type = memory_type;
	}
}
