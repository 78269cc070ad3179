//! The request splitter: decomposes a client `(addr, size)` request into
//! at most one head segment, a run of middle pages, and at most one tail
//! segment, and drives reads/writes against the cache and backend in that
//! order.

use crate::{
	address::{checked_end, next_page_boundary, page_base, Address},
	backend::StorageBackend,
	cache::PageCache,
	error::CacheError,
	header::{Flags, HeaderHandle},
};

/// A head or tail segment: a possibly-partial page.
struct EdgeSegment {
	page_address: Address,
	in_page_offset: usize,
	len: usize,
	buf_offset: usize,
}

/// A run of whole, consecutive pages.
struct MiddleSegment {
	start_address: Address,
	num_pages: usize,
	buf_offset: usize,
}

struct Segments {
	head: Option<EdgeSegment>,
	middle: Option<MiddleSegment>,
	tail: Option<EdgeSegment>,
}

/// Decomposes `(addr, size)` relative to `page_size`-aligned boundaries.
/// Total coverage of the three segments always exactly equals `size`.
fn split_request(addr: Address, size: usize, page_size: usize) -> Segments {
	let page_size_addr = page_size as Address;
	let mut cursor = addr;
	let mut remaining = size;
	let mut buf_offset = 0usize;

	let head = if cursor % page_size_addr != 0 {
		let page_address = page_base(cursor, page_size);
		let boundary = next_page_boundary(cursor, page_size);
		let end = Address::min(cursor + remaining as Address, boundary);
		let len = (end - cursor) as usize;
		let in_page_offset = (cursor - page_address) as usize;

		cursor = end;
		remaining -= len;
		buf_offset += len;

		Some(EdgeSegment {
			page_address,
			in_page_offset,
			len,
			buf_offset: 0,
		})
	} else {
		None
	};

	let num_middle_pages = remaining / page_size;
	let middle = if num_middle_pages > 0 {
		let segment = MiddleSegment {
			start_address: cursor,
			num_pages: num_middle_pages,
			buf_offset,
		};
		let consumed = num_middle_pages * page_size;
		cursor += consumed as Address;
		remaining -= consumed;
		buf_offset += consumed;
		Some(segment)
	} else {
		None
	};

	let tail = if remaining > 0 {
		Some(EdgeSegment {
			page_address: cursor,
			in_page_offset: 0,
			len: remaining,
			buf_offset,
		})
	} else {
		None
	};

	let total = head.as_ref().map_or(0, |s| s.len)
		+ middle.as_ref().map_or(0, |m| m.num_pages * page_size)
		+ tail.as_ref().map_or(0, |s| s.len);
	debug_assert_eq!(total, size, "request splitter must cover exactly `size` bytes");

	Segments { head, middle, tail }
}

impl<B: StorageBackend> PageCache<B> {
	/// Looks up `address` in the hash table, recording a stats hit/miss.
	pub(crate) fn find_resident(&mut self, address: Address) -> Option<HeaderHandle> {
		let bucket = self.hash_table.hash_code(address, self.config.page_size);
		let (found, _depth) = self.hash_table.search(&self.pool, bucket, address);
		if found.is_some() {
			self.stats.hash_hits += 1;
		} else {
			self.stats.hash_misses += 1;
		}
		found
	}

	/// Reads `buf.len()` bytes starting at `addr`, splitting across page
	/// boundaries as needed.
	pub fn read(&mut self, addr: Address, buf: &mut [u8]) -> Result<(), CacheError> {
		checked_end(addr, buf.len())?;
		let segments = split_request(addr, buf.len(), self.config.page_size);
		log::trace!("read: addr={addr:#x} size={}", buf.len());

		if let Some(head) = &segments.head {
			self.read_edge(head, buf)?;
		}
		if let Some(middle) = &segments.middle {
			self.read_middle(middle, buf)?;
		}
		if let Some(tail) = &segments.tail {
			self.read_edge(tail, buf)?;
		}
		Ok(())
	}

	/// Writes `buf` starting at `addr`, splitting across page boundaries
	/// as needed.
	pub fn write(&mut self, addr: Address, buf: &[u8]) -> Result<(), CacheError> {
		checked_end(addr, buf.len())?;
		let segments = split_request(addr, buf.len(), self.config.page_size);
		log::trace!("write: addr={addr:#x} size={}", buf.len());

		if let Some(head) = &segments.head {
			self.write_edge(head, buf)?;
		}
		if let Some(middle) = &segments.middle {
			self.write_middle(middle, buf)?;
		}
		if let Some(tail) = &segments.tail {
			self.write_edge(tail, buf)?;
		}
		Ok(())
	}

	fn read_edge(&mut self, seg: &EdgeSegment, buf: &mut [u8]) -> Result<(), CacheError> {
		let handle = match self.find_resident(seg.page_address) {
			Some(handle) => handle,
			None => self.load_page(seg.page_address)?,
		};
		self.copy_page_to_client(handle, seg.in_page_offset, seg.len, seg.buf_offset, buf);
		Ok(())
	}

	fn read_middle(&mut self, seg: &MiddleSegment, buf: &mut [u8]) -> Result<(), CacheError> {
		let page_size = self.config.page_size;
		let mut run_start: Option<usize> = None;

		for page_idx in 0..seg.num_pages {
			let page_address = seg.start_address + (page_idx * page_size) as Address;
			match self.find_resident(page_address) {
				Some(handle) => {
					if let Some(start) = run_start.take() {
						self.coalesced_read(seg, start, page_idx, buf)?;
					}
					let buf_offset = seg.buf_offset + page_idx * page_size;
					self.copy_page_to_client(handle, 0, page_size, buf_offset, buf);
				}
				None => {
					if run_start.is_none() {
						run_start = Some(page_idx);
					}
				}
			}
		}
		if let Some(start) = run_start.take() {
			self.coalesced_read(seg, start, seg.num_pages, buf)?;
		}
		Ok(())
	}

	/// Issues one backend read covering middle pages `[start, end)`,
	/// writing straight into the client buffer without involving the
	/// cache.
	fn coalesced_read(
		&mut self,
		seg: &MiddleSegment,
		start: usize,
		end: usize,
		buf: &mut [u8],
	) -> Result<(), CacheError> {
		let page_size = self.config.page_size;
		let run_address = seg.start_address + (start * page_size) as Address;
		let run_buf_offset = seg.buf_offset + start * page_size;
		let run_byte_len = (end - start) * page_size;

		self.backend
			.read_bytes(
				run_address,
				self.default_memory_type,
				&mut buf[run_buf_offset..run_buf_offset + run_byte_len],
			)
			.map_err(CacheError::io)?;
		self.stats.coalesced_reads += 1;
		Ok(())
	}

	fn copy_page_to_client(
		&mut self,
		handle: HeaderHandle,
		in_page_offset: usize,
		len: usize,
		buf_offset: usize,
		buf: &mut [u8],
	) {
		{
			let header = self.pool.get_mut(handle);
			header.flags.set(Flags::BUSY | Flags::READ);
			buf[buf_offset..buf_offset + len]
				.copy_from_slice(&header.buffer[in_page_offset..in_page_offset + len]);
		}
		self.replacement.touch(&mut self.pool, handle);
		self.pool.get_mut(handle).flags.clear(Flags::BUSY | Flags::READ);
	}

	fn write_edge(&mut self, seg: &EdgeSegment, buf: &[u8]) -> Result<(), CacheError> {
		let handle = match self.find_resident(seg.page_address) {
			Some(handle) => handle,
			None => self.load_page(seg.page_address)?,
		};

		let header = self.pool.get_mut(handle);
		header.flags.set(Flags::BUSY | Flags::WRITE);
		header.buffer[seg.in_page_offset..seg.in_page_offset + seg.len]
			.copy_from_slice(&buf[seg.buf_offset..seg.buf_offset + seg.len]);
		if !header.flags.contains(Flags::DIRTY) {
			header.flags.set(Flags::DIRTY);
			self.dirty_count += 1;
		}

		self.replacement.touch(&mut self.pool, handle);
		self.pool.get_mut(handle).flags.clear(Flags::BUSY | Flags::WRITE);
		Ok(())
	}

	/// Invalidates every currently-resident middle page, then writes the
	/// whole run through to the backend in one call. The cache never
	/// retains middle-page data on writes.
	fn write_middle(&mut self, seg: &MiddleSegment, buf: &[u8]) -> Result<(), CacheError> {
		let page_size = self.config.page_size;
		for page_idx in 0..seg.num_pages {
			let page_address = seg.start_address + (page_idx * page_size) as Address;
			if let Some(handle) = self.find_resident(page_address) {
				self.invalidate_page(handle);
			}
		}

		let byte_len = seg.num_pages * page_size;
		self.backend
			.write_bytes(
				seg.start_address,
				self.default_memory_type,
				&buf[seg.buf_offset..seg.buf_offset + byte_len],
			)
			.map_err(CacheError::io)
	}
}
