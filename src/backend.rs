//! The backend storage provider contract. The core never touches a file
//! directly; it only calls through this trait. Everything here is
//! forwarded, not interpreted - the cache stores `MemoryType` and
//! `TypeMap` values and relays `ctl` commands without understanding them.

use std::cmp::Ordering;

#[cfg(test)]
use mockall::automock;
use static_assertions::assert_impl_all;

use crate::address::Address;

/// Opaque tag the backend uses for its own memory-type map; the core only
/// stores and relays it alongside page I/O.
pub type MemoryType = u32;

pub const DEFAULT_MEMORY_TYPE: MemoryType = 0;

/// Opaque capability bitmask reported by `query_features`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendFeatures(pub u32);

/// Opaque per-memory-type metadata blob, relayed verbatim.
pub type TypeMap = Vec<u8>;

/// Opaque backend identity, used only for `compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendHandle(pub u64);

/// The backend storage provider consumed by the cache core.
///
/// All page I/O is page-aligned: `read_page`/`write_page` always transfer
/// exactly `page_size` bytes at a page-aligned address. `read_bytes`/
/// `write_bytes` back the request splitter's coalesced middle-page runs and
/// may transfer any multiple of `page_size` bytes in one call.
#[cfg_attr(test, automock(type Error = MockBackendError;))]
pub trait StorageBackend {
	type Error: std::error::Error + Send + Sync + 'static;

	fn open(&mut self) -> Result<(), Self::Error>;
	fn close(&mut self) -> Result<(), Self::Error>;

	fn page_size(&self) -> usize;

	fn read_page(
		&mut self,
		addr: Address,
		memory_type: MemoryType,
		buf: &mut [u8],
	) -> Result<(), Self::Error>;

	fn write_page(
		&mut self,
		addr: Address,
		memory_type: MemoryType,
		buf: &[u8],
	) -> Result<(), Self::Error>;

	/// Reads `buf.len()` bytes (a multiple of `page_size`) starting at the
	/// page-aligned `addr`. Backs the request splitter's read-coalescing
	/// rule.
	fn read_bytes(
		&mut self,
		addr: Address,
		memory_type: MemoryType,
		buf: &mut [u8],
	) -> Result<(), Self::Error>;

	/// Writes `buf.len()` bytes (a multiple of `page_size`) starting at the
	/// page-aligned `addr`. Backs the request splitter's middle-page write
	/// rule.
	fn write_bytes(
		&mut self,
		addr: Address,
		memory_type: MemoryType,
		buf: &[u8],
	) -> Result<(), Self::Error>;

	fn get_eoa(&mut self) -> Result<Address, Self::Error>;
	fn set_eoa(&mut self, addr: Address) -> Result<(), Self::Error>;
	fn get_eof(&mut self) -> Result<Address, Self::Error>;

	fn flush(&mut self) -> Result<(), Self::Error>;
	fn truncate(&mut self) -> Result<(), Self::Error>;

	fn lock(&mut self, exclusive: bool) -> Result<(), Self::Error>;
	fn unlock(&mut self) -> Result<(), Self::Error>;

	fn delete(&mut self) -> Result<(), Self::Error>;

	fn compare(&self, other: &Self) -> Ordering
	where
		Self: Sized;

	fn query_features(&self) -> BackendFeatures;
	fn get_type_map(&self) -> &TypeMap;
	fn get_handle(&self) -> BackendHandle;

	/// Opaque control-plane forwarding: the core does not interpret
	/// `op_code` or the contents of `input`/`output` in any way.
	fn ctl(&mut self, op_code: u32, input: &[u8], output: &mut Vec<u8>) -> Result<(), Self::Error>;
}

#[cfg(test)]
#[derive(Debug, thiserror::Error)]
#[error("mock backend error")]
pub struct MockBackendError;

/// A plain in-memory backend. Not part of the cache engine - a reference
/// implementation of [`StorageBackend`] for the crate's own integration
/// tests, and a template for anyone wiring up a real one.
pub struct MemoryBackend {
	page_size: usize,
	data: Vec<u8>,
	eoa: Address,
	type_map: TypeMap,
	handle: BackendHandle,
	locked: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryBackendError {
	#[error("address {0:#x} is out of bounds for a backend of length {1}")]
	OutOfBounds(Address, usize),
	#[error("backend is already locked")]
	AlreadyLocked,
	#[error("backend is not locked")]
	NotLocked,
}

assert_impl_all!(MemoryBackend: StorageBackend, Send);

impl MemoryBackend {
	pub fn new(page_size: usize, handle_id: u64) -> Self {
		Self {
			page_size,
			data: Vec::new(),
			eoa: 0,
			type_map: Vec::new(),
			handle: BackendHandle(handle_id),
			locked: false,
		}
	}

	fn ensure_len(&mut self, end: usize) {
		if self.data.len() < end {
			self.data.resize(end, 0);
		}
	}

	/// Test hook: read back the raw backing store, bypassing the cache.
	pub fn raw_contents(&self) -> &[u8] {
		&self.data
	}
}

impl StorageBackend for MemoryBackend {
	type Error = MemoryBackendError;

	fn open(&mut self) -> Result<(), Self::Error> {
		Ok(())
	}

	fn close(&mut self) -> Result<(), Self::Error> {
		Ok(())
	}

	fn page_size(&self) -> usize {
		self.page_size
	}

	fn read_page(
		&mut self,
		addr: Address,
		_memory_type: MemoryType,
		buf: &mut [u8],
	) -> Result<(), Self::Error> {
		self.read_bytes(addr, _memory_type, buf)
	}

	fn write_page(
		&mut self,
		addr: Address,
		_memory_type: MemoryType,
		buf: &[u8],
	) -> Result<(), Self::Error> {
		self.write_bytes(addr, _memory_type, buf)
	}

	fn read_bytes(
		&mut self,
		addr: Address,
		_memory_type: MemoryType,
		buf: &mut [u8],
	) -> Result<(), Self::Error> {
		let start = addr as usize;
		let end = start + buf.len();
		if end > self.data.len() {
			// Unwritten regions read back as zero, matching a sparse file.
			let available = self.data.len().saturating_sub(start);
			buf[..available].copy_from_slice(&self.data[start..]);
			buf[available..].fill(0);
		} else {
			buf.copy_from_slice(&self.data[start..end]);
		}
		Ok(())
	}

	fn write_bytes(
		&mut self,
		addr: Address,
		_memory_type: MemoryType,
		buf: &[u8],
	) -> Result<(), Self::Error> {
		let start = addr as usize;
		let end = start + buf.len();
		self.ensure_len(end);
		self.data[start..end].copy_from_slice(buf);
		Ok(())
	}

	fn get_eoa(&mut self) -> Result<Address, Self::Error> {
		Ok(self.eoa)
	}

	fn set_eoa(&mut self, addr: Address) -> Result<(), Self::Error> {
		self.eoa = addr;
		self.ensure_len(addr as usize);
		Ok(())
	}

	fn get_eof(&mut self) -> Result<Address, Self::Error> {
		Ok(self.data.len() as Address)
	}

	fn flush(&mut self) -> Result<(), Self::Error> {
		Ok(())
	}

	fn truncate(&mut self) -> Result<(), Self::Error> {
		self.data.truncate(self.eoa as usize);
		Ok(())
	}

	fn lock(&mut self, _exclusive: bool) -> Result<(), Self::Error> {
		if self.locked {
			return Err(MemoryBackendError::AlreadyLocked);
		}
		self.locked = true;
		Ok(())
	}

	fn unlock(&mut self) -> Result<(), Self::Error> {
		if !self.locked {
			return Err(MemoryBackendError::NotLocked);
		}
		self.locked = false;
		Ok(())
	}

	fn delete(&mut self) -> Result<(), Self::Error> {
		self.data.clear();
		self.eoa = 0;
		Ok(())
	}

	fn compare(&self, other: &Self) -> Ordering {
		self.handle.0.cmp(&other.handle.0)
	}

	fn query_features(&self) -> BackendFeatures {
		BackendFeatures::default()
	}

	fn get_type_map(&self) -> &TypeMap {
		&self.type_map
	}

	fn get_handle(&self) -> BackendHandle {
		self.handle
	}

	fn ctl(
		&mut self,
		_op_code: u32,
		_input: &[u8],
		_output: &mut Vec<u8>,
	) -> Result<(), Self::Error> {
		Ok(())
	}
}
