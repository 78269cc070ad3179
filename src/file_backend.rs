//! A real file-backed [`StorageBackend`]. `MemoryBackend` in `backend.rs`
//! is a reference double for unit tests; this is the closer-to-production
//! collaborator, reading and writing pages through positional file I/O
//! instead of a `Vec<u8>`.

use std::{
	cmp::Ordering,
	fs::{File, OpenOptions},
	io,
	path::{Path, PathBuf},
};

#[cfg(unix)]
use std::os::unix::fs::FileExt;

use static_assertions::assert_impl_all;
use thiserror::Error;

use crate::{
	address::Address,
	backend::{BackendFeatures, BackendHandle, MemoryType, StorageBackend, TypeMap},
};

#[derive(Debug, Error)]
pub enum FileBackendError {
	#[error("failed to open backing file {}: {1}", _0.display())]
	Open(PathBuf, #[source] io::Error),

	#[error("short write at {0:#x}: expected {1} bytes, got {2}")]
	ShortWrite(Address, usize, usize),

	#[error("i/o error: {0}")]
	Io(#[source] io::Error),

	#[error("backing file is already locked")]
	AlreadyLocked,

	#[error("backing file is not locked")]
	NotLocked,
}

impl From<io::Error> for FileBackendError {
	fn from(err: io::Error) -> Self {
		FileBackendError::Io(err)
	}
}

/// Reads and writes pages directly against an open file via positional I/O
/// (`pread`/`pwrite` on unix), so no seek state is shared across calls -
/// mirroring the teacher crate's `IoTarget` impl for `std::fs::File`.
pub struct FileBackend {
	path: PathBuf,
	file: File,
	page_size: usize,
	eoa: Address,
	type_map: TypeMap,
	handle: BackendHandle,
	locked: bool,
}

impl FileBackend {
	/// Opens (creating if necessary) the file at `path` for page-aligned
	/// I/O. Does not read or validate any header; the cache core owns no
	/// on-disk format, so there is nothing to parse here.
	pub fn open(path: impl AsRef<Path>, page_size: usize, handle_id: u64) -> Result<Self, FileBackendError> {
		let path = path.as_ref().to_path_buf();
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(false)
			.open(&path)
			.map_err(|err| FileBackendError::Open(path.clone(), err))?;

		Ok(Self {
			path,
			file,
			page_size,
			eoa: 0,
			type_map: Vec::new(),
			handle: BackendHandle(handle_id),
			locked: false,
		})
	}

	#[cfg(unix)]
	fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
		FileExt::read_at(&self.file, buf, offset)
	}

	#[cfg(not(unix))]
	fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
		use std::io::{Read, Seek, SeekFrom};
		let mut file = &self.file;
		file.seek(SeekFrom::Start(offset))?;
		file.read(buf)
	}

	#[cfg(unix)]
	fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
		FileExt::write_at(&self.file, buf, offset)
	}

	#[cfg(not(unix))]
	fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
		use std::io::{Seek, SeekFrom, Write};
		let mut file = &self.file;
		file.seek(SeekFrom::Start(offset))?;
		file.write(buf)
	}
}

assert_impl_all!(FileBackend: StorageBackend, Send);

impl StorageBackend for FileBackend {
	type Error = FileBackendError;

	fn open(&mut self) -> Result<(), Self::Error> {
		Ok(())
	}

	fn close(&mut self) -> Result<(), Self::Error> {
		self.file.sync_all()?;
		Ok(())
	}

	fn page_size(&self) -> usize {
		self.page_size
	}

	fn read_page(&mut self, addr: Address, memory_type: MemoryType, buf: &mut [u8]) -> Result<(), Self::Error> {
		self.read_bytes(addr, memory_type, buf)
	}

	fn write_page(&mut self, addr: Address, memory_type: MemoryType, buf: &[u8]) -> Result<(), Self::Error> {
		self.write_bytes(addr, memory_type, buf)
	}

	fn read_bytes(&mut self, addr: Address, _memory_type: MemoryType, buf: &mut [u8]) -> Result<(), Self::Error> {
		let read = self.read_at(buf, addr)?;
		if read < buf.len() {
			// Past the current end of the file reads back as zero, matching a
			// sparse backing file that was never written this far.
			buf[read..].fill(0);
		}
		Ok(())
	}

	fn write_bytes(&mut self, addr: Address, _memory_type: MemoryType, buf: &[u8]) -> Result<(), Self::Error> {
		let written = self.write_at(buf, addr)?;
		if written != buf.len() {
			return Err(FileBackendError::ShortWrite(addr, buf.len(), written));
		}
		Ok(())
	}

	fn get_eoa(&mut self) -> Result<Address, Self::Error> {
		Ok(self.eoa)
	}

	fn set_eoa(&mut self, addr: Address) -> Result<(), Self::Error> {
		self.eoa = addr;
		Ok(())
	}

	fn get_eof(&mut self) -> Result<Address, Self::Error> {
		Ok(self.file.metadata()?.len())
	}

	fn flush(&mut self) -> Result<(), Self::Error> {
		self.file.sync_data().map_err(FileBackendError::Io)
	}

	fn truncate(&mut self) -> Result<(), Self::Error> {
		self.file.set_len(self.eoa).map_err(FileBackendError::Io)
	}

	fn lock(&mut self, _exclusive: bool) -> Result<(), Self::Error> {
		if self.locked {
			return Err(FileBackendError::AlreadyLocked);
		}
		self.locked = true;
		Ok(())
	}

	fn unlock(&mut self) -> Result<(), Self::Error> {
		if !self.locked {
			return Err(FileBackendError::NotLocked);
		}
		self.locked = false;
		Ok(())
	}

	fn delete(&mut self) -> Result<(), Self::Error> {
		self.file.set_len(0)?;
		self.eoa = 0;
		std::fs::remove_file(&self.path).map_err(FileBackendError::Io)
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

	fn ctl(&mut self, _op_code: u32, _input: &[u8], _output: &mut Vec<u8>) -> Result<(), Self::Error> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn write_then_read_page_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let mut backend = FileBackend::open(dir.path().join("cache.pages"), 16, 1).unwrap();

		backend.write_page(0, 0, &[7u8; 16]).unwrap();
		let mut buf = [0u8; 16];
		backend.read_page(0, 0, &mut buf).unwrap();
		assert_eq!(buf, [7u8; 16]);
	}

	#[test]
	fn unwritten_region_reads_back_as_zero() {
		let dir = tempfile::tempdir().unwrap();
		let mut backend = FileBackend::open(dir.path().join("cache.pages"), 16, 1).unwrap();

		let mut buf = [0xFFu8; 16];
		backend.read_page(16, 0, &mut buf).unwrap();
		assert_eq!(buf, [0u8; 16]);
	}

	#[test]
	fn lock_then_unlock_round_trips_and_rejects_double_lock() {
		let dir = tempfile::tempdir().unwrap();
		let mut backend = FileBackend::open(dir.path().join("cache.pages"), 16, 1).unwrap();

		backend.lock(true).unwrap();
		assert!(backend.lock(true).is_err());
		backend.unlock().unwrap();
		assert!(backend.unlock().is_err());
	}

	#[test]
	fn truncate_shrinks_file_to_eoa() {
		let dir = tempfile::tempdir().unwrap();
		let mut backend = FileBackend::open(dir.path().join("cache.pages"), 16, 1).unwrap();

		backend.write_page(32, 0, &[1u8; 16]).unwrap();
		backend.set_eoa(16).unwrap();
		backend.truncate().unwrap();
		assert_eq!(backend.get_eof().unwrap(), 16);
	}
}
