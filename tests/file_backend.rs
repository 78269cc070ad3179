//! The same round-trip and flush-on-close guarantees as `scenarios.rs`,
//! exercised against a real file on disk instead of the in-memory test
//! double, so the splitter's backend calls are proven against actual
//! positional I/O.

use pagevault::{file_backend::FileBackend, CacheConfig, PageCache};

fn config() -> CacheConfig {
	CacheConfig::default().with_page_size(4096).with_max_num_pages(4)
}

#[test]
fn write_then_read_back_survives_a_close_and_reopen() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("cache.pages");

	let backend = FileBackend::open(&path, 4096, 1).unwrap();
	let mut cache = PageCache::open(config(), backend).unwrap();
	cache.write(100, &vec![0x5Au8; 8000]).unwrap();
	cache.close().unwrap();

	let backend = FileBackend::open(&path, 4096, 1).unwrap();
	let mut cache = PageCache::open(config(), backend).unwrap();
	let mut buf = vec![0u8; 8000];
	cache.read(100, &mut buf).unwrap();
	assert_eq!(buf, vec![0x5Au8; 8000]);
}

#[test]
fn middle_page_write_bypasses_cache_and_lands_on_disk_immediately() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("cache.pages");
	let backend = FileBackend::open(&path, 4096, 1).unwrap();
	let mut cache = PageCache::open(config(), backend).unwrap();

	cache.write(0, &vec![0x77u8; 4096]).unwrap();
	assert_eq!(cache.resident_pages(), 0);

	// No flush, no close: the bytes must already be on disk because the
	// middle-page write rule writes straight through.
	let raw = std::fs::read(&path).unwrap();
	assert_eq!(&raw[..4096], &[0x77u8; 4096][..]);
}

#[test]
fn eviction_flushes_dirty_victim_to_the_backing_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("cache.pages");
	let backend = FileBackend::open(&path, 4096, 1).unwrap();
	let mut cache = PageCache::open(
		CacheConfig::default().with_page_size(4096).with_max_num_pages(1),
		backend,
	)
	.unwrap();

	// A partial, page-aligned-start write is a tail segment: it loads the
	// page and leaves it resident and dirty, unlike a whole-page write.
	cache.write(0, &vec![0x11u8; 10]).unwrap();
	assert_eq!(cache.resident_pages(), 1);
	assert_eq!(cache.dirty_count(), 1);

	// Loading a second page with only one slot forces an eviction of the
	// first, dirty page - which must flush before the slot is reused.
	let mut buf = [0u8; 1];
	cache.read(4096, &mut buf).unwrap();

	let raw = std::fs::read(&path).unwrap();
	assert_eq!(&raw[..10], &[0x11u8; 10][..]);
	assert_eq!(cache.dirty_count(), 0);
}
