use crate::{address::is_power_of_two, error::CacheError};

/// Magic tag stamped into every [`CacheConfig`]. A caller that fills in a
/// config record by hand (rather than through a builder) and forgets to set
/// this gets a `CONFIG_ERROR` instead of silently opening.
pub const CONFIG_MAGIC: u32 = 0x5042_4146; // "PBAF" - Page Buffer, cAche, File

/// Current configuration record format.
pub const CONFIG_VERSION: u16 = 1;

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_MAX_NUM_PAGES: usize = 64;
pub const DEFAULT_NUM_BUCKETS: usize = 16;

/// The two replacement-policy variants. Numeric values match the
/// wire-level `0 = LRU`, `1 = FIFO` encoding used by the configuration
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicyKind {
	#[default]
	Lru = 0,
	Fifo = 1,
}

impl ReplacementPolicyKind {
	pub fn from_wire(value: u8) -> Result<Self, CacheError> {
		match value {
			0 => Ok(ReplacementPolicyKind::Lru),
			1 => Ok(ReplacementPolicyKind::Fifo),
			other => Err(CacheError::Config(format!(
				"unknown replacement policy code {other}"
			))),
		}
	}
}

/// Configuration record consumed by [`crate::cache::PageCache::open`].
///
/// `magic` and `version` exist purely so a caller assembling this struct by
/// hand (as opposed to going through [`CacheConfig::new`]) gets a
/// `CONFIG_ERROR` at open time instead of a cache that silently misbehaves;
/// the core never looks at them again after `open` succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
	pub magic: u32,
	pub version: u16,
	pub page_size: usize,
	pub max_num_pages: usize,
	pub replacement_policy: ReplacementPolicyKind,
	pub num_buckets: usize,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			magic: CONFIG_MAGIC,
			version: CONFIG_VERSION,
			page_size: DEFAULT_PAGE_SIZE,
			max_num_pages: DEFAULT_MAX_NUM_PAGES,
			replacement_policy: ReplacementPolicyKind::default(),
			num_buckets: DEFAULT_NUM_BUCKETS,
		}
	}
}

impl CacheConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_page_size(mut self, page_size: usize) -> Self {
		self.page_size = page_size;
		self
	}

	pub fn with_max_num_pages(mut self, max_num_pages: usize) -> Self {
		self.max_num_pages = max_num_pages;
		self
	}

	pub fn with_replacement_policy(mut self, policy: ReplacementPolicyKind) -> Self {
		self.replacement_policy = policy;
		self
	}

	pub fn with_num_buckets(mut self, num_buckets: usize) -> Self {
		self.num_buckets = num_buckets;
		self
	}

	/// Validates magic/version and the power-of-two constraints on
	/// `page_size`/`num_buckets`. Called once, at open.
	pub(crate) fn validate(&self) -> Result<(), CacheError> {
		if self.magic != CONFIG_MAGIC {
			return Err(CacheError::Config(format!(
				"config magic {:#010x} does not match expected {CONFIG_MAGIC:#010x}",
				self.magic
			)));
		}
		if self.version != CONFIG_VERSION {
			return Err(CacheError::Config(format!(
				"config version {} is not supported (expected {CONFIG_VERSION})",
				self.version
			)));
		}
		if !is_power_of_two(self.page_size) {
			return Err(CacheError::Config(format!(
				"page_size {} is not a power of two",
				self.page_size
			)));
		}
		if !is_power_of_two(self.num_buckets) {
			return Err(CacheError::Config(format!(
				"num_buckets {} is not a power of two",
				self.num_buckets
			)));
		}
		if self.max_num_pages == 0 {
			return Err(CacheError::Config(
				"max_num_pages must be positive".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_is_valid() {
		CacheConfig::default().validate().unwrap();
	}

	#[test]
	fn rejects_non_power_of_two_page_size() {
		let config = CacheConfig::default().with_page_size(3000);
		assert!(matches!(config.validate(), Err(CacheError::Config(_))));
	}

	#[test]
	fn rejects_non_power_of_two_bucket_count() {
		let config = CacheConfig::default().with_num_buckets(10);
		assert!(matches!(config.validate(), Err(CacheError::Config(_))));
	}

	#[test]
	fn rejects_bad_magic() {
		let mut config = CacheConfig::default();
		config.magic = 0xdead_beef;
		assert!(matches!(config.validate(), Err(CacheError::Config(_))));
	}

	#[test]
	fn rejects_bad_version() {
		let mut config = CacheConfig::default();
		config.version = 99;
		assert!(matches!(config.validate(), Err(CacheError::Config(_))));
	}
}
