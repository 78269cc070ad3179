//! End-of-allocation bookkeeping: `eoa_up` as the client sees it,
//! `eoa_down` as the backend sees it, always the smallest multiple of
//! `page_size` that is `>= eoa_up`.

use crate::{
	address::{round_up_to_page, Address},
	backend::StorageBackend,
	cache::PageCache,
	error::CacheError,
};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EoaManager {
	pub eoa_up: Address,
	pub eoa_down: Address,
}

impl<B: StorageBackend> PageCache<B> {
	/// `set_eoa(addr)`: updates `eoa_up`/`eoa_down` and forwards the
	/// rounded value to the backend. Never scans or invalidates resident
	/// pages, even if `addr` is lower than an already-resident page's
	/// address - shrinking the allocation is the caller's responsibility
	/// to reconcile, not this cache's.
	pub fn set_eoa(&mut self, addr: Address) -> Result<(), CacheError> {
		let eoa_down = round_up_to_page(addr, self.config.page_size);
		self.backend.set_eoa(eoa_down).map_err(CacheError::io)?;
		self.eoa.eoa_up = addr;
		self.eoa.eoa_down = eoa_down;
		log::debug!("set_eoa: eoa_up={addr:#x} eoa_down={eoa_down:#x}");
		Ok(())
	}

	/// `get_eoa()`: cross-checks the backend's view of `eoa_down` against
	/// ours before returning `eoa_up`, surfacing `INCONSISTENT_STATE` on
	/// disagreement rather than silently trusting either side.
	pub fn get_eoa(&mut self) -> Result<Address, CacheError> {
		let reported = self.backend.get_eoa().map_err(CacheError::io)?;
		if reported != self.eoa.eoa_down {
			return Err(CacheError::inconsistent_eoa(reported, self.eoa.eoa_down));
		}
		Ok(self.eoa.eoa_up)
	}

	/// Passed through to the backend unchanged.
	pub fn get_eof(&mut self) -> Result<Address, CacheError> {
		self.backend.get_eof().map_err(CacheError::io)
	}
}
