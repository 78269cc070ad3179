//! Address-space arithmetic shared by the splitter and the EOA manager.

use crate::error::CacheError;

/// A byte offset into the backend's address space.
pub type Address = u64;

/// Sentinel meaning "no address" / "undefined", mirrored from the backend
/// contract: callers may pass this in and must be rejected up front.
pub const UNDEFINED_ADDRESS: Address = Address::MAX;

#[inline]
pub fn is_power_of_two(value: usize) -> bool {
	value != 0 && (value & (value - 1)) == 0
}

/// `addr - (addr mod page_size)`: the address of the page containing `addr`.
#[inline]
pub fn page_base(addr: Address, page_size: usize) -> Address {
	addr - (addr % page_size as Address)
}

/// The address immediately past the page containing `addr`.
#[inline]
pub fn next_page_boundary(addr: Address, page_size: usize) -> Address {
	page_base(addr, page_size) + page_size as Address
}

/// Rounds `addr` up to the next multiple of `page_size` (already-aligned
/// addresses are unchanged).
#[inline]
pub fn round_up_to_page(addr: Address, page_size: usize) -> Address {
	let page_size = page_size as Address;
	let remainder = addr % page_size;
	if remainder == 0 {
		addr
	} else {
		addr + (page_size - remainder)
	}
}

/// Validates `addr` and computes `addr + size`, guarding against the
/// `ADDR_UNDEFINED` and `OVERFLOW` failure points from the request splitter.
pub fn checked_end(addr: Address, size: usize) -> Result<Address, CacheError> {
	if addr == UNDEFINED_ADDRESS {
		return Err(CacheError::AddrUndefined);
	}
	addr.checked_add(size as Address).ok_or(CacheError::Overflow)
}
