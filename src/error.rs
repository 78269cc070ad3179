use thiserror::Error;

use crate::address::Address;

/// The core's error taxonomy. Every variant here is a *kind*, not a
/// wrapper around a specific backend type, so the cache engine stays
/// generic over whatever backend a caller plugs in.
#[derive(Debug, Error)]
pub enum CacheError {
	#[error("invalid cache configuration: {0}")]
	Config(String),

	#[error("request address is the undefined-address sentinel")]
	AddrUndefined,

	#[error("request end address overflows the address space")]
	Overflow,

	#[error("backend I/O failed: {0}")]
	Io(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

	#[error("eviction exhausted: every resident page is busy")]
	Exhausted,

	#[error("inconsistent state detected: {0}")]
	InconsistentState(String),
}

impl CacheError {
	/// Wraps a backend error as `IO_ERROR`. Kept as a free function so call
	/// sites read as `.map_err(CacheError::io)` instead of repeating the
	/// boxing boilerplate.
	pub fn io<E>(err: E) -> Self
	where
		E: std::error::Error + Send + Sync + 'static,
	{
		CacheError::Io(Box::new(err))
	}

	pub(crate) fn inconsistent_eoa(reported: Address, expected: Address) -> Self {
		CacheError::InconsistentState(format!(
			"backend-reported EOA {reported:#x} disagrees with eoa_down {expected:#x}"
		))
	}
}
