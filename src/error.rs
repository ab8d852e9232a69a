//! Error types for the cache.
//!
//! Lookups of absent keys are not errors: they surface as `None` or `false`.
//! The only failure a caller has to handle is storage exhaustion on the
//! fallible insertion paths.

use hashbrown::TryReserveError;

/// Error returned by fallible cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
	/// The entry table could not grow to hold `additional` more entries,
	/// either because the requested capacity overflows or because the
	/// allocator refused the request.
	#[error("cache storage exhausted while reserving room for {additional} more entries ({reason:?})")]
	Exhausted {
		/// Number of extra entries that were requested.
		additional: usize,
		/// Failure reported by the underlying table.
		reason: TryReserveError,
	},
}

impl CacheError {
	pub(crate) fn exhausted(additional: usize, reason: TryReserveError) -> Self {
		Self::Exhausted {
			additional,
			reason,
		}
	}
}

/// Result alias for cache operations.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;
