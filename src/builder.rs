use std::hash::{BuildHasher, Hash};

use ahash::RandomState;

use crate::cache::Cache;
use crate::error::Result;
use crate::store::Store;
use crate::sweep::DEFAULT_SWEEP_BATCH;
use crate::traits::Sweeper;

/// Builder for configuring a [`Cache`].
///
/// # Example
///
/// ```
/// use sweep_cache::CacheBuilder;
///
/// let cache = CacheBuilder::new()
///     .capacity(1024)
///     .sweep_batch(16)
///     .sweeper(|_key: &u64, hits: &u32| *hits == 0)
///     .build();
///
/// cache.set(1, 0);
/// cache.set(2, 5);
/// assert_eq!(cache.sweep().map(|s| s.evicted), Some(1));
/// ```
pub struct CacheBuilder<K, V, S = RandomState> {
	capacity: usize,
	hasher: S,
	sweep_batch: usize,
	sweeper: Option<Box<dyn Sweeper<K, V>>>,
}

impl<K, V> CacheBuilder<K, V> {
	/// Create a builder with default settings.
	pub fn new() -> Self {
		Self {
			capacity: 0,
			hasher: RandomState::new(),
			sweep_batch: DEFAULT_SWEEP_BATCH,
			sweeper: None,
		}
	}
}

impl<K, V, S> CacheBuilder<K, V, S> {
	/// Pre-size the table for `capacity` entries.
	///
	/// Default: 0 (grow on demand)
	pub fn capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity;
		self
	}

	/// Hash keys with `hasher` instead of the default `ahash::RandomState`.
	pub fn hasher<H>(self, hasher: H) -> CacheBuilder<K, V, H> {
		CacheBuilder {
			capacity: self.capacity,
			hasher,
			sweep_batch: self.sweep_batch,
			sweeper: self.sweeper,
		}
	}

	/// Set how many matched keys a sweep removes per exclusive lock
	/// acquisition.
	///
	/// Smaller batches let writers interleave with a long delete phase,
	/// larger ones finish the sweep with fewer acquisitions. `1` takes the
	/// lock once per key; `0` is treated as `1`.
	///
	/// Default: 64
	pub fn sweep_batch(mut self, keys: usize) -> Self {
		self.sweep_batch = keys.max(1);
		self
	}

	/// Register the eviction rule run by [`Cache::sweep`].
	pub fn sweeper<W>(mut self, sweeper: W) -> Self
	where
		W: Sweeper<K, V> + 'static,
	{
		self.sweeper = Some(Box::new(sweeper));
		self
	}
}

impl<K, V, S> CacheBuilder<K, V, S>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	/// Build the cache with the configured settings.
	///
	/// Aborts if the requested capacity cannot be allocated; see
	/// [`try_build`](Self::try_build).
	pub fn build(self) -> Cache<K, V, S> {
		let store = Store::with_capacity_and_hasher(self.capacity, self.hasher);
		Cache::from_parts(store, self.sweep_batch, self.sweeper)
	}

	/// Build the cache, reporting a failure to allocate the requested
	/// capacity instead of aborting.
	///
	/// # Errors
	///
	/// Returns [`CacheError::Exhausted`](crate::CacheError::Exhausted) if the
	/// table cannot reserve `capacity` entries.
	pub fn try_build(self) -> Result<Cache<K, V, S>> {
		let mut store = Store::with_capacity_and_hasher(0, self.hasher);
		store.try_reserve(self.capacity).inspect_err(|err| {
			tracing::warn!(capacity = self.capacity, error = %err, "cache allocation failed");
		})?;
		Ok(Cache::from_parts(store, self.sweep_batch, self.sweeper))
	}
}

impl<K, V> Default for CacheBuilder<K, V> {
	fn default() -> Self {
		Self::new()
	}
}
