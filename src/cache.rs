use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::RandomState;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::builder::CacheBuilder;
use crate::error::Result;
use crate::guard::Guard;
#[cfg(feature = "metrics")]
use crate::metrics::{CacheMetrics, Counters};
use crate::store::{SetOutcome, Store};
use crate::sweep::{DEFAULT_SWEEP_BATCH, SweepStats};
use crate::traits::Sweeper;

/// Thread-safe key/value cache guarded by a single reader/writer lock.
///
/// The cache can be shared across threads via `Arc<Cache<K, V>>`. All methods
/// are synchronous, short critical sections, and are safe to call from async
/// contexts.
///
/// # Locking
///
/// - `get`, `get_clone`, `get_ref`, `contains` and `snapshot` take the lock in
///   shared mode and only wait behind a writer.
/// - `set`, `try_set`, `remove`, `take` and `clear` take it in exclusive mode.
/// - `len` reads an atomic counter that is only changed inside exclusive
///   sections, so it always matches the number of present keys.
///
/// # Sweeps
///
/// [`cleanup`](Self::cleanup) removes every entry whose value matches a
/// predicate without holding the lock while the predicate runs:
///
/// 1. A snapshot of all `(key, value)` pairs is copied out under one shared
///    acquisition.
/// 2. The predicate is evaluated over the snapshot with no lock held. It may
///    be slow, do I/O, or call back into this cache.
/// 3. Matched keys are removed in batches, one exclusive acquisition per
///    batch. A key is only removed if it still holds the snapshotted value,
///    so entries written after the snapshot always survive.
///
/// # Example
///
/// ```
/// use sweep_cache::Cache;
///
/// let cache: Cache<&str, i32> = Cache::new();
/// cache.set("a", 1);
/// cache.set("b", 2);
/// cache.set("c", 3);
///
/// let stats = cache.cleanup(|v| v % 2 == 0);
/// assert_eq!(stats.evicted, 1);
/// assert_eq!(cache.len(), 2);
/// assert!(!cache.contains(&"b"));
/// ```
pub struct Cache<K, V, S = RandomState> {
	/// Entry table
	store: RwLock<Store<K, V, S>>,
	/// Number of present keys, only modified while the write lock is held
	entry_count: AtomicUsize,
	/// Keys removed per exclusive acquisition during a sweep
	sweep_batch: usize,
	/// Eviction rule run by `sweep()`
	sweeper: Option<Box<dyn Sweeper<K, V>>>,
	#[cfg(feature = "metrics")]
	counters: Counters,
}

impl<K, V> Cache<K, V> {
	/// Create an empty cache.
	pub fn new() -> Self {
		Self::with_capacity(0)
	}

	/// Create an empty cache with room for `capacity` entries before the
	/// table has to grow.
	pub fn with_capacity(capacity: usize) -> Self {
		Self::from_parts(
			Store::with_capacity_and_hasher(capacity, RandomState::new()),
			DEFAULT_SWEEP_BATCH,
			None,
		)
	}

	/// Start configuring a cache.
	pub fn builder() -> CacheBuilder<K, V> {
		CacheBuilder::new()
	}
}

impl<K, V, S> Cache<K, V, S> {
	/// Create an empty cache that hashes keys with `hasher`.
	pub fn with_hasher(hasher: S) -> Self {
		Self::from_parts(Store::with_capacity_and_hasher(0, hasher), DEFAULT_SWEEP_BATCH, None)
	}

	pub(crate) fn from_parts(
		store: Store<K, V, S>,
		sweep_batch: usize,
		sweeper: Option<Box<dyn Sweeper<K, V>>>,
	) -> Self {
		let entry_count = AtomicUsize::new(store.len());
		Self {
			store: RwLock::new(store),
			entry_count,
			sweep_batch: sweep_batch.max(1),
			sweeper,
			#[cfg(feature = "metrics")]
			counters: Counters::default(),
		}
	}

	/// Number of entries currently present.
	pub fn len(&self) -> usize {
		self.entry_count.load(Ordering::Acquire)
	}

	/// Check if the cache is empty.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Keys removed per exclusive lock acquisition during a sweep.
	pub fn sweep_batch(&self) -> usize {
		self.sweep_batch
	}

	/// Whether a [`Sweeper`] was registered at construction.
	pub fn has_sweeper(&self) -> bool {
		self.sweeper.is_some()
	}

	/// Remove every entry.
	///
	/// The counter is reset inside the same exclusive section, so no reader
	/// ever sees a non-zero `len()` for an empty table. Metrics are reset too.
	pub fn clear(&self) {
		let mut store = self.store.write();
		let dropped = store.len();
		store.clear();
		self.entry_count.store(0, Ordering::Release);
		drop(store);

		#[cfg(feature = "metrics")]
		self.counters.reset();

		tracing::debug!(dropped, "cache cleared");
	}

	/// Snapshot of cache activity.
	#[cfg(feature = "metrics")]
	pub fn metrics(&self) -> CacheMetrics {
		self.counters.snapshot(self.len())
	}

	fn check_count(&self, store: &Store<K, V, S>) {
		debug_assert_eq!(
			self.entry_count.load(Ordering::Relaxed),
			store.len(),
			"entry counter diverged from table size"
		);
	}
}

impl<K, V, S> Cache<K, V, S>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	/// Retrieve a value. The lock is released before returning, so the `Arc`
	/// can be held for as long as needed, including across `.await` points.
	pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let value = self.store.read().get(key).cloned();

		#[cfg(feature = "metrics")]
		self.counters.lookup(value.is_some());

		value
	}

	/// Retrieve a cloned value.
	///
	/// Requires `V: Clone`. Prefer [`get`](Self::get) if cloning is expensive.
	pub fn get_clone<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
		V: Clone,
	{
		self.get(key).map(|value| V::clone(&value))
	}

	/// Borrow a value in place. The returned guard holds the read lock.
	///
	/// # Warning
	///
	/// Writers block for as long as the guard lives. Do not hold it across
	/// `.await` points or while calling back into this cache for a write.
	pub fn get_ref<Q>(&self, key: &Q) -> Option<Guard<'_, V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let mapped = RwLockReadGuard::try_map(self.store.read(), |store| {
			store.get(key).map(|value| &**value)
		})
		.ok();

		#[cfg(feature = "metrics")]
		self.counters.lookup(mapped.is_some());

		mapped.map(Guard::new)
	}

	/// Check if a key is present.
	pub fn contains<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.store.read().contains(key)
	}

	/// Store `value` under `key`.
	///
	/// Returns `true` if the cache changed: the key was new, or it held an
	/// unequal value that was replaced. Returns `false` without writing
	/// anything when the stored value already equals `value`, which lets
	/// callers detect whether a cache line actually changed.
	///
	/// Like std collections, this aborts if the table cannot allocate. Use
	/// [`try_set`](Self::try_set) to get an error instead.
	pub fn set(&self, key: K, value: V) -> bool
	where
		V: PartialEq,
	{
		self.set_arc(key, Arc::new(value))
	}

	/// [`set`](Self::set) for a value that is already shared.
	///
	/// Setting the same `Arc` that is stored is always a no-op.
	pub fn set_arc(&self, key: K, value: Arc<V>) -> bool
	where
		V: PartialEq,
	{
		let mut store = self.store.write();
		let outcome = store.set(key, value);
		self.record_write(&store, outcome);
		outcome.changed()
	}

	/// Fallible [`set`](Self::set).
	///
	/// # Errors
	///
	/// Returns [`CacheError::Exhausted`](crate::CacheError::Exhausted) if the
	/// table cannot grow to hold a new key. The cache is left unchanged.
	pub fn try_set(&self, key: K, value: V) -> Result<bool>
	where
		V: PartialEq,
	{
		let mut store = self.store.write();
		let outcome = store.try_set(key, Arc::new(value)).inspect_err(|err| {
			tracing::warn!(error = %err, "cache insertion failed");
		})?;
		self.record_write(&store, outcome);
		Ok(outcome.changed())
	}

	/// Remove a key. Returns `true` if it was present.
	///
	/// Removing an absent key is a no-op and leaves `len()` untouched.
	pub fn remove<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.take(key).is_some()
	}

	/// Remove a key and return the value it held.
	pub fn take<Q>(&self, key: &Q) -> Option<Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let mut store = self.store.write();
		let removed = store.remove(key)?;
		self.entry_count.fetch_sub(1, Ordering::Release);
		self.check_count(&store);
		drop(store);

		#[cfg(feature = "metrics")]
		self.counters.removal();

		Some(removed)
	}

	/// Copy every `(key, value)` pair out under one shared acquisition.
	///
	/// Values are shared with the cache, keys are cloned. Writes that happen
	/// after this returns are not reflected in the snapshot.
	pub fn snapshot(&self) -> Vec<(K, Arc<V>)>
	where
		K: Clone,
	{
		let snapshot = self.store.read().snapshot();
		tracing::trace!(entries = snapshot.len(), "cache snapshot taken");
		snapshot
	}

	/// Remove every entry whose value satisfies `predicate`.
	///
	/// The predicate runs without any lock held. Entries inserted after the
	/// sweep's snapshot are never passed to it, and an entry overwritten with
	/// a different value after the snapshot is kept even if its old value
	/// matched.
	///
	/// If the predicate panics, the panic propagates and nothing has been
	/// removed by this sweep.
	pub fn cleanup<F>(&self, mut predicate: F) -> SweepStats
	where
		K: Clone,
		V: PartialEq,
		F: FnMut(&V) -> bool,
	{
		self.cleanup_entries(|_, value| predicate(value))
	}

	/// [`cleanup`](Self::cleanup) with a predicate that also sees the key.
	pub fn cleanup_entries<F>(&self, mut predicate: F) -> SweepStats
	where
		K: Clone,
		V: PartialEq,
		F: FnMut(&K, &V) -> bool,
	{
		let snapshot = self.snapshot();
		let mut stats = SweepStats::with_scanned(snapshot.len());

		let matched: Vec<(K, Arc<V>)> =
			snapshot.into_iter().filter(|(key, value)| predicate(key, &**value)).collect();
		stats.matched = matched.len();

		for batch in matched.chunks(self.sweep_batch) {
			let evicted = self.remove_batch(batch);
			stats.evicted += evicted;
			tracing::trace!(batch = batch.len(), evicted, "sweep batch applied");
		}
		stats.stale = stats.matched - stats.evicted;

		#[cfg(feature = "metrics")]
		self.counters.sweep(&stats);

		tracing::debug!(
			scanned = stats.scanned,
			matched = stats.matched,
			evicted = stats.evicted,
			stale = stats.stale,
			"cache sweep finished"
		);
		stats
	}

	/// Run the [`Sweeper`] registered at construction.
	///
	/// Returns `None` if the cache was built without one.
	pub fn sweep(&self) -> Option<SweepStats>
	where
		K: Clone,
		V: PartialEq,
	{
		let sweeper = self.sweeper.as_deref()?;
		Some(self.cleanup_entries(|key, value| sweeper.should_evict(key, value)))
	}

	/// Conditionally delete one batch of matched entries under a single
	/// exclusive acquisition. Returns how many were removed.
	fn remove_batch(&self, batch: &[(K, Arc<V>)]) -> usize
	where
		V: PartialEq,
	{
		let mut store = self.store.write();
		let mut evicted = 0;
		for (key, expected) in batch {
			if store.remove_if_same(key, expected) {
				self.entry_count.fetch_sub(1, Ordering::Release);
				evicted += 1;
			}
		}
		self.check_count(&store);
		evicted
	}

	fn record_write(&self, store: &Store<K, V, S>, outcome: SetOutcome) {
		if outcome == SetOutcome::Inserted {
			self.entry_count.fetch_add(1, Ordering::Release);
		}
		self.check_count(store);

		#[cfg(feature = "metrics")]
		self.counters.write(outcome);
	}
}

impl<K, V, S: Default> Default for Cache<K, V, S> {
	fn default() -> Self {
		Self::with_hasher(S::default())
	}
}

impl<K, V, S> fmt::Debug for Cache<K, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cache")
			.field("len", &self.len())
			.field("sweep_batch", &self.sweep_batch)
			.field("has_sweeper", &self.has_sweeper())
			.finish_non_exhaustive()
	}
}
