//! Cache operation counters.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::store::SetOutcome;
use crate::sweep::SweepStats;

/// Snapshot of cache activity since construction or the last `clear()`.
///
/// # Example
///
/// ```
/// use sweep_cache::Cache;
///
/// let cache: Cache<u32, u32> = Cache::new();
/// cache.set(1, 10);
/// cache.get(&1);
/// cache.get(&2);
///
/// let metrics = cache.metrics();
/// assert_eq!(metrics.hits, 1);
/// assert_eq!(metrics.misses, 1);
/// println!("Hit rate: {:.2}%", metrics.hit_rate() * 100.0);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
	/// Lookups that found a value (`get`, `get_clone`, `get_ref`).
	pub hits: u64,
	/// Lookups that found nothing.
	pub misses: u64,
	/// Writes that created a new entry.
	pub inserts: u64,
	/// Writes that replaced an unequal value.
	pub updates: u64,
	/// Writes skipped because the stored value was already equal.
	pub unchanged: u64,
	/// Entries removed explicitly (`remove`, `take`).
	pub removals: u64,
	/// Completed sweeps.
	pub sweeps: u64,
	/// Entries removed by sweeps.
	pub swept: u64,
	/// Sweep deletes skipped because the entry changed after the snapshot.
	pub stale: u64,
	/// Current number of entries.
	pub entry_count: usize,
}

impl CacheMetrics {
	/// Hit rate as a ratio between 0.0 and 1.0. Returns 0.0 before any lookup.
	pub fn hit_rate(&self) -> f64 {
		let total = self.total_accesses();
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// Total lookups (hits + misses).
	pub fn total_accesses(&self) -> u64 {
		self.hits + self.misses
	}

	/// Writes that changed the cache (inserts + updates).
	pub fn total_writes(&self) -> u64 {
		self.inserts + self.updates
	}
}

/// Live counters behind [`CacheMetrics`].
#[derive(Debug, Default)]
pub(crate) struct Counters {
	hits: AtomicU64,
	misses: AtomicU64,
	inserts: AtomicU64,
	updates: AtomicU64,
	unchanged: AtomicU64,
	removals: AtomicU64,
	sweeps: AtomicU64,
	swept: AtomicU64,
	stale: AtomicU64,
}

impl Counters {
	pub fn lookup(&self, hit: bool) {
		if hit {
			self.hits.fetch_add(1, Ordering::Relaxed);
		} else {
			self.misses.fetch_add(1, Ordering::Relaxed);
		}
	}

	pub fn write(&self, outcome: SetOutcome) {
		let counter = match outcome {
			SetOutcome::Inserted => &self.inserts,
			SetOutcome::Updated => &self.updates,
			SetOutcome::Unchanged => &self.unchanged,
		};
		counter.fetch_add(1, Ordering::Relaxed);
	}

	pub fn removal(&self) {
		self.removals.fetch_add(1, Ordering::Relaxed);
	}

	pub fn sweep(&self, stats: &SweepStats) {
		self.sweeps.fetch_add(1, Ordering::Relaxed);
		self.swept.fetch_add(stats.evicted as u64, Ordering::Relaxed);
		self.stale.fetch_add(stats.stale as u64, Ordering::Relaxed);
	}

	pub fn reset(&self) {
		for counter in [
			&self.hits,
			&self.misses,
			&self.inserts,
			&self.updates,
			&self.unchanged,
			&self.removals,
			&self.sweeps,
			&self.swept,
			&self.stale,
		] {
			counter.store(0, Ordering::Relaxed);
		}
	}

	pub fn snapshot(&self, entry_count: usize) -> CacheMetrics {
		CacheMetrics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			inserts: self.inserts.load(Ordering::Relaxed),
			updates: self.updates.load(Ordering::Relaxed),
			unchanged: self.unchanged.load(Ordering::Relaxed),
			removals: self.removals.load(Ordering::Relaxed),
			sweeps: self.sweeps.load(Ordering::Relaxed),
			swept: self.swept.load(Ordering::Relaxed),
			stale: self.stale.load(Ordering::Relaxed),
			entry_count,
		}
	}
}
