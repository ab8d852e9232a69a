/// Eviction rule registered with a cache at construction time.
///
/// A sweeper is the typed hook that lets the owner of a cache trigger a
/// sweep from somewhere else in the process (a reload signal, a timer task)
/// without knowing the rule: the handler only calls
/// [`Cache::sweep`](crate::Cache::sweep).
///
/// Closures taking `(&K, &V)` implement this trait, so most callers never
/// write an impl by hand.
///
/// # Example
///
/// ```
/// use sweep_cache::{CacheBuilder, Sweeper};
///
/// struct OlderThan(u64);
///
/// impl Sweeper<String, u64> for OlderThan {
///     fn should_evict(&self, _key: &String, stamp: &u64) -> bool {
///         *stamp < self.0
///     }
/// }
///
/// let cache = CacheBuilder::new().sweeper(OlderThan(100)).build();
/// cache.set("fresh".to_string(), 150);
/// cache.set("stale".to_string(), 20);
///
/// let stats = cache.sweep().expect("a sweeper is registered");
/// assert_eq!(stats.evicted, 1);
/// assert!(cache.contains("fresh"));
/// ```
pub trait Sweeper<K, V>: Send + Sync {
	/// Return `true` if the entry should be removed.
	///
	/// Runs without any cache lock held and may be slow.
	fn should_evict(&self, key: &K, value: &V) -> bool;
}

impl<K, V, F> Sweeper<K, V> for F
where
	F: Fn(&K, &V) -> bool + Send + Sync,
{
	fn should_evict(&self, key: &K, value: &V) -> bool {
		self(key, value)
	}
}
