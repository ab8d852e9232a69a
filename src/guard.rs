use std::ops::Deref;

use parking_lot::MappedRwLockReadGuard;

/// RAII guard for a borrowed value. Holds the cache's read lock.
///
/// **Intentionally `!Send`**, so it cannot be held across `.await` points in a
/// spawned task. While a guard is alive every writer and sweep delete phase
/// on the same cache is blocked, so keep its scope tight.
///
/// For async contexts or long-lived access use [`Cache::get`](crate::Cache::get),
/// which returns an `Arc` and releases the lock immediately.
///
/// # Example
///
/// ```
/// use sweep_cache::Cache;
///
/// let cache: Cache<u32, String> = Cache::new();
/// cache.set(1, "one".to_string());
///
/// let len = {
///     let guard = cache.get_ref(&1).expect("present");
///     guard.len()
/// }; // read lock released here
/// assert_eq!(len, 3);
/// ```
///
/// A guard cannot leave the thread that took the lock:
///
/// ```compile_fail
/// use std::thread;
/// use sweep_cache::Cache;
///
/// let cache: &'static Cache<u32, u32> = Box::leak(Box::new(Cache::new()));
/// cache.set(1, 1);
///
/// let guard = cache.get_ref(&1).unwrap();
/// // Guard is !Send
/// thread::spawn(move || {
///     assert_eq!(*guard, 1);
/// });
/// ```
pub struct Guard<'a, V> {
	inner: MappedRwLockReadGuard<'a, V>,
}

impl<'a, V> Guard<'a, V> {
	pub(crate) fn new(inner: MappedRwLockReadGuard<'a, V>) -> Self {
		Self {
			inner,
		}
	}
}

impl<V> Deref for Guard<'_, V> {
	type Target = V;

	fn deref(&self) -> &V {
		&self.inner
	}
}

impl<V: std::fmt::Debug> std::fmt::Debug for Guard<'_, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		(**self).fmt(f)
	}
}

impl<V: std::fmt::Display> std::fmt::Display for Guard<'_, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		(**self).fmt(f)
	}
}

impl<V: PartialEq> PartialEq<V> for Guard<'_, V> {
	fn eq(&self, other: &V) -> bool {
		**self == *other
	}
}
