//! Unsynchronized entry storage.
//!
//! A `Store` is the map behind a [`Cache`](crate::Cache). It is not thread-safe
//! on its own: the cache wraps it in an `RwLock` and every method here runs
//! inside a critical section of that lock.
//!
//! Values are kept behind `Arc` so readers can take a value out of the
//! critical section, and so a sweep snapshot copies pointers instead of
//! holding references into the table while the lock is released.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry as HashMapEntry;

use crate::error::{CacheError, Result};

/// What a write did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOutcome {
	/// The key was absent and a new entry was created.
	Inserted,
	/// The key held an unequal value, which was replaced.
	Updated,
	/// The key already held an equal value. Nothing was written.
	Unchanged,
}

impl SetOutcome {
	/// Whether the cache line observably changed.
	pub fn changed(self) -> bool {
		self != SetOutcome::Unchanged
	}
}

/// Key/value table owned by a single cache.
pub(crate) struct Store<K, V, S> {
	entries: HashMap<K, Arc<V>, S>,
}

impl<K, V, S> Store<K, V, S> {
	/// Create an empty store sized for `capacity` entries.
	pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
		Self {
			entries: HashMap::with_capacity_and_hasher(capacity, hasher),
		}
	}

	/// Number of entries in the table.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Drop every entry.
	pub fn clear(&mut self) {
		self.entries.clear();
	}
}

impl<K, V, S> Store<K, V, S>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	/// Look up the value stored under `key`.
	pub fn get<Q>(&self, key: &Q) -> Option<&Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.entries.get(key)
	}

	/// Check whether `key` is present.
	pub fn contains<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.entries.contains_key(key)
	}

	/// Store `value` under `key` unless an equal value is already there.
	pub fn set(&mut self, key: K, value: Arc<V>) -> SetOutcome
	where
		V: PartialEq,
	{
		match self.entries.entry(key) {
			HashMapEntry::Occupied(mut occupied) => {
				let current = occupied.get();
				if Arc::ptr_eq(current, &value) || **current == *value {
					return SetOutcome::Unchanged;
				}
				occupied.insert(value);
				SetOutcome::Updated
			}
			HashMapEntry::Vacant(vacant) => {
				vacant.insert(value);
				SetOutcome::Inserted
			}
		}
	}

	/// Like [`set`](Self::set), but reserves table space first so a failed
	/// allocation is reported instead of aborting.
	pub fn try_set(&mut self, key: K, value: Arc<V>) -> Result<SetOutcome>
	where
		V: PartialEq,
	{
		if !self.entries.contains_key(&key) {
			self.try_reserve(1)?;
		}
		Ok(self.set(key, value))
	}

	/// Reserve room for `additional` more entries.
	pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
		self.entries.try_reserve(additional).map_err(|e| CacheError::exhausted(additional, e))
	}

	/// Remove `key`, returning the value it held.
	pub fn remove<Q>(&mut self, key: &Q) -> Option<Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.entries.remove(key)
	}

	/// Remove `key` only if it still holds `expected`.
	///
	/// `expected` matches when it is the very same allocation as the stored
	/// value or compares equal to it. Returns whether an entry was removed.
	pub fn remove_if_same(&mut self, key: &K, expected: &Arc<V>) -> bool
	where
		V: PartialEq,
	{
		let same = match self.entries.get(key) {
			Some(current) => Arc::ptr_eq(current, expected) || **current == **expected,
			None => false,
		};
		same && self.entries.remove(key).is_some()
	}

	/// Copy every key/value pair out of the table.
	pub fn snapshot(&self) -> Vec<(K, Arc<V>)>
	where
		K: Clone,
	{
		self.entries.iter().map(|(k, v)| (k.clone(), Arc::clone(v))).collect()
	}
}
