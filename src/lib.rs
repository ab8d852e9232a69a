//! # Sweep Cache
//!
//! A concurrent, in-memory key/value cache with:
//! - **Reader/writer locking**: lookups share the lock, writes take it exclusively
//! - **Exact entry count**: `len()` always equals the number of present keys
//! - **Change detection**: `set` reports whether the stored value actually changed
//! - **Predicate sweeps** that never hold the lock while the predicate runs
//!
//! The cache has no replacement policy and no expiry. What leaves the cache,
//! and when, is decided by the caller through `remove` and sweeps.
//!
//! ## Quick Start
//!
//! ```rust
//! use sweep_cache::Cache;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct UserProfile {
//!     name: String,
//!     active: bool,
//! }
//!
//! let cache: Cache<u64, UserProfile> = Cache::new();
//!
//! let alice = UserProfile { name: "Alice".to_string(), active: true };
//! assert!(cache.set(1, alice.clone()));
//! // Writing an equal value is a no-op
//! assert!(!cache.set(1, alice));
//!
//! // Values come back as `Arc`, the lock is already released
//! if let Some(profile) = cache.get(&1) {
//!     println!("User: {}", profile.name);
//! }
//!
//! cache.set(2, UserProfile { name: "Bob".to_string(), active: false });
//! let stats = cache.cleanup(|profile| !profile.active);
//! assert_eq!(stats.evicted, 1);
//! assert_eq!(cache.len(), 1);
//! ```
//!
//! ## Sweeps
//!
//! [`Cache::cleanup`] copies the entries out under a shared lock, evaluates the
//! predicate with no lock held, then deletes matches in short exclusive
//! batches. A delete only happens if the key still holds the value the
//! predicate saw, so entries written while the sweep runs are never lost. The
//! predicate may be slow, block on I/O, or use the cache itself.
//!
//! A sweep rule can also be registered once at construction with
//! [`CacheBuilder::sweeper`] and triggered from elsewhere with
//! [`Cache::sweep`], e.g. from a reload signal handler.
//!
//! ## Thread Safety
//!
//! The cache is `Send + Sync` and can be shared across threads via `Arc`:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use sweep_cache::Cache;
//!
//! let cache: Arc<Cache<u64, u64>> = Arc::new(Cache::new());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|i| {
//!         let cache = cache.clone();
//!         thread::spawn(move || {
//!             cache.set(i, i * 10);
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(cache.len(), 4);
//! ```

mod builder;
mod cache;
mod error;
mod guard;
#[cfg(feature = "metrics")]
mod metrics;
mod store;
mod sweep;
mod traits;

pub use builder::CacheBuilder;
pub use cache::Cache;
pub use error::{CacheError, Result};
pub use guard::Guard;
#[cfg(feature = "metrics")]
pub use metrics::CacheMetrics;
pub use sweep::SweepStats;
pub use traits::Sweeper;
