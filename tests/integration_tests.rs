use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use sweep_cache::{Cache, CacheBuilder, SweepStats};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

fn is_even(v: &i64) -> bool {
	v % 2 == 0
}

/// Number of keys actually present, counted independently of `len()`.
fn present_keys<K, V>(cache: &Cache<K, V>) -> usize
where
	K: std::hash::Hash + Eq + Clone,
{
	cache.snapshot().len()
}

#[test]
fn test_len_matches_present_keys_after_mixed_operations() {
	init_tracing();
	let cache: Cache<u32, i64> = Cache::new();

	for i in 0..50 {
		cache.set(i, i as i64);
	}
	for i in 0..50 {
		cache.set(i, (i * 2) as i64);
	}
	for i in (0..50).step_by(3) {
		cache.remove(&i);
	}
	for i in 40..60 {
		cache.remove(&i);
	}
	cache.cleanup(|v| v % 4 == 0);

	assert_eq!(cache.len(), present_keys(&cache));
}

#[test]
fn test_remove_is_idempotent() {
	let cache: Cache<&str, i64> = Cache::new();

	assert!(!cache.remove(&"ghost"));
	assert_eq!(cache.len(), 0);

	cache.set("k", 1);
	cache.set("other", 2);
	assert!(cache.remove(&"k"));
	assert!(!cache.remove(&"k"));
	assert_eq!(cache.len(), 1);
}

#[test]
fn test_equal_set_is_noop() {
	let cache: Cache<&str, i64> = Cache::new();

	assert!(cache.set("k", 42));
	assert!(!cache.set("k", 42));
	assert_eq!(cache.len(), 1);
}

#[test]
fn test_cleanup_evicts_exactly_matching_entries() {
	let cache: Cache<&str, i64> = Cache::new();
	cache.set("a", 1);
	cache.set("b", 2);
	cache.set("c", 3);

	let stats = cache.cleanup(is_even);

	assert_eq!(stats.evicted, 1);
	assert_eq!(cache.len(), 2);
	assert_eq!(cache.get_clone(&"a"), Some(1));
	assert_eq!(cache.get_clone(&"c"), Some(3));
	assert!(!cache.contains(&"b"));
}

#[test]
fn test_cleanup_on_empty_cache_is_noop() {
	let cache: Cache<&str, i64> = Cache::new();
	let stats = cache.cleanup(is_even);
	assert_eq!(stats, SweepStats::default());
	assert!(cache.is_empty());
}

/// Run `cleanup(is_even)` on another thread and pause it inside the first
/// predicate call. `during` runs while the sweep is paused, after its
/// snapshot and before its delete phase.
fn with_paused_sweep<F>(cache: &Arc<Cache<&'static str, i64>>, during: F) -> SweepStats
where
	F: FnOnce(),
{
	let (paused_tx, paused_rx) = mpsc::channel::<()>();
	let (resume_tx, resume_rx) = mpsc::channel::<()>();

	let sweeper = {
		let cache = cache.clone();
		thread::spawn(move || {
			let mut first = true;
			cache.cleanup(move |v| {
				if first {
					first = false;
					paused_tx.send(()).expect("test thread alive");
					resume_rx.recv().expect("test thread alive");
				}
				is_even(v)
			})
		})
	};

	paused_rx.recv_timeout(Duration::from_secs(5)).expect("sweep should reach the predicate");
	during();
	resume_tx.send(()).expect("sweep thread alive");

	sweeper.join().expect("sweep thread should not panic")
}

#[test]
fn test_insert_after_snapshot_survives_sweep() {
	init_tracing();
	let cache: Arc<Cache<&'static str, i64>> = Arc::new(Cache::new());
	cache.set("a", 1);
	cache.set("b", 2);
	cache.set("c", 3);

	let stats = with_paused_sweep(&cache, || {
		assert!(cache.set("d", 4));
	});

	assert_eq!(stats.scanned, 3);
	assert_eq!(stats.evicted, 1);
	assert_eq!(cache.get_clone(&"d"), Some(4));
	assert!(!cache.contains(&"b"));
	assert_eq!(cache.len(), 3);
}

#[test]
fn test_overwrite_after_snapshot_survives_sweep() {
	let cache: Arc<Cache<&'static str, i64>> = Arc::new(Cache::new());
	cache.set("b", 2);
	cache.set("x", 8);

	let stats = with_paused_sweep(&cache, || {
		// Still even, but not the value the sweep looked at
		assert!(cache.set("b", 6));
	});

	assert_eq!(stats.matched, 2);
	assert_eq!(stats.evicted, 1);
	assert_eq!(stats.stale, 1);
	assert_eq!(cache.get_clone(&"b"), Some(6));
	assert!(!cache.contains(&"x"));
	assert_eq!(cache.len(), 1);
}

#[test]
fn test_lock_is_free_while_predicate_runs() {
	let cache: Arc<Cache<&'static str, i64>> = Arc::new(Cache::new());
	cache.set("a", 2);

	// Every operation below would deadlock if the sweep held the lock
	// during predicate evaluation.
	let stats = with_paused_sweep(&cache, || {
		assert_eq!(cache.get_clone(&"a"), Some(2));
		assert!(cache.set("z", 26));
		assert!(cache.remove(&"z"));
		assert_eq!(cache.snapshot().len(), 1);
		assert_eq!(cache.cleanup(|_| false).scanned, 1);
	});

	assert_eq!(stats.evicted, 1);
	assert!(cache.is_empty());
}

#[test]
fn test_concurrent_operations_keep_len_exact() {
	init_tracing();
	const THREADS: u64 = 8;
	const OPS: u64 = 2_000;
	const KEYS: u64 = 64;
	const STRIDE: u64 = 1_000_000;

	let cache: Arc<Cache<u64, u64>> = Arc::new(CacheBuilder::new().sweep_batch(4).build());
	let barrier = Arc::new(Barrier::new(THREADS as usize + 1));
	let done = Arc::new(AtomicBool::new(false));

	let workers: Vec<_> = (0..THREADS)
		.map(|t| {
			let cache = cache.clone();
			let barrier = barrier.clone();
			thread::spawn(move || {
				// Small LCG so each worker has its own deterministic op stream
				let mut state = t.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
				barrier.wait();
				for i in 0..OPS {
					state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
					let key = (state >> 33) % KEYS;
					match (state >> 20) % 4 {
						0 | 1 => {
							cache.set(key, key * STRIDE + i);
						}
						2 => {
							if let Some(value) = cache.get(&key) {
								// Every value carries its key, so a torn or misplaced
								// write would show up here.
								assert_eq!(*value / STRIDE, key);
							}
						}
						_ => {
							cache.remove(&key);
						}
					}
				}
			})
		})
		.collect();

	let sweeper = {
		let cache = cache.clone();
		let barrier = barrier.clone();
		let done = done.clone();
		thread::spawn(move || {
			barrier.wait();
			let mut sweeps = 0;
			loop {
				let stats = cache.cleanup(|v| v % 3 == 0);
				assert_eq!(stats.matched, stats.evicted + stats.stale);
				sweeps += 1;
				if done.load(Ordering::Acquire) {
					break sweeps;
				}
			}
		})
	};

	for worker in workers {
		worker.join().expect("worker should not panic");
	}
	done.store(true, Ordering::Release);
	let sweeps = sweeper.join().expect("sweeper should not panic");
	assert!(sweeps > 0);

	let present = (0..KEYS).filter(|k| cache.contains(k)).count();
	assert_eq!(cache.len(), present);
	assert_eq!(cache.len(), present_keys(&cache));
}

#[test]
fn test_registered_sweeper_runs_on_reload_signal() {
	init_tracing();

	// A worker owned by the process entry point forwards reload signals to
	// the cache. The rule itself was fixed when the cache was built.
	enum Signal {
		Reload,
		Shutdown,
	}

	let cache: Arc<Cache<String, u64>> = Arc::new(
		CacheBuilder::new().sweeper(|key: &String, _: &u64| key.starts_with("query:")).build(),
	);
	for i in 0..5 {
		cache.set(format!("query:{i}"), i);
		cache.set(format!("session:{i}"), i);
	}

	let (signal_tx, signal_rx) = mpsc::channel();
	let (report_tx, report_rx) = mpsc::channel();
	let handler = {
		let cache = cache.clone();
		thread::spawn(move || {
			while let Ok(signal) = signal_rx.recv() {
				match signal {
					Signal::Reload => {
						report_tx.send(cache.sweep()).expect("test thread alive");
					}
					Signal::Shutdown => break,
				}
			}
		})
	};

	signal_tx.send(Signal::Reload).expect("handler alive");
	let stats = report_rx
		.recv_timeout(Duration::from_secs(5))
		.expect("handler should report")
		.expect("sweeper registered");
	signal_tx.send(Signal::Shutdown).expect("handler alive");
	handler.join().expect("handler should not panic");

	assert_eq!(stats.evicted, 5);
	assert_eq!(cache.len(), 5);
	assert!(cache.contains("session:0"));
	assert!(!cache.contains("query:0"));
}

#[test]
fn test_borrowed_key_lookups() {
	let cache: Cache<String, String> = Cache::new();
	cache.set("catalog".to_string(), "schema".to_string());

	assert!(cache.contains("catalog"));
	assert_eq!(cache.get_clone("catalog").as_deref(), Some("schema"));
	assert_eq!(cache.get_ref("catalog").map(|g| g.len()), Some(6));
	assert!(cache.remove("catalog"));
	assert!(cache.get("catalog").is_none());
}

#[test]
fn test_values_outlive_removal() {
	let cache: Cache<u32, Vec<u8>> = Cache::new();
	cache.set(1, vec![1, 2, 3]);

	let held = cache.get(&1).expect("present");
	cache.remove(&1);
	cache.set(1, vec![9]);

	// A reader keeps the version it observed
	assert_eq!(*held, vec![1, 2, 3]);
	assert_eq!(cache.get_clone(&1), Some(vec![9]));
}

#[cfg(feature = "metrics")]
#[test]
fn test_metrics_report_stale_sweep_deletes() {
	let cache: Arc<Cache<&'static str, i64>> = Arc::new(Cache::new());
	cache.set("b", 2);

	with_paused_sweep(&cache, || {
		cache.set("b", 4);
	});

	let metrics = cache.metrics();
	assert_eq!(metrics.sweeps, 1);
	assert_eq!(metrics.swept, 0);
	assert_eq!(metrics.stale, 1);
	assert_eq!(metrics.entry_count, 1);
}
