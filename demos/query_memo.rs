use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use sweep_cache::{Cache, CacheBuilder, Sweeper};

/// Example memoizing database query results, with stale results dropped
/// whenever the process receives a reload request.
///
/// The cache has no notion of age; the sweeper registered at construction
/// decides what "stale" means.

#[derive(Clone, Debug, PartialEq)]
struct QueryResult {
	rows: Vec<String>,
	cached_at: Instant,
}

struct ExpiredResults {
	max_age: Duration,
}

impl Sweeper<String, QueryResult> for ExpiredResults {
	fn should_evict(&self, _sql: &String, result: &QueryResult) -> bool {
		result.cached_at.elapsed() > self.max_age
	}
}

/// Everything the data layer needs, passed in explicitly.
struct DataLayer {
	cache: Arc<Cache<String, QueryResult>>,
}

impl DataLayer {
	fn query(&self, sql: &str) -> Vec<String> {
		if let Some(hit) = self.cache.get(sql) {
			println!("cache hit:  {sql}");
			return hit.rows.clone();
		}

		println!("cache miss: {sql}");
		let rows = vec![format!("row for `{sql}`")];
		self.cache.set(
			sql.to_string(),
			QueryResult {
				rows: rows.clone(),
				cached_at: Instant::now(),
			},
		);
		rows
	}
}

enum Signal {
	Reload,
	Terminate,
}

fn main() {
	tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

	let cache = Arc::new(
		CacheBuilder::new()
			.capacity(64)
			.sweeper(ExpiredResults {
				max_age: Duration::from_millis(50),
			})
			.build(),
	);
	let data = DataLayer {
		cache: cache.clone(),
	};

	// Signal dispatch owned by the entry point; it only knows how to ask the
	// cache to sweep, not what gets swept.
	let (signals, inbox) = mpsc::channel();
	let dispatcher = {
		let cache = cache.clone();
		thread::spawn(move || {
			for signal in inbox {
				match signal {
					Signal::Reload => {
						if let Some(stats) = cache.sweep() {
							println!("reload sweep: {stats}");
						}
					}
					Signal::Terminate => break,
				}
			}
		})
	};

	data.query("SELECT * FROM users");
	data.query("SELECT * FROM users");
	thread::sleep(Duration::from_millis(80));
	data.query("SELECT * FROM orders");

	signals.send(Signal::Reload).expect("dispatcher running");
	signals.send(Signal::Terminate).expect("dispatcher running");
	dispatcher.join().expect("dispatcher should not panic");

	// `users` aged out, `orders` is still fresh
	println!("cached queries after reload: {}", cache.len());
	data.query("SELECT * FROM users");
	data.query("SELECT * FROM orders");

	let metrics = cache.metrics();
	println!(
		"hits {} misses {} swept {} hit rate {:.0}%",
		metrics.hits,
		metrics.misses,
		metrics.swept,
		metrics.hit_rate() * 100.0
	);
}
