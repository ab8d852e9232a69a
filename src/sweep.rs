//! Outcome reporting for predicate sweeps.

use std::fmt;

/// Default number of keys removed per exclusive lock acquisition during a sweep.
pub(crate) const DEFAULT_SWEEP_BATCH: usize = 64;

/// What a single sweep saw and did.
///
/// `matched` always equals `evicted + stale`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
	/// Entries present in the snapshot the sweep started from.
	pub scanned: usize,
	/// Snapshot entries the predicate selected for removal.
	pub matched: usize,
	/// Entries actually removed.
	pub evicted: usize,
	/// Selected entries left alone because they were removed or overwritten
	/// with a different value after the snapshot was taken.
	pub stale: usize,
}

impl SweepStats {
	pub(crate) fn with_scanned(scanned: usize) -> Self {
		Self {
			scanned,
			..Self::default()
		}
	}

	/// True if the sweep removed nothing.
	pub fn is_noop(&self) -> bool {
		self.evicted == 0
	}
}

impl fmt::Display for SweepStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"scanned {}, matched {}, evicted {}, stale {}",
			self.scanned, self.matched, self.evicted, self.stale
		)
	}
}
