//! Unique rule identifier allocation.
//!
//! Every `SecRule`/`SecAction` needs an `id`, and every `skipAfter` target is named after the
//! id of the rule that jumps to it. A single [`RuleIdSequencer`] is shared by all emitters of a
//! run so that no two directives or markers ever collide.

use std::sync::atomic::{AtomicU64, Ordering};

/// Value the counter starts from; the first id handed out is `DEFAULT_SEED + 1`.
pub const DEFAULT_SEED: u64 = 30000;

/// Monotonically increasing rule id counter.
///
/// Increments are atomic, so the sequencer can be shared by reference between emitters
/// running on different threads without ever returning the same value twice.
#[derive(Debug)]
pub struct RuleIdSequencer {
    seed: u64,
    last: AtomicU64,
}

impl RuleIdSequencer {
    /// Creates a sequencer starting at [`DEFAULT_SEED`]
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Creates a sequencer whose first id is `seed + 1`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            last: AtomicU64::new(seed),
        }
    }

    /// Allocates the next identifier
    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The most recently issued identifier, or the seed if none was issued yet
    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }

    /// Rewinds the counter to its seed
    pub fn reset(&self) {
        self.last.store(self.seed, Ordering::SeqCst);
    }
}

impl Default for RuleIdSequencer {
    fn default() -> Self {
        Self::new()
    }
}
