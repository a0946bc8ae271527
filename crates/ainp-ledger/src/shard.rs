use std::sync::Mutex;

use ainp_core::Did;

/// A fixed set of mutexes, one per shard, used to serialize mutations to a
/// keyed resource (here, a DID's ledger row) without needing one lock per
/// key in memory.
pub struct ShardedLocks {
    shards: Vec<Mutex<()>>,
}

const N_SHARDS: usize = 256;

impl ShardedLocks {
    pub fn new() -> Self {
        ShardedLocks {
            shards: (0..N_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    fn shard_index(did: &Did) -> usize {
        let hash = blake3::hash(did.as_str().as_bytes());
        hash.as_bytes()[0] as usize % N_SHARDS
    }

    /// Run `f` while holding the shard lock for `did`. The lock guards only
    /// the in-memory critical section; the caller still performs its own
    /// store reads/writes inside `f`.
    pub fn with_lock<T>(&self, did: &Did, f: impl FnOnce() -> T) -> T {
        let _guard = self.shards[Self::shard_index(did)]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }
}

impl Default for ShardedLocks {
    fn default() -> Self {
        Self::new()
    }
}
