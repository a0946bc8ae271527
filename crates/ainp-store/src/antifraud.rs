use ainp_core::AinpError;

use crate::db::StoreDb;

/// Which TTL-cache tree an anti-fraud check targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlCache {
    Replay,
    ContentHash,
    Greylist,
}

impl StoreDb {
    fn tree_for(&self, cache: TtlCache) -> &sled::Tree {
        match cache {
            TtlCache::Replay => &self.antifraud_replay,
            TtlCache::ContentHash => &self.antifraud_content_hash,
            TtlCache::Greylist => &self.antifraud_greylist,
        }
    }

    /// Atomically check whether `key` has a live (non-expired) entry and, if
    /// not, mark it with an expiry of `now + ttl_seconds`. Returns `true` on
    /// first sight (no live entry existed), `false` on duplicate.
    ///
    /// Expiry is stored as the absolute unix-seconds deadline so a stale
    /// entry reads as absent without needing a separate sweep pass.
    pub fn ttl_check_and_mark(
        &self,
        cache: TtlCache,
        key: &[u8],
        now: i64,
        ttl_seconds: u64,
    ) -> Result<bool, AinpError> {
        let tree = self.tree_for(cache);
        let expires_at = now + ttl_seconds as i64;
        let mut first_sight = false;
        tree.fetch_and_update(key, |existing| {
            let is_live = existing
                .and_then(|b| b.try_into().ok())
                .map(i64::from_be_bytes)
                .map(|deadline| deadline > now)
                .unwrap_or(false);
            first_sight = !is_live;
            Some(expires_at.to_be_bytes().to_vec())
        })
        .map_err(|e| AinpError::Storage(e.to_string()))?;
        Ok(first_sight)
    }

    /// First-contact greylist check: on first sight of `key`, records `now`
    /// as the first-seen timestamp and returns `true` (greylisted). On every
    /// later call the stored first-seen timestamp is left untouched, and the
    /// result is `true` (still greylisted) while `now < first_seen +
    /// delay_seconds`, `false` (allowed) once the delay has elapsed.
    pub fn greylist_check_and_mark(
        &self,
        key: &[u8],
        now: i64,
        delay_seconds: u64,
    ) -> Result<bool, AinpError> {
        let tree = &self.antifraud_greylist;
        let mut greylisted = false;
        tree.fetch_and_update(key, |existing| match existing
            .and_then(|b| b.try_into().ok())
            .map(i64::from_be_bytes)
        {
            Some(first_seen) => {
                greylisted = now < first_seen + delay_seconds as i64;
                Some(first_seen.to_be_bytes().to_vec())
            }
            None => {
                greylisted = true;
                Some(now.to_be_bytes().to_vec())
            }
        })
        .map_err(|e| AinpError::Storage(e.to_string()))?;
        Ok(greylisted)
    }

    /// Read-only liveness check, without marking.
    pub fn ttl_is_live(&self, cache: TtlCache, key: &[u8], now: i64) -> Result<bool, AinpError> {
        let tree = self.tree_for(cache);
        let live = tree
            .get(key)
            .map_err(|e| AinpError::Storage(e.to_string()))?
            .and_then(|b| b.as_ref().try_into().ok())
            .map(i64::from_be_bytes)
            .map(|deadline| deadline > now)
            .unwrap_or(false);
        Ok(live)
    }

    /// Purge expired entries from a TTL cache. Lazy sweeps call this
    /// periodically; it is not required for correctness since liveness is
    /// always re-checked against the stored deadline.
    pub fn ttl_sweep_expired(&self, cache: TtlCache, now: i64) -> Result<usize, AinpError> {
        let tree = self.tree_for(cache);
        let mut removed = 0;
        let mut batch = sled::Batch::default();
        for entry in tree.iter() {
            let (key, value) = entry.map_err(|e| AinpError::Storage(e.to_string()))?;
            let deadline = i64::from_be_bytes(value.as_ref().try_into().unwrap_or([0; 8]));
            if deadline <= now {
                batch.remove(key);
                removed += 1;
            }
        }
        tree.apply_batch(batch)
            .map_err(|e| AinpError::Storage(e.to_string()))?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> StoreDb {
        let dir = tempfile::tempdir().unwrap();
        StoreDb::open(dir.path()).unwrap()
    }

    #[test]
    fn first_sight_true_then_false() {
        let db = temp_db();
        assert!(db
            .ttl_check_and_mark(TtlCache::Replay, b"env1", 1000, 300)
            .unwrap());
        assert!(!db
            .ttl_check_and_mark(TtlCache::Replay, b"env1", 1001, 300)
            .unwrap());
    }

    #[test]
    fn entry_becomes_live_again_after_ttl_expiry() {
        let db = temp_db();
        db.ttl_check_and_mark(TtlCache::Replay, b"env1", 1000, 10)
            .unwrap();
        assert!(db.ttl_is_live(TtlCache::Replay, b"env1", 1005).unwrap());
        // past the deadline (1010) it reads as not live, so this is a fresh mark
        assert!(db
            .ttl_check_and_mark(TtlCache::Replay, b"env1", 1020, 10)
            .unwrap());
    }

    #[test]
    fn greylist_check_blocks_until_delay_elapses_then_allows_permanently() {
        let db = temp_db();
        assert!(db.greylist_check_and_mark(b"a|b", 0, 60).unwrap());
        assert!(db.greylist_check_and_mark(b"a|b", 30, 60).unwrap());
        assert!(!db.greylist_check_and_mark(b"a|b", 60, 60).unwrap());
        assert!(!db.greylist_check_and_mark(b"a|b", 1000, 60).unwrap());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let db = temp_db();
        db.ttl_check_and_mark(TtlCache::Greylist, b"a", 0, 5).unwrap();
        db.ttl_check_and_mark(TtlCache::Greylist, b"b", 0, 500).unwrap();
        let removed = db.ttl_sweep_expired(TtlCache::Greylist, 100).unwrap();
        assert_eq!(removed, 1);
        assert!(db.ttl_is_live(TtlCache::Greylist, b"b", 100).unwrap());
    }
}
