//! Anti-fraud cache (C4): replay suppression, content dedupe, greylisting.
//!
//! Backed by `ainp-store`'s TTL-keyed sled trees. If the store is
//! unreachable, checks fail open (allow) and flip the shared `degraded`
//! flag so the admission surface can surface it to callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ainp_core::Did;
use ainp_store::{StoreDb, TtlCache};
use sha2::{Digest, Sha256};

#[derive(Clone)]
pub struct AntiFraudCache {
    db: StoreDb,
    degraded: Arc<AtomicBool>,
}

impl AntiFraudCache {
    pub fn new(db: StoreDb) -> Self {
        AntiFraudCache {
            db,
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// `true` on first sight (stored for `ttl_seconds`); `false` on
    /// duplicate. Fails open on a store error.
    pub fn check_and_mark_replay(
        &self,
        envelope_id: &str,
        from_did: &Did,
        trace_id: &str,
        now: i64,
        ttl_seconds: u64,
    ) -> bool {
        let key = format!("{envelope_id}|{from_did}|{trace_id}");
        self.guarded_check(TtlCache::Replay, key.as_bytes(), now, ttl_seconds)
    }

    /// SHA-256 over the normalized concatenation of `(from, to, subject,
    /// body)`. `false` on duplicate within the TTL window.
    pub fn check_and_mark_content_hash(
        &self,
        from: &Did,
        to: &Did,
        subject: Option<&str>,
        body: &str,
        now: i64,
        ttl_seconds: u64,
    ) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(from.as_str().trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(to.as_str().trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(subject.unwrap_or("").trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(body.trim().to_lowercase().as_bytes());
        let digest = hasher.finalize();
        self.guarded_check(TtlCache::ContentHash, &digest, now, ttl_seconds)
    }

    /// Returns true while a `from` -> `to` first contact is still within its
    /// greylist window (including the first sighting itself), `false` once
    /// `delay_seconds` has elapsed since that first sighting. Fails open on
    /// a store error.
    pub fn should_greylist_first_contact(
        &self,
        from: &Did,
        to: &Did,
        now: i64,
        delay_seconds: u64,
    ) -> bool {
        let key = format!("{from}|{to}");
        match self.db.greylist_check_and_mark(key.as_bytes(), now, delay_seconds) {
            Ok(greylisted) => greylisted,
            Err(_) => {
                self.degraded.store(true, Ordering::Relaxed);
                false
            }
        }
    }

    fn guarded_check(&self, cache: TtlCache, key: &[u8], now: i64, ttl_seconds: u64) -> bool {
        match self.db.ttl_check_and_mark(cache, key, now, ttl_seconds) {
            Ok(first_sight) => first_sight,
            Err(_) => {
                self.degraded.store(true, Ordering::Relaxed);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> AntiFraudCache {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        AntiFraudCache::new(db)
    }

    #[test]
    fn replay_first_sight_then_duplicate() {
        let cache = temp_cache();
        let did = Did::new("did:key:zA");
        assert!(cache.check_and_mark_replay("e1", &did, "t1", 0, 300));
        assert!(!cache.check_and_mark_replay("e1", &did, "t1", 1, 300));
    }

    #[test]
    fn distinct_trace_ids_are_not_replays() {
        let cache = temp_cache();
        let did = Did::new("did:key:zA");
        assert!(cache.check_and_mark_replay("e1", &did, "t1", 0, 300));
        assert!(cache.check_and_mark_replay("e1", &did, "t2", 0, 300));
    }

    #[test]
    fn content_dedupe_is_case_and_whitespace_normalized() {
        let cache = temp_cache();
        let from = Did::new("did:key:zA");
        let to = Did::new("did:key:zB");
        assert!(cache.check_and_mark_content_hash(
            &from,
            &to,
            Some("Hello"),
            "  Body text  ",
            0,
            86_400
        ));
        assert!(!cache.check_and_mark_content_hash(
            &from,
            &to,
            Some("hello"),
            "body text",
            1,
            86_400
        ));
    }

    #[test]
    fn greylist_blocks_first_contact_then_allows_after_delay() {
        let cache = temp_cache();
        let from = Did::new("did:key:zA");
        let to = Did::new("did:key:zB");
        assert!(cache.should_greylist_first_contact(&from, &to, 0, 60));
        assert!(cache.should_greylist_first_contact(&from, &to, 30, 60));
        assert!(!cache.should_greylist_first_contact(&from, &to, 60, 60));
    }
}
