//! Feedback-loop suppression for the troll mutator (spec §4.4): a bounded,
//! TTL-based record of `(topic, payload)` digests the troll itself just
//! published, so it does not perturb its own republication right back.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

pub type Digest256 = [u8; 32];

const DEFAULT_TTL: Duration = Duration::from_secs(60);

pub fn digest(topic: &str, payload: &[u8]) -> Digest256 {
    let mut hasher = Sha256::new();
    hasher.update(topic.as_bytes());
    hasher.update(payload);
    hasher.finalize().into()
}

/// Maps a digest to the instant it was inserted; entries older than `ttl`
/// are treated as absent and swept opportunistically.
pub struct DigestCache {
    ttl: Duration,
    entries: HashMap<Digest256, Instant>,
}

impl DigestCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, topic: &str, payload: &[u8], now: Instant) {
        self.entries.insert(digest(topic, payload), now);
    }

    /// Looks up and removes a digest in one step, so each self-published
    /// message is suppressed exactly once even if it arrives twice.
    pub fn take(&mut self, topic: &str, payload: &[u8], now: Instant) -> bool {
        let key = digest(topic, payload);
        match self.entries.remove(&key) {
            Some(inserted_at) => now.duration_since(inserted_at) <= self.ttl,
            None => false,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sweep(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, inserted_at| now.duration_since(*inserted_at) <= ttl);
    }
}

impl Default for DigestCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_take_suppresses_exactly_once() {
        let mut cache = DigestCache::default();
        let now = Instant::now();
        cache.insert("HardenMqtt/Events", b"payload", now);

        assert!(cache.take("HardenMqtt/Events", b"payload", now));
        assert!(!cache.take("HardenMqtt/Events", b"payload", now));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = DigestCache::new(Duration::from_secs(1));
        let inserted_at = Instant::now();
        cache.insert("t", b"p", inserted_at);

        let later = inserted_at + Duration::from_secs(2);
        assert!(!cache.take("t", b"p", later));
    }

    #[test]
    fn distinct_topic_or_payload_does_not_collide() {
        let mut cache = DigestCache::default();
        let now = Instant::now();
        cache.insert("topic-a", b"payload", now);

        assert!(!cache.take("topic-b", b"payload", now));
        assert!(!cache.take("topic-a", b"other", now));
        assert!(cache.take("topic-a", b"payload", now));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let mut cache = DigestCache::new(Duration::from_millis(10));
        let t0 = Instant::now();
        cache.insert("old", b"p", t0);
        cache.insert("new", b"p", t0 + Duration::from_millis(5));

        cache.sweep(t0 + Duration::from_millis(12));
        assert!(!cache.take("old", b"p", t0 + Duration::from_millis(12)));
        assert!(cache.take("new", b"p", t0 + Duration::from_millis(12)));
    }
}
