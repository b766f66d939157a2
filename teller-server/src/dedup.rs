//! Reply cache for at-most-once semantics.

use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Cache key: the peer's `ip:port` rendering plus the request id. A resend of
/// the same request from the same socket maps to the same key.
pub type DedupKey = (String, u64);

/// Builds the cache key for a request.
pub fn dedup_key(peer: SocketAddr, request_id: u64) -> DedupKey {
    (peer.to_string(), request_id)
}

#[derive(Debug)]
struct DedupEntry {
    reply: Bytes,
    expires_at: Instant,
}

/// Maps (peer, request id) to the encoded reply produced for it.
///
/// Consulted only for requests carrying the at-most-once flag. Entries expire
/// by TTL alone; the cache is unbounded in peers, which is acceptable for a
/// teaching service but would need a cap in hostile environments.
#[derive(Debug)]
pub struct DedupCache {
    entries: HashMap<DedupKey, DedupEntry>,
    ttl: Duration,
}

impl DedupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Returns the cached reply bytes for a key, if any.
    pub fn get(&self, key: &DedupKey) -> Option<&Bytes> {
        self.entries.get(key).map(|e| &e.reply)
    }

    /// Stores the reply produced for `key`, replacing any previous entry.
    pub fn insert(&mut self, key: DedupKey, reply: Bytes, now: Instant) {
        self.entries.insert(
            key,
            DedupEntry {
                reply,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drops entries whose TTL has elapsed.
    pub fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, e| e.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_replay_is_verbatim() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        let key = dedup_key(peer(5000), 42);
        let reply = Bytes::from_static(b"original reply bytes");

        cache.insert(key.clone(), reply.clone(), Instant::now());
        assert_eq!(cache.get(&key).unwrap(), &reply);
    }

    #[test]
    fn test_keyed_by_peer_and_request_id() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.insert(dedup_key(peer(5000), 1), Bytes::from_static(b"a"), now);

        assert!(cache.get(&dedup_key(peer(5000), 2)).is_none());
        assert!(cache.get(&dedup_key(peer(5001), 1)).is_none());
        assert!(cache.get(&dedup_key(peer(5000), 1)).is_some());
    }

    #[test]
    fn test_sweep_honors_ttl() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert(dedup_key(peer(5000), 1), Bytes::from_static(b"a"), t0);

        cache.sweep(t0 + Duration::from_secs(59));
        assert_eq!(cache.len(), 1);

        cache.sweep(t0 + Duration::from_secs(60));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_refreshes_existing_key() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        let key = dedup_key(peer(5000), 1);
        cache.insert(key.clone(), Bytes::from_static(b"a"), t0);
        cache.insert(key.clone(), Bytes::from_static(b"b"), t0 + Duration::from_secs(30));

        cache.sweep(t0 + Duration::from_secs(60));
        assert_eq!(cache.get(&key).unwrap(), &Bytes::from_static(b"b"));
    }
}
