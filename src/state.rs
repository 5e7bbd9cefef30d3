//! Engine state persistence (spec.md §3, §5, §6).
//!
//! Per Design Note 1, the whole [`EngineState`] is serialized under a single
//! cache key so the Locked→Unlocked transition is an atomic replacement
//! rather than a handful of keys that could be observed half-written.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved KV cache key names (spec.md §6). `SHARENUMBERS` and
/// `PARTIAL_HASHES` are kept for interface fidelity with the external
/// contract; this crate's own [`StateStore`] only ever touches `STATE`.
pub const STATE_KEY: &str = "hasher";
pub const SHARENUMBERS_KEY: &str = "sharenumbers";
pub const PARTIAL_HASHES_KEY: &str = "partial_hashes";

/// The external key/value cache (spec.md §6). Implementations back this
/// with whatever the ambient deployment uses (Redis, memcached, ...); this
/// crate only depends on the trait.
pub trait KvCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&self, key: &str, value: Vec<u8>);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialHashRecord {
    pub share_number: u8,
    pub salted_hash_b64: String,
}

/// Process-wide engine state (spec.md §3), threaded through the password
/// surface as an instance rather than a true global (Design Note 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub is_unlocked: bool,
    pub secret: Option<Vec<u8>>,
    pub threshold_key: Option<Vec<u8>>,
    /// The Shamir basis points, once `recombine` has established them.
    /// Absent while locked (spec.md §3's invariant).
    pub shamir_basis: Option<Vec<(u8, Vec<u8>)>>,
    pub next_share: u8,
    pub last_unlocked: Option<DateTime<Utc>>,
    pub candidate_shares: BTreeMap<u8, Vec<u8>>,
    pub partial_hashes: BTreeMap<String, PartialHashRecord>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            is_unlocked: false,
            secret: None,
            threshold_key: None,
            shamir_basis: None,
            next_share: 1,
            last_unlocked: None,
            candidate_shares: BTreeMap::new(),
            partial_hashes: BTreeMap::new(),
        }
    }
}

/// Persists [`EngineState`] to a [`KvCache`] as one JSON blob under
/// [`STATE_KEY`].
pub struct StateStore<C: KvCache> {
    cache: C,
}

impl<C: KvCache> StateStore<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn load(&self) -> EngineState {
        self.cache
            .get(STATE_KEY)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, state: &EngineState) {
        let bytes = serde_json::to_vec(state).expect("EngineState always serializes");
        self.cache.set(STATE_KEY, bytes);
    }
}

/// A process-local [`KvCache`] for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryKvCache {
    inner: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

impl KvCache for InMemoryKvCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.inner.lock().unwrap().insert(key.to_string(), value);
    }
}
