//! Memoizing oracle wrapper using moka
//!
//! Wraps any [`SemanticOracle`] so repeated questions within a run hit the
//! backend once. Only resolved answers and definitive refusals are stored;
//! backend failures are retried on the next query.

use crate::oracle::{Resolution, SemanticOracle};
use crate::signature::{CallableRef, Signature, TypeName, TypeQuery};
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleStats {
    /// Queries answered
    pub queries: u64,
    /// Queries answered from cache
    pub hits: u64,
    /// Queries forwarded to the wrapped oracle
    pub misses: u64,
    /// Cached entries (approximate)
    pub entry_count: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queries: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Caching oracle
pub struct CachedOracle<O> {
    inner: O,
    signatures: Cache<CallableRef, Resolution<Signature>>,
    types: Cache<TypeQuery, Resolution<TypeName>>,
    counters: Counters,
}

impl<O: SemanticOracle> CachedOracle<O> {
    /// Wrap oracle with max capacity per table
    #[must_use]
    pub fn new(inner: O, max_capacity: u64) -> Self {
        Self {
            inner,
            signatures: Cache::new(max_capacity),
            types: Cache::new(max_capacity),
            counters: Counters::default(),
        }
    }

    /// Wrap oracle with time-based expiration
    #[must_use]
    pub fn with_ttl(inner: O, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            signatures: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            types: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            counters: Counters::default(),
        }
    }

    /// Wrapped oracle
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &O {
        &self.inner
    }

    /// Drop every cached answer
    pub fn invalidate_all(&self) {
        self.signatures.invalidate_all();
        self.types.invalidate_all();
    }

    /// Snapshot of cache counters
    #[must_use]
    pub fn stats(&self) -> OracleStats {
        OracleStats {
            queries: self.counters.queries.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            entry_count: self.signatures.entry_count() + self.types.entry_count(),
        }
    }

    fn lookup<K, V>(
        &self,
        cache: &Cache<K, Resolution<V>>,
        key: &K,
        fetch: impl FnOnce() -> Resolution<V>,
    ) -> Resolution<V>
    where
        K: std::hash::Hash + Eq + Clone + Send + Sync + std::fmt::Debug + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.counters.queries.fetch_add(1, Ordering::Relaxed);
        if let Some(answer) = cache.get(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(?key, "oracle cache hit");
            return answer;
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let answer = fetch();
        if answer.is_cacheable() {
            cache.insert(key.clone(), answer.clone());
        } else {
            tracing::debug!(?key, oracle = self.inner.name(), "oracle backend failure, not cached");
        }
        answer
    }
}

impl<O: SemanticOracle> SemanticOracle for CachedOracle<O> {
    fn resolve_signature(&self, callable: &CallableRef) -> Resolution<Signature> {
        self.lookup(&self.signatures, callable, || {
            self.inner.resolve_signature(callable)
        })
    }

    fn resolve_type(&self, query: &TypeQuery) -> Resolution<TypeName> {
        self.lookup(&self.types, query, || self.inner.resolve_type(query))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

impl<O: std::fmt::Debug> std::fmt::Debug for CachedOracle<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedOracle")
            .field("inner", &self.inner)
            .field("signatures", &self.signatures.entry_count())
            .field("types", &self.types.entry_count())
            .finish_non_exhaustive()
    }
}
