//! Compiled-plan cache keyed by [`Identity`].
//!
//! The cache maps identities to compiled plans of an opaque type `P`. The
//! mapper supplies the compiler as a closure; the cache guarantees that for
//! any one identity at most one compilation runs at a time and that only one
//! compiled plan is ever published, even when many threads miss
//! concurrently.
//!
//! # Example
//!
//! ```
//! use sqlshape_cache::{Identity, PlanCache};
//! use sqlshape_core::TypeHandle;
//!
//! let cache: PlanCache<String> = PlanCache::new();
//! let identity = Identity::builder("select 1").build(TypeHandle::of::<i64>()).unwrap();
//!
//! let plan = cache
//!     .get_or_compile(&identity, |id| Ok(format!("plan for {}", id.sql())))
//!     .unwrap();
//! assert_eq!(*plan, "plan for select 1");
//! assert_eq!(cache.stats().misses, 1);
//!
//! cache.get_or_compile(&identity, |_| unreachable!()).unwrap();
//! assert_eq!(cache.stats().hits, 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    TryLockError,
};

use serde::Serialize;
use sqlshape_core::{Result, TypeHandle};

use crate::config::PlanCacheConfig;
use crate::identity::Identity;

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found a compiled plan
    pub hits: usize,
    /// Lookups that did not
    pub misses: usize,
    /// Entries currently cached
    pub size: usize,
    /// Collection passes run so far
    pub collections: usize,
}

/// Summary of one cached query, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedQuery {
    pub sql: String,
    pub connection_target: Option<String>,
    pub grid_index: i32,
    pub hits: u64,
}

struct Entry<P> {
    /// Set once, by whichever caller compiled or inserted first.
    plan: OnceLock<Arc<P>>,
    /// Held while the first compilation runs.
    compiling: Mutex<()>,
    hits: AtomicU64,
}

impl<P> Entry<P> {
    fn new() -> Self {
        Self {
            plan: OnceLock::new(),
            compiling: Mutex::new(()),
            hits: AtomicU64::new(0),
        }
    }

    fn ready(&self) -> Option<Arc<P>> {
        self.plan.get().cloned()
    }

    fn lock_compile(&self) -> MutexGuard<'_, ()> {
        // A panicking compiler leaves nothing published, so the guard is
        // still valid to reuse.
        self.compiling.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_compiling(&self) -> bool {
        matches!(self.compiling.try_lock(), Err(TryLockError::WouldBlock))
    }
}

/// Thread-safe cache from [`Identity`] to compiled plan.
pub struct PlanCache<P> {
    entries: RwLock<HashMap<Identity, Arc<Entry<P>>>>,
    config: PlanCacheConfig,
    hits: AtomicUsize,
    misses: AtomicUsize,
    inserts: AtomicUsize,
    collections: AtomicUsize,
}

impl<P> Default for PlanCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PlanCache<P> {
    /// Create a cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(PlanCacheConfig::default())
    }

    /// Create a cache with a specific configuration.
    pub fn with_config(config: PlanCacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            collections: AtomicUsize::new(0),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &PlanCacheConfig {
        &self.config
    }

    /// Look up a compiled plan. Never waits on an in-flight compilation.
    pub fn get(&self, identity: &Identity) -> Option<Arc<P>> {
        if !self.config.enabled {
            return None;
        }
        let entry = self.existing(identity);
        match entry.as_ref().and_then(|e| e.ready().map(|plan| (e, plan))) {
            Some((entry, plan)) => {
                self.record_hit(entry, identity);
                Some(plan)
            }
            None => {
                self.record_miss(identity);
                None
            }
        }
    }

    /// Return the cached plan for `identity`, compiling it on first use.
    ///
    /// Concurrent callers with equal identities wait for a single
    /// compilation. If `compile` fails the error is returned, nothing is
    /// cached, and a later call will try again.
    pub fn get_or_compile<F>(&self, identity: &Identity, compile: F) -> Result<Arc<P>>
    where
        F: FnOnce(&Identity) -> Result<P>,
    {
        if !self.config.enabled {
            return compile(identity).map(Arc::new);
        }

        loop {
            let entry = self.entry(identity);
            if let Some(plan) = entry.ready() {
                self.record_hit(&entry, identity);
                return Ok(plan);
            }

            let guard = entry.lock_compile();
            if let Some(plan) = entry.ready() {
                drop(guard);
                self.record_hit(&entry, identity);
                return Ok(plan);
            }
            // A failed compilation may have unlinked this entry while we waited.
            if !self.is_current(identity, &entry) {
                continue;
            }

            self.record_miss(identity);
            return match compile(identity) {
                Ok(plan) => {
                    let plan = Arc::clone(entry.plan.get_or_init(|| Arc::new(plan)));
                    drop(guard);
                    tracing::debug!(
                        target: "sqlshape::cache",
                        hash = identity.hash_code(),
                        grid_index = identity.grid_index(),
                        "compiled and cached query plan"
                    );
                    self.after_insert(identity);
                    Ok(plan)
                }
                Err(err) => {
                    drop(guard);
                    tracing::debug!(
                        target: "sqlshape::cache",
                        hash = identity.hash_code(),
                        error = %err,
                        "query plan compilation failed"
                    );
                    self.discard_if_empty(identity, &entry);
                    Err(err)
                }
            };
        }
    }

    /// Insert a plan unless one is already cached; returns the cached plan.
    pub fn insert(&self, identity: &Identity, plan: P) -> Arc<P> {
        if !self.config.enabled {
            return Arc::new(plan);
        }
        loop {
            let entry = self.entry(identity);
            if let Some(existing) = entry.ready() {
                return existing;
            }
            let guard = entry.lock_compile();
            if let Some(existing) = entry.ready() {
                return existing;
            }
            if !self.is_current(identity, &entry) {
                continue;
            }
            let plan = Arc::clone(entry.plan.get_or_init(|| Arc::new(plan)));
            drop(guard);
            self.after_insert(identity);
            return plan;
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached plan.
    pub fn purge(&self) {
        let mut entries = self.write_entries();
        let removed = entries.len();
        entries.clear();
        tracing::debug!(target: "sqlshape::cache", removed, "purged query plan cache");
    }

    /// Drop plans whose primary type or linked result types include `ty`.
    pub fn purge_by_type(&self, ty: TypeHandle) -> usize {
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|identity, _| {
            identity.primary_type() != Some(ty) && !identity.linked_result_types().contains(&ty)
        });
        let removed = before - entries.len();
        tracing::debug!(
            target: "sqlshape::cache",
            ty = ty.name(),
            removed,
            "purged query plans by type"
        );
        removed
    }

    /// Cached queries ordered by hit count (highest first).
    ///
    /// Entries with more than `ignore_hits_above` hits are skipped when a
    /// bound is given.
    pub fn cached_sql(&self, ignore_hits_above: Option<u64>) -> Vec<CachedQuery> {
        let entries = self.read_entries();
        let mut queries: Vec<CachedQuery> = entries
            .iter()
            .filter(|(_, entry)| entry.plan.get().is_some())
            .map(|(identity, entry)| CachedQuery {
                sql: identity.sql().to_string(),
                connection_target: identity.connection_target().map(str::to_string),
                grid_index: identity.grid_index(),
                hits: entry.hits.load(Ordering::Relaxed),
            })
            .filter(|q| ignore_hits_above.is_none_or(|max| q.hits <= max))
            .collect();
        queries.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.sql.cmp(&b.sql)));
        queries
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
            collections: self.collections.load(Ordering::Relaxed),
        }
    }

    /// Remove cold entries now.
    ///
    /// Entries whose hit count is at most `min_hits_to_keep` are dropped.
    /// Entries without a published plan yet are kept.
    pub fn collect(&self) -> usize {
        self.collect_sparing(None)
    }

    fn collect_sparing(&self, spared: Option<&Identity>) -> usize {
        let min_hits = self.config.min_hits_to_keep;
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|identity, entry| {
            spared == Some(identity)
                || entry.plan.get().is_none()
                || entry.hits.load(Ordering::Relaxed) > min_hits
        });
        let removed = before - entries.len();
        drop(entries);
        self.collections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            target: "sqlshape::cache",
            removed,
            min_hits,
            "collected cold query plans"
        );
        removed
    }

    fn existing(&self, identity: &Identity) -> Option<Arc<Entry<P>>> {
        self.read_entries().get(identity).cloned()
    }

    fn entry(&self, identity: &Identity) -> Arc<Entry<P>> {
        // Fast path: entry already present
        if let Some(entry) = self.existing(identity) {
            return entry;
        }
        let mut entries = self.write_entries();
        Arc::clone(
            entries
                .entry(identity.clone())
                .or_insert_with(|| Arc::new(Entry::new())),
        )
    }

    fn is_current(&self, identity: &Identity, entry: &Arc<Entry<P>>) -> bool {
        self.read_entries()
            .get(identity)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }

    fn discard_if_empty(&self, identity: &Identity, entry: &Arc<Entry<P>>) {
        let mut entries = self.write_entries();
        let same_entry = entries
            .get(identity)
            .is_some_and(|current| Arc::ptr_eq(current, entry));
        if same_entry && entry.plan.get().is_none() && !entry.is_compiling() {
            entries.remove(identity);
        }
    }

    /// Counts an insertion and runs a collection pass when one is due. The
    /// entry just published is never collected by the pass it triggers.
    fn after_insert(&self, inserted: &Identity) {
        let every = self.config.collect_every;
        if every == 0 {
            return;
        }
        let count = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if count % every == 0 {
            self.collect_sparing(Some(inserted));
        }
    }

    fn record_hit(&self, entry: &Entry<P>, identity: &Identity) {
        entry.hits.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: "sqlshape::cache", hash = identity.hash_code(), "plan cache hit");
    }

    fn record_miss(&self, identity: &Identity) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: "sqlshape::cache", hash = identity.hash_code(), "plan cache miss");
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<Identity, Arc<Entry<P>>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<Identity, Arc<Entry<P>>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> std::fmt::Debug for PlanCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlshape_core::reflect_record;
    use sqlshape_core::types::MemberInfo;
    use sqlshape_core::{CommandKind, Error};

    struct Invoice;
    struct LineItem;

    reflect_record!(LineItem, "LineItem", [
        MemberInfo::field("sku", TypeHandle::of::<String>),
    ]);
    reflect_record!(Invoice, "Invoice", [
        MemberInfo::field("number", TypeHandle::of::<i64>),
        MemberInfo::field("lines", TypeHandle::of::<Vec<LineItem>>),
    ]);

    fn identity(sql: &str) -> Identity {
        Identity::builder(sql)
            .command_kind(CommandKind::Text)
            .connection_target("Server=test")
            .build(TypeHandle::of::<i64>())
            .unwrap()
    }

    #[test]
    fn test_compile_once_then_hit() {
        let cache: PlanCache<String> = PlanCache::new();
        let id = identity("select 1");
        let mut compiled = 0;
        for _ in 0..3 {
            let plan = cache
                .get_or_compile(&id, |_| {
                    compiled += 1;
                    Ok("plan".to_string())
                })
                .unwrap();
            assert_eq!(*plan, "plan");
        }
        assert_eq!(compiled, 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_equal_identities_share_plan() {
        let cache: PlanCache<u32> = PlanCache::new();
        let a = identity("select 1");
        let b = Identity::builder("select 1")
            .command_kind(CommandKind::Text)
            .connection_target("SERVER=TEST")
            .build(TypeHandle::of::<String>())
            .unwrap();
        cache.insert(&a, 7);
        assert_eq!(cache.get(&b).as_deref(), Some(&7));
    }

    #[test]
    fn test_compile_error_not_cached() {
        let cache: PlanCache<String> = PlanCache::new();
        let id = identity("select broken");
        let err = cache
            .get_or_compile(&id, |id| Err(Error::compile("bad column", id.sql())))
            .unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
        assert!(cache.is_empty());

        let plan = cache
            .get_or_compile(&id, |_| Ok("fixed".to_string()))
            .unwrap();
        assert_eq!(*plan, "fixed");
    }

    #[test]
    fn test_insert_if_absent() {
        let cache: PlanCache<&'static str> = PlanCache::new();
        let id = identity("select 2");
        let first = cache.insert(&id, "first");
        let second = cache.insert(&id, "second");
        assert_eq!(*first, "first");
        assert_eq!(*second, "first");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_miss_records_stat() {
        let cache: PlanCache<String> = PlanCache::new();
        assert!(cache.get(&identity("select 3")).is_none());
        assert_eq!(cache.stats().misses, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_always_compiles() {
        let cache: PlanCache<String> = PlanCache::with_config(PlanCacheConfig::new().enabled(false));
        let id = identity("select 4");
        let mut compiled = 0;
        for _ in 0..2 {
            cache
                .get_or_compile(&id, |_| {
                    compiled += 1;
                    Ok(String::new())
                })
                .unwrap();
        }
        assert_eq!(compiled, 2);
        assert!(cache.get(&id).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_purge() {
        let cache: PlanCache<u8> = PlanCache::new();
        cache.insert(&identity("a"), 1);
        cache.insert(&identity("b"), 2);
        cache.purge();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_by_type_uses_linked_types() {
        let cache: PlanCache<u8> = PlanCache::new();
        let invoice = Identity::builder("select * from invoices")
            .primary_type(TypeHandle::of::<Invoice>())
            .build(TypeHandle::of::<Invoice>())
            .unwrap();
        let plain = identity("select 1");
        cache.insert(&invoice, 1);
        cache.insert(&plain, 2);

        assert_eq!(cache.purge_by_type(TypeHandle::of::<LineItem>()), 1);
        assert!(cache.get(&invoice).is_none());
        assert!(cache.get(&plain).is_some());
    }

    #[test]
    fn test_cached_sql_ordering_and_filter() {
        let cache: PlanCache<u8> = PlanCache::new();
        let hot = identity("select hot");
        let cold = identity("select cold");
        cache.insert(&hot, 1);
        cache.insert(&cold, 2);
        for _ in 0..3 {
            cache.get(&hot);
        }

        let all = cache.cached_sql(None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sql, "select hot");
        assert_eq!(all[0].hits, 3);
        assert_eq!(all[0].connection_target.as_deref(), Some("Server=test"));

        let cool = cache.cached_sql(Some(1));
        assert_eq!(cool.len(), 1);
        assert_eq!(cool[0].sql, "select cold");
    }

    #[test]
    fn test_periodic_collection_drops_cold_entries() {
        let cache: PlanCache<u8> =
            PlanCache::with_config(PlanCacheConfig::new().collect_every(3).min_hits_to_keep(0));
        let warm = identity("warm");
        cache.insert(&warm, 0);
        cache.get(&warm);
        cache.insert(&identity("cold"), 1);
        assert_eq!(cache.len(), 2);

        let fresh = identity("fresh");
        cache.insert(&fresh, 2);
        let stats = cache.stats();
        assert_eq!(stats.collections, 1);
        assert_eq!(stats.size, 2);
        assert!(cache.get(&warm).is_some());
        assert!(cache.get(&fresh).is_some());
        assert!(cache.get(&identity("cold")).is_none());
    }

    #[test]
    fn test_collection_keeps_the_entry_that_triggered_it() {
        let cache: PlanCache<u8> = PlanCache::with_config(PlanCacheConfig::new().collect_every(1));
        let id = identity("select 5");
        let plan = cache.insert(&id, 1);
        assert_eq!(*plan, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&id).as_deref(), Some(&1));

        let other = identity("select 6");
        let mut compiled = 0;
        for _ in 0..3 {
            cache
                .get_or_compile(&other, |_| {
                    compiled += 1;
                    Ok(2)
                })
                .unwrap();
        }
        assert_eq!(compiled, 1);
        assert!(cache.stats().collections >= 2);
    }

    #[test]
    fn test_panicking_compile_does_not_hide_later_plan() {
        let cache: PlanCache<u32> =
            PlanCache::with_config(PlanCacheConfig::new().collect_every(0).min_hits_to_keep(5));
        let id = identity("select panicky");

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_compile(&id, |_| -> Result<u32> { panic!("compiler crashed") })
        }));
        assert!(outcome.is_err());
        assert!(cache.get(&id).is_none());

        let plan = cache.get_or_compile(&id, |_| Ok(9)).unwrap();
        assert_eq!(*plan, 9);
        assert_eq!(cache.get(&id).as_deref(), Some(&9));
        assert_eq!(cache.cached_sql(None).len(), 1);

        assert_eq!(cache.collect(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_collection_disabled() {
        let cache: PlanCache<u8> = PlanCache::with_config(PlanCacheConfig::new().collect_every(0));
        for i in 0..5 {
            cache.insert(&identity(&format!("select {i}")), 0);
        }
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.stats().collections, 0);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CacheStats {
            hits: 1,
            misses: 2,
            size: 3,
            collections: 0,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["misses"], 2);
    }
}
