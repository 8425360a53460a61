//! Concurrent Cache Module
//!
//! Main cache engine: a table lock guarding membership, one lock per entry
//! guarding its value, FIFO eviction and a background sync thread.

use std::collections::hash_map::{Entry as MapEntry, RandomState};
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::cache::{CacheEntry, CacheStats, EntryRef, LifetimeTracker};
use crate::cache::stats::StatsCounters;
use crate::config::Config;
use crate::error::{CacheError, LockStage, Result};
use crate::store::PersistentStore;
use crate::tasks::SyncTask;

// == Table ==
/// Structural state, only ever touched under the table lock.
///
/// Invariant: `entries`, `lifetime` and `current_size` describe the same set
/// of entries.
struct Table<K, V, S> {
    entries: HashMap<K, EntryRef<K, V>, S>,
    lifetime: LifetimeTracker<EntryRef<K, V>>,
    current_size: u64,
}

impl<K, V, S> Table<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    fn with_hasher(hasher: S) -> Self {
        Self {
            entries: HashMap::with_hasher(hasher),
            lifetime: LifetimeTracker::new(),
            current_size: 0,
        }
    }

    // == Evict Oldest ==
    /// Removes the entry that was inserted first.
    fn evict_oldest(&mut self) -> Result<()> {
        let oldest = self.lifetime.pop_oldest()?;

        match self.entries.remove(&oldest.key) {
            Some(removed) if Arc::ptr_eq(&removed, &oldest) => {}
            Some(removed) => {
                self.entries.insert(removed.key.clone(), removed);
                return Err(CacheError::InternalConsistency(
                    "Record in lifetime tracker points to a replaced table entry".to_string(),
                ));
            }
            None => {
                return Err(CacheError::InternalConsistency(
                    "Record in lifetime tracker has no matching table entry".to_string(),
                ));
            }
        }

        self.current_size -= 1;
        Ok(())
    }

    // == Insert Tracked ==
    /// Adds a new entry to both the table and the lifetime tracker, or to neither.
    fn insert_tracked(&mut self, entry: EntryRef<K, V>) -> Result<EntryRef<K, V>> {
        let pending = PendingInsert::begin(&mut self.entries, entry)?;
        let entry = pending.commit(&mut self.lifetime)?;
        self.current_size += 1;
        Ok(entry)
    }
}

// == Pending Insert ==
/// A table insertion that is rolled back unless the tracker records it too.
struct PendingInsert<'a, K, V, S> {
    entries: &'a mut HashMap<K, EntryRef<K, V>, S>,
    entry: EntryRef<K, V>,
}

impl<'a, K, V, S> PendingInsert<'a, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    fn begin(entries: &'a mut HashMap<K, EntryRef<K, V>, S>, entry: EntryRef<K, V>) -> Result<Self> {
        match entries.entry(entry.key.clone()) {
            MapEntry::Occupied(_) => {
                return Err(CacheError::InternalConsistency(
                    "Error inserting record in table: key already present".to_string(),
                ));
            }
            MapEntry::Vacant(slot) => {
                slot.insert(Arc::clone(&entry));
            }
        }
        Ok(Self { entries, entry })
    }

    fn commit(self, lifetime: &mut LifetimeTracker<EntryRef<K, V>>) -> Result<EntryRef<K, V>> {
        if let Err(err) = lifetime.add(Arc::clone(&self.entry)) {
            // Undo so the table never holds an entry the tracker does not know about
            self.entries.remove(&self.entry.key);
            return Err(err);
        }
        Ok(self.entry)
    }
}

// == Shared ==
/// State shared between the cache handle and its sync thread.
struct Shared<K, V, S> {
    table: RwLock<Table<K, V, S>>,
    store: Arc<dyn PersistentStore<K, V>>,
    stats: StatsCounters,
    max_size: u64,
    lock_timeout: Duration,
}

impl<K, V, S> Shared<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn timed_out(&self, stage: LockStage) -> CacheError {
        self.stats.record_lock_timeout();
        debug!("Timed out after {:?} waiting for {}", self.lock_timeout, stage);
        CacheError::LockTimeout { stage }
    }

    // == Access ==
    /// Runs `op` on the value stored for `key`, loading it first on a miss.
    fn access<R>(&self, key: &K, op: impl FnOnce(&mut V) -> R) -> Result<R> {
        let table = self
            .table
            .try_read_for(self.lock_timeout)
            .ok_or_else(|| self.timed_out(LockStage::SharedTable))?;

        if let Some(entry) = table.entries.get(key) {
            let mut value = entry
                .value
                .try_lock_for(self.lock_timeout)
                .ok_or_else(|| self.timed_out(LockStage::Entry))?;
            self.stats.record_hit();
            return Ok(op(&mut *value));
        }
        drop(table);

        let mut table = self
            .table
            .try_write_for(self.lock_timeout)
            .ok_or_else(|| self.timed_out(LockStage::ExclusiveTable))?;

        // Another thread may have loaded the key while the table was unlocked
        let entry = match table.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Arc::clone(entry)
            }
            None => self.load(&mut table, key)?,
        };

        // Uncontended: every other holder of an entry lock also holds the table lock
        let mut value = entry.value.lock();
        Ok(op(&mut *value))
    }

    // == Load ==
    /// Loads `key` from the store into a new entry, evicting first when full.
    fn load(&self, table: &mut Table<K, V, S>, key: &K) -> Result<EntryRef<K, V>> {
        if table.current_size >= self.max_size {
            table.evict_oldest()?;
            self.stats.record_eviction();
            trace!("Evicted oldest entry, size is now {}", table.current_size);
        }

        let value = self.store.find(key)?;
        let entry = table.insert_tracked(CacheEntry::new_ref(key.clone(), value))?;
        self.stats.record_miss();
        Ok(entry)
    }

    // == Write Entries ==
    /// Writes every entry to the store, oldest first.
    ///
    /// A failing entry does not stop the pass; the first error is returned
    /// after all other entries were written. With `entry_timeout` set, an entry
    /// lock that cannot be taken in time ends the pass with `LockTimeout`.
    fn write_entries(
        &self,
        table: &Table<K, V, S>,
        entry_timeout: Option<Duration>,
    ) -> Result<usize> {
        let mut first_error = None;
        let mut written = 0;

        for entry in table.lifetime.iter() {
            let value = match entry_timeout {
                Some(timeout) => entry
                    .value
                    .try_lock_for(timeout)
                    .ok_or_else(|| self.timed_out(LockStage::Entry))?,
                None => entry.value.lock(),
            };
            match self.store.update(&entry.key, &value) {
                Ok(()) => written += 1,
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(written),
        }
    }

    /// Flushes the store after a pass; called with the table unlocked.
    fn finish_sync(&self, written: Result<usize>) -> Result<usize> {
        let flushed = self.store.flush();
        let written = written?;
        flushed?;

        self.stats.record_sync_cycle();
        Ok(written)
    }

    /// One background cycle; waits for the table and entries as long as it takes.
    fn background_cycle(&self) -> Result<usize> {
        let written = {
            let table = self.table.read();
            self.write_entries(&table, None)
        };
        self.finish_sync(written)
    }
}

// == Concurrent Cache ==
/// A size-bounded concurrent cache in front of a [`PersistentStore`].
///
/// Lookups on different keys proceed in parallel: the table lock is only
/// taken exclusively to insert or evict. Every foreground lock acquisition
/// gives up after the configured timeout with [`CacheError::LockTimeout`].
///
/// Entries are evicted in strict insertion order. Reading or overwriting an
/// existing entry never changes its position.
///
/// A background thread writes all entries to the store once per sync period.
/// Dropping the cache stops that thread after one final sync.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use concurrent_cache::{ConcurrentCache, MemoryStore};
///
/// let store = Arc::new(MemoryStore::<String, String>::new());
/// let cache: ConcurrentCache<String, String> = ConcurrentCache::new(
///     100,
///     Duration::from_secs(1),
///     Duration::from_millis(100),
///     store,
/// )?;
///
/// cache.update(&"Petrov".to_string(), "Eugen".to_string())?;
/// assert_eq!(cache.find(&"Petrov".to_string())?, "Eugen");
/// # Ok::<(), concurrent_cache::error::CacheError>(())
/// ```
pub struct ConcurrentCache<K, V, S = RandomState> {
    sync_task: SyncTask,
    shared: Arc<Shared<K, V, S>>,
}

impl<K, V> ConcurrentCache<K, V, RandomState>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Creates a cache and starts its sync thread.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries, must be > 0
    /// * `sync_period` - Interval between sync cycles, must be > 0
    /// * `lock_timeout` - Maximum wait for any foreground lock
    /// * `store` - Backing store for misses and sync
    pub fn new(
        max_size: u64,
        sync_period: Duration,
        lock_timeout: Duration,
        store: Arc<dyn PersistentStore<K, V>>,
    ) -> Result<Self> {
        Self::with_hasher(max_size, sync_period, lock_timeout, store, RandomState::new())
    }

    /// Creates a cache from server configuration.
    pub fn from_config(config: &Config, store: Arc<dyn PersistentStore<K, V>>) -> Result<Self> {
        Self::new(
            config.max_entries,
            config.sync_period(),
            config.lock_timeout(),
            store,
        )
    }
}

impl<K, V, S> ConcurrentCache<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
    S: BuildHasher + Send + Sync + 'static,
{
    /// Creates a cache that hashes keys with `hasher`.
    pub fn with_hasher(
        max_size: u64,
        sync_period: Duration,
        lock_timeout: Duration,
        store: Arc<dyn PersistentStore<K, V>>,
        hasher: S,
    ) -> Result<Self> {
        if max_size == 0 {
            return Err(CacheError::InvalidArgument(
                "Zero max cache size".to_string(),
            ));
        }
        if sync_period.is_zero() {
            return Err(CacheError::InvalidArgument(
                "Zero sync period".to_string(),
            ));
        }

        let shared = Arc::new(Shared {
            table: RwLock::new(Table::with_hasher(hasher)),
            store,
            stats: StatsCounters::default(),
            max_size,
            lock_timeout,
        });

        let task_shared = Arc::clone(&shared);
        let sync_task = SyncTask::spawn(sync_period, move || task_shared.background_cycle())?;

        debug!(
            "Cache created: max_size={}, sync_period={:?}, lock_timeout={:?}",
            max_size, sync_period, lock_timeout
        );

        Ok(Self { sync_task, shared })
    }

    // == Find ==
    /// Returns the value for `key`, loading it from the store on a miss.
    ///
    /// A key the store does not know yields the value type's default and
    /// still occupies a slot in the cache.
    pub fn find(&self, key: &K) -> Result<V> {
        self.shared.access(key, |value| value.clone())
    }

    // == Update ==
    /// Sets the value for `key`, inserting a new entry on a miss.
    pub fn update(&self, key: &K, value: V) -> Result<()> {
        self.shared.access(key, move |slot| *slot = value)
    }

    // == Size ==
    /// Returns the number of live entries.
    pub fn size(&self) -> Result<u64> {
        let table = self
            .shared
            .table
            .try_read_for(self.shared.lock_timeout)
            .ok_or_else(|| self.shared.timed_out(LockStage::SharedTable))?;
        Ok(table.current_size)
    }

    /// Returns the capacity bound.
    pub fn max_size(&self) -> u64 {
        self.shared.max_size
    }

    pub fn lock_timeout(&self) -> Duration {
        self.shared.lock_timeout
    }

    /// Returns the cached keys, oldest (next to be evicted) first.
    pub fn keys(&self) -> Result<Vec<K>> {
        let table = self
            .shared
            .table
            .try_read_for(self.shared.lock_timeout)
            .ok_or_else(|| self.shared.timed_out(LockStage::SharedTable))?;
        Ok(table.lifetime.iter().map(|entry| entry.key.clone()).collect())
    }

    // == Sync Now ==
    /// Runs one sync pass on the calling thread.
    ///
    /// Every lock wait is bounded by the lock timeout. Returns the number of
    /// entries written to the store.
    pub fn sync_now(&self) -> Result<usize> {
        let table = self
            .shared
            .table
            .try_read_for(self.shared.lock_timeout)
            .ok_or_else(|| self.shared.timed_out(LockStage::SharedTable))?;
        let written = self
            .shared
            .write_entries(&table, Some(self.shared.lock_timeout));
        drop(table);

        self.shared.finish_sync(written)
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> Result<CacheStats> {
        let size = self.size()?;
        Ok(self.shared.stats.snapshot(size, self.shared.max_size))
    }
}

impl<K, V, S> Drop for ConcurrentCache<K, V, S> {
    fn drop(&mut self) {
        self.sync_task.shutdown();
    }
}
