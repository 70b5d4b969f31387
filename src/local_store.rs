//! Persistent string-keyed, string-valued store backed by redb.
//!
//! [`LocalStore`] is the shared mutable resource every consumer in the
//! process sees: one redb file, one `kv` table, raw JSON strings as values.
//! It also carries the cross-instance watcher registry, the analogue of the
//! platform storage-change event: after a committed write the originating
//! bridge broadcasts to every *other* registered bridge, never to itself
//! (same-instance consumers are reached by the bridge's own channel).
//!
//! Read-modify-write cycles are not atomic across instances; the last
//! committed write wins. The underlying store offers no transactional
//! primitive spanning consumers, so this is accepted behavior.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use log::{info, warn};
use redb::{Database, ReadableTable, TableDefinition, TableError};

use crate::app_response::StoreError;
use crate::store_bridge::{lock, ChangeNotice, ChangeOrigin};

const KV_TABLE: TableDefinition<&str, &str> = TableDefinition::new("kv");

pub(crate) type WatcherFn = Arc<dyn Fn(&ChangeNotice) + Send + Sync>;

struct StoreWatcher {
    bridge_id: u64,
    notify: WatcherFn,
}

struct StoreInner {
    /// `None` once the store has been closed; every operation then fails
    /// with [`StoreError::Unavailable`].
    db: Option<Database>,
    path: PathBuf,
}

/// A single persistent key-value store shared by all bridges in the process.
pub struct LocalStore {
    inner: Mutex<StoreInner>,
    watchers: Mutex<Vec<StoreWatcher>>,
}

impl LocalStore {
    /// Opens (or creates) the store file `<name>.redb` and makes sure the
    /// backing table exists so first reads see an empty store rather than a
    /// missing-table error.
    pub fn open(name: &str) -> Result<LocalStore, StoreError> {
        let path = PathBuf::from(format!("{name}.redb"));
        info!("Opening local store at {}", path.display());

        let db = Database::create(&path)?;
        Self::ensure_table(&db)?;

        Ok(LocalStore {
            inner: Mutex::new(StoreInner { db: Some(db), path }),
            watchers: Mutex::new(Vec::new()),
        })
    }

    fn ensure_table(db: &Database) -> Result<(), StoreError> {
        let write_txn = db.begin_write()?;
        {
            let _table = write_txn.open_table(KV_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Raw string read for `key`; `Ok(None)` when the key is absent.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let inner = lock(&self.inner);
        let db = Self::require_db(&inner)?;

        let read_txn = db.begin_read()?;
        let table = match read_txn.open_table(KV_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(table.get(key)?.map(|guard| guard.value().to_string()))
    }

    /// Raw string write for `key`. The transaction is fully committed before
    /// this returns, so a notification dispatched afterwards always observes
    /// the new value.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let inner = lock(&self.inner);
        let db = Self::require_db(&inner)?;

        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let inner = lock(&self.inner);
        let db = Self::require_db(&inner)?;

        let write_txn = db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(KV_TABLE)?;
            let was_present = table.remove(key)?.is_some();
            was_present
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Removes every key, returning how many were cleared.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let inner = lock(&self.inner);
        let db = Self::require_db(&inner)?;

        let write_txn = db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(KV_TABLE)?;
            let keys: Vec<String> = table
                .iter()?
                .map(|entry| entry.map(|(key, _)| key.value().to_string()))
                .collect::<Result<Vec<_>, redb::StorageError>>()?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
            keys.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Closes the current file, deletes it, and reopens a clean store under
    /// `<name>.redb`.
    pub fn reset(&self, name: &str) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);

        let old_path = inner.path.clone();
        inner.db = None;
        if old_path.exists() {
            if let Err(e) = fs::remove_file(&old_path) {
                warn!("Could not remove old store file {}: {e}", old_path.display());
            }
        }

        let new_path = PathBuf::from(format!("{name}.redb"));
        if new_path.exists() {
            if let Err(e) = fs::remove_file(&new_path) {
                warn!("Could not remove stale store file {}: {e}", new_path.display());
            }
        }

        let db = Database::create(&new_path)?;
        Self::ensure_table(&db)?;
        inner.db = Some(db);
        inner.path = new_path;

        info!("Store reset to {}", inner.path.display());
        Ok(())
    }

    /// Releases the underlying database. Later reads and writes fail with
    /// [`StoreError::Unavailable`], which bridges treat as "degrade to
    /// defaults".
    pub fn close(&self) {
        let mut inner = lock(&self.inner);
        inner.db = None;
        info!("Store at {} closed", inner.path.display());
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner).db.is_some()
    }

    fn require_db<'a>(inner: &'a StoreInner) -> Result<&'a Database, StoreError> {
        inner
            .db
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("store is closed".to_string()))
    }

    pub(crate) fn register_watcher(&self, bridge_id: u64, notify: WatcherFn) {
        lock(&self.watchers).push(StoreWatcher { bridge_id, notify });
    }

    pub(crate) fn unregister_watcher(&self, bridge_id: u64) {
        lock(&self.watchers).retain(|watcher| watcher.bridge_id != bridge_id);
    }

    /// Delivers a change notice to every bridge except the originating one.
    /// `key = None` is the "entire store cleared" convention.
    pub(crate) fn broadcast(&self, origin: u64, key: Option<&str>) {
        let notice = ChangeNotice {
            key: key.map(str::to_string),
            origin: ChangeOrigin::CrossContext,
        };

        // Clone the callbacks out so a subscriber reacting to the notice can
        // register or drop subscriptions without deadlocking on the registry.
        let targets: Vec<WatcherFn> = lock(&self.watchers)
            .iter()
            .filter(|watcher| watcher.bridge_id != origin)
            .map(|watcher| watcher.notify.clone())
            .collect();

        for notify in targets {
            notify(&notice);
        }
    }
}
