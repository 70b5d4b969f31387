//! Reactive bridge over single keys of the local store.
//!
//! [`StoreBridge`] plays the part of one execution context ("tab") sharing a
//! [`LocalStore`] with others. It offers typed, reference-stable reads of
//! JSON-encoded values, silent-degrade writes, and a two-channel change
//! notification scheme:
//!
//! * **cross-instance**: after a committed write, the store's watcher
//!   registry notifies every *other* bridge attached to the same store;
//! * **same-instance**: the writing bridge then dispatches to its own
//!   subscribers, since the cross-instance channel never fires in the
//!   originating context.
//!
//! The two channels are deliberately kept separate; collapsing them would
//! either double-notify remote bridges or starve local ones.
//!
//! Reference stability: two reads of the same key return the identical
//! `Arc` as long as the underlying serialized content is unchanged, even
//! though each read goes back to the store. Consumers that skip work by
//! pointer comparison can rely on this.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::local_store::LocalStore;

static NEXT_BRIDGE_ID: AtomicU64 = AtomicU64::new(1);

/// Locks a mutex, recovering the data from a poisoned lock instead of
/// propagating the panic of an unrelated consumer.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Compile-time association of a store key with exactly one value type.
///
/// ```rust
/// use user_directory_core::store_bridge::PersistedKey;
///
/// const COUNTER: PersistedKey<u64> = PersistedKey::new("demo.counter");
/// assert_eq!(COUNTER.name(), "demo.counter");
/// ```
pub struct PersistedKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> PersistedKey<T> {
    pub const fn new(name: &'static str) -> PersistedKey<T> {
        PersistedKey {
            name,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Which channel delivered a [`ChangeNotice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Dispatched by the bridge that performed the write.
    SameContext,
    /// Relayed through the shared store from another bridge.
    CrossContext,
}

/// Notification that a key (or the whole store, `key = None`) changed and
/// dependents should re-read.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub key: Option<String>,
    pub origin: ChangeOrigin,
}

impl ChangeNotice {
    /// True when this notice is relevant for a subscriber of `key`: an exact
    /// key match, or the whole-store-cleared convention.
    pub fn concerns(&self, key: &str) -> bool {
        match &self.key {
            Some(changed) => changed == key,
            None => true,
        }
    }
}

struct Snapshot {
    raw: String,
    value: Arc<dyn Any + Send + Sync>,
}

type SubscriberFn = Arc<dyn Fn(&ChangeNotice) + Send + Sync>;

struct SubscriberEntry {
    id: u64,
    key: &'static str,
    callback: SubscriberFn,
}

struct BridgeShared {
    id: u64,
    store: Option<Arc<LocalStore>>,
    cache: Mutex<HashMap<&'static str, Snapshot>>,
    subscribers: Mutex<Vec<SubscriberEntry>>,
    next_subscriber: AtomicU64,
}

fn dispatch(shared: &BridgeShared, notice: &ChangeNotice) {
    // Callbacks run outside the registry lock so they can subscribe or
    // unsubscribe without deadlocking.
    let targets: Vec<SubscriberFn> = lock(&shared.subscribers)
        .iter()
        .filter(|subscriber| notice.concerns(subscriber.key))
        .map(|subscriber| subscriber.callback.clone())
        .collect();

    for callback in targets {
        callback(notice);
    }
}

/// One consumer context over a shared [`LocalStore`].
pub struct StoreBridge {
    shared: Arc<BridgeShared>,
}

impl StoreBridge {
    /// Opens `<name>.redb` and attaches to it. When the store cannot be
    /// opened the bridge comes up detached: reads yield defaults, writes
    /// no-op, and nothing is surfaced to the caller.
    pub fn open(name: &str) -> StoreBridge {
        match LocalStore::open(name) {
            Ok(store) => StoreBridge::attach(Arc::new(store)),
            Err(e) => {
                warn!("Local store '{name}' unavailable ({e}); continuing detached with defaults");
                StoreBridge::detached()
            }
        }
    }

    /// Attaches a new bridge to an already-open store. Several bridges over
    /// one store model several tabs over one storage area.
    pub fn attach(store: Arc<LocalStore>) -> StoreBridge {
        let shared = Arc::new(BridgeShared {
            id: NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed),
            store: Some(store.clone()),
            cache: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber: AtomicU64::new(1),
        });

        let weak: Weak<BridgeShared> = Arc::downgrade(&shared);
        store.register_watcher(
            shared.id,
            Arc::new(move |notice| {
                if let Some(shared) = weak.upgrade() {
                    dispatch(&shared, notice);
                }
            }),
        );

        StoreBridge { shared }
    }

    /// A bridge with no store at all, for environments where persistent
    /// storage does not exist. Reads stay reference-stable against repeated
    /// calls with the same default.
    pub fn detached() -> StoreBridge {
        StoreBridge {
            shared: Arc::new(BridgeShared {
                id: NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed),
                store: None,
                cache: Mutex::new(HashMap::new()),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.store.is_some()
    }

    /// The shared store, when attached.
    pub fn store(&self) -> Option<&Arc<LocalStore>> {
        self.shared.store.as_ref()
    }

    /// Current value for `key`.
    ///
    /// Absent key, unavailable store and malformed JSON all fall back to
    /// `default` without surfacing an error. As long as the serialized
    /// content is unchanged between calls, the returned `Arc` is
    /// pointer-identical to the previous one.
    pub fn read<T>(&self, key: &PersistedKey<T>, default: &T) -> Arc<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        match self.load_raw(key.name) {
            Some(raw) => {
                {
                    let cache = lock(&self.shared.cache);
                    if let Some(snapshot) = cache.get(key.name) {
                        if snapshot.raw == raw {
                            if let Ok(value) = snapshot.value.clone().downcast::<T>() {
                                return value;
                            }
                        }
                    }
                }
                match serde_json::from_str::<T>(&raw) {
                    Ok(parsed) => self.cache_snapshot(key.name, raw, parsed),
                    Err(e) => {
                        warn!(
                            "Malformed value under '{}' ({e}); falling back to default",
                            key.name
                        );
                        self.default_snapshot(key.name, default)
                    }
                }
            }
            None => self.default_snapshot(key.name, default),
        }
    }

    /// Serializes `value`, commits it under `key`, then notifies the other
    /// bridges (cross-instance channel) and this bridge's own subscribers
    /// (same-instance channel), strictly in that order relative to the
    /// commit. On any failure the write is dropped silently: the cached
    /// value is not updated and the next read reflects whatever the store
    /// actually holds.
    pub fn write<T>(&self, key: &PersistedKey<T>, value: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        let raw = match serde_json::to_string(&value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not serialize value for '{}' ({e}); write dropped", key.name);
                return;
            }
        };

        let Some(store) = self.shared.store.as_ref() else {
            warn!("Store detached; write to '{}' dropped", key.name);
            return;
        };

        if let Err(e) = store.put_raw(key.name, &raw) {
            warn!("Write to '{}' failed ({e}); cached value left untouched", key.name);
            return;
        }

        lock(&self.shared.cache).insert(
            key.name,
            Snapshot {
                raw,
                value: Arc::new(value),
            },
        );

        store.broadcast(self.shared.id, Some(key.name));
        dispatch(
            &self.shared,
            &ChangeNotice {
                key: Some(key.name.to_string()),
                origin: ChangeOrigin::SameContext,
            },
        );
    }

    /// Read-modify-write: applies `f` to the current value (or `default`)
    /// and writes the result back. Not atomic against writes from other
    /// bridges; the last committed write wins.
    pub fn update<T>(&self, key: &PersistedKey<T>, default: &T, f: impl FnOnce(&T) -> T)
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let current = self.read(key, default);
        let next = f(&current);
        self.write(key, next);
    }

    /// Clears the whole store and notifies both channels with `key = None`.
    pub fn clear_all(&self) {
        let Some(store) = self.shared.store.as_ref() else {
            warn!("Store detached; clear dropped");
            return;
        };

        match store.clear_all() {
            Ok(removed) => {
                lock(&self.shared.cache).clear();
                info!("Cleared {removed} persisted entries");
                store.broadcast(self.shared.id, None);
                dispatch(
                    &self.shared,
                    &ChangeNotice {
                        key: None,
                        origin: ChangeOrigin::SameContext,
                    },
                );
            }
            Err(e) => warn!("Clear failed ({e}); keeping current state"),
        }
    }

    /// Registers `callback` for changes to `key`. Notices for other keys are
    /// filtered out; a whole-store notice (`key = None`) is always delivered.
    /// Dropping the returned [`Subscription`] unregisters the callback.
    pub fn subscribe<T>(
        &self,
        key: &PersistedKey<T>,
        callback: impl Fn(&ChangeNotice) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.subscribers).push(SubscriberEntry {
            id,
            key: key.name,
            callback: Arc::new(callback),
        });
        Subscription {
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    fn load_raw(&self, name: &str) -> Option<String> {
        let store = self.shared.store.as_ref()?;
        match store.get_raw(name) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Read of '{name}' failed ({e}); falling back to default");
                None
            }
        }
    }

    fn cache_snapshot<T>(&self, name: &'static str, raw: String, parsed: T) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let value = Arc::new(parsed);
        lock(&self.shared.cache).insert(
            name,
            Snapshot {
                raw,
                value: value.clone(),
            },
        );
        value
    }

    fn default_snapshot<T>(&self, name: &'static str, default: &T) -> Arc<T>
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        let raw = match serde_json::to_string(default) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not serialize default for '{name}': {e}");
                return Arc::new(default.clone());
            }
        };

        {
            let cache = lock(&self.shared.cache);
            if let Some(snapshot) = cache.get(name) {
                if snapshot.raw == raw {
                    if let Ok(value) = snapshot.value.clone().downcast::<T>() {
                        return value;
                    }
                }
            }
        }

        self.cache_snapshot(name, raw, default.clone())
    }
}

impl Drop for StoreBridge {
    fn drop(&mut self) {
        if let Some(store) = self.shared.store.as_ref() {
            store.unregister_watcher(self.shared.id);
        }
    }
}

/// Handle to a registered subscriber; dropping it releases the callback so
/// no further notifications are delivered.
pub struct Subscription {
    shared: Weak<BridgeShared>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.subscribers).retain(|subscriber| subscriber.id != self.id);
        }
    }
}
