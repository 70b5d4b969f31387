//! Dashboard state controller.
//!
//! Composes the store bridge with the single persisted key
//! [`DASHBOARD_STATE_KEY`] and exposes the mutators the UI tree calls. The
//! controller is constructed explicitly and passed to whoever needs it; there
//! is no ambient singleton, which keeps the bridge testable in isolation.

use std::sync::Arc;

use crate::filter::filter_users;
use crate::store_bridge::{ChangeNotice, PersistedKey, StoreBridge, Subscription};
use crate::user_model::{DashboardState, PermissionLevel, User};

/// The one store key holding the persisted dashboard state blob.
pub const DASHBOARD_STATE_KEY: PersistedKey<DashboardState> =
    PersistedKey::new("dashboard.state");

pub struct DashboardController {
    bridge: StoreBridge,
}

impl DashboardController {
    pub fn new(bridge: StoreBridge) -> DashboardController {
        DashboardController { bridge }
    }

    /// Opens (or degrades over) the store `<name>.redb` and wraps it.
    pub fn open(name: &str) -> DashboardController {
        DashboardController::new(StoreBridge::open(name))
    }

    pub fn bridge(&self) -> &StoreBridge {
        &self.bridge
    }

    /// Live dashboard state; defaults when nothing was ever persisted.
    /// Reference-stable across calls while the persisted blob is unchanged.
    pub fn state(&self) -> Arc<DashboardState> {
        self.bridge.read(&DASHBOARD_STATE_KEY, &DashboardState::default())
    }

    /// Replaces the search query, keeping the permission selection.
    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.bridge
            .update(&DASHBOARD_STATE_KEY, &DashboardState::default(), |prev| {
                DashboardState {
                    search_query: query,
                    selected_permissions: prev.selected_permissions.clone(),
                }
            });
    }

    /// Adds `permission` to the selection if absent, removes it otherwise.
    pub fn toggle_permission(&self, permission: PermissionLevel) {
        self.bridge
            .update(&DASHBOARD_STATE_KEY, &DashboardState::default(), |prev| {
                prev.toggled(permission)
            });
    }

    /// Resets query and selection to the defaults.
    pub fn clear_filters(&self) {
        self.bridge.write(&DASHBOARD_STATE_KEY, DashboardState::default());
    }

    /// Applies the current filter state to an injected record sequence.
    pub fn visible_users(&self, records: &[User]) -> Vec<User> {
        let state = self.state();
        filter_users(records, &state.search_query, &state.selected_permissions)
    }

    /// Re-read signal for consumers rendering this controller's state.
    pub fn watch(
        &self,
        callback: impl Fn(&ChangeNotice) + Send + Sync + 'static,
    ) -> Subscription {
        self.bridge.subscribe(&DASHBOARD_STATE_KEY, callback)
    }
}
