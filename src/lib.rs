//! # User Directory Core
//!
//! Embedded local-storage core for a user-directory dashboard, designed for
//! FFI integration with UI shells (Flutter, desktop web views). The crate
//! owns everything below the rendering layer: the persisted filter state,
//! a reference-stable reactive bridge over a redb-backed key-value store,
//! the pure list-filtering predicate, and a fake-async simulator for
//! exercising loading/error states.
//!
//! ## Features
//!
//! - **redb-based storage**: single-file embedded store, pure Rust
//! - **Reference-stable reads**: unchanged persisted content yields the
//!   identical `Arc`, so consumers can skip re-renders by pointer comparison
//! - **Dual-channel change notification**: cross-instance broadcast through
//!   the shared store plus a same-instance subscriber dispatch
//! - **Silent degradation**: a missing, corrupt or closed store falls back
//!   to defaults; no storage error ever reaches the UI
//! - **FFI-optimized**: C-compatible functions with JSON request/response
//!   envelopes, no `unwrap()` on the production paths
//!
//! ## Quick Start
//!
//! ```no_run
//! use user_directory_core::{create_dashboard, set_search_query, dashboard_state};
//! use std::ffi::CString;
//!
//! let name = CString::new("directory_demo").unwrap();
//! let controller = create_dashboard(name.as_ptr());
//!
//! let query = CString::new("george").unwrap();
//! let _updated = set_search_query(controller, query.as_ptr());
//! let _state = dashboard_state(controller);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_dashboard`] - Open the persisted dashboard controller
//! - [`dashboard_state`] - Read the current filter state
//! - [`set_search_query`] - Replace the search query
//! - [`toggle_permission`] - Toggle one permission filter
//! - [`clear_filters`] - Reset query and selection
//! - [`filter_users`] - Apply the filter predicate to a record list
//! - [`default_directory`] - The built-in demo record set
//! - [`clear_dashboard_storage`] - Drop every persisted entry
//! - [`close_dashboard`] - Release the underlying store

pub mod app_response;
pub mod dashboard;
pub mod fetch_sim;
pub mod filter;
pub mod local_store;
pub mod store_bridge;
pub mod user_model;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::str::FromStr;

use log::{info, warn};

use crate::app_response::AppResponse;
use crate::dashboard::DashboardController;
use crate::user_model::{default_users, PermissionLevel, User};

/// Opens the dashboard controller over the store file `<name>.redb`.
///
/// Store unavailability is not an error here: when the file cannot be
/// opened the controller degrades to a detached bridge that serves default
/// state and drops writes, matching the behavior of a storage-less
/// environment.
///
/// # Parameters
///
/// * `name` - Null-terminated C string with the store name (no extension)
///
/// # Returns
///
/// Pointer to a [`DashboardController`], or null when `name` is null or not
/// valid UTF-8. The caller owns the pointer and must release it by passing
/// it back to `Box::from_raw` on its side of the boundary.
///
/// # Safety
///
/// Dereferences the raw `name` pointer; it must point to a valid
/// null-terminated string.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_dashboard(name: *const c_char) -> *mut DashboardController {
    if name.is_null() {
        warn!("Null name pointer passed to create_dashboard");
        return std::ptr::null_mut();
    }

    let name_str = match unsafe { CStr::from_ptr(name).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in name parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    info!("Opening dashboard controller over store '{name_str}'");
    let controller = DashboardController::open(name_str);
    if !controller.bridge().is_attached() {
        warn!("Dashboard controller for '{name_str}' is running detached");
    }

    Box::into_raw(Box::new(controller))
}

/// Reads the current persisted filter state.
///
/// # Returns
///
/// JSON-formatted C string: `Ok` carrying the serialized state, or a
/// `BadRequest` for a null controller. The returned string must be freed by
/// the caller (reclaim it with `CString::from_raw`).
///
/// # Safety
///
/// `state` must be a valid pointer returned by [`create_dashboard`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn dashboard_state(state: *mut DashboardController) -> *const c_char {
    let controller = match unsafe { state.as_ref() } {
        Some(c) => c,
        None => {
            let error = AppResponse::BadRequest("Null state pointer".to_string());
            return response_to_c_string(&error);
        }
    };

    state_response(controller)
}

/// Replaces the search query, keeping the permission selection, and returns
/// the updated state.
///
/// The query is stored raw; normalization (case, whitespace) happens inside
/// the filter predicate at match time.
///
/// # Safety
///
/// Both pointers must be valid.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn set_search_query(
    state: *mut DashboardController,
    query: *const c_char,
) -> *const c_char {
    let controller = match unsafe { state.as_ref() } {
        Some(c) => c,
        None => {
            let error = AppResponse::BadRequest("Null state pointer".to_string());
            return response_to_c_string(&error);
        }
    };

    let query_str = match c_ptr_to_string(query, "query") {
        Ok(s) => s,
        Err(error_ptr) => return error_ptr,
    };

    controller.set_search_query(query_str);
    state_response(controller)
}

/// Toggles one permission filter and returns the updated state.
///
/// # Parameters
///
/// * `level` - Lowercase wire name of the permission (`"admin"`,
///   `"editor"`, `"viewer"`, `"guest"`, `"owner"`, `"inactive"`)
///
/// # Returns
///
/// `Ok` with the updated state, or `ValidationError` when `level` is not a
/// recognized permission name.
///
/// # Safety
///
/// Both pointers must be valid.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn toggle_permission(
    state: *mut DashboardController,
    level: *const c_char,
) -> *const c_char {
    let controller = match unsafe { state.as_ref() } {
        Some(c) => c,
        None => {
            let error = AppResponse::BadRequest("Null state pointer".to_string());
            return response_to_c_string(&error);
        }
    };

    let level_str = match c_ptr_to_string(level, "level") {
        Ok(s) => s,
        Err(error_ptr) => return error_ptr,
    };

    let permission = match PermissionLevel::from_str(&level_str) {
        Ok(p) => p,
        Err(e) => {
            let error = AppResponse::ValidationError(e);
            return response_to_c_string(&error);
        }
    };

    controller.toggle_permission(permission);
    state_response(controller)
}

/// Resets query and permission selection to the defaults and returns the
/// (default) state.
///
/// # Safety
///
/// `state` must be a valid pointer.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_filters(state: *mut DashboardController) -> *const c_char {
    let controller = match unsafe { state.as_ref() } {
        Some(c) => c,
        None => {
            let error = AppResponse::BadRequest("Null state pointer".to_string());
            return response_to_c_string(&error);
        }
    };

    controller.clear_filters();
    state_response(controller)
}

/// Applies the filter predicate to a caller-supplied record list.
///
/// Pure function, no controller involved: the record source is injected and
/// could equally come from a real backend.
///
/// # Parameters
///
/// * `records_json` - JSON array of user records
/// * `query` - Raw search string (may be empty)
/// * `permissions_json` - JSON array of permission names (may be `[]`)
///
/// # Returns
///
/// `Ok` carrying the filtered JSON array in input order, or
/// `SerializationError`/`BadRequest` on malformed input.
///
/// # Safety
///
/// All pointers must be valid null-terminated strings.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn filter_users(
    records_json: *const c_char,
    query: *const c_char,
    permissions_json: *const c_char,
) -> *const c_char {
    let records_str = match c_ptr_to_string(records_json, "records") {
        Ok(s) => s,
        Err(error_ptr) => return error_ptr,
    };
    let query_str = match c_ptr_to_string(query, "query") {
        Ok(s) => s,
        Err(error_ptr) => return error_ptr,
    };
    let permissions_str = match c_ptr_to_string(permissions_json, "permissions") {
        Ok(s) => s,
        Err(error_ptr) => return error_ptr,
    };

    let records: Vec<User> = match serde_json::from_str(&records_str) {
        Ok(r) => r,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid records JSON: {e}"));
            return response_to_c_string(&error);
        }
    };
    let permissions: Vec<PermissionLevel> = match serde_json::from_str(&permissions_str) {
        Ok(p) => p,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid permissions JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    let visible = filter::filter_users(&records, &query_str, &permissions);
    match serde_json::to_string(&visible) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Returns the built-in demo record set as a JSON array.
#[no_mangle]
pub extern "C" fn default_directory() -> *const c_char {
    match serde_json::to_string(&default_users()) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize records: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Drops every persisted entry, reverting readers to default state.
///
/// Subscribers on all bridges over the same store receive a whole-store
/// notice so they re-read.
///
/// # Safety
///
/// `state` must be a valid pointer.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_dashboard_storage(state: *mut DashboardController) -> *const c_char {
    let controller = match unsafe { state.as_ref() } {
        Some(c) => c,
        None => {
            let error = AppResponse::BadRequest("Null state pointer".to_string());
            return response_to_c_string(&error);
        }
    };

    controller.bridge().clear_all();
    response_to_c_string(&AppResponse::success("Dashboard storage cleared"))
}

/// Releases the underlying store explicitly.
///
/// Useful for hot-restart scenarios where the shell wants the file lock
/// gone before reconnecting. The controller keeps working afterwards in
/// degraded mode: reads serve defaults, writes are dropped.
///
/// # Safety
///
/// `state` must be a valid pointer.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_dashboard(state: *mut DashboardController) -> *const c_char {
    let controller = match unsafe { state.as_ref() } {
        Some(c) => c,
        None => {
            let error = AppResponse::BadRequest("Null state pointer".to_string());
            return response_to_c_string(&error);
        }
    };

    match controller.bridge().store() {
        Some(store) => {
            store.close();
            response_to_c_string(&AppResponse::success("Dashboard storage closed successfully"))
        }
        None => response_to_c_string(&AppResponse::success("Dashboard storage already detached")),
    }
}

fn state_response(controller: &DashboardController) -> *const c_char {
    match serde_json::to_string(&*controller.state()) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize state: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Serializes a response to JSON and hands it across the boundary as a C
/// string. Returns null if serialization or C-string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to an owned `String`, turning null pointers
/// and invalid UTF-8 into ready-to-return `BadRequest` responses.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
