//! Data model definitions for the user directory.
//!
//! This module defines the records the dashboard renders ([`User`]), the
//! closed permission enumeration ([`PermissionLevel`]) and the persisted
//! filter state ([`DashboardState`]). All types serialize with serde so they
//! can cross the FFI boundary and live inside the local store as JSON.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single directory entry.
///
/// Plain immutable value with no identity beyond its fields; `contact_info`
/// doubles as the natural key when the UI renders lists.
///
/// # Examples
///
/// ```rust
/// use user_directory_core::user_model::{PermissionLevel, User};
///
/// let user = User {
///     name: "George Harris".to_string(),
///     role: "Platform Lead".to_string(),
///     permission: PermissionLevel::Admin,
///     team: "Infrastructure".to_string(),
///     contact_info: "george.harris@example.com".to_string(),
/// };
/// assert_eq!(user.permission, PermissionLevel::Admin);
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct User {
    /// Display name, matched by the search filter.
    pub name: String,
    /// Free-form role label shown on the card.
    pub role: String,
    /// Access level, matched by the permission filter.
    pub permission: PermissionLevel,
    /// Team label shown on the card.
    pub team: String,
    /// Contact address; also the natural key for list rendering.
    pub contact_info: String,
}

/// Closed set of access levels a directory entry can carry.
///
/// Serialized with lowercase names (`"admin"`, `"editor"`, ...) both in the
/// persisted state blob and across FFI. There is no hierarchy between levels;
/// [`PermissionLevel::ALL`] only fixes the display order.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Admin,
    Editor,
    Viewer,
    Guest,
    Owner,
    Inactive,
}

impl PermissionLevel {
    /// Every level in fixed display order.
    pub const ALL: [PermissionLevel; 6] = [
        PermissionLevel::Admin,
        PermissionLevel::Editor,
        PermissionLevel::Viewer,
        PermissionLevel::Guest,
        PermissionLevel::Owner,
        PermissionLevel::Inactive,
    ];

    /// Lowercase wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Admin => "admin",
            PermissionLevel::Editor => "editor",
            PermissionLevel::Viewer => "viewer",
            PermissionLevel::Guest => "guest",
            PermissionLevel::Owner => "owner",
            PermissionLevel::Inactive => "inactive",
        }
    }

    /// Human-readable label for badges.
    pub fn label(&self) -> &'static str {
        match self {
            PermissionLevel::Admin => "Admin",
            PermissionLevel::Editor => "Editor",
            PermissionLevel::Viewer => "Viewer",
            PermissionLevel::Guest => "Guest",
            PermissionLevel::Owner => "Owner",
            PermissionLevel::Inactive => "Inactive",
        }
    }
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(PermissionLevel::Admin),
            "editor" => Ok(PermissionLevel::Editor),
            "viewer" => Ok(PermissionLevel::Viewer),
            "guest" => Ok(PermissionLevel::Guest),
            "owner" => Ok(PermissionLevel::Owner),
            "inactive" => Ok(PermissionLevel::Inactive),
            other => Err(format!("Unknown permission level: {other}")),
        }
    }
}

/// Persisted dashboard filter state.
///
/// Exactly one store key holds this blob as JSON. A missing or malformed
/// value degrades to [`DashboardState::default`]; `selected_permissions`
/// holds each level at most once (toggle semantics enforce this).
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Raw search text as the user submitted it.
    pub search_query: String,
    /// Active permission filters, OR semantics, duplicate-free.
    pub selected_permissions: Vec<PermissionLevel>,
}

impl DashboardState {
    /// Adds `permission` if absent, removes it if present.
    pub fn toggled(&self, permission: PermissionLevel) -> DashboardState {
        let mut next = self.clone();
        if let Some(pos) = next.selected_permissions.iter().position(|p| *p == permission) {
            next.selected_permissions.remove(pos);
        } else {
            next.selected_permissions.push(permission);
        }
        next
    }

    /// True when neither the query nor the permission filter is active.
    pub fn is_identity(&self) -> bool {
        self.search_query.trim().is_empty() && self.selected_permissions.is_empty()
    }
}

/// Built-in demo directory used when no external record source is injected.
///
/// The core treats records as an injected read-only sequence; this static set
/// stands in for a real backend so UI shells can render something out of the
/// box.
pub fn default_users() -> Vec<User> {
    fn user(
        name: &str,
        role: &str,
        permission: PermissionLevel,
        team: &str,
        contact_info: &str,
    ) -> User {
        User {
            name: name.to_string(),
            role: role.to_string(),
            permission,
            team: team.to_string(),
            contact_info: contact_info.to_string(),
        }
    }

    vec![
        user(
            "George Harris",
            "Platform Lead",
            PermissionLevel::Admin,
            "Infrastructure",
            "george.harris@example.com",
        ),
        user(
            "Arianna Russo",
            "Content Strategist",
            PermissionLevel::Editor,
            "Marketing",
            "arianna.russo@example.com",
        ),
        user(
            "Priya Natarajan",
            "Staff Engineer",
            PermissionLevel::Owner,
            "Core Services",
            "priya.natarajan@example.com",
        ),
        user(
            "Tomas Lindqvist",
            "Data Analyst",
            PermissionLevel::Viewer,
            "Analytics",
            "tomas.lindqvist@example.com",
        ),
        user(
            "Maya Okafor",
            "Site Reliability Engineer",
            PermissionLevel::Admin,
            "Infrastructure",
            "maya.okafor@example.com",
        ),
        user(
            "Daniel Reyes",
            "Contractor",
            PermissionLevel::Guest,
            "Design",
            "daniel.reyes@example.com",
        ),
        user(
            "Hana Suzuki",
            "Former Employee",
            PermissionLevel::Inactive,
            "Sales",
            "hana.suzuki@example.com",
        ),
    ]
}
