//! The list-filtering predicate.
//!
//! Pure function over an injected sequence of [`User`] records: a record is
//! visible when its name contains the search query (case- and
//! whitespace-insensitive) AND its permission is in the selected set (empty
//! set means "all", OR semantics otherwise). Safe to call on every keystroke
//! or filter toggle.

use crate::user_model::{PermissionLevel, User};

/// Lowercases and collapses runs of whitespace, trimming the ends, so that
/// `"  Bob   Smith "` and `"bob smith"` compare equal.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Computes the visible subset of `records` for the given query and
/// permission selection.
///
/// Always returns a fresh `Vec` preserving input order, even when nothing is
/// filtered out; an empty query together with an empty selection is the
/// identity filter. Records are cloned, never mutated.
pub fn filter_users(
    records: &[User],
    query: &str,
    selected_permissions: &[PermissionLevel],
) -> Vec<User> {
    let needle = normalize(query);

    records
        .iter()
        .filter(|user| {
            let name_matches = needle.is_empty() || normalize(&user.name).contains(&needle);
            let permission_matches = selected_permissions.is_empty()
                || selected_permissions.contains(&user.permission);
            name_matches && permission_matches
        })
        .cloned()
        .collect()
}
