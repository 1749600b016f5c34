//! Dot-path field resolution
//!
//! `user.email` walks nested JSON objects one segment at a time. Arrays are
//! never indexed into: `tags.0` resolves to nothing even when `tags` is a
//! list.

use serde_json::Value;

/// Resolve a dot-path against the input; `None` means the field is absent
pub fn resolve<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    path.split('.')
        .try_fold(data, |current, segment| current.as_object()?.get(segment))
}
