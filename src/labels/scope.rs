//! Exclusive label scopes.
//!
//! A label named `priority/high` belongs to scope `priority`; an item may
//! carry at most one label per non-empty scope. Names without an interior
//! `/` have no scope and never conflict.

use std::collections::HashMap;

use crate::model::Label;

/// Scope of a label name: the text before the last `/`.
///
/// Empty when the name has no `/`, starts with it, or ends with it.
#[must_use]
pub fn exclusive_scope(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => &name[..idx],
        _ => "",
    }
}

/// Remove repeated labels, keeping the last occurrence of each ID.
#[must_use]
pub fn dedup_labels(labels: &[Label]) -> Vec<Label> {
    let last: HashMap<i64, usize> = labels
        .iter()
        .enumerate()
        .map(|(idx, label)| (label.id, idx))
        .collect();
    labels
        .iter()
        .enumerate()
        .filter(|(idx, label)| last.get(&label.id) == Some(idx))
        .map(|(_, label)| label.clone())
        .collect()
}

/// Keep at most one label per non-empty scope: the last one in input order.
///
/// Unscoped labels pass through. Relative order of survivors is preserved.
#[must_use]
pub fn apply_exclusive_scope(labels: &[Label]) -> Vec<Label> {
    let mut winner: HashMap<&str, usize> = HashMap::new();
    for (idx, label) in labels.iter().enumerate() {
        let scope = label.exclusive_scope();
        if !scope.is_empty() {
            winner.insert(scope, idx);
        }
    }
    labels
        .iter()
        .enumerate()
        .filter(|(idx, label)| {
            let scope = label.exclusive_scope();
            scope.is_empty() || winner.get(scope) == Some(idx)
        })
        .map(|(_, label)| label.clone())
        .collect()
}
