//! Idempotent array insertion.
//!
//! Elements are compared with the structural equality oracle, which compares
//! literals by value (`'a'` equals `"a"`, `1.0` equals `1`) and everything else
//! by shape.

use crate::ast::{canonical, ArrayExpr, Expr};
use tracing::debug;

/// Append `element` unless an equal element exists. Returns whether it was
/// inserted.
pub fn append(arr: &mut ArrayExpr, element: Expr) -> bool {
    if contains(arr, &element) {
        return false;
    }
    debug!(kind = element.kind_name(), "appending array element");
    arr.elements.push(element);
    true
}

/// Prepend `element` unless an equal element exists.
pub fn prepend(arr: &mut ArrayExpr, element: Expr) -> bool {
    if contains(arr, &element) {
        return false;
    }
    debug!(kind = element.kind_name(), "prepending array element");
    arr.elements.insert(0, element);
    true
}

/// Remove every element equal to `element`. Returns whether any was removed.
pub fn remove(arr: &mut ArrayExpr, element: &Expr) -> bool {
    let target = canonical::expr(element);
    let before = arr.elements.len();
    arr.elements.retain(|e| canonical::expr(e) != target);
    arr.elements.len() != before
}

pub fn contains(arr: &ArrayExpr, element: &Expr) -> bool {
    position(arr, element).is_some()
}

pub fn position(arr: &ArrayExpr, element: &Expr) -> Option<usize> {
    let target = canonical::expr(element);
    arr.elements.iter().position(|e| canonical::expr(e) == target)
}
