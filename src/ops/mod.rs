//! Idempotent mutation primitives over a [`crate::ast::Program`].
//!
//! Every primitive is get-or-create: applying it to its own output changes
//! nothing. Lookups return indices or [`crate::ast::ExprLocation`]s rather
//! than references, so callers can resolve a node, edit other parts of the
//! program and come back to it.

pub mod array;
pub mod common;
pub mod config;
pub mod exports;
pub mod handlers;
pub mod imports;
pub mod object;
pub mod variables;
