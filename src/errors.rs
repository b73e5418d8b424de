use crate::js::ParseError;
use thiserror::Error;

/// Failure of a mutation primitive.
///
/// None of these leave a [`crate::ast::Program`] half-edited: primitives
/// check shapes before they touch the tree.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("expected {expected}, found {found}")]
    StructuralMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("cannot resolve binding '{name}' to a local declaration")]
    UnresolvedBinding { name: String },

    #[error("default export holds {found}, which was not produced by this tool")]
    AmbiguousPreexistingConfig { found: String },

    #[error("refusing to rename '{name}': {references} other reference(s) would break")]
    UnsafeRename { name: String, references: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl MutationError {
    pub(crate) fn mismatch(expected: &'static str, found: impl Into<String>) -> Self {
        MutationError::StructuralMismatch {
            expected,
            found: found.into(),
        }
    }

    /// Whether the orchestrator should skip the file with a warning instead
    /// of aborting the run.
    pub fn is_skippable(&self) -> bool {
        matches!(self, MutationError::AmbiguousPreexistingConfig { .. })
    }
}
