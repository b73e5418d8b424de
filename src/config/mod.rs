//! Declarative recipes: which files to touch and which operations to run on
//! them, loaded from TOML and applied all-or-nothing.

pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{
    apply_recipe, plan_recipe, write_plan, ApplicationError, FileStatus, Plan, PlannedFile,
};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    DeclarationKind, FileKind, FileRecipe, Metadata, Operation, Recipe, Target, ValidationError,
    ValidationIssue,
};
