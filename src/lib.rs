//! JS Patcher: idempotent structural edits for JavaScript and TypeScript projects
//!
//! Source files are parsed with tree-sitter, lowered into an owned syntax
//! tree and edited through get-or-create primitives. Applying the same
//! mutation twice leaves the file as the first application left it.
//!
//! # Architecture
//!
//! - [`js`] parses modules and lowers them into [`ast::Program`]s.
//! - [`ops`] holds the mutation primitives (imports, exports, config
//!   objects, arrays, handler composition).
//! - [`ast`] prints the tree back, keeping untouched nodes byte-for-byte
//!   and following the file's indentation and quote style for new code.
//! - [`config`] loads TOML recipes and applies them to a project through
//!   [`edit::FileWrite`], which checks before-text and writes atomically.
//!
//! # Safety
//!
//! - Every write verifies the file still holds the text it was planned from
//! - Atomic file writes (tempfile + fsync + rename)
//! - Project boundary enforcement, `node_modules` and package caches are off limits
//! - Generated output is re-parsed before it is written
//!
//! # Example
//!
//! ```no_run
//! use js_patcher::ops::{config, imports, object};
//! use js_patcher::{Dialect, JsDocument};
//!
//! let source = std::fs::read_to_string("vite.config.ts").unwrap();
//! let mut doc = JsDocument::parse(source, Dialect::TypeScript).unwrap();
//!
//! let program = doc.program_mut();
//! imports::add_default(program, "@vitejs/plugin-react", "react").unwrap();
//! let cfg = config::config_object_mut(program, "defineConfig").unwrap();
//! object::array_property(cfg, "plugins").unwrap();
//!
//! println!("{}", doc.serialize());
//! ```

pub mod ast;
pub mod cache;
pub mod config;
pub mod document;
pub mod edit;
pub mod editor;
pub mod errors;
pub mod js;
pub mod json;
pub mod ops;
pub mod pool;
pub mod safety;
pub mod sg;
pub mod style;

// Re-exports
pub use config::{
    apply_recipe, load_from_path, load_from_str, plan_recipe, ApplicationError, ConfigError,
    Plan, Recipe,
};
pub use document::JsDocument;
pub use edit::{EditError, EditVerification, FileWrite, WriteResult};
pub use editor::{EditorError, FileEditor, TextDocument};
pub use errors::MutationError;
pub use js::{Dialect, ParseError};
pub use json::{JsonDocument, JsonError};
pub use ops::handlers::{register_handler, Composition, HandlerOutcome};
pub use safety::{SafetyError, WorkspaceGuard};
pub use style::{QuoteStyle, Style};
