//! Per-file editors.
//!
//! The kind of a file is decided once, from its extension, when it is
//! opened. Recipes then address the editor they expect and get a
//! [`EditorError::WrongKind`] otherwise.

use crate::document::JsDocument;
use crate::js::{Dialect, ParseError};
use crate::json::{JsonDocument, JsonError};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Script(#[from] ParseError),

    #[error(transparent)]
    Json(#[from] JsonError),

    #[error("Operation needs a {expected} file, found a {found} file")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
}

/// An open file, typed by content.
#[derive(Debug, Clone)]
pub enum FileEditor {
    Script(JsDocument),
    Json(JsonDocument),
    Text(TextDocument),
}

impl FileEditor {
    /// Open `content` as read from `path` (empty for a missing file).
    pub fn open(path: &Path, content: String) -> Result<Self, EditorError> {
        if let Some(dialect) = Dialect::from_path(path) {
            return Ok(Self::Script(JsDocument::parse(content, dialect)?));
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json(JsonDocument::parse(content)?)),
            _ => Ok(Self::Text(TextDocument::new(content))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Script(_) => "script",
            Self::Json(_) => "json",
            Self::Text(_) => "text",
        }
    }

    pub fn script_mut(&mut self) -> Result<&mut JsDocument, EditorError> {
        match self {
            Self::Script(doc) => Ok(doc),
            other => Err(EditorError::WrongKind {
                expected: "script",
                found: other.kind(),
            }),
        }
    }

    pub fn json_mut(&mut self) -> Result<&mut JsonDocument, EditorError> {
        match self {
            Self::Json(doc) => Ok(doc),
            other => Err(EditorError::WrongKind {
                expected: "json",
                found: other.kind(),
            }),
        }
    }

    pub fn text_mut(&mut self) -> Result<&mut TextDocument, EditorError> {
        match self {
            Self::Text(doc) => Ok(doc),
            other => Err(EditorError::WrongKind {
                expected: "text",
                found: other.kind(),
            }),
        }
    }

    /// Final text of the file; script output is re-parsed before it is
    /// returned.
    pub fn output(&self) -> Result<String, EditorError> {
        match self {
            Self::Script(doc) => Ok(doc.serialize_checked()?),
            Self::Json(doc) => Ok(doc.output()),
            Self::Text(doc) => Ok(doc.content().to_string()),
        }
    }
}

/// Line-oriented text file such as `.gitignore` or `.env`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    content: String,
}

impl TextDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Append `line` unless a line with the same trimmed text exists.
    pub fn ensure_line(&mut self, line: &str) -> bool {
        let wanted = line.trim();
        if self.content.lines().any(|l| l.trim() == wanted) {
            return false;
        }
        if !self.content.is_empty() && !self.content.ends_with('\n') {
            self.content.push('\n');
        }
        self.content.push_str(wanted);
        self.content.push('\n');
        true
    }

    /// Append `block` unless its text already occurs in the file.
    pub fn ensure_block(&mut self, block: &str) -> bool {
        let block = block.trim_end_matches('\n');
        if block.is_empty() || self.content.contains(block) {
            return false;
        }
        if !self.content.is_empty() {
            if !self.content.ends_with('\n') {
                self.content.push('\n');
            }
            self.content.push('\n');
        }
        self.content.push_str(block);
        self.content.push('\n');
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_extension() {
        let editor = FileEditor::open(Path::new("vite.config.ts"), String::new()).unwrap();
        assert_eq!(editor.kind(), "script");
        let editor = FileEditor::open(Path::new("package.json"), "{}".to_string()).unwrap();
        assert_eq!(editor.kind(), "json");
        let mut editor = FileEditor::open(Path::new(".gitignore"), String::new()).unwrap();
        assert_eq!(editor.kind(), "text");
        assert!(matches!(
            editor.script_mut(),
            Err(EditorError::WrongKind { expected: "script", found: "text" })
        ));
    }

    #[test]
    fn text_lines_are_idempotent() {
        let mut doc = TextDocument::new("node_modules");
        assert!(doc.ensure_line(".env"));
        assert!(!doc.ensure_line(".env  "));
        assert_eq!(doc.content(), "node_modules\n.env\n");
    }

    #[test]
    fn text_blocks_are_separated() {
        let mut doc = TextDocument::new("A=1\n");
        assert!(doc.ensure_block("# auth\nAUTH_SECRET=\n"));
        assert!(!doc.ensure_block("# auth\nAUTH_SECRET="));
        assert_eq!(doc.content(), "A=1\n\n# auth\nAUTH_SECRET=\n");
    }
}
