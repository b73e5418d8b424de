//! JSON documents such as `package.json` or `tsconfig.json`.
//!
//! Key order is preserved (`serde_json` with `preserve_order`), and the
//! indentation of the file is re-applied on output. Comments are not
//! supported; JSONC files are plain text to us.

use crate::style::guess_indent_string;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Expected an object at '{path}'")]
    NotAnObject { path: String },

    #[error("Expected an array at '{path}'")]
    NotAnArray { path: String },
}

#[derive(Debug, Clone)]
pub struct JsonDocument {
    source: String,
    value: Value,
    indent: String,
}

impl JsonDocument {
    /// Parse `source`; an empty or whitespace-only file is an empty object.
    pub fn parse(source: impl Into<String>) -> Result<Self, JsonError> {
        let source = source.into();
        let value = if source.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(&source)?
        };
        let indent = if source.contains('\n') {
            guess_indent_string(&source)
        } else {
            "\t".to_string()
        };
        Ok(Self {
            source,
            value,
            indent,
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Get or create the object at `path`, creating intermediate objects.
    pub fn object_mut(&mut self, path: &[&str]) -> Result<&mut Map<String, Value>, JsonError> {
        let mut current = &mut self.value;
        for (depth, key) in path.iter().enumerate() {
            let map = current.as_object_mut().ok_or_else(|| JsonError::NotAnObject {
                path: path[..depth].join("."),
            })?;
            current = map
                .entry((*key).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        current.as_object_mut().ok_or_else(|| JsonError::NotAnObject {
            path: path.join("."),
        })
    }

    /// Look up the value at `path` without creating anything.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.value, |value, key| value.get(*key))
    }

    /// Set `key` in the object at `path` unless it already has a value.
    ///
    /// Returns `true` when the value was inserted.
    pub fn set_default(&mut self, path: &[&str], key: &str, value: Value) -> Result<bool, JsonError> {
        let map = self.object_mut(path)?;
        if map.contains_key(key) {
            return Ok(false);
        }
        debug!(key, "adding JSON key");
        map.insert(key.to_string(), value);
        Ok(true)
    }

    /// Force `key` in the object at `path` to `value`.
    ///
    /// Returns `true` when the document changed.
    pub fn set(&mut self, path: &[&str], key: &str, value: Value) -> Result<bool, JsonError> {
        let map = self.object_mut(path)?;
        if map.get(key) == Some(&value) {
            return Ok(false);
        }
        debug!(key, "setting JSON key");
        map.insert(key.to_string(), value);
        Ok(true)
    }

    /// Remove `key` from the object at `path`, keeping the order of the rest.
    pub fn remove(&mut self, path: &[&str], key: &str) -> Result<bool, JsonError> {
        let map = self.object_mut(path)?;
        Ok(map.shift_remove(key).is_some())
    }

    /// Append `value` to the array under `key` unless an equal element is
    /// already there. A missing array is created.
    pub fn append_unique(&mut self, path: &[&str], key: &str, value: Value) -> Result<bool, JsonError> {
        let map = self.object_mut(path)?;
        let array = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| JsonError::NotAnArray {
                path: path.iter().copied().chain([key]).collect::<Vec<_>>().join("."),
            })?;
        if array.contains(&value) {
            return Ok(false);
        }
        array.push(value);
        Ok(true)
    }

    /// Pretty-print with the file's indentation and a final newline.
    pub fn serialize(&self) -> String {
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut out, formatter);
        if self.value.serialize(&mut serializer).is_err() {
            return self.source.clone();
        }
        let mut text = String::from_utf8(out).unwrap_or_else(|_| self.source.clone());
        text.push('\n');
        text
    }

    /// Whether the document differs from the parsed text, ignoring layout.
    pub fn changed(&self) -> bool {
        if self.source.trim().is_empty() {
            return !matches!(&self.value, Value::Object(map) if map.is_empty());
        }
        serde_json::from_str::<Value>(&self.source).map_or(true, |original| original != self.value)
    }

    /// Output text: the original when nothing changed, otherwise re-printed.
    pub fn output(&self) -> String {
        if self.changed() {
            self.serialize()
        } else {
            self.source.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PACKAGE: &str = "{\n  \"name\": \"app\",\n  \"scripts\": {\n    \"dev\": \"vite dev\"\n  }\n}\n";

    #[test]
    fn set_default_keeps_existing() {
        let mut doc = JsonDocument::parse(PACKAGE).unwrap();
        assert!(!doc.set_default(&["scripts"], "dev", json!("other")).unwrap());
        assert!(doc.set_default(&["scripts"], "test", json!("vitest")).unwrap());
        assert_eq!(
            doc.output(),
            "{\n  \"name\": \"app\",\n  \"scripts\": {\n    \"dev\": \"vite dev\",\n    \"test\": \"vitest\"\n  }\n}\n"
        );
    }

    #[test]
    fn unchanged_document_is_verbatim() {
        let source = "{ \"name\": \"app\" }";
        let mut doc = JsonDocument::parse(source).unwrap();
        assert!(!doc.set(&[], "name", json!("app")).unwrap());
        assert_eq!(doc.output(), source);
    }

    #[test]
    fn nested_paths_are_created() {
        let mut doc = JsonDocument::parse("").unwrap();
        doc.set(&["compilerOptions"], "strict", json!(true)).unwrap();
        assert_eq!(doc.get(&["compilerOptions", "strict"]), Some(&json!(true)));
        assert!(doc.changed());
    }

    #[test]
    fn arrays_are_deduplicated() {
        let mut doc = JsonDocument::parse("{}").unwrap();
        assert!(doc.append_unique(&[], "files", json!("dist")).unwrap());
        assert!(!doc.append_unique(&[], "files", json!("dist")).unwrap());
        assert_eq!(doc.get(&["files"]), Some(&json!(["dist"])));
    }

    #[test]
    fn shape_errors() {
        let mut doc = JsonDocument::parse(PACKAGE).unwrap();
        assert!(matches!(
            doc.set(&["name"], "x", json!(1)),
            Err(JsonError::NotAnObject { .. })
        ));
        assert!(matches!(
            doc.append_unique(&[], "name", json!(1)),
            Err(JsonError::NotAnArray { .. })
        ));
        assert!(doc.remove(&[], "name").unwrap());
        assert!(!doc.remove(&[], "name").unwrap());
    }
}
