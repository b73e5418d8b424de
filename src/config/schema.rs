use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Recipe {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub files: Vec<FileRecipe>,
}

impl Recipe {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.files.is_empty() {
            issues.push(ValidationIssue::EmptyFileList);
        }

        for file in &self.files {
            if file.path.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    file: None,
                    field: "path",
                });
                continue;
            }
            let path = Some(file.path.clone());
            if Path::new(&file.path).is_absolute() {
                issues.push(ValidationIssue::InvalidCombo {
                    file: path.clone(),
                    message: "file paths are relative to the project root".to_string(),
                });
            }
            if file.operations.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    file: path.clone(),
                    field: "operations",
                });
            }
            if file.skip_if.as_deref().is_some_and(|p| p.trim().is_empty()) {
                issues.push(ValidationIssue::MissingField {
                    file: path.clone(),
                    field: "skip_if",
                });
            }

            let kind = FileKind::of(&file.path);
            for operation in &file.operations {
                if operation.file_kind() != kind {
                    issues.push(ValidationIssue::InvalidCombo {
                        file: path.clone(),
                        message: format!(
                            "{} operates on {} files, not {} files",
                            operation.name(),
                            operation.file_kind(),
                            kind
                        ),
                    });
                }
                for field in operation.empty_fields() {
                    issues.push(ValidationIssue::MissingField {
                        file: path.clone(),
                        field,
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Operations for one file, applied in order.
#[derive(Debug, Deserialize, Clone)]
pub struct FileRecipe {
    /// Path relative to the project root
    pub path: String,
    /// Create the file when it does not exist
    #[serde(default = "default_true")]
    pub create: bool,
    /// Leave the file alone when this ast-grep pattern (or, for non-script
    /// files, this text) already occurs in it
    #[serde(default)]
    pub skip_if: Option<String>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

fn default_true() -> bool {
    true
}

/// File kinds, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Script,
    Json,
    Text,
}

impl FileKind {
    pub fn of(path: &str) -> Self {
        let path = Path::new(path);
        if crate::js::Dialect::from_path(path).is_some() {
            return FileKind::Script;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => FileKind::Json,
            _ => FileKind::Text,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileKind::Script => "script",
            FileKind::Json => "json",
            FileKind::Text => "text",
        })
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    #[default]
    Const,
    Let,
    Var,
}

/// Where a property operation finds its object.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// Wrapper call around the default-exported object, e.g. `defineConfig`;
    /// without one the default export must be the object itself
    #[serde(default)]
    pub wrapper: Option<String>,
    /// Property path from the config object to the object edited
    #[serde(default)]
    pub path: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    AddDefaultImport {
        module: String,
        local: String,
    },
    AddNamedImport {
        module: String,
        /// `name` or `name as alias`
        names: Vec<String>,
        #[serde(default)]
        type_only: bool,
    },
    AddNamespaceImport {
        module: String,
        local: String,
    },
    AddSideEffectImport {
        module: String,
    },
    SetProperty {
        #[serde(flatten)]
        target: Target,
        key: String,
        value: String,
        /// Overwrite an existing value instead of keeping it
        #[serde(default)]
        force: bool,
    },
    RemoveProperty {
        #[serde(flatten)]
        target: Target,
        key: String,
    },
    AppendToArray {
        #[serde(flatten)]
        target: Target,
        key: String,
        value: String,
        #[serde(default)]
        prepend: bool,
    },
    DeclareVariable {
        #[serde(default)]
        kind: DeclarationKind,
        name: String,
        #[serde(default)]
        type_annotation: Option<String>,
        value: String,
    },
    CreateNamedExport {
        name: String,
        value: String,
    },
    AppendStatements {
        code: String,
        /// Insert after the import block instead of at the end
        #[serde(default)]
        after_imports: bool,
    },
    RegisterHandler {
        export: String,
        handler: String,
        expr: String,
        #[serde(default = "default_helper")]
        helper: String,
        #[serde(default = "default_helper_module")]
        helper_module: String,
        #[serde(default)]
        handler_type: Option<String>,
        #[serde(default)]
        handler_type_module: Option<String>,
    },
    JsonSet {
        #[serde(default)]
        path: Vec<String>,
        key: String,
        value: serde_json::Value,
        #[serde(default)]
        force: bool,
    },
    JsonRemove {
        #[serde(default)]
        path: Vec<String>,
        key: String,
    },
    JsonAppend {
        #[serde(default)]
        path: Vec<String>,
        key: String,
        value: serde_json::Value,
    },
    EnsureLine {
        line: String,
    },
    EnsureBlock {
        text: String,
    },
}

fn default_helper() -> String {
    "sequence".to_string()
}

fn default_helper_module() -> String {
    "@sveltejs/kit/hooks".to_string()
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AddDefaultImport { .. } => "add-default-import",
            Operation::AddNamedImport { .. } => "add-named-import",
            Operation::AddNamespaceImport { .. } => "add-namespace-import",
            Operation::AddSideEffectImport { .. } => "add-side-effect-import",
            Operation::SetProperty { .. } => "set-property",
            Operation::RemoveProperty { .. } => "remove-property",
            Operation::AppendToArray { .. } => "append-to-array",
            Operation::DeclareVariable { .. } => "declare-variable",
            Operation::CreateNamedExport { .. } => "create-named-export",
            Operation::AppendStatements { .. } => "append-statements",
            Operation::RegisterHandler { .. } => "register-handler",
            Operation::JsonSet { .. } => "json-set",
            Operation::JsonRemove { .. } => "json-remove",
            Operation::JsonAppend { .. } => "json-append",
            Operation::EnsureLine { .. } => "ensure-line",
            Operation::EnsureBlock { .. } => "ensure-block",
        }
    }

    pub fn file_kind(&self) -> FileKind {
        match self {
            Operation::JsonSet { .. } | Operation::JsonRemove { .. } | Operation::JsonAppend { .. } => {
                FileKind::Json
            }
            Operation::EnsureLine { .. } | Operation::EnsureBlock { .. } => FileKind::Text,
            _ => FileKind::Script,
        }
    }

    fn empty_fields(&self) -> Vec<&'static str> {
        let blank = |s: &str| s.trim().is_empty();
        let mut fields = Vec::new();
        match self {
            Operation::AddDefaultImport { module, local }
            | Operation::AddNamespaceImport { module, local } => {
                if blank(module) {
                    fields.push("module");
                }
                if blank(local) {
                    fields.push("local");
                }
            }
            Operation::AddNamedImport { module, names, .. } => {
                if blank(module) {
                    fields.push("module");
                }
                if names.is_empty() || names.iter().any(|n| blank(n)) {
                    fields.push("names");
                }
            }
            Operation::AddSideEffectImport { module } => {
                if blank(module) {
                    fields.push("module");
                }
            }
            Operation::SetProperty { key, value, .. } | Operation::AppendToArray { key, value, .. } => {
                if blank(key) {
                    fields.push("key");
                }
                if blank(value) {
                    fields.push("value");
                }
            }
            Operation::RemoveProperty { key, .. }
            | Operation::JsonSet { key, .. }
            | Operation::JsonRemove { key, .. }
            | Operation::JsonAppend { key, .. } => {
                if blank(key) {
                    fields.push("key");
                }
            }
            Operation::DeclareVariable { name, value, .. }
            | Operation::CreateNamedExport { name, value } => {
                if blank(name) {
                    fields.push("name");
                }
                if blank(value) {
                    fields.push("value");
                }
            }
            Operation::AppendStatements { code, .. } => {
                if blank(code) {
                    fields.push("code");
                }
            }
            Operation::RegisterHandler {
                export,
                handler,
                expr,
                helper,
                helper_module,
                handler_type,
                handler_type_module,
            } => {
                for (field, value) in [
                    ("export", export),
                    ("handler", handler),
                    ("expr", expr),
                    ("helper", helper),
                    ("helper_module", helper_module),
                ] {
                    if blank(value) {
                        fields.push(field);
                    }
                }
                if handler_type.is_some() != handler_type_module.is_some() {
                    fields.push(if handler_type.is_some() {
                        "handler_type_module"
                    } else {
                        "handler_type"
                    });
                }
            }
            Operation::EnsureLine { line } => {
                if blank(line) {
                    fields.push("line");
                }
            }
            Operation::EnsureBlock { text } => {
                if blank(text) {
                    fields.push("text");
                }
            }
        }
        fields
    }
}

/// Split `name` or `name as alias` into `(imported, local)`.
pub fn parse_import_name(spec: &str) -> (&str, &str) {
    match spec.split_once(" as ") {
        Some((imported, local)) => (imported.trim(), local.trim()),
        None => (spec.trim(), spec.trim()),
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyFileList,
    MissingField {
        file: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        file: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyFileList => write!(f, "recipe contains no files"),
            ValidationIssue::MissingField { file, field } => match file {
                Some(file) => write!(f, "file '{file}' missing required field '{field}'"),
                None => write!(f, "file entry missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { file, message } => match file {
                Some(file) => write!(f, "file '{file}' has invalid configuration: {message}"),
                None => write!(f, "invalid recipe configuration: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kinds() {
        assert_eq!(FileKind::of("vite.config.ts"), FileKind::Script);
        assert_eq!(FileKind::of("svelte.config.js"), FileKind::Script);
        assert_eq!(FileKind::of("package.json"), FileKind::Json);
        assert_eq!(FileKind::of(".env.example"), FileKind::Text);
    }

    #[test]
    fn import_names() {
        assert_eq!(parse_import_name("sequence"), ("sequence", "sequence"));
        assert_eq!(parse_import_name("sequence as seq"), ("sequence", "seq"));
    }
}
