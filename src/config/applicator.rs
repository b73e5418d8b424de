//! Recipe applicator
//!
//! Applies a [`Recipe`] to a project in two phases:
//! - plan: every file is read once, mutated in memory and its output
//!   re-validated; nothing touches the disk
//! - write: if every file planned cleanly, changed files are written
//!   atomically after their before-text is verified again
//!
//! A file whose default export holds content this tool did not produce is
//! skipped with a warning; every other failure aborts the run.

use crate::config::schema::{parse_import_name, DeclarationKind, FileRecipe, Operation, Recipe, Target};
use crate::edit::{EditError, FileWrite, WriteResult};
use crate::editor::{EditorError, FileEditor};
use crate::errors::MutationError;
use crate::ast::{ObjectExpr, Program, VarKind};
use crate::ops::config::{resolve_config_object, resolve_plain_object};
use crate::ops::handlers::{register_handler, Composition};
use crate::ops::{array, common, exports, imports, object, variables};
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::sg::PatternMatcher;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What the plan decided for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// The file will be (or was) rewritten
    Changed,
    /// Every operation was already applied
    Unchanged,
    /// The file was left alone
    Skipped { reason: String },
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Changed => write!(f, "changed"),
            FileStatus::Unchanged => write!(f, "up to date"),
            FileStatus::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// In-memory result of running a recipe against one file.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    /// Path relative to the project root, as written in the recipe
    pub relative: String,
    /// Validated absolute path
    pub path: PathBuf,
    /// Content on disk, `None` when the file does not exist
    pub before: Option<String>,
    /// Content after all operations
    pub after: String,
    pub status: FileStatus,
}

impl PlannedFile {
    pub fn is_changed(&self) -> bool {
        self.status == FileStatus::Changed
    }
}

/// Result of planning a recipe.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub files: Vec<PlannedFile>,
}

impl Plan {
    pub fn changed(&self) -> impl Iterator<Item = &PlannedFile> {
        self.files.iter().filter(|f| f.is_changed())
    }

    pub fn is_up_to_date(&self) -> bool {
        self.changed().next().is_none()
    }
}

/// Errors during recipe application
#[derive(Debug)]
pub enum ApplicationError {
    /// Path rejected by the workspace guard
    Safety(SafetyError),
    /// File I/O error
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// File does not exist and the recipe does not create it
    MissingFile { file: PathBuf },
    /// The file could not be opened or its output failed to re-parse
    Editor { file: PathBuf, source: EditorError },
    /// A mutation primitive failed
    Mutation {
        file: PathBuf,
        source: MutationError,
    },
    /// Writing failed
    Edit(EditError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Safety(e) => write!(f, "unsafe path: {}", e),
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::MissingFile { file } => {
                write!(f, "{} does not exist and create = false", file.display())
            }
            ApplicationError::Editor { file, source } => {
                write!(f, "cannot edit {}: {}", file.display(), source)
            }
            ApplicationError::Mutation { file, source } => {
                write!(f, "mutation failed on {}: {}", file.display(), source)
            }
            ApplicationError::Edit(e) => write!(f, "write error: {}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Safety(e) => Some(e),
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Editor { source, .. } => Some(source),
            ApplicationError::Mutation { source, .. } => Some(source),
            ApplicationError::Edit(e) => Some(e),
            ApplicationError::MissingFile { .. } => None,
        }
    }
}

impl From<SafetyError> for ApplicationError {
    fn from(e: SafetyError) -> Self {
        ApplicationError::Safety(e)
    }
}

impl From<EditError> for ApplicationError {
    fn from(e: EditError) -> Self {
        ApplicationError::Edit(e)
    }
}

/// Failure of a single operation, before the file path is attached.
enum OperationError {
    Editor(EditorError),
    Mutation(MutationError),
}

impl From<EditorError> for OperationError {
    fn from(e: EditorError) -> Self {
        OperationError::Editor(e)
    }
}

impl From<MutationError> for OperationError {
    fn from(e: MutationError) -> Self {
        OperationError::Mutation(e)
    }
}

impl From<crate::json::JsonError> for OperationError {
    fn from(e: crate::json::JsonError) -> Self {
        OperationError::Editor(EditorError::Json(e))
    }
}

impl OperationError {
    fn with_file(self, file: &Path) -> ApplicationError {
        match self {
            OperationError::Editor(source) => ApplicationError::Editor {
                file: file.to_path_buf(),
                source,
            },
            OperationError::Mutation(source) => ApplicationError::Mutation {
                file: file.to_path_buf(),
                source,
            },
        }
    }
}

/// Run `recipe` against the project at `root` without writing anything.
pub fn plan_recipe(recipe: &Recipe, root: &Path) -> Result<Plan, ApplicationError> {
    let guard = WorkspaceGuard::new(root)?;
    let mut plan = Plan::default();

    for file in &recipe.files {
        let path = guard.validate_path(&file.path)?;
        let index = match plan.files.iter().position(|p| p.path == path) {
            Some(index) => index,
            None => {
                let before = read_optional(&path)?;
                if before.is_none() && !file.create {
                    return Err(ApplicationError::MissingFile { file: path });
                }
                plan.files.push(PlannedFile {
                    relative: file.path.clone(),
                    path: path.clone(),
                    after: before.clone().unwrap_or_default(),
                    before,
                    status: FileStatus::Unchanged,
                });
                plan.files.len() - 1
            }
        };

        let planned = &mut plan.files[index];
        if matches!(planned.status, FileStatus::Skipped { .. }) {
            continue;
        }
        match plan_file(file, &planned.path, &planned.after)? {
            FileOutcome::Output(after) => {
                planned.status = if planned.before.as_deref() == Some(after.as_str()) {
                    FileStatus::Unchanged
                } else {
                    FileStatus::Changed
                };
                planned.after = after;
            }
            FileOutcome::Skipped(reason) => {
                planned.after = planned.before.clone().unwrap_or_default();
                planned.status = FileStatus::Skipped { reason };
            }
        }
    }

    Ok(plan)
}

/// Apply `recipe` to the project at `root` and return the changed paths.
///
/// All files are planned first; nothing is written unless every file's
/// pipeline succeeded.
pub fn apply_recipe(recipe: &Recipe, root: &Path) -> Result<Vec<PathBuf>, ApplicationError> {
    let plan = plan_recipe(recipe, root)?;
    write_plan(&plan)
}

/// Write the changed files of `plan`.
pub fn write_plan(plan: &Plan) -> Result<Vec<PathBuf>, ApplicationError> {
    let writes: Vec<FileWrite> = plan
        .changed()
        .map(|file| match &file.before {
            Some(before) => FileWrite::new(&file.path, file.after.clone(), before),
            None => FileWrite::create(&file.path, file.after.clone()),
        })
        .collect();

    let mut changed = Vec::new();
    for result in FileWrite::apply_all(&writes)? {
        if let WriteResult::Written { file, bytes } = result {
            info!(file = %file.display(), bytes, "wrote file");
            changed.push(file);
        }
    }
    Ok(changed)
}

fn read_optional(path: &Path) -> Result<Option<String>, ApplicationError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ApplicationError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

enum FileOutcome {
    Output(String),
    Skipped(String),
}

/// Run one file entry over `content`.
fn plan_file(file: &FileRecipe, path: &Path, content: &str) -> Result<FileOutcome, ApplicationError> {
    let mut editor = FileEditor::open(path, content.to_string()).map_err(|source| ApplicationError::Editor {
        file: path.to_path_buf(),
        source,
    })?;

    if let Some(pattern) = &file.skip_if {
        if guard_matches(&editor, content, pattern) {
            debug!(file = %path.display(), pattern = %pattern, "skip_if matched");
            return Ok(FileOutcome::Skipped(format!("matches skip_if '{pattern}'")));
        }
    }

    for operation in &file.operations {
        debug!(file = %path.display(), operation = operation.name(), "applying operation");
        match apply_operation(&mut editor, operation) {
            Ok(()) => {}
            Err(OperationError::Mutation(e)) if e.is_skippable() => {
                warn!(file = %path.display(), error = %e, "skipping file");
                return Ok(FileOutcome::Skipped(e.to_string()));
            }
            Err(e) => return Err(e.with_file(path)),
        }
    }

    editor.output().map(FileOutcome::Output).map_err(|source| ApplicationError::Editor {
        file: path.to_path_buf(),
        source,
    })
}

fn guard_matches(editor: &FileEditor, content: &str, pattern: &str) -> bool {
    match editor {
        FileEditor::Script(doc) => PatternMatcher::new(content, doc.dialect())
            .find_all(pattern)
            .is_ok_and(|found| !found.is_empty()),
        _ => content.contains(pattern),
    }
}

fn apply_operation(editor: &mut FileEditor, operation: &Operation) -> Result<(), OperationError> {
    match operation {
        Operation::JsonSet {
            path,
            key,
            value,
            force,
        } => {
            let doc = editor.json_mut()?;
            let path = as_strs(path);
            if *force {
                doc.set(&path, key, value.clone())?;
            } else {
                doc.set_default(&path, key, value.clone())?;
            }
            return Ok(());
        }
        Operation::JsonRemove { path, key } => {
            editor.json_mut()?.remove(&as_strs(path), key)?;
            return Ok(());
        }
        Operation::JsonAppend { path, key, value } => {
            editor.json_mut()?.append_unique(&as_strs(path), key, value.clone())?;
            return Ok(());
        }
        Operation::EnsureLine { line } => {
            editor.text_mut()?.ensure_line(line);
            return Ok(());
        }
        Operation::EnsureBlock { text } => {
            editor.text_mut()?.ensure_block(text);
            return Ok(());
        }
        _ => {}
    }

    let doc = editor.script_mut()?;
    let dialect = doc.dialect();
    let program = doc.program_mut();

    match operation {
        Operation::AddDefaultImport { module, local } => {
            imports::add_default(program, module, local)?;
        }
        Operation::AddNamedImport {
            module,
            names,
            type_only,
        } => {
            let pairs: Vec<(&str, &str)> = names.iter().map(|n| parse_import_name(n)).collect();
            imports::add_named(program, module, &pairs, *type_only)?;
        }
        Operation::AddNamespaceImport { module, local } => {
            imports::add_namespace(program, module, local)?;
        }
        Operation::AddSideEffectImport { module } => imports::add_empty(program, module),
        Operation::SetProperty {
            target,
            key,
            value,
            force,
        } => {
            let value = common::expression_from_str(value, dialect)?;
            let obj = target_object(program, target)?;
            if *force {
                object::override_property(obj, key, value);
            } else {
                object::property(obj, key, value);
            }
        }
        Operation::RemoveProperty { target, key } => {
            object::remove_property(target_object(program, target)?, key);
        }
        Operation::AppendToArray {
            target,
            key,
            value,
            prepend,
        } => {
            let value = common::expression_from_str(value, dialect)?;
            let arr = object::array_property(target_object(program, target)?, key)?;
            if *prepend {
                array::prepend(arr, value);
            } else {
                array::append(arr, value);
            }
        }
        Operation::DeclareVariable {
            kind,
            name,
            type_annotation,
            value,
        } => {
            let value = common::expression_from_str(value, dialect)?;
            let kind = match kind {
                DeclarationKind::Const => VarKind::Const,
                DeclarationKind::Let => VarKind::Let,
                DeclarationKind::Var => VarKind::Var,
            };
            let type_annotation = type_annotation.as_deref().filter(|_| dialect.is_typescript());
            variables::declaration(program, kind, name, type_annotation, value)?;
        }
        Operation::CreateNamedExport { name, value } => {
            let value = common::expression_from_str(value, dialect)?;
            exports::create_named(program, name, value)?;
        }
        Operation::AppendStatements { code, after_imports } => {
            let statements = common::statements_from_str(code, dialect)?;
            if *after_imports {
                // Keep the snippet's own order after the imports
                for statement in statements.into_iter().rev() {
                    common::insert_statement_after_imports(program, statement);
                }
            } else {
                for statement in statements {
                    common::append_statement(program, statement);
                }
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
            let expr = common::expression_from_str(expr, dialect)?;
            let mut composition = Composition::new(helper.as_str(), helper_module.as_str());
            if let (Some(name), Some(module)) = (handler_type, handler_type_module) {
                composition = composition.with_type(name.as_str(), module.as_str());
            }
            register_handler(program, dialect, &composition, export, handler, expr)?;
        }
        Operation::JsonSet { .. }
        | Operation::JsonRemove { .. }
        | Operation::JsonAppend { .. }
        | Operation::EnsureLine { .. }
        | Operation::EnsureBlock { .. } => {}
    }
    Ok(())
}

/// The object a property operation edits.
fn target_object<'p>(program: &'p mut Program, target: &Target) -> Result<&'p mut ObjectExpr, MutationError> {
    let resolved = match &target.wrapper {
        Some(wrapper) => resolve_config_object(program, wrapper)?,
        None => resolve_plain_object(program)?,
    };
    let obj = resolved
        .get_mut(program)
        .ok_or_else(|| MutationError::mismatch("object literal", "unresolvable config path"))?;
    object::property_path(obj, &as_strs(&target.path))
}

fn as_strs(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn plan_does_not_write() {
        let dir = project(&[("vite.config.ts", "export default defineConfig({ plugins: [] });\n")]);
        let recipe = load_from_str(
            r#"
[[files]]
path = "vite.config.ts"

[[files.operations]]
type = "append-to-array"
wrapper = "defineConfig"
key = "plugins"
value = "sveltekit()"
"#,
        )
        .unwrap();

        let plan = plan_recipe(&recipe, dir.path()).unwrap();
        assert_eq!(plan.changed().count(), 1);
        assert_eq!(plan.files[0].after, "export default defineConfig({ plugins: [sveltekit()] });\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("vite.config.ts")).unwrap(),
            "export default defineConfig({ plugins: [] });\n"
        );
    }

    #[test]
    fn foreign_config_is_skipped() {
        let dir = project(&[("vite.config.ts", "export default createConfig();\n")]);
        let recipe = load_from_str(
            r#"
[[files]]
path = "vite.config.ts"

[[files.operations]]
type = "set-property"
wrapper = "defineConfig"
key = "clearScreen"
value = "false"
"#,
        )
        .unwrap();

        let plan = plan_recipe(&recipe, dir.path()).unwrap();
        assert!(matches!(plan.files[0].status, FileStatus::Skipped { .. }));
        assert!(apply_recipe(&recipe, dir.path()).unwrap().is_empty());
    }

    #[test]
    fn skip_if_guards_file() {
        let dir = project(&[("src/hooks.server.ts", "export const handle = sequence(a, b);\n")]);
        let recipe = load_from_str(
            r#"
[[files]]
path = "src/hooks.server.ts"
skip_if = "sequence($$$HANDLERS)"

[[files.operations]]
type = "register-handler"
export = "handle"
handler = "auth"
expr = "authHandle"
"#,
        )
        .unwrap();

        let plan = plan_recipe(&recipe, dir.path()).unwrap();
        assert!(plan.is_up_to_date());
        assert!(matches!(plan.files[0].status, FileStatus::Skipped { .. }));
    }

    #[test]
    fn mutation_errors_carry_file() {
        let dir = project(&[("src/lib/config.js", "import config from './c';\n")]);
        let recipe = load_from_str(
            r#"
[[files]]
path = "src/lib/config.js"

[[files.operations]]
type = "declare-variable"
name = "config"
value = "{}"
"#,
        )
        .unwrap();

        let err = apply_recipe(&recipe, dir.path()).unwrap_err();
        assert!(matches!(err, ApplicationError::Mutation { .. }));
        assert!(err.to_string().contains("config.js"));
    }

    #[test]
    fn missing_file_without_create() {
        let dir = project(&[]);
        let recipe = load_from_str(
            r#"
[[files]]
path = ".gitignore"
create = false

[[files.operations]]
type = "ensure-line"
line = ".env"
"#,
        )
        .unwrap();

        assert!(matches!(
            plan_recipe(&recipe, dir.path()),
            Err(ApplicationError::MissingFile { .. })
        ));
    }
}
