//! Recipe workflow tests
//!
//! Plans and applies recipes against throwaway projects:
//! 1. Apply a multi-file recipe
//! 2. Re-plan and expect nothing left to do
//! 3. Failure modes (all-or-nothing writes, skips, unsafe paths, conflicts)

use js_patcher::config::{apply_recipe, load_from_str, plan_recipe, write_plan, FileStatus};
use js_patcher::edit::EditError;
use js_patcher::ApplicationError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const VITE_CONFIG: &str = "import { defineConfig } from 'vite';\n\nexport default defineConfig({\n  plugins: [],\n});\n";

const PACKAGE_JSON: &str = "{\n  \"name\": \"app\",\n  \"scripts\": {\n    \"dev\": \"vite dev\"\n  }\n}\n";

const SETUP_RECIPE: &str = r#"
[meta]
name = "sveltekit-setup"
description = "Wire up the SvelteKit plugin, hooks and scripts"

[[files]]
path = "vite.config.ts"

[[files.operations]]
type = "add-named-import"
module = "@sveltejs/kit/vite"
names = ["sveltekit"]

[[files.operations]]
type = "append-to-array"
wrapper = "defineConfig"
key = "plugins"
value = "sveltekit()"

[[files]]
path = "src/hooks.server.ts"

[[files.operations]]
type = "register-handler"
export = "handle"
handler = "auth"
expr = "authHandle"

[[files.operations]]
type = "register-handler"
export = "handle"
handler = "i18n"
expr = "i18nHandle"

[[files]]
path = "package.json"

[[files.operations]]
type = "json-set"
path = ["scripts"]
key = "check"
value = "svelte-check"

[[files]]
path = ".gitignore"

[[files.operations]]
type = "ensure-line"
line = ".svelte-kit"
"#;

/// Create a minimal SvelteKit-like project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("vite.config.ts"), VITE_CONFIG).unwrap();
    fs::write(dir.path().join("package.json"), PACKAGE_JSON).unwrap();
    fs::write(dir.path().join(".gitignore"), "node_modules\n").unwrap();
    dir
}

fn read(dir: &Path, file: &str) -> String {
    fs::read_to_string(dir.join(file)).unwrap()
}

#[test]
fn apply_then_reapply_is_a_no_op() {
    let project = setup_project();
    let recipe = load_from_str(SETUP_RECIPE).unwrap();

    let changed = apply_recipe(&recipe, project.path()).unwrap();
    assert_eq!(changed.len(), 4);

    let vite = read(project.path(), "vite.config.ts");
    assert!(vite.contains("import { sveltekit } from '@sveltejs/kit/vite';"), "{vite}");
    assert!(vite.contains("plugins: [sveltekit()]"), "{vite}");

    let hooks = read(project.path(), "src/hooks.server.ts");
    assert!(hooks.contains("sequence"), "{hooks}");
    assert!(hooks.contains("authHandle"), "{hooks}");
    assert!(hooks.contains("i18nHandle"), "{hooks}");

    let package = read(project.path(), "package.json");
    assert!(package.contains("\"check\": \"svelte-check\""), "{package}");
    assert!(package.starts_with("{\n  \"name\""), "{package}");

    assert_eq!(read(project.path(), ".gitignore"), "node_modules\n.svelte-kit\n");

    let plan = plan_recipe(&recipe, project.path()).unwrap();
    assert!(plan.is_up_to_date(), "{:#?}", plan.files);
    assert!(apply_recipe(&recipe, project.path()).unwrap().is_empty());
}

#[test]
fn planning_never_writes() {
    let project = setup_project();
    let recipe = load_from_str(SETUP_RECIPE).unwrap();

    let plan = plan_recipe(&recipe, project.path()).unwrap();
    assert_eq!(plan.changed().count(), 4);
    assert_eq!(read(project.path(), "vite.config.ts"), VITE_CONFIG);
    assert!(!project.path().join("src/hooks.server.ts").exists());

    write_plan(&plan).unwrap();
    assert!(project.path().join("src/hooks.server.ts").exists());
}

#[test]
fn failing_file_blocks_every_write() {
    let project = setup_project();
    fs::write(project.path().join("package.json"), "{ not json").unwrap();
    let recipe = load_from_str(SETUP_RECIPE).unwrap();

    let err = apply_recipe(&recipe, project.path()).unwrap_err();
    assert!(matches!(err, ApplicationError::Editor { .. }), "{err}");

    assert_eq!(read(project.path(), "vite.config.ts"), VITE_CONFIG);
    assert_eq!(read(project.path(), ".gitignore"), "node_modules\n");
    assert!(!project.path().join("src/hooks.server.ts").exists());
}

#[test]
fn foreign_config_is_skipped() {
    let project = setup_project();
    let foreign = "export default createConfig();\n";
    fs::write(project.path().join("vite.config.ts"), foreign).unwrap();
    let recipe = load_from_str(SETUP_RECIPE).unwrap();

    let plan = plan_recipe(&recipe, project.path()).unwrap();
    let vite = plan.files.iter().find(|f| f.relative == "vite.config.ts").unwrap();
    assert!(matches!(vite.status, FileStatus::Skipped { .. }));

    let changed = write_plan(&plan).unwrap();
    assert_eq!(changed.len(), 3);
    assert_eq!(read(project.path(), "vite.config.ts"), foreign);
}

#[test]
fn skip_if_guard_leaves_file_alone() {
    let project = setup_project();
    let recipe = load_from_str(
        r#"
[[files]]
path = "vite.config.ts"
skip_if = "defineConfig($$$ARGS)"

[[files.operations]]
type = "set-property"
wrapper = "defineConfig"
key = "clearScreen"
value = "false"
"#,
    )
    .unwrap();

    let plan = plan_recipe(&recipe, project.path()).unwrap();
    assert!(matches!(plan.files[0].status, FileStatus::Skipped { .. }));
    assert!(plan.is_up_to_date());
}

#[test]
fn set_property_respects_existing_values() {
    let project = setup_project();
    let recipe = load_from_str(
        r#"
[[files]]
path = "vite.config.ts"

[[files.operations]]
type = "set-property"
wrapper = "defineConfig"
path = ["server"]
key = "port"
value = "5173"
"#,
    )
    .unwrap();

    apply_recipe(&recipe, project.path()).unwrap();
    let vite = read(project.path(), "vite.config.ts");
    assert!(vite.contains("port: 5173"), "{vite}");
    assert!(vite.contains("  plugins: [],\n"), "{vite}");

    let plan = plan_recipe(&recipe, project.path()).unwrap();
    assert!(plan.is_up_to_date());
}

#[test]
fn forbidden_paths_are_rejected() {
    let project = setup_project();
    fs::create_dir_all(project.path().join("node_modules/pkg")).unwrap();
    let recipe = load_from_str(
        r#"
[[files]]
path = "node_modules/pkg/index.js"

[[files.operations]]
type = "add-side-effect-import"
module = "./polyfill"
"#,
    )
    .unwrap();

    let err = plan_recipe(&recipe, project.path()).unwrap_err();
    assert!(matches!(err, ApplicationError::Safety(_)), "{err}");
}

#[test]
fn missing_file_without_create() {
    let project = setup_project();
    let recipe = load_from_str(
        r#"
[[files]]
path = "svelte.config.js"
create = false

[[files.operations]]
type = "add-default-import"
module = "@sveltejs/adapter-auto"
local = "adapter"
"#,
    )
    .unwrap();

    let err = plan_recipe(&recipe, project.path()).unwrap_err();
    assert!(matches!(err, ApplicationError::MissingFile { .. }), "{err}");
}

#[test]
fn concurrent_edit_is_detected() {
    let project = setup_project();
    let recipe = load_from_str(SETUP_RECIPE).unwrap();
    let plan = plan_recipe(&recipe, project.path()).unwrap();

    fs::write(project.path().join("vite.config.ts"), "export default {};\n").unwrap();

    let err = write_plan(&plan).unwrap_err();
    assert!(
        matches!(err, ApplicationError::Edit(EditError::BeforeTextMismatch { .. })),
        "{err}"
    );
    assert_eq!(read(project.path(), "package.json"), PACKAGE_JSON);
}
