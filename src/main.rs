use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use js_patcher::config::{load_from_path, plan_recipe, write_plan, FileStatus, Plan};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "js-patcher")]
#[command(about = "Idempotent structural patching of JavaScript and TypeScript projects", long_about = None)]
#[command(version)]
struct Cli {
    /// Log mutation details (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply recipes to a project
    Apply {
        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Specific recipe file to apply (otherwise applies all in recipes/)
        #[arg(short = 'f', long)]
        recipe: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Show which files recipes would still change
    Status {
        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Fail unless every recipe is already fully applied
    Verify {
        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// List available recipes and the files they touch
    List {
        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            root,
            recipe,
            dry_run,
            diff,
        } => cmd_apply(root, recipe, dry_run, diff),
        Commands::Status { root } => cmd_status(root),
        Commands::Verify { root } => cmd_verify(root),
        Commands::List { root } => cmd_list(root),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Helper: Discover all .toml recipe files in a recipes/ directory.
///
/// Discovery order:
/// 1. `<root>/recipes` (recipes kept alongside the project).
/// 2. `./recipes` relative to the current working directory.
fn discover_recipe_files(root: &Path) -> Result<Vec<PathBuf>> {
    let cwd_recipes_dir = env::current_dir().ok().map(|cwd| cwd.join("recipes"));
    let root_recipes_dir = root.join("recipes");

    let candidate_dirs: Vec<PathBuf> = std::iter::once(root_recipes_dir)
        .chain(cwd_recipes_dir)
        .collect();

    for recipes_dir in candidate_dirs {
        if !recipes_dir.exists() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&recipes_dir).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();

        if !files.is_empty() {
            return Ok(files);
        }
    }

    anyhow::bail!(
        "No .toml recipe files found in either ./recipes or {}/recipes",
        root.display()
    )
}

/// Resolve the project root
///
/// Priority order:
/// 1. Explicit --root flag
/// 2. JS_PATCHER_ROOT environment variable
/// 3. Nearest ancestor of the current directory holding package.json
fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_root {
        return Ok(path.canonicalize()?);
    }

    if let Ok(env_path) = env::var("JS_PATCHER_ROOT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!("Warning: JS_PATCHER_ROOT is set but path doesn't exist: {env_path}").yellow()
        );
    }

    if let Some(path) = auto_detect_root() {
        println!(
            "{}",
            format!("Auto-detected project: {}", path.display()).dimmed()
        );
        return Ok(path);
    }

    anyhow::bail!(
        "{}\n{}\n  {}\n  {}\n  {}",
        "Could not find a project root (no package.json found).".red(),
        "Try one of:".bold(),
        "1. cd into your project: cd /path/to/app && js-patcher apply",
        "2. Specify explicitly: js-patcher apply --root /path/to/app",
        "3. Set environment variable: export JS_PATCHER_ROOT=/path/to/app"
    )
}

fn auto_detect_root() -> Option<PathBuf> {
    let current = env::current_dir().ok()?;
    current
        .ancestors()
        .find(|ancestor| ancestor.join("package.json").is_file())
        .map(Path::to_path_buf)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{sign}");
    }
}

fn plan_all(root: &Path, recipe_files: &[PathBuf]) -> Result<Vec<(PathBuf, Plan)>> {
    recipe_files
        .iter()
        .map(|file| {
            let recipe = load_from_path(file)?;
            let plan = plan_recipe(&recipe, root)?;
            Ok::<_, anyhow::Error>((file.clone(), plan))
        })
        .collect()
}

fn cmd_apply(root: Option<PathBuf>, recipe: Option<PathBuf>, dry_run: bool, show_diff: bool) -> Result<()> {
    let root = resolve_root(root)?;
    let recipe_files = match recipe {
        Some(path) => vec![path],
        None => discover_recipe_files(&root)?,
    };

    println!("Project: {}", root.display());
    if dry_run {
        println!("{}", "[DRY RUN - showing what would be changed]".cyan());
    }
    println!();

    let mut total_changed = 0;
    let mut total_unchanged = 0;
    let mut total_skipped = 0;

    // Recipes run one after another; each sees the files as the previous one
    // left them.
    for recipe_file in recipe_files {
        println!("Applying {}...", recipe_file.display());
        let recipe = load_from_path(&recipe_file)?;
        let plan = plan_recipe(&recipe, &root)?;

        for file in &plan.files {
            match &file.status {
                FileStatus::Changed => {
                    let verb = if dry_run { "Would change" } else { "Changed" };
                    println!("{} {verb} {}", "✓".green(), file.relative);
                    total_changed += 1;
                    if show_diff {
                        display_diff(
                            Path::new(&file.relative),
                            file.before.as_deref().unwrap_or(""),
                            &file.after,
                        );
                    }
                }
                FileStatus::Unchanged => {
                    println!("{} {}: up to date", "⊙".yellow(), file.relative);
                    total_unchanged += 1;
                }
                FileStatus::Skipped { reason } => {
                    println!("{} {}: skipped ({reason})", "⊘".cyan(), file.relative);
                    total_skipped += 1;
                }
            }
        }

        if !dry_run {
            write_plan(&plan)?;
        }
        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} changed", format!("{total_changed}").green());
    println!("  {} up to date", format!("{total_unchanged}").yellow());
    println!("  {} skipped", format!("{total_skipped}").cyan());

    Ok(())
}

fn cmd_status(root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    let recipe_files = discover_recipe_files(&root)?;

    println!("{}", "Recipe Status Report".bold());
    println!("Project: {}", root.display());
    println!();

    for (recipe_file, plan) in plan_all(&root, &recipe_files)? {
        let name = recipe_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if plan.is_up_to_date() {
            println!("{} {}", "✓".green(), name.green().bold());
        } else {
            println!("{} {}", "⊙".yellow(), name.yellow().bold());
        }
        for file in &plan.files {
            println!("  - {} ({})", file.relative, file.status.to_string().dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_verify(root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    let recipe_files = discover_recipe_files(&root)?;

    println!("{}", "Verifying recipes...".bold());
    println!("Project: {}", root.display());
    println!();

    let mut verified = 0;
    let mut pending = 0;

    for (recipe_file, plan) in plan_all(&root, &recipe_files)? {
        for file in &plan.files {
            if file.is_changed() {
                eprintln!("{} {}: NOT APPLIED", "✗".red(), file.relative);
                eprintln!("  Recipe: {}", recipe_file.display());
                pending += 1;
            } else {
                println!("{} {}: {}", "✓".green(), file.relative, file.status);
                verified += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} verified", format!("{verified}").green());
    println!("  {} pending", format!("{pending}").red());

    if pending > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    for recipe_file in discover_recipe_files(&root)? {
        let recipe = load_from_path(&recipe_file)?;
        let name = if recipe.meta.name.is_empty() {
            recipe_file.display().to_string()
        } else {
            recipe.meta.name.clone()
        };
        println!("{}", name.bold());
        if let Some(description) = &recipe.meta.description {
            println!("  {}", description.dimmed());
        }
        for file in &recipe.files {
            let operations: Vec<&str> = file.operations.iter().map(|op| op.name()).collect();
            println!("  - {} [{}]", file.path, operations.join(", "));
        }
    }
    Ok(())
}
