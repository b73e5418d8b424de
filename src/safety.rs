use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory names that are never edited, wherever they appear in the project.
const FORBIDDEN_DIRS: &[&str] = &["node_modules", ".git"];

/// User-level package caches, relative to the home directory.
const PACKAGE_CACHES: &[&str] = &[".npm", ".pnpm-store", ".yarn", ".cache/yarn", ".bun"];

/// Workspace safety checks to prevent editing files outside the target project.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Absolute path to project root
    workspace_root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    /// Create a new workspace guard with the given root.
    ///
    /// The workspace root will be canonicalized to handle symlinks correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;

        let mut forbidden_paths = Vec::new();
        if let Some(home) = home::home_dir() {
            for cache in PACKAGE_CACHES {
                if let Ok(path) = home.join(cache).canonicalize() {
                    forbidden_paths.push(path);
                }
            }
        }

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to edit.
    ///
    /// The file itself need not exist yet; its nearest existing ancestor is
    /// canonicalized instead. Returns the absolute path if safe.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        // Resolve relative paths against workspace root
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let canonical = canonicalize_lenient(&absolute)?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        let Ok(relative) = canonical.strip_prefix(&self.workspace_root) else {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        };

        let mut prefix = self.workspace_root.clone();
        for component in relative.components() {
            prefix.push(component);
            if let Component::Normal(name) = component {
                if FORBIDDEN_DIRS.iter().any(|dir| name.to_str() == Some(*dir)) {
                    return Err(SafetyError::ForbiddenPath {
                        path: canonical.to_path_buf(),
                        forbidden: prefix,
                    });
                }
            }
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Create a guard with custom forbidden paths (for testing).
    #[cfg(test)]
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;
        Ok(Self {
            workspace_root,
            forbidden_paths: forbidden,
        })
    }
}

/// Canonicalize the longest existing prefix of `path` and append the rest.
fn canonicalize_lenient(path: &Path) -> Result<PathBuf, SafetyError> {
    let mut missing = Vec::new();
    let mut existing = path;
    loop {
        match existing.canonicalize() {
            Ok(mut canonical) => {
                for name in missing.iter().rev() {
                    canonical.push(name);
                }
                return Ok(canonical);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(e.into());
                };
                missing.push(name.to_os_string());
                existing = parent;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_validate_path_inside_workspace() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let guard = WorkspaceGuard::new(workspace).unwrap();

        let file = workspace.join("src/hooks.server.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        assert!(guard.validate_path(&file).is_ok());
    }

    #[test]
    fn test_validate_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(temp_dir.path()).unwrap();

        let validated = guard.validate_path("src/lib/new/file.ts").unwrap();
        assert!(validated.starts_with(guard.workspace_root()));
        assert!(validated.ends_with("src/lib/new/file.ts"));
    }

    #[test]
    fn test_validate_path_outside_workspace() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();
        let guard = WorkspaceGuard::new(&workspace).unwrap();

        let outside = temp_dir.path().join("outside.js");
        fs::write(&outside, b"").unwrap();

        let result = guard.validate_path(&outside);
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
        let result = guard.validate_path("../escape.js");
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }

    #[test]
    fn test_node_modules_and_git_are_forbidden() {
        let temp_dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(temp_dir.path()).unwrap();

        let result = guard.validate_path("node_modules/vite/index.js");
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
        let result = guard.validate_path("packages/app/node_modules/x.js");
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
        let result = guard.validate_path(".git/config");
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
    }

    #[test]
    fn test_custom_forbidden_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let forbidden = workspace.join("build");
        fs::create_dir_all(&forbidden).unwrap();

        let guard = WorkspaceGuard::with_forbidden(workspace, vec![forbidden.canonicalize().unwrap()]).unwrap();

        let result = guard.validate_path("build/index.js");
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_symlink_escape() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let outside = temp_dir.path().join("outside.js");
        fs::write(&outside, b"").unwrap();

        let link = workspace.join("escape.js");
        symlink(&outside, &link).unwrap();

        let guard = WorkspaceGuard::new(&workspace).unwrap();
        let result = guard.validate_path(&link);

        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }
}
