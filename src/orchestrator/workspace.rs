//! Workspace allocation and removal.
//!
//! A workspace is a private temporary directory owned by exactly one
//! in-flight compilation. Names come from an atomically-unique mkdtemp
//! primitive, never from request data, so concurrent requests cannot
//! collide without needing any global registry.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::errors::CompileError;

/// Shared base name for the three files the compiler contract fixes:
/// `input.tex`, `input.pdf`, `input.log`.
const JOB_BASE: &str = "input";

/// Directory name prefix for workspaces under the temp root.
const WORKSPACE_PREFIX: &str = "kiln-";

/// An exclusively-owned temporary directory for one compilation.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the source file the compiler reads.
    pub fn source_file(&self) -> PathBuf {
        self.path.join(format!("{JOB_BASE}.tex"))
    }

    /// Path of the artifact the compiler is expected to emit.
    pub fn artifact_file(&self) -> PathBuf {
        self.path.join(format!("{JOB_BASE}.pdf"))
    }

    /// Path of the compiler's diagnostic log.
    pub fn log_file(&self) -> PathBuf {
        self.path.join(format!("{JOB_BASE}.log"))
    }

    /// File name passed to the compiler on its command line (relative,
    /// since the compiler runs with the workspace as working directory).
    pub fn source_name(&self) -> String {
        format!("{JOB_BASE}.tex")
    }
}

/// Creates and removes workspaces under a configured root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Create a manager rooted at an explicit directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Allocate a fresh, uniquely-named workspace directory.
    ///
    /// Fails with [`CompileError::Workspace`] when the root cannot be
    /// created or written (disk exhaustion, permissions).
    pub fn acquire(&self) -> Result<Workspace, CompileError> {
        std::fs::create_dir_all(&self.root).map_err(CompileError::Workspace)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.root)
            .map_err(CompileError::Workspace)?;
        // Ownership of the directory's lifetime moves to the orchestrator's
        // deferred release, not RAII drop.
        Ok(Workspace { path: dir.keep() })
    }

    /// Recursively remove a workspace. Best-effort: an orphaned temp
    /// directory is an acceptable degraded outcome, so failures are
    /// logged and swallowed.
    pub async fn release(workspace: Workspace) {
        if let Err(err) = tokio::fs::remove_dir_all(&workspace.path).await {
            warn!(
                workspace = %workspace.path.display(),
                error = %err,
                "failed to remove workspace directory"
            );
        }
    }
}
