//! Compilation orchestrator.
//!
//! Ties three tightly-coupled responsibilities around one workspace's
//! lifetime:
//! - workspace allocation and guaranteed (deferred) removal
//! - bounded-time compiler invocations with captured streams
//! - the fixed two-pass sequence and its interpretation into a result
//!
//! Every failure is recovered here and converted into the outcome type;
//! nothing propagates to the caller as an unhandled fault.

pub mod runner;
pub mod workspace;

pub use runner::{InvocationOutcome, ProcessRunner};
pub use workspace::{Workspace, WorkspaceManager};

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::CompileError;

/// Number of compiler passes per request.
///
/// Exactly two, fixed: the second pass exists solely to resolve forward
/// references (tables of contents, citations, cross-references) that
/// stabilize once the first pass has written its auxiliary files. There
/// is deliberately no "compile until references stabilize" loop; that is
/// a known latency/simplicity trade-off, not a bug.
const PASSES: u32 = 2;

/// Terminal result of one compilation request.
///
/// The log is best-effort on both sides: it is whatever the compiler
/// left in the workspace, and may be absent. A failure never carries
/// artifact bytes.
#[derive(Debug)]
pub enum CompileOutcome {
    Success {
        artifact: Vec<u8>,
        log: Option<String>,
    },
    Failure {
        error: CompileError,
        log: Option<String>,
    },
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success { .. })
    }

    pub fn log(&self) -> Option<&str> {
        match self {
            CompileOutcome::Success { log, .. } | CompileOutcome::Failure { log, .. } => {
                log.as_deref()
            }
        }
    }
}

/// The compilation orchestrator.
///
/// One instance serves many concurrent requests; requests share nothing
/// but the workspace root, which is safe because workspace names are
/// collision-free.
pub struct Compiler {
    config: Config,
    workspaces: WorkspaceManager,
    runner: ProcessRunner,
    /// Pending deferred workspace releases. Owned here so they can be
    /// awaited on shutdown instead of leaking as detached timers.
    cleanups: Mutex<JoinSet<()>>,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        let workspaces = WorkspaceManager::new(config.temp_root.clone());
        let runner = ProcessRunner::new(config.capture_cap);
        Self {
            config,
            workspaces,
            runner,
            cleanups: Mutex::new(JoinSet::new()),
        }
    }

    /// Compile a document source to its rendered artifact.
    ///
    /// `deadline_override`, when given, replaces the configured per-pass
    /// deadline for this request. The returned outcome is terminal: all
    /// failure classes from [`CompileError`] arrive as
    /// [`CompileOutcome::Failure`], with the compiler log attached when
    /// one was recoverable from the workspace.
    pub async fn compile(
        &self,
        source: &str,
        deadline_override: Option<Duration>,
    ) -> CompileOutcome {
        let deadline = deadline_override.unwrap_or(self.config.pass_deadline);

        let workspace = match self.workspaces.acquire() {
            Ok(ws) => ws,
            // No workspace means no log to attach and nothing to clean up.
            Err(error) => {
                warn!(error = %error, "workspace acquisition failed");
                return CompileOutcome::Failure { error, log: None };
            }
        };
        debug!(workspace = %workspace.path().display(), "workspace acquired");

        let result = self.run_passes(&workspace, source, deadline).await;
        let log = read_log(&workspace).await;

        let outcome = match result {
            Ok(artifact) => {
                info!(artifact_bytes = artifact.len(), "compilation succeeded");
                CompileOutcome::Success { artifact, log }
            }
            Err(error) => {
                info!(error = %error, "compilation failed");
                CompileOutcome::Failure { error, log }
            }
        };

        // Release runs on every path, after result construction, with a
        // grace delay so the caller may still be consuming the artifact.
        self.schedule_release(workspace).await;
        outcome
    }

    /// Write the source and run the fixed pass sequence.
    ///
    /// Artifact bytes are only read after every scheduled pass has
    /// completed; a zero exit with no artifact on disk is still a
    /// failure, guarding against toolchains that report success without
    /// emitting output.
    async fn run_passes(
        &self,
        workspace: &Workspace,
        source: &str,
        deadline: Duration,
    ) -> Result<Vec<u8>, CompileError> {
        tokio::fs::write(workspace.source_file(), source)
            .await
            .map_err(|source| CompileError::Io {
                what: "write source file",
                source,
            })?;

        let args = pass_args(workspace);
        for pass in 1..=PASSES {
            let invocation = self
                .runner
                .run(&self.config.tex_cmd, &args, workspace.path(), deadline)
                .await?;
            if invocation.timed_out {
                return Err(CompileError::Timeout { pass, deadline });
            }
            if !invocation.success() {
                return Err(CompileError::PassFailed {
                    pass,
                    exit_code: invocation.exit_code,
                });
            }
            debug!(pass, "compiler pass completed");
        }

        match tokio::fs::read(workspace.artifact_file()).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(CompileError::ArtifactMissing)
            }
            Err(source) => Err(CompileError::Io {
                what: "read output artifact",
                source,
            }),
        }
    }

    /// Schedule the workspace for removal after the configured grace
    /// delay. The task is tracked, not detached; `shutdown` awaits it.
    async fn schedule_release(&self, workspace: Workspace) {
        let grace = self.config.cleanup_grace;
        let mut cleanups = self.cleanups.lock().await;
        // Reap already-finished releases so the set doesn't grow.
        while cleanups.try_join_next().is_some() {}
        cleanups.spawn(async move {
            if !grace.is_zero() {
                tokio::time::sleep(grace).await;
            }
            WorkspaceManager::release(workspace).await;
        });
    }

    /// Wait for all pending workspace releases to finish.
    pub async fn shutdown(&self) {
        let mut cleanups = self.cleanups.lock().await;
        while cleanups.join_next().await.is_some() {}
    }
}

/// The fixed, non-interactive argument profile: batch mode, halt on the
/// first fatal error instead of prompting, per-line file/error locations,
/// PDF output only.
fn pass_args(workspace: &Workspace) -> Vec<String> {
    vec![
        "-interaction=nonstopmode".to_string(),
        "-halt-on-error".to_string(),
        "-file-line-error".to_string(),
        "-output-format=pdf".to_string(),
        workspace.source_name(),
    ]
}

/// Best-effort log recovery, shared by every terminal transition.
async fn read_log(workspace: &Workspace) -> Option<String> {
    tokio::fs::read_to_string(workspace.log_file()).await.ok()
}
