//! Typed error hierarchy for the compilation orchestrator.
//!
//! One enum covers the whole taxonomy:
//! - environment failures that precede any subprocess (`Workspace`, `Io`)
//! - failures to start the compiler at all (`Spawn`)
//! - failures reported by the compiler itself (`PassFailed`, `Timeout`,
//!   `ArtifactMissing`)
//!
//! None of these are retried: the input is unchanged and the toolchain is
//! deterministic, so a second attempt reproduces the first.

use std::time::Duration;

use thiserror::Error;

/// Errors from a single compilation request.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to create workspace directory: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to spawn compiler process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("compiler pass {pass} failed (exit {})", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".into()))]
    PassFailed { pass: u32, exit_code: Option<i32> },

    #[error("compiler pass {pass} exceeded the {}ms deadline and was killed", deadline.as_millis())]
    Timeout { pass: u32, deadline: Duration },

    #[error("compiler reported success but produced no output artifact")]
    ArtifactMissing,

    #[error("failed to {what}: {source}")]
    Io {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Whether the failure happened in the environment rather than in the
    /// submitted document.
    ///
    /// The HTTP layer maps these to a 500 instead of a 400.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            CompileError::Workspace(_) | CompileError::Spawn(_) | CompileError::Io { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_is_matchable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "pdflatex not found");
        let err = CompileError::Spawn(io_err);
        match &err {
            CompileError::Spawn(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Spawn variant"),
        }
    }

    #[test]
    fn pass_failed_renders_exit_code() {
        let err = CompileError::PassFailed {
            pass: 1,
            exit_code: Some(1),
        };
        assert!(err.to_string().contains("pass 1"));
        assert!(err.to_string().contains("exit 1"));
    }

    #[test]
    fn pass_failed_renders_killed_process_as_none() {
        let err = CompileError::PassFailed {
            pass: 2,
            exit_code: None,
        };
        assert!(err.to_string().contains("exit none"));
    }

    #[test]
    fn timeout_carries_pass_and_deadline() {
        let err = CompileError::Timeout {
            pass: 1,
            deadline: Duration::from_millis(200),
        };
        assert!(err.to_string().contains("200ms"));
        match err {
            CompileError::Timeout { pass, .. } => assert_eq!(pass, 1),
            _ => panic!("Expected Timeout"),
        }
    }

    #[test]
    fn environment_classification() {
        let ws = CompileError::Workspace(std::io::Error::other("disk full"));
        let spawn = CompileError::Spawn(std::io::Error::other("permission denied"));
        let pass = CompileError::PassFailed {
            pass: 1,
            exit_code: Some(1),
        };
        let timeout = CompileError::Timeout {
            pass: 1,
            deadline: Duration::from_secs(10),
        };
        assert!(ws.is_environment());
        assert!(spawn.is_environment());
        assert!(!pass.is_environment());
        assert!(!timeout.is_environment());
        assert!(!CompileError::ArtifactMissing.is_environment());
    }

    #[test]
    fn all_variants_implement_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&CompileError::ArtifactMissing);
    }
}
