//! Runtime configuration for the compilation pipeline.

use std::path::PathBuf;
use std::time::Duration;

/// Default compiler command.
const DEFAULT_TEX_CMD: &str = "pdflatex";

/// Default deadline for a single compiler pass (10s).
///
/// The deadline applies per invocation, not to the two-pass sequence as a
/// whole: each pass gets its own timer, matching the reference behavior.
const DEFAULT_PASS_DEADLINE_SECS: u64 = 10;

/// Default delay between returning a result and deleting the workspace,
/// so the caller can still be streaming the artifact when cleanup starts.
const DEFAULT_CLEANUP_GRACE_MS: u64 = 1000;

/// Upper bound on captured bytes per subprocess stream (1 MiB).
const DEFAULT_CAPTURE_CAP: usize = 1024 * 1024;

/// Configuration for the compilation orchestrator.
///
/// The temp root is always an explicit value here rather than a
/// process-wide default, so tests can substitute an isolated root.
#[derive(Debug, Clone)]
pub struct Config {
    /// Compiler command (default: "pdflatex", env: `KILN_TEX_CMD`).
    pub tex_cmd: String,
    /// Root directory under which workspaces are created.
    pub temp_root: PathBuf,
    /// Deadline for one compiler pass.
    pub pass_deadline: Duration,
    /// Grace delay before workspace removal.
    pub cleanup_grace: Duration,
    /// Maximum bytes retained per captured stream.
    pub capture_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        let tex_cmd =
            std::env::var("KILN_TEX_CMD").unwrap_or_else(|_| DEFAULT_TEX_CMD.to_string());
        let temp_root = std::env::var_os("KILN_TEMP_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Self {
            tex_cmd,
            temp_root,
            pass_deadline: Duration::from_secs(DEFAULT_PASS_DEADLINE_SECS),
            cleanup_grace: Duration::from_millis(DEFAULT_CLEANUP_GRACE_MS),
            capture_cap: DEFAULT_CAPTURE_CAP,
        }
    }
}

impl Config {
    /// Set the compiler command.
    pub fn with_tex_cmd(mut self, cmd: &str) -> Self {
        self.tex_cmd = cmd.to_string();
        self
    }

    /// Set the workspace root directory.
    pub fn with_temp_root(mut self, root: PathBuf) -> Self {
        self.temp_root = root;
        self
    }

    /// Set the per-pass deadline.
    pub fn with_pass_deadline(mut self, deadline: Duration) -> Self {
        self.pass_deadline = deadline;
        self
    }

    /// Set the cleanup grace delay.
    pub fn with_cleanup_grace(mut self, grace: Duration) -> Self {
        self.cleanup_grace = grace;
        self
    }

    /// Set the per-stream capture cap.
    pub fn with_capture_cap(mut self, cap: usize) -> Self {
        self.capture_cap = cap;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deadline_is_ten_seconds() {
        let config = Config::default();
        assert_eq!(config.pass_deadline, Duration::from_secs(10));
    }

    #[test]
    fn builders_override_defaults() {
        let config = Config::default()
            .with_tex_cmd("lualatex")
            .with_temp_root(PathBuf::from("/tmp/kiln-test"))
            .with_pass_deadline(Duration::from_millis(200))
            .with_cleanup_grace(Duration::ZERO)
            .with_capture_cap(4096);
        assert_eq!(config.tex_cmd, "lualatex");
        assert_eq!(config.temp_root, PathBuf::from("/tmp/kiln-test"));
        assert_eq!(config.pass_deadline, Duration::from_millis(200));
        assert_eq!(config.cleanup_grace, Duration::ZERO);
        assert_eq!(config.capture_cap, 4096);
    }
}
