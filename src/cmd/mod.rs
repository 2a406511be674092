//! CLI command implementations.
//!
//! | Function      | Command handled            |
//! |---------------|----------------------------|
//! | `cmd_serve`   | `kiln serve`               |
//! | `cmd_compile` | `kiln compile <file.tex>`  |

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use kiln::config::Config;
use kiln::orchestrator::{CompileOutcome, Compiler};
use kiln::server::{self, ServerConfig};

/// Run the HTTP compilation server until interrupted.
pub async fn cmd_serve(port: u16, compiler: Config) -> Result<()> {
    println!(
        "{} kiln listening on http://0.0.0.0:{}",
        style("→").cyan(),
        port
    );
    server::serve(ServerConfig { port, compiler }).await
}

/// Compile one file from disk and write the artifact next to it.
pub async fn cmd_compile(file: &Path, output: Option<&Path>, config: Config) -> Result<()> {
    let source = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read source file {}", file.display()))?;

    let compiler = Compiler::new(config);
    let outcome = compiler.compile(&source, None).await;

    // No early returns between here and shutdown: the deferred workspace
    // removal must still run on every path.
    let result = match outcome {
        CompileOutcome::Success { artifact, .. } => {
            let out_path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| file.with_extension("pdf"));
            match tokio::fs::write(&out_path, &artifact).await {
                Ok(()) => {
                    println!(
                        "{} {} ({} bytes)",
                        style("✓").green(),
                        out_path.display(),
                        artifact.len()
                    );
                    Ok(())
                }
                Err(e) => Err(anyhow::Error::new(e)
                    .context(format!("Failed to write artifact to {}", out_path.display()))),
            }
        }
        CompileOutcome::Failure { error, log } => {
            eprintln!("{} {}", style("✗").red(), error);
            if let Some(log_text) = log {
                let log_path = file.with_extension("log");
                match std::fs::write(&log_path, &log_text) {
                    Ok(()) => eprintln!("  compiler log written to {}", log_path.display()),
                    Err(e) => eprintln!("  could not write compiler log: {e}"),
                }
            }
            Err(anyhow::anyhow!("compilation failed: {error}"))
        }
    };

    compiler.shutdown().await;
    result
}
