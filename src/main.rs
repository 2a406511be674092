use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use kiln::config::Config;

mod cmd;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(version, about = "LaTeX compilation service - render documents to PDF")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Compiler command (overrides KILN_TEX_CMD).
    #[arg(long, global = true)]
    pub tex_cmd: Option<String>,

    /// Root directory for compilation workspaces (overrides KILN_TEMP_ROOT).
    #[arg(long, global = true)]
    pub temp_root: Option<PathBuf>,

    /// Per-pass compiler deadline in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP compilation server
    Serve {
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },
    /// Compile a single .tex file to PDF
    Compile {
        file: PathBuf,
        /// Output path (defaults to the input path with a .pdf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    fn compiler_config(&self) -> Config {
        let mut config = Config::default();
        if let Some(ref cmd) = self.tex_cmd {
            config = config.with_tex_cmd(cmd);
        }
        if let Some(ref root) = self.temp_root {
            config = config.with_temp_root(root.clone());
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_pass_deadline(Duration::from_millis(ms));
        }
        config
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "kiln=debug" } else { "kiln=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.compiler_config();
    match cli.command {
        Commands::Serve { port } => cmd::cmd_serve(port, config).await,
        Commands::Compile {
            ref file,
            ref output,
        } => cmd::cmd_compile(file, output.as_deref(), config).await,
    }
}
