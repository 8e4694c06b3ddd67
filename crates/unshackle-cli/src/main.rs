//! CLI binary for running and checking release scripts.

mod script;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use unshackle_chain::{Engine, StartOptions};
use unshackle_exec::ShellRunner;

use crate::script::ReleaseScript;

#[derive(Parser, Debug)]
#[command(name = "unshackle", version, about = "Run interactive, resumable release scripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a release script
    Run {
        /// Path to the release script (.toml)
        script: PathBuf,

        /// Resume from the step with this mark
        #[arg(long, env = "UNSHACKLE_FROM")]
        from: Option<String>,

        /// Working directory for commands
        #[arg(short, long)]
        workdir: Option<PathBuf>,

        /// Shell used to run commands
        #[arg(long, default_value = "sh")]
        shell: String,
    },

    /// Validate a release script and show which steps would run
    Check {
        /// Path to the release script (.toml)
        script: PathBuf,

        /// Resume from the step with this mark
        #[arg(long, env = "UNSHACKLE_FROM")]
        from: Option<String>,
    },

    /// List the marks a script can be resumed from
    Marks {
        /// Path to the release script (.toml)
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            script,
            from,
            workdir,
            shell,
        } => cmd_run(&script, from, workdir.as_deref(), shell).await,
        Commands::Check { script, from } => cmd_check(&script, from.as_deref()),
        Commands::Marks { script } => cmd_marks(&script),
    }
}

/// Log to stderr so stdout carries only operator-facing output.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_script(path: &Path) -> anyhow::Result<ReleaseScript> {
    ReleaseScript::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

async fn cmd_run(
    path: &Path,
    from: Option<String>,
    workdir: Option<&Path>,
    shell: String,
) -> anyhow::Result<()> {
    let script = load_script(path)?;
    script.check_resume(from.as_deref())?;

    let mut runner = ShellRunner::new().with_shell(shell);
    if let Some(dir) = workdir {
        let abs = std::fs::canonicalize(dir)
            .with_context(|| format!("Working directory {} not found", dir.display()))?;
        tracing::debug!(workdir = %abs.display(), "Using working directory");
        runner = runner.with_working_dir(abs);
    }

    let engine = Engine::builder().runner(Arc::new(runner)).build();
    let mut options = StartOptions::new();
    options.message = script.message.clone();
    options.resume_from = from;

    let chain = script.append_to(engine.start(options));
    chain.done(script.done.as_deref()).await;
    Ok(())
}

fn cmd_check(path: &Path, from: Option<&str>) -> anyhow::Result<()> {
    let script = load_script(path)?;
    script.check_resume(from)?;

    println!("Script is valid ({} steps)", script.steps.len());
    if let Some(mark) = from {
        println!("Resuming from `{mark}`");
    }
    for (index, planned) in script.plan(from).iter().enumerate() {
        let status = if planned.runs { "run " } else { "skip" };
        let mark = planned
            .step
            .mark
            .as_deref()
            .map(|m| format!("[{m}] "))
            .unwrap_or_default();
        println!("  {status} {:>2}. {mark}{}", index + 1, planned.step.action.describe());
    }
    Ok(())
}

fn cmd_marks(path: &Path) -> anyhow::Result<()> {
    let script = load_script(path)?;
    let mut any = false;
    for mark in script.marks() {
        println!("{mark}");
        any = true;
    }
    if !any {
        println!("(no marks)");
    }
    Ok(())
}
