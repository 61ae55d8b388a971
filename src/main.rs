// rlsmoke - Smoke-test runner for PPO batch training examples
// Main entry point

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use rlsmoke::config::load_config;
use rlsmoke::errors::{wrap_error_with_suggestion, SmokeError};
use rlsmoke::runner::ProcessLauncher;
use rlsmoke::{Accelerator, SmokeReport, SmokeTest};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "rlsmoke")]
#[command(about = "Train a PPO example briefly, then replay the finished model once", version)]
#[command(allow_negative_numbers = true)]
struct Args {
    /// Accelerator index passed to the trainer as --gpu (-1 for none)
    gpu: Accelerator,

    /// Config file (default: ~/.rlsmoke/config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trainer program (overrides config and RLSMOKE_TRAINER)
    #[arg(long)]
    trainer: Option<String>,

    /// Training script passed as the trainer's first argument
    #[arg(long)]
    script: Option<String>,

    /// Parent directory for the scratch workspace
    #[arg(long = "tmp-root")]
    tmp_root: Option<PathBuf>,

    /// Remove the workspace after a successful run
    #[arg(long)]
    cleanup: bool,

    /// Write trainer output to train.log / demo.log in the workspace
    #[arg(long = "capture-logs")]
    capture_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();

    match run(args).await {
        Ok(report) => {
            println!("{}", success_summary(&report));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", wrap_error_with_suggestion(&e, &e.suggestion()));
            ExitCode::from(process_code(e.exit_code()))
        }
    }
}

async fn run(args: Args) -> Result<SmokeReport, SmokeError> {
    let mut config = load_config(args.config.as_deref())
        .map_err(|e| SmokeError::Config(format!("{:#}", e)))?;

    if let Some(program) = args.trainer {
        config.trainer.program = program;
    }
    if let Some(script) = args.script {
        config.trainer.args = vec![script];
    }
    if let Some(tmp_root) = args.tmp_root {
        config.tmp_root = Some(tmp_root);
    }
    config.cleanup_on_success |= args.cleanup;
    config.capture_logs |= args.capture_logs;

    let launcher = Arc::new(ProcessLauncher::new(config.trainer.clone()));
    let smoke = SmokeTest::new(config, launcher)?;

    smoke.run(args.gpu).await
}

/// Paths of a passed run; removed workspaces are marked rather than listed
fn success_summary(report: &SmokeReport) -> String {
    if report.cleaned_up {
        format!(
            "workspace: {} (removed)\nartifact:  {} (removed)",
            report.workspace.display(),
            report.artifact.display()
        )
    } else {
        format!(
            "workspace: {}\nartifact:  {}",
            report.workspace.display(),
            report.artifact.display()
        )
    }
}

/// Narrow an error's exit code to a non-zero process status
fn process_code(code: i32) -> u8 {
    u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1)
}

fn init_tracing() {
    let show_debug = std::env::var("RLSMOKE_DEBUG")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    // Default: INFO level, RUST_LOG takes precedence
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if show_debug { "debug" } else { "info" })
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    // Bridge log crate → tracing
    tracing_log::LogTracer::init().ok();
}
