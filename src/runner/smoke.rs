// Smoke test sequence
//
// workspace -> train -> discover *_finish -> demo. Strictly sequential and
// fail-fast: the first error ends the run and nothing after it executes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::artifact::discover_artifact;
use super::launcher::{Invocation, Launcher};
use super::workspace::Workspace;
use super::Accelerator;
use crate::config::Config;
use crate::errors::SmokeError;

/// Summary file written at the workspace root after a successful run
pub const REPORT_FILE: &str = "smoke_report.json";

/// Outcome of a successful smoke run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeReport {
    pub workspace: PathBuf,
    pub train_outdir: PathBuf,
    pub demo_outdir: PathBuf,
    /// Finished model handed to the demo run
    pub artifact: PathBuf,
    pub accelerator: Accelerator,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub train_secs: f64,
    pub demo_secs: f64,
    /// True when the workspace was removed after the run
    pub cleaned_up: bool,
}

/// Drives one train-then-demo smoke run
pub struct SmokeTest {
    config: Config,
    launcher: Arc<dyn Launcher>,
}

impl SmokeTest {
    /// Validates the configuration up front so a bad value never starts a trainer
    pub fn new(config: Config, launcher: Arc<dyn Launcher>) -> Result<Self, SmokeError> {
        config.validate()?;
        Ok(Self { config, launcher })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, gpu: Accelerator) -> Result<SmokeReport, SmokeError> {
        let started_at = Utc::now();
        let run = &self.config.run;

        let workspace = Workspace::create(self.config.tmp_root.as_deref())?;
        let train_outdir = workspace.join(&run.train_subdir);
        let demo_outdir = workspace.join(&run.demo_subdir);

        info!(
            steps = run.steps,
            env = %run.env,
            gpu = %gpu,
            outdir = %train_outdir.display(),
            "Starting training run"
        );
        let train = self.invocation(Invocation::train(run, &train_outdir, gpu), &workspace);
        let timer = Instant::now();
        self.launcher.launch(&train).await?;
        let train_secs = timer.elapsed().as_secs_f64();

        let artifact = discover_artifact(&train_outdir, &run.artifact_pattern)?;
        info!(artifact = %artifact.display(), "Found finished model");

        info!(eval_n_runs = run.eval_n_runs, "Starting demo run");
        let demo = self.invocation(
            Invocation::demo(run, &artifact, &demo_outdir, gpu),
            &workspace,
        );
        let timer = Instant::now();
        self.launcher.launch(&demo).await?;
        let demo_secs = timer.elapsed().as_secs_f64();

        let mut report = SmokeReport {
            workspace: workspace.path().to_path_buf(),
            train_outdir,
            demo_outdir,
            artifact,
            accelerator: gpu,
            started_at,
            finished_at: Utc::now(),
            train_secs,
            demo_secs,
            cleaned_up: false,
        };

        if self.config.cleanup_on_success {
            match workspace.remove() {
                Ok(()) => report.cleaned_up = true,
                Err(e) => warn!("Failed to clean up workspace: {}", e),
            }
        } else if let Err(e) = write_report(&workspace, &report) {
            warn!("Failed to write {}: {}", REPORT_FILE, e);
        }

        info!(
            workspace = %report.workspace.display(),
            train_secs = report.train_secs,
            demo_secs = report.demo_secs,
            "Smoke test passed"
        );

        Ok(report)
    }

    fn invocation(&self, invocation: Invocation, workspace: &Workspace) -> Invocation {
        if self.config.capture_logs {
            let log = workspace.join(format!("{}.log", invocation.mode.log_stem()));
            invocation.with_log_file(log)
        } else {
            invocation
        }
    }
}

fn write_report(workspace: &Workspace, report: &SmokeReport) -> Result<(), SmokeError> {
    let path = workspace.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| SmokeError::filesystem(&path, e.into()))?;
    std::fs::write(&path, json).map_err(|e| SmokeError::filesystem(&path, e))
}
