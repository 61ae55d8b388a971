// Trainer launcher
//
// Builds the argument lists for the training and demo invocations and runs
// the trainer as a blocking (awaited) subprocess.

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, info};

use super::{Accelerator, Mode};
use crate::config::{RunConfig, TrainerCommand};
use crate::errors::SmokeError;

/// One call of the trainer: the mode plus the flags that follow the base command
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub mode: Mode,
    pub args: Vec<OsString>,
    /// Where to send stdout/stderr; inherited when `None`
    pub log_file: Option<PathBuf>,
}

impl Invocation {
    /// Training run with the fixed smoke-test budget
    pub fn train(run: &RunConfig, outdir: &Path, gpu: Accelerator) -> Self {
        let mut args = Vec::new();
        push_flag(&mut args, "--steps", run.steps.to_string());
        push_flag(&mut args, "--update-interval", run.update_interval.to_string());
        push_flag(&mut args, "--batchsize", run.batch_size.to_string());
        push_flag(&mut args, "--epochs", run.epochs.to_string());
        push_flag(&mut args, "--outdir", outdir);
        push_flag(&mut args, "--env", &run.env);
        push_flag(&mut args, "--gpu", gpu.to_string());

        Self {
            mode: Mode::Train,
            args,
            log_file: None,
        }
    }

    /// Demo run loading `model` for a fixed number of evaluation episodes
    pub fn demo(run: &RunConfig, model: &Path, outdir: &Path, gpu: Accelerator) -> Self {
        let mut args = vec![OsString::from("--demo")];
        push_flag(&mut args, "--load", model);
        push_flag(&mut args, "--eval-n-runs", run.eval_n_runs.to_string());
        push_flag(&mut args, "--env", &run.env);
        push_flag(&mut args, "--outdir", outdir);
        push_flag(&mut args, "--gpu", gpu.to_string());

        Self {
            mode: Mode::Demo,
            args,
            log_file: None,
        }
    }

    pub fn with_log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    /// Value following `flag`, if present
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

fn push_flag(args: &mut Vec<OsString>, flag: &str, value: impl AsRef<OsStr>) {
    args.push(OsString::from(flag));
    args.push(value.as_ref().to_os_string());
}

/// Runs a trainer invocation to completion
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Block until the invocation exits; non-zero exit is `SmokeError::Subprocess`
    async fn launch(&self, invocation: &Invocation) -> Result<(), SmokeError>;
}

/// Launches the configured trainer as a child process
pub struct ProcessLauncher {
    command: TrainerCommand,
}

impl ProcessLauncher {
    pub fn new(command: TrainerCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &TrainerCommand {
        &self.command
    }

    fn subprocess_error(&self, mode: Mode, code: Option<i32>, spawn_error: Option<std::io::Error>) -> SmokeError {
        SmokeError::Subprocess {
            mode,
            program: self.command.program.clone(),
            code,
            spawn_error,
        }
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, invocation: &Invocation) -> Result<(), SmokeError> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args).args(&invocation.args);

        if let Some(log_path) = &invocation.log_file {
            let log_file = std::fs::File::create(log_path)
                .map_err(|e| SmokeError::filesystem(log_path, e))?;
            let stdout = log_file
                .try_clone()
                .map_err(|e| SmokeError::filesystem(log_path, e))?;
            cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(log_file));
            info!("{} logs will be written to: {}", invocation.mode, log_path.display());
        }

        debug!(
            mode = %invocation.mode,
            program = %self.command.program,
            args = ?invocation.args,
            "Spawning trainer"
        );

        let status = cmd
            .status()
            .await
            .map_err(|e| self.subprocess_error(invocation.mode, None, Some(e)))?;

        if status.success() {
            info!(mode = %invocation.mode, "Trainer exited successfully");
            Ok(())
        } else {
            let code = exit_code(status);
            tracing::error!(mode = %invocation.mode, code = ?code, "Trainer failed");
            Err(self.subprocess_error(invocation.mode, code, None))
        }
    }
}

/// Exit code of a finished child; signal deaths map to 128 + signal on Unix
fn exit_code(status: ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(inv: &Invocation) -> Vec<String> {
        inv.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_train_invocation_layout() {
        let run = RunConfig::default();
        let inv = Invocation::train(&run, Path::new("/tmp/ws/mujoco/ppo_batch"), Accelerator::NONE);

        assert_eq!(inv.mode, Mode::Train);
        assert_eq!(
            args_as_strings(&inv),
            vec![
                "--steps", "100",
                "--update-interval", "50",
                "--batchsize", "16",
                "--epochs", "2",
                "--outdir", "/tmp/ws/mujoco/ppo_batch",
                "--env", "Hopper-v2",
                "--gpu", "-1",
            ]
        );
        assert!(!inv.has_flag("--demo"));
    }

    #[test]
    fn test_demo_invocation_layout() {
        let run = RunConfig::default();
        let inv = Invocation::demo(
            &run,
            Path::new("/tmp/ws/mujoco/ppo_batch/run1_finish"),
            Path::new("/tmp/ws/temp"),
            Accelerator::device(0),
        );

        assert_eq!(inv.mode, Mode::Demo);
        assert!(inv.has_flag("--demo"));
        assert_eq!(
            inv.value_of("--load"),
            Some(OsStr::new("/tmp/ws/mujoco/ppo_batch/run1_finish"))
        );
        assert_eq!(inv.value_of("--eval-n-runs"), Some(OsStr::new("1")));
        assert_eq!(inv.value_of("--outdir"), Some(OsStr::new("/tmp/ws/temp")));
        assert_eq!(inv.value_of("--gpu"), Some(OsStr::new("0")));
        assert!(inv.value_of("--steps").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_success_and_failure() {
        let ok = ProcessLauncher::new(TrainerCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 0".to_string(), "trainer".to_string()],
        });
        let inv = Invocation::train(&RunConfig::default(), Path::new("/tmp/unused"), Accelerator::NONE);
        ok.launch(&inv).await.unwrap();

        let failing = ProcessLauncher::new(TrainerCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 3".to_string(), "trainer".to_string()],
        });
        let err = failing.launch(&inv).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(matches!(err, SmokeError::Subprocess { mode: Mode::Train, code: Some(3), .. }));
    }

    #[tokio::test]
    async fn test_launch_missing_program() {
        let launcher = ProcessLauncher::new(TrainerCommand {
            program: "rlsmoke-definitely-not-a-real-trainer".to_string(),
            args: vec![],
        });
        let inv = Invocation::train(&RunConfig::default(), Path::new("/tmp/unused"), Accelerator::NONE);

        let err = launcher.launch(&inv).await.unwrap_err();
        assert!(matches!(err, SmokeError::Subprocess { code: None, spawn_error: Some(_), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_logs() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("train.log");
        let launcher = ProcessLauncher::new(TrainerCommand {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo out; echo err >&2".to_string(),
                "trainer".to_string(),
            ],
        });
        let inv = Invocation::train(&RunConfig::default(), Path::new("/tmp/unused"), Accelerator::NONE)
            .with_log_file(log_path.clone());

        launcher.launch(&inv).await.unwrap();

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("out"));
        assert!(log.contains("err"));
    }
}
