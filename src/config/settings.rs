// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::errors::SmokeError;

/// Everything one smoke run needs besides the accelerator index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How to launch the training program
    pub trainer: TrainerCommand,

    /// Parameters forwarded to the trainer
    pub run: RunConfig,

    /// Parent directory for the scratch workspace (system temp dir when unset)
    pub tmp_root: Option<PathBuf>,

    /// Remove the workspace after a fully successful run
    pub cleanup_on_success: bool,

    /// Redirect trainer stdout/stderr into `<mode>.log` inside the workspace
    pub capture_logs: bool,
}

/// Program plus leading arguments, e.g. `python examples/mujoco/train_ppo_batch_gym.py`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for TrainerCommand {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["examples/mujoco/train_ppo_batch_gym.py".to_string()],
        }
    }
}

/// Fixed parameter set of the training and demo invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Total environment steps (default: 100)
    pub steps: u64,

    /// Steps between policy updates (default: 50)
    pub update_interval: u64,

    /// Minibatch size (default: 16)
    pub batch_size: u64,

    /// Optimisation epochs per update (default: 2)
    pub epochs: u64,

    /// Gym environment id (default: Hopper-v2)
    pub env: String,

    /// Training output, relative to the workspace (default: mujoco/ppo_batch)
    pub train_subdir: PathBuf,

    /// Demo output, relative to the workspace (default: temp)
    pub demo_subdir: PathBuf,

    /// Evaluation episodes in demo mode (default: 1)
    pub eval_n_runs: u64,

    /// File-name pattern of the finished model (default: *_finish)
    pub artifact_pattern: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            update_interval: 50,
            batch_size: 16,
            epochs: 2,
            env: "Hopper-v2".to_string(),
            train_subdir: PathBuf::from("mujoco/ppo_batch"),
            demo_subdir: PathBuf::from("temp"),
            eval_n_runs: 1,
            artifact_pattern: "*_finish".to_string(),
        }
    }
}

impl Config {
    /// Reject values the trainer cannot meaningfully run with
    pub fn validate(&self) -> Result<(), SmokeError> {
        if self.trainer.program.trim().is_empty() {
            return Err(SmokeError::Config("trainer program is empty".to_string()));
        }

        let counts = [
            ("steps", self.run.steps),
            ("update_interval", self.run.update_interval),
            ("batch_size", self.run.batch_size),
            ("epochs", self.run.epochs),
            ("eval_n_runs", self.run.eval_n_runs),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(SmokeError::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.run.env.trim().is_empty() {
            return Err(SmokeError::Config("env is empty".to_string()));
        }

        if self.run.artifact_pattern.is_empty() {
            return Err(SmokeError::Config("artifact_pattern is empty".to_string()));
        }
        glob::Pattern::new(&self.run.artifact_pattern).map_err(|e| {
            SmokeError::Config(format!(
                "artifact_pattern '{}' is not a valid pattern: {}",
                self.run.artifact_pattern, e
            ))
        })?;

        check_subdir("train_subdir", &self.run.train_subdir)?;
        check_subdir("demo_subdir", &self.run.demo_subdir)?;

        Ok(())
    }
}

/// Subdirectories must stay inside the workspace
fn check_subdir(name: &str, path: &Path) -> Result<(), SmokeError> {
    if path.as_os_str().is_empty() {
        return Err(SmokeError::Config(format!("{} is empty", name)));
    }
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(SmokeError::Config(format!(
            "{} must be a relative path inside the workspace: {}",
            name,
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.run.steps, 100);
        assert_eq!(config.run.update_interval, 50);
        assert_eq!(config.run.batch_size, 16);
        assert_eq!(config.run.epochs, 2);
        assert_eq!(config.run.eval_n_runs, 1);
        assert_eq!(config.run.artifact_pattern, "*_finish");
        assert!(!config.cleanup_on_success);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_steps_rejected() {
        let mut config = Config::default();
        config.run.steps = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("steps"));
    }

    #[test]
    fn test_escaping_subdir_rejected() {
        let mut config = Config::default();
        config.run.train_subdir = PathBuf::from("../outside");
        assert!(config.validate().is_err());

        config.run.train_subdir = PathBuf::from("/abs/path");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut config = Config::default();
        config.trainer.program = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let mut config = Config::default();
        config.run.artifact_pattern = "[unclosed".to_string();
        assert!(config.validate().is_err());
    }
}
