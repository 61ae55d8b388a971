// Error taxonomy for smoke runs
//
// Every failure aborts the run. Each variant knows which exit code it maps to
// and carries a short hint that main prints underneath the error.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::runner::Mode;

/// Exit code used when the failure did not come from a trainer process
pub const GENERIC_FAILURE_CODE: i32 = 1;

/// Exit code used for configuration problems
pub const CONFIG_FAILURE_CODE: i32 = 2;

#[derive(Debug, Error)]
pub enum SmokeError {
    /// Scratch directory could not be created or prepared
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Trainer could not be spawned or exited unsuccessfully
    #[error("{mode} step failed: {program} {}", describe_exit(*code, spawn_error.as_ref()))]
    Subprocess {
        mode: Mode,
        program: String,
        /// Exit code of the child, `None` when it never started
        code: Option<i32>,
        spawn_error: Option<io::Error>,
    },

    /// Discovery did not resolve to exactly one artifact
    #[error(
        "expected exactly one entry matching '{pattern}' under {}, found {}{}",
        search_dir.display(),
        candidates.len(),
        list_candidates(candidates)
    )]
    ArtifactNotFound {
        search_dir: PathBuf,
        pattern: String,
        candidates: Vec<PathBuf>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SmokeError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Process exit code this error should surface as
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Subprocess {
                code: Some(code), ..
            } if *code != 0 => *code,
            Self::Config(_) => CONFIG_FAILURE_CODE,
            _ => GENERIC_FAILURE_CODE,
        }
    }

    /// True when discovery found several candidates rather than none
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::ArtifactNotFound { candidates, .. } if candidates.len() > 1)
    }

    /// Short actionable hint for the user
    pub fn suggestion(&self) -> String {
        match self {
            Self::Filesystem { path, .. } => format!(
                "Check that {} is writable, or pick another location with --tmp-root",
                path.display()
            ),
            Self::Subprocess {
                spawn_error: Some(_),
                program,
                ..
            } => format!(
                "Could not start '{}'. Check it is on PATH or pass --trainer",
                program
            ),
            Self::Subprocess { mode, .. } => format!(
                "Inspect the {} output above (or {}.log with --capture-logs)",
                mode,
                mode.log_stem()
            ),
            Self::ArtifactNotFound { candidates, .. } if candidates.len() > 1 => {
                "Several finished models were written; the trainer should emit exactly one per run"
                    .to_string()
            }
            Self::ArtifactNotFound { .. } => {
                "Training exited cleanly but saved no finished model. Check the step budget and --outdir handling"
                    .to_string()
            }
            Self::Config(_) => "Fix the value in ~/.rlsmoke/config.toml or on the command line"
                .to_string(),
        }
    }
}

fn describe_exit(code: Option<i32>, spawn_error: Option<&io::Error>) -> String {
    match (code, spawn_error) {
        (_, Some(e)) => format!("could not be started: {}", e),
        (Some(code), None) => format!("exited with status {}", code),
        (None, None) => "terminated without an exit status".to_string(),
    }
}

fn list_candidates(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    let names: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    format!(" ({})", names.join(", "))
}

/// Wrap an error with a highlighted suggestion line
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\
        \x1b[1;33mSuggestion:\x1b[0m {}",
        error, suggestion
    )
}
