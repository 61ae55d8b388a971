// Configuration loader
// Loads ~/.rlsmoke/config.toml (or an explicit path), then applies RLSMOKE_* overrides

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;

/// Environment variable overriding the trainer program
pub const TRAINER_ENV: &str = "RLSMOKE_TRAINER";

/// Environment variable overriding the workspace parent directory
pub const TMPDIR_ENV: &str = "RLSMOKE_TMPDIR";

/// Load configuration from an explicit file, the default file, or defaults
///
/// An explicit path must exist. The default `~/.rlsmoke/config.toml` is
/// optional; when it is missing the built-in defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            load_from_file(path)?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => load_from_file(&path)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// `~/.rlsmoke/config.toml`, if a home directory can be determined
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".rlsmoke").join("config.toml"))
}

pub fn load_from_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Loaded config file");

    Ok(config)
}

/// Apply RLSMOKE_* overrides using `lookup` to read variables
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(program) = lookup(TRAINER_ENV).filter(|v| !v.trim().is_empty()) {
        tracing::debug!(program = %program, "Trainer program overridden from environment");
        config.trainer.program = program;
    }

    if let Some(dir) = lookup(TMPDIR_ENV).filter(|v| !v.trim().is_empty()) {
        config.tmp_root = Some(PathBuf::from(dir));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
cleanup_on_success = true

[trainer]
program = "python3"

[run]
steps = 2000
env = "Walker2d-v2"
"#,
        )
        .unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.trainer.program, "python3");
        // args were not given, so they keep their default
        assert_eq!(config.trainer.args, Config::default().trainer.args);
        assert_eq!(config.run.steps, 2000);
        assert_eq!(config.run.env, "Walker2d-v2");
        assert_eq!(config.run.batch_size, 16);
        assert!(config.cleanup_on_success);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[run\nsteps = ").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (TRAINER_ENV, "/opt/venv/bin/python"),
            (TMPDIR_ENV, "/scratch"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.trainer.program, "/opt/venv/bin/python");
        assert_eq!(config.tmp_root, Some(PathBuf::from("/scratch")));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |_| Some("   ".to_string()));
        assert_eq!(config, Config::default());
    }
}
