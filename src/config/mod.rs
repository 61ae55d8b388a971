// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{
    apply_env_overrides, default_config_path, load_config, load_from_file, TMPDIR_ENV,
    TRAINER_ENV,
};
pub use settings::{Config, RunConfig, TrainerCommand};
