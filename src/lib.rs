// rlsmoke - Smoke-test runner for PPO batch training examples
// Library exports

pub mod config;
pub mod errors;
pub mod runner; // Workspace, trainer launch, artifact discovery

pub use errors::SmokeError;
pub use runner::{Accelerator, SmokeReport, SmokeTest};
