// Artifact discovery - finds the finished model written by the trainer

use glob::Pattern;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::SmokeError;

/// Find the single entry under `search_dir` whose file name matches `pattern`
///
/// The search is recursive, but a matching directory is not descended into,
/// so files inside a finished model never count as extra candidates.
/// Zero matches and several matches are both errors; nothing is guessed.
/// A `search_dir` that does not exist counts as zero matches.
pub fn discover_artifact(search_dir: &Path, pattern: &str) -> Result<PathBuf, SmokeError> {
    let matcher = Pattern::new(pattern).map_err(|e| {
        SmokeError::Config(format!("invalid artifact pattern '{}': {}", pattern, e))
    })?;

    let mut candidates = Vec::new();

    if search_dir.is_dir() {
        let mut walker = WalkDir::new(search_dir).min_depth(1).into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| search_dir.to_path_buf());
                SmokeError::filesystem(path, io::Error::from(e))
            })?;

            let name = entry.file_name().to_string_lossy();
            if matcher.matches(&name) {
                debug!(path = %entry.path().display(), "Artifact candidate");
                candidates.push(entry.path().to_path_buf());
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
            }
        }
    }

    candidates.sort();

    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }

    Err(SmokeError::ArtifactNotFound {
        search_dir: search_dir.to_path_buf(),
        pattern: pattern.to_string(),
        candidates,
    })
}
