//! Graph output: path configuration and `.dot` file writing.

use std::path::{Path, PathBuf};
use std::{env, fs};
use thiserror::Error;

/// Environment variable overriding where the captured graph is written.
pub const OUTPUT_ENV: &str = "SKEIN_OUTPUT";

const DEFAULT_OUTPUT: &str = "sync_graph.dot";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output path must end in .dot: {0:?}")]
    BadExtension(PathBuf),
    #[error("output path must not contain spaces: {0:?}")]
    SpaceInPath(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The configured output path for the next capture.
pub(crate) fn output_path() -> PathBuf {
    env::var_os(OUTPUT_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

/// Writes `graph` to `path`, replacing any previous capture at that path.
pub(crate) fn save_dot(path: &Path, graph: &str) -> Result<(), OutputError> {
    if path.extension().and_then(|e| e.to_str()) != Some("dot") {
        return Err(OutputError::BadExtension(path.to_owned()));
    }
    // spaces break the downstream renderer invocation
    if path.to_string_lossy().contains(' ') {
        return Err(OutputError::SpaceInPath(path.to_owned()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        fs::remove_file(path)?;
    }
    fs::write(path, graph.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let mut p = env::temp_dir();
        p.push(format!("skein_{}_{}", std::process::id(), name));
        p
    }

    #[test]
    fn rejects_wrong_extension() {
        let err = save_dot(Path::new("graph.txt"), "digraph G {}\n");
        assert!(matches!(err, Err(OutputError::BadExtension(_))));
    }

    #[test]
    fn rejects_spaces() {
        let err = save_dot(Path::new("my graphs/sync.dot"), "digraph G {}\n");
        assert!(matches!(err, Err(OutputError::SpaceInPath(_))));
    }

    #[test]
    fn creates_parent_and_overwrites() {
        let dir = scratch_path("out");
        let file = dir.join("nested").join("sync.dot");
        save_dot(&file, "digraph A {}\n").unwrap();
        save_dot(&file, "digraph B {}\n").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "digraph B {}\n");
        fs::remove_dir_all(&dir).unwrap();
    }
}
