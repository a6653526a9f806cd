//! Output file resolution across candidate storage locations.
//!
//! Finished files may land in ComfyUI's own output directory or in the
//! temporary directories of auxiliary pipelines chained after the engine.
//! The store probes a fixed ordered list of candidates and serves the
//! first match.

use std::path::{Path, PathBuf};

/// Errors from output resolution.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// No candidate directory contains the requested file.
    #[error("File '{0}' not found in any of the expected locations")]
    NotFound(String),

    /// The requested name was not a plain filename.
    #[error("Invalid output filename '{0}'")]
    InvalidName(String),
}

/// Resolves output filenames against an ordered list of directories.
#[derive(Debug, Clone)]
pub struct OutputStore {
    candidate_dirs: Vec<PathBuf>,
}

impl OutputStore {
    pub fn new(candidate_dirs: Vec<PathBuf>) -> Self {
        Self { candidate_dirs }
    }

    /// Directories probed, in order.
    pub fn candidate_dirs(&self) -> &[PathBuf] {
        &self.candidate_dirs
    }

    /// Resolve a filename to the first candidate path that exists.
    ///
    /// Rejects names containing path separators or `..` so a caller can
    /// never escape the candidate directories.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, OutputError> {
        if !is_plain_filename(filename) {
            return Err(OutputError::InvalidName(filename.to_string()));
        }

        self.candidate_dirs
            .iter()
            .map(|dir| dir.join(filename))
            .find(|path| path.is_file())
            .ok_or_else(|| OutputError::NotFound(filename.to_string()))
    }
}

/// A plain filename has no path components and is not a dot-traversal.
fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
        && Path::new(name).file_name().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_file_in_first_directory() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("out.png"), b"png").unwrap();

        let store = OutputStore::new(vec![first.path().into(), second.path().into()]);
        let path = store.resolve("out.png").unwrap();
        assert_eq!(path, first.path().join("out.png"));
    }

    #[test]
    fn falls_through_to_second_directory() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("video.mp4"), b"mp4 bytes").unwrap();

        let store = OutputStore::new(vec![first.path().into(), second.path().into()]);
        let path = store.resolve("video.mp4").unwrap();
        assert_eq!(path, second.path().join("video.mp4"));
        assert_eq!(std::fs::read(path).unwrap(), b"mp4 bytes");
    }

    #[test]
    fn first_directory_wins_when_both_have_the_file() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("dup.png"), b"first").unwrap();
        std::fs::write(second.path().join("dup.png"), b"second").unwrap();

        let store = OutputStore::new(vec![first.path().into(), second.path().into()]);
        let path = store.resolve("dup.png").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"first");
    }

    #[test]
    fn missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(vec![dir.path().into()]);
        assert!(matches!(
            store.resolve("ghost.png"),
            Err(OutputError::NotFound(_))
        ));
    }

    #[test]
    fn path_traversal_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(vec![dir.path().into()]);

        for name in ["../secret.png", "a/b.png", "..", "", "dir\\file.png"] {
            assert!(
                matches!(store.resolve(name), Err(OutputError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
