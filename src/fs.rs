use std::{fs, io, path::Path};

use crate::error::{DirectoryProblem, SetupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Missing,
    EmptyDirectory,
    NonEmptyDirectory,
    NotADirectory,
}

/// The filesystem as seen by the setup steps.
pub trait Workspace {
    fn inspect(&self, path: &Path) -> Result<PathState, SetupError>;
    /// Creates `path` and any missing parents.
    fn create_dir(&self, path: &Path) -> Result<(), SetupError>;
    fn write_file(&self, path: &Path, contents: &str) -> Result<(), SetupError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalWorkspace;

impl Workspace for LocalWorkspace {
    fn inspect(&self, path: &Path) -> Result<PathState, SetupError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PathState::Missing),
            Err(e) => return Err(SetupError::directory(path, DirectoryProblem::from_io(e))),
        };
        if !metadata.is_dir() {
            return Ok(PathState::NotADirectory);
        }
        let mut entries = fs::read_dir(path)
            .map_err(|e| SetupError::directory(path, DirectoryProblem::from_io(e)))?;
        Ok(match entries.next() {
            None => PathState::EmptyDirectory,
            Some(_) => PathState::NonEmptyDirectory,
        })
    }

    fn create_dir(&self, path: &Path) -> Result<(), SetupError> {
        fs::create_dir_all(path).map_err(|e| {
            let problem = if path.exists() && !path.is_dir() {
                DirectoryProblem::NotADirectory
            } else {
                DirectoryProblem::from_io(e)
            };
            SetupError::directory(path, problem)
        })
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<(), SetupError> {
        fs::write(path, contents).map_err(|source| SetupError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
