use std::{io, path::PathBuf};

use thiserror::Error;

/// Everything that can go wrong while setting up a project.
///
/// `InvalidArgument` is raised before any side effect. A `Directory` error on the
/// project directory itself stops the run; every other kind stays local to the
/// step that produced it.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot use {}: {problem}", path.display())]
    Directory {
        path: PathBuf,
        problem: DirectoryProblem,
    },

    #[error("{what} is unavailable: {reason}")]
    ResourceUnavailable { what: String, reason: String },

    #[error("{tool} failed: {detail}")]
    ExternalTool { tool: String, detail: String },

    #[error("template `{0}` not found")]
    TemplateMissing(String),

    #[error("cannot render template `{name}`: {reason}")]
    TemplateSyntax { name: String, reason: String },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DirectoryProblem {
    #[error("it already exists and is not empty")]
    NotEmpty,
    #[error("permission denied")]
    PermissionDenied,
    #[error("no such directory")]
    NotFound,
    #[error("it is not a directory")]
    NotADirectory,
    #[error(transparent)]
    Io(io::Error),
}

impl DirectoryProblem {
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::AlreadyExists => Self::NotEmpty,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io(err),
        }
    }
}

impl SetupError {
    pub(crate) fn directory(path: impl Into<PathBuf>, problem: DirectoryProblem) -> Self {
        Self::Directory {
            path: path.into(),
            problem,
        }
    }

    pub(crate) fn tool(tool: &str, detail: impl ToString) -> Self {
        Self::ExternalTool {
            tool: tool.to_string(),
            detail: detail.to_string(),
        }
    }
}
