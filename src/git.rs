use std::path::Path;

use anyhow::{Context, Result};
use git2::{Repository, Signature};
use tracing::debug;

use crate::error::SetupError;

const FALLBACK_NAME: &str = "Change Me";
const FALLBACK_EMAIL: &str = "change@me.org";

/// Version control as needed by the setup steps.
pub trait Vcs {
    fn init(&self, dir: &Path) -> Result<(), SetupError>;
    /// Stages `files` (relative to `dir`) and commits them on top of HEAD.
    fn commit(&self, dir: &Path, files: &[&str], message: &str) -> Result<(), SetupError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitRepository;

impl Vcs for GitRepository {
    fn init(&self, dir: &Path) -> Result<(), SetupError> {
        Repository::init(dir)
            .with_context(|| format!("cannot initialize repository at {}", dir.display()))
            .map_err(|e| SetupError::tool("git", format!("{e:#}")))?;
        Ok(())
    }

    fn commit(&self, dir: &Path, files: &[&str], message: &str) -> Result<(), SetupError> {
        commit_files(dir, files, message).map_err(|e| SetupError::tool("git", format!("{e:#}")))
    }
}

fn commit_files(dir: &Path, files: &[&str], message: &str) -> Result<()> {
    let repo = Repository::open(dir)
        .with_context(|| format!("cannot open repository at {}", dir.display()))?;
    let mut index = repo.index()?;
    for file in files {
        index
            .add_path(Path::new(file))
            .with_context(|| format!("cannot stage {file}"))?;
    }
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;

    // unconfigured machines still get a commit
    let signature = repo
        .signature()
        .or_else(|_| Signature::now(FALLBACK_NAME, FALLBACK_EMAIL))?;
    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .context("cannot create commit")?;
    debug!(%oid, message, "committed {}", files.join(", "));
    Ok(())
}
