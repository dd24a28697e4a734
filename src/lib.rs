pub mod env;
pub mod error;
pub mod fetch;
pub mod fs;
pub mod git;
mod helpers;
pub mod licenses;
pub mod logging;
pub mod options;
pub mod orchestrator;
pub mod template;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

pub use crate::{
    error::{DirectoryProblem, SetupError},
    options::{LogLevel, Opts, PackagingMetadata, ProjectConfig},
    orchestrator::{Collaborators, Orchestrator, RunSummary, StepKind, StepOutcome},
    template::{Renderer, TemplateContext},
};

use crate::{
    env::Virtualenv,
    fetch::{CachingFetcher, HttpFetcher},
    fs::LocalWorkspace,
    git::GitRepository,
};

/// The step counter for a run: drawn on stderr at `warning` and below, hidden
/// otherwise. Log output must go through [`logging::init`] with the same bar.
pub fn progress_bar(level: LogLevel) -> Result<ProgressBar> {
    if level > LogLevel::Warning {
        return Ok(ProgressBar::hidden());
    }
    Ok(ProgressBar::new(0)
        .with_style(ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")?))
}

/// Runs every requested step against the real filesystem, git, virtualenv and network.
pub fn bootstrap(
    config: &ProjectConfig,
    level: LogLevel,
    progress: ProgressBar,
) -> Result<RunSummary> {
    let renderer = match &config.templates {
        Some(dir) => Renderer::with_overrides(dir)?,
        None => Renderer::new()?,
    };
    let environments = Virtualenv::new(
        config
            .envs_root
            .clone()
            .unwrap_or_else(Virtualenv::default_root),
    );
    let fetcher = CachingFetcher::new(HttpFetcher::new(config.fetch_policy)?);
    let tools = Collaborators {
        workspace: &LocalWorkspace,
        vcs: &GitRepository,
        environments: &environments,
        fetcher: &fetcher,
    };

    Ok(Orchestrator::new(config, &renderer, tools, level)
        .with_progress(progress)
        .run())
}
