//! Decides which setup steps a configuration asks for and runs them in order.
//!
//! The plan is a fixed list of steps, each with the switch that requests it and
//! the steps it cannot run without. The project directory gates everything:
//! if it cannot be established the run stops. Any other failure only blocks
//! the steps that depend on it.

use std::{fmt, process::ExitCode};

use console::{Emoji, Style};
use indicatif::ProgressBar;
use tracing::{debug, error, info, info_span, warn};

use crate::{
    env::EnvironmentManager,
    error::{DirectoryProblem, SetupError},
    fetch::{ResourceFetcher, ResourceKind, IGNORE_BOILERPLATES, PACKAGING_SKELETONS},
    fs::{PathState, Workspace},
    git::Vcs,
    licenses,
    options::{LogLevel, ProjectConfig},
    template::{Renderer, TemplateContext},
};

pub const README_FILE: &str = "README.md";
pub const LICENSE_FILE: &str = "LICENSE.txt";
pub const IGNORE_FILE: &str = ".gitignore";
pub const SCRIPT_EXTENSION: &str = "py";

/// Package subdirectories, and whether each gets an `__init__.py`.
const PACKAGE_SUBDIRECTORIES: &[(&str, bool)] =
    &[("scripts", true), ("tests", true), ("data", false)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepKind {
    MakeDirectory,
    CreateEnvironment,
    InitVcs,
    WriteIgnoreFile,
    WriteReadme,
    WriteScript,
    WriteLicense,
    WritePackaging,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepKind::MakeDirectory => "project directory",
            StepKind::CreateEnvironment => "virtual environment",
            StepKind::InitVcs => "git repository",
            StepKind::WriteIgnoreFile => ".gitignore",
            StepKind::WriteReadme => "readme",
            StepKind::WriteScript => "script",
            StepKind::WriteLicense => "license",
            StepKind::WritePackaging => "package files",
        })
    }
}

pub struct SetupStep {
    pub kind: StepKind,
    pub requested: fn(&ProjectConfig) -> bool,
    pub requires: &'static [StepKind],
}

pub const PLAN: &[SetupStep] = &[
    SetupStep {
        kind: StepKind::MakeDirectory,
        requested: wants_directory,
        requires: &[],
    },
    SetupStep {
        kind: StepKind::CreateEnvironment,
        requested: wants_environment,
        requires: &[StepKind::MakeDirectory],
    },
    SetupStep {
        kind: StepKind::InitVcs,
        requested: wants_vcs,
        requires: &[StepKind::MakeDirectory],
    },
    SetupStep {
        kind: StepKind::WriteIgnoreFile,
        requested: wants_vcs,
        requires: &[StepKind::MakeDirectory, StepKind::InitVcs],
    },
    SetupStep {
        kind: StepKind::WriteReadme,
        requested: wants_readme,
        requires: &[StepKind::MakeDirectory],
    },
    SetupStep {
        kind: StepKind::WriteScript,
        requested: wants_script,
        requires: &[StepKind::MakeDirectory],
    },
    SetupStep {
        kind: StepKind::WriteLicense,
        requested: wants_license,
        requires: &[StepKind::MakeDirectory],
    },
    SetupStep {
        kind: StepKind::WritePackaging,
        requested: wants_package,
        requires: &[StepKind::MakeDirectory],
    },
];

fn wants_directory(config: &ProjectConfig) -> bool {
    config.create_directory || config.wants_content()
}

fn wants_environment(config: &ProjectConfig) -> bool {
    config.init_env
}

fn wants_vcs(config: &ProjectConfig) -> bool {
    config.init_vcs
}

fn wants_readme(config: &ProjectConfig) -> bool {
    config.init_readme
}

fn wants_script(config: &ProjectConfig) -> bool {
    config.init_script
}

fn wants_license(config: &ProjectConfig) -> bool {
    config.license.is_some()
}

fn wants_package(config: &ProjectConfig) -> bool {
    config.setup_package
}

#[derive(Debug)]
pub enum StepOutcome {
    Done(String),
    Skipped(String),
    NotRequested,
    Failed(SetupError),
    Blocked(StepKind),
    Aborted,
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StepOutcome::Failed(_) | StepOutcome::Blocked(_) | StepOutcome::Aborted
        )
    }

    /// Whether steps requiring this one may run.
    fn is_ready(&self) -> bool {
        matches!(self, StepOutcome::Done(_) | StepOutcome::Skipped(_))
    }
}

#[derive(Debug)]
pub struct StepReport {
    pub kind: StepKind,
    pub outcome: StepOutcome,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<StepReport>,
}

impl RunSummary {
    pub fn outcome(&self, kind: StepKind) -> Option<&StepOutcome> {
        self.reports
            .iter()
            .find(|report| report.kind == kind)
            .map(|report| &report.outcome)
    }

    pub fn succeeded(&self) -> bool {
        !self.reports.iter().any(|report| report.outcome.is_failure())
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    /// One line per step, then the overall status. Quiet levels only show failures.
    pub fn print(&self, level: LogLevel) {
        let green = Style::new().green();
        let yellow = Style::new().yellow();
        let red = Style::new().red();
        let dim = Style::new().dim();
        let quiet = level >= LogLevel::Error;

        for StepReport { kind, outcome } in &self.reports {
            match outcome {
                StepOutcome::Done(detail) if !quiet => {
                    println!("{} {kind}: {}", Emoji("✅", "+"), green.apply_to(detail))
                }
                StepOutcome::Skipped(reason) if !quiet => {
                    println!("{} {kind}: {}", Emoji("⏭️ ", "-"), yellow.apply_to(reason))
                }
                StepOutcome::NotRequested if level <= LogLevel::Info => {
                    println!("{} {kind}: {}", Emoji("⏭️ ", "-"), dim.apply_to("not requested"))
                }
                StepOutcome::Failed(err) => {
                    println!("{} {kind}: {}", Emoji("❌", "x"), red.apply_to(err))
                }
                StepOutcome::Blocked(by) => println!(
                    "{} {kind}: {}",
                    Emoji("❌", "x"),
                    red.apply_to(format!("not attempted because {by} did not complete"))
                ),
                StepOutcome::Aborted => println!(
                    "{} {kind}: {}",
                    Emoji("❌", "x"),
                    red.apply_to("not attempted after a fatal error")
                ),
                _ => {}
            }
        }

        if self.succeeded() {
            if !quiet {
                println!("{}", green.apply_to("project setup complete"));
            }
        } else {
            println!("{}", red.apply_to("project setup failed"));
        }
    }
}

/// The outside world the steps act on.
pub struct Collaborators<'a> {
    pub workspace: &'a dyn Workspace,
    pub vcs: &'a dyn Vcs,
    pub environments: &'a dyn EnvironmentManager,
    pub fetcher: &'a dyn ResourceFetcher,
}

pub struct Orchestrator<'a> {
    config: &'a ProjectConfig,
    renderer: &'a Renderer,
    tools: Collaborators<'a>,
    level: LogLevel,
    progress: ProgressBar,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a ProjectConfig,
        renderer: &'a Renderer,
        tools: Collaborators<'a>,
        level: LogLevel,
    ) -> Self {
        Self {
            config,
            renderer,
            tools,
            level,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        let requested = PLAN
            .iter()
            .filter(|step| (step.requested)(self.config))
            .count();
        self.progress.set_length(requested as u64);
        debug!(requested, level = ?self.level, "planned steps");

        let mut aborted = false;
        for step in PLAN {
            let outcome = if !(step.requested)(self.config) {
                StepOutcome::NotRequested
            } else if aborted {
                StepOutcome::Aborted
            } else if let Some(missing) = step
                .requires
                .iter()
                .find(|required| !summary.outcome(**required).is_some_and(StepOutcome::is_ready))
            {
                warn!(step = %step.kind, prerequisite = %missing, "blocked");
                StepOutcome::Blocked(*missing)
            } else {
                self.progress.set_message(step.kind.to_string());
                let _span = info_span!("step", step = %step.kind).entered();
                let result = self.perform(step.kind, &summary);
                self.progress.inc(1);
                match result {
                    Ok(outcome) => outcome,
                    Err(err) if step.kind == StepKind::MakeDirectory => {
                        error!(error = %err, "cannot establish project directory");
                        aborted = true;
                        StepOutcome::Failed(err)
                    }
                    Err(err) => {
                        warn!(error = %err, "step failed");
                        StepOutcome::Failed(err)
                    }
                }
            };
            summary.reports.push(StepReport {
                kind: step.kind,
                outcome,
            });
        }
        self.progress.finish_and_clear();
        summary
    }

    fn ensure_directory(&self) -> Result<StepOutcome, SetupError> {
        let path = &self.config.target;
        let create = self.config.create_directory;
        let fail = |problem| Err(SetupError::directory(path, problem));
        match self.tools.workspace.inspect(path)? {
            PathState::Missing if create => {
                self.tools.workspace.create_dir(path)?;
                info!(path = %path.display(), "created new project directory");
                Ok(StepOutcome::Done(format!("created {}", path.display())))
            }
            PathState::Missing => fail(DirectoryProblem::NotFound),
            PathState::EmptyDirectory if create => Ok(StepOutcome::Done(format!(
                "using empty directory {}",
                path.display()
            ))),
            PathState::NonEmptyDirectory if create => fail(DirectoryProblem::NotEmpty),
            PathState::EmptyDirectory | PathState::NonEmptyDirectory => {
                Ok(StepOutcome::Skipped(format!("{} already exists", path.display())))
            }
            PathState::NotADirectory => fail(DirectoryProblem::NotADirectory),
        }
    }

    fn perform(&self, kind: StepKind, summary: &RunSummary) -> Result<StepOutcome, SetupError> {
        let vcs_ready = summary
            .outcome(StepKind::InitVcs)
            .is_some_and(StepOutcome::is_ready);
        let commit = |files: &[&str], message: &str| {
            if !vcs_ready {
                return;
            }
            if let Err(err) = self.tools.vcs.commit(&self.config.target, files, message) {
                warn!(error = %err, "files written but not committed");
            }
        };

        match kind {
            StepKind::MakeDirectory => self.ensure_directory(),
            StepKind::CreateEnvironment => {
                let location = self
                    .tools
                    .environments
                    .create(&self.config.project_name, &self.config.runtime_version)?;
                info!(
                    location = %location.display(),
                    version = %self.config.runtime_version,
                    "instantiated virtual environment"
                );
                Ok(StepOutcome::Done(format!(
                    "python {} environment at {}",
                    self.config.runtime_version,
                    location.display()
                )))
            }
            StepKind::InitVcs => {
                self.tools.vcs.init(&self.config.target)?;
                info!(path = %self.config.target.display(), "initialized git repository");
                Ok(StepOutcome::Done("initialized".into()))
            }
            StepKind::WriteIgnoreFile => {
                let mut text = String::new();
                let mut origins = Vec::new();
                for id in IGNORE_BOILERPLATES {
                    let resource = self
                        .tools
                        .fetcher
                        .fetch(ResourceKind::IgnoreBoilerplate, id)?;
                    text.push_str(resource.text.trim_end());
                    text.push_str("\n\n");
                    origins.push(resource.origin);
                }
                self.write(IGNORE_FILE, &text)?;
                commit(
                    &[IGNORE_FILE],
                    &format!("initial values for .gitignore from: {}", origins.join(", ")),
                );
                Ok(StepOutcome::Done(format!(
                    "{IGNORE_FILE} from {}",
                    IGNORE_BOILERPLATES.join(" + ")
                )))
            }
            StepKind::WriteReadme => {
                let license = self.license_info()?;
                let title =
                    license.map_or("license of your choice", |(_, info)| info.title.as_str());
                // only point at a license file the license step can write
                let license_file = match license {
                    Some((id, info)) if info.source_url(id).is_some() => LICENSE_FILE,
                    _ => "",
                };
                let context = TemplateContext::for_project(&self.config.project_name)
                    .with("license_title", title)
                    .with("license_file", license_file);
                let readme = self.renderer.render("readme", &context)?;
                self.write(README_FILE, &readme)?;
                commit(&[README_FILE], "include default readme template");
                Ok(StepOutcome::Done(README_FILE.into()))
            }
            StepKind::WriteScript => {
                let major = self
                    .config
                    .runtime_version
                    .split('.')
                    .next()
                    .unwrap_or_default();
                let context = TemplateContext::for_project(&self.config.project_name)
                    .with("python_version", &self.config.runtime_version);
                let script = self.renderer.render(&format!("script-{major}"), &context)?;
                let file = format!("{}.{SCRIPT_EXTENSION}", self.config.project_name);
                self.write(&file, &script)?;
                commit(&[file.as_str()], "include default script template");
                Ok(StepOutcome::Done(file))
            }
            StepKind::WriteLicense => {
                let Some((id, info)) = self.license_info()? else {
                    return Ok(StepOutcome::Skipped("no license chosen".into()));
                };
                if info.source_url(id).is_none() {
                    warn!(license = id, "license text not published; license creation skipped");
                    return Ok(StepOutcome::Skipped(format!("no published text for `{id}`")));
                }
                let resource = self.tools.fetcher.fetch(ResourceKind::License, id)?;
                let context = TemplateContext::for_project(&self.config.project_name);
                let text = licenses::fill_holder(
                    licenses::strip_front_matter(&resource.text),
                    context.get("year").unwrap_or_default(),
                    &self.config.holder(),
                );
                self.write(LICENSE_FILE, &text)?;
                commit(
                    &[LICENSE_FILE],
                    &format!("assigned the {} using text from: {}", info.title, resource.origin),
                );
                Ok(StepOutcome::Done(format!("{LICENSE_FILE} ({})", info.title)))
            }
            StepKind::WritePackaging => self.write_packaging(&commit),
        }
    }

    fn write_packaging(&self, commit: &dyn Fn(&[&str], &str)) -> Result<StepOutcome, SetupError> {
        let metadata = self.config.packaging.clone().unwrap_or_default();
        let classifier = self
            .license_info()?
            .map_or(licenses::FALLBACK_CLASSIFIER, |(_, info)| info.classifier());
        let context = TemplateContext::for_project(&self.config.project_name)
            .with("readme", README_FILE)
            .with("version", metadata.version)
            .with("description", metadata.description)
            .with("homepage", metadata.homepage)
            .with("author", metadata.author)
            .with("email", metadata.email)
            .with("dev_status", metadata.dev_status)
            .with("audience", metadata.audience)
            .with("topic", metadata.topic)
            .with("license_classifier", classifier)
            .with("python_version", &self.config.runtime_version)
            .with("keywords", metadata.keywords);

        // everything is rendered and fetched before the first write
        let mut files = vec![
            ("setup.py".to_string(), self.renderer.render("setup", &context)?),
            (
                "requirements_dev.txt".to_string(),
                self.renderer.render("requirements", &context)?,
            ),
        ];
        for id in PACKAGING_SKELETONS {
            let resource = self.tools.fetcher.fetch(ResourceKind::PackagingSkeleton, id)?;
            files.push((id.to_string(), resource.text));
        }

        for (name, text) in &files {
            self.write(name, text)?;
        }
        let mut written: Vec<String> = files.into_iter().map(|(name, _)| name).collect();
        for (dir, package) in PACKAGE_SUBDIRECTORIES {
            self.tools.workspace.create_dir(&self.config.target.join(dir))?;
            if *package {
                let init = format!("{dir}/__init__.py");
                self.write(&init, "")?;
                written.push(init);
            }
        }

        let names: Vec<&str> = written.iter().map(String::as_str).collect();
        commit(&names, "set up as a python package");
        info!(files = %names.join(", "), "instantiated package files");
        Ok(StepOutcome::Done(names.join(", ")))
    }

    fn license_info(&self) -> Result<Option<(&'a str, &'static licenses::LicenseInfo)>, SetupError> {
        let Some(id) = self.config.license.as_deref() else {
            return Ok(None);
        };
        licenses::lookup(id)
            .map(|info| Some((id, info)))
            .ok_or_else(|| SetupError::InvalidArgument(format!("unrecognized license `{id}`")))
    }

    fn write(&self, relative: &str, contents: &str) -> Result<(), SetupError> {
        let path = self.config.target.join(relative);
        self.tools.workspace.write_file(&path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        path::{Path, PathBuf},
    };

    use super::*;
    use crate::fetch::Resource;

    #[derive(Default)]
    struct Calls(RefCell<Vec<String>>);

    impl Calls {
        fn push(&self, call: String) {
            self.0.borrow_mut().push(call);
        }

        fn count(&self, prefix: &str) -> usize {
            self.0.borrow().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    struct FakeWorkspace<'c> {
        state: PathState,
        fail_create: bool,
        calls: &'c Calls,
    }

    impl Workspace for FakeWorkspace<'_> {
        fn inspect(&self, path: &Path) -> Result<PathState, SetupError> {
            self.calls.push(format!("inspect {}", path.display()));
            Ok(self.state)
        }

        fn create_dir(&self, path: &Path) -> Result<(), SetupError> {
            self.calls.push(format!("mkdir {}", path.display()));
            if self.fail_create {
                return Err(SetupError::directory(path, DirectoryProblem::PermissionDenied));
            }
            Ok(())
        }

        fn write_file(&self, path: &Path, _contents: &str) -> Result<(), SetupError> {
            self.calls.push(format!("write {}", path.display()));
            Ok(())
        }
    }

    struct FakeVcs<'c> {
        fail_init: bool,
        calls: &'c Calls,
    }

    impl Vcs for FakeVcs<'_> {
        fn init(&self, _dir: &Path) -> Result<(), SetupError> {
            self.calls.push("git init".into());
            if self.fail_init {
                return Err(SetupError::tool("git", "simulated failure"));
            }
            Ok(())
        }

        fn commit(&self, _dir: &Path, files: &[&str], _message: &str) -> Result<(), SetupError> {
            self.calls.push(format!("git commit {}", files.join(" ")));
            Ok(())
        }
    }

    struct FakeEnvironments<'c> {
        calls: &'c Calls,
    }

    impl EnvironmentManager for FakeEnvironments<'_> {
        fn create(&self, name: &str, runtime_version: &str) -> Result<PathBuf, SetupError> {
            self.calls.push(format!("env {name} {runtime_version}"));
            Ok(PathBuf::from("/envs").join(name))
        }
    }

    struct FakeFetcher<'c> {
        offline: bool,
        calls: &'c Calls,
    }

    impl ResourceFetcher for FakeFetcher<'_> {
        fn fetch(&self, kind: ResourceKind, id: &str) -> Result<Resource, SetupError> {
            self.calls.push(format!("fetch {kind} {id}"));
            if self.offline {
                return Err(SetupError::ResourceUnavailable {
                    what: id.into(),
                    reason: "offline".into(),
                });
            }
            Ok(Resource {
                text: format!("---\ntitle: {id}\n---\n{id} text [year] [fullname]\n"),
                origin: format!("memory://{id}"),
            })
        }
    }

    struct Harness {
        calls: Calls,
        state: PathState,
        fail_create: bool,
        fail_init: bool,
        offline: bool,
    }

    impl Harness {
        fn new(state: PathState) -> Self {
            Self {
                calls: Calls::default(),
                state,
                fail_create: false,
                fail_init: false,
                offline: false,
            }
        }

        fn run(&self, args: &[&str]) -> RunSummary {
            self.run_with(args, &Renderer::new().unwrap())
        }

        fn run_with(&self, args: &[&str], renderer: &Renderer) -> RunSummary {
            let config = ProjectConfig::from_args(
                ["mkproj"].into_iter().chain(args.iter().copied()).chain(["/tmp/proj/demo"]),
            )
            .unwrap();
            let workspace = FakeWorkspace {
                state: self.state,
                fail_create: self.fail_create,
                calls: &self.calls,
            };
            let vcs = FakeVcs {
                fail_init: self.fail_init,
                calls: &self.calls,
            };
            let environments = FakeEnvironments { calls: &self.calls };
            let fetcher = FakeFetcher {
                offline: self.offline,
                calls: &self.calls,
            };
            let tools = Collaborators {
                workspace: &workspace,
                vcs: &vcs,
                environments: &environments,
                fetcher: &fetcher,
            };
            Orchestrator::new(&config, renderer, tools, LogLevel::Warning).run()
        }
    }

    #[test]
    fn no_switches_touch_nothing() {
        let harness = Harness::new(PathState::Missing);
        let summary = harness.run(&[]);
        assert!(summary.succeeded());
        assert!(summary
            .reports
            .iter()
            .all(|r| matches!(r.outcome, StepOutcome::NotRequested)));
        assert!(harness.calls.0.borrow().is_empty());
    }

    #[test]
    fn failed_directory_creation_writes_nothing() {
        let mut harness = Harness::new(PathState::Missing);
        harness.fail_create = true;
        let summary = harness.run(&["-c", "-g", "-s", "-r", "-p"]);
        assert!(!summary.succeeded());
        assert!(matches!(
            summary.outcome(StepKind::MakeDirectory),
            Some(StepOutcome::Failed(SetupError::Directory { .. }))
        ));
        assert!(matches!(summary.outcome(StepKind::WriteScript), Some(StepOutcome::Aborted)));
        assert_eq!(harness.calls.count("write"), 0);
        assert_eq!(harness.calls.count("git"), 0);
        assert_eq!(harness.calls.count("env"), 0);
        assert_eq!(harness.calls.count("fetch"), 0);
    }

    #[test]
    fn create_on_non_empty_directory_is_fatal() {
        let harness = Harness::new(PathState::NonEmptyDirectory);
        let summary = harness.run(&["-c"]);
        assert!(matches!(
            summary.outcome(StepKind::MakeDirectory),
            Some(StepOutcome::Failed(SetupError::Directory {
                problem: DirectoryProblem::NotEmpty,
                ..
            }))
        ));
        assert_eq!(harness.calls.count("mkdir"), 0);
    }

    #[test]
    fn missing_directory_without_create_is_fatal() {
        let harness = Harness::new(PathState::Missing);
        let summary = harness.run(&["-s"]);
        assert!(matches!(
            summary.outcome(StepKind::MakeDirectory),
            Some(StepOutcome::Failed(SetupError::Directory {
                problem: DirectoryProblem::NotFound,
                ..
            }))
        ));
        assert_eq!(harness.calls.count("write"), 0);
    }

    #[test]
    fn existing_directory_is_used_without_create() {
        let harness = Harness::new(PathState::NonEmptyDirectory);
        let summary = harness.run(&["-s"]);
        assert!(summary.succeeded());
        assert!(matches!(summary.outcome(StepKind::MakeDirectory), Some(StepOutcome::Skipped(_))));
        assert_eq!(harness.calls.count("write /tmp/proj/demo/demo.py"), 1);
    }

    #[test]
    fn none_license_fetches_and_writes_nothing() {
        let harness = Harness::new(PathState::Missing);
        let summary = harness.run(&["-c", "-s", "-x", "none"]);
        assert!(summary.succeeded());
        assert!(matches!(summary.outcome(StepKind::WriteLicense), Some(StepOutcome::NotRequested)));
        assert_eq!(harness.calls.count("fetch"), 0);
        assert_eq!(harness.calls.count("write /tmp/proj/demo/LICENSE.txt"), 0);
    }

    #[test]
    fn vcs_failure_does_not_stop_independent_steps() {
        let mut harness = Harness::new(PathState::Missing);
        harness.fail_init = true;
        let summary = harness.run(&["-c", "-g", "-r", "-s"]);
        assert!(!summary.succeeded());
        assert!(matches!(summary.outcome(StepKind::InitVcs), Some(StepOutcome::Failed(_))));
        assert!(matches!(
            summary.outcome(StepKind::WriteIgnoreFile),
            Some(StepOutcome::Blocked(StepKind::InitVcs))
        ));
        assert!(matches!(summary.outcome(StepKind::WriteReadme), Some(StepOutcome::Done(_))));
        assert!(matches!(summary.outcome(StepKind::WriteScript), Some(StepOutcome::Done(_))));
        assert_eq!(harness.calls.count("write /tmp/proj/demo/README.md"), 1);
        assert_eq!(harness.calls.count("git commit"), 0);
    }

    #[test]
    fn fetch_failure_is_local_to_its_step() {
        let mut harness = Harness::new(PathState::Missing);
        harness.offline = true;
        let summary = harness.run(&["-c", "-r", "-k"]);
        assert!(matches!(
            summary.outcome(StepKind::WriteLicense),
            Some(StepOutcome::Failed(SetupError::ResourceUnavailable { .. }))
        ));
        assert!(matches!(
            summary.outcome(StepKind::WritePackaging),
            Some(StepOutcome::Failed(SetupError::ResourceUnavailable { .. }))
        ));
        assert!(matches!(summary.outcome(StepKind::WriteReadme), Some(StepOutcome::Done(_))));
        // packaging writes nothing when a skeleton cannot be fetched
        assert_eq!(harness.calls.count("write /tmp/proj/demo/setup.py"), 0);
    }

    #[test]
    fn git_commits_each_content_step() {
        let harness = Harness::new(PathState::Missing);
        let summary = harness.run(&["-c", "-g", "-r", "-x", "mit"]);
        assert!(summary.succeeded());
        assert_eq!(harness.calls.count("git init"), 1);
        assert_eq!(harness.calls.count("git commit .gitignore"), 1);
        assert_eq!(harness.calls.count("git commit README.md"), 1);
        assert_eq!(harness.calls.count("git commit LICENSE.txt"), 1);
        assert_eq!(harness.calls.count("fetch ignore boilerplate"), 2);
    }

    #[test]
    fn unpublished_license_is_skipped_cleanly() {
        let harness = Harness::new(PathState::Missing);
        let summary = harness.run(&["-c", "-x", "other"]);
        assert!(summary.succeeded());
        assert!(matches!(summary.outcome(StepKind::WriteLicense), Some(StepOutcome::Skipped(_))));
        assert_eq!(harness.calls.count("fetch"), 0);
    }

    #[test]
    fn unknown_runtime_major_fails_only_the_script() {
        let harness = Harness::new(PathState::Missing);
        let summary = harness.run(&["-c", "-s", "-p", "-n", "4.0"]);
        assert!(matches!(
            summary.outcome(StepKind::WriteScript),
            Some(StepOutcome::Failed(SetupError::TemplateMissing(_)))
        ));
        assert!(matches!(summary.outcome(StepKind::CreateEnvironment), Some(StepOutcome::Done(_))));
        assert_eq!(harness.calls.count("env demo 4.0"), 1);
    }

    #[test]
    fn package_layout_is_written() {
        let harness = Harness::new(PathState::EmptyDirectory);
        let summary = harness.run(&["-c", "-k"]);
        assert!(summary.succeeded(), "{summary:?}");
        for file in ["setup.py", "requirements_dev.txt", "setup.cfg", "MANIFEST.in", "scripts/__init__.py", "tests/__init__.py"] {
            assert_eq!(harness.calls.count(&format!("write /tmp/proj/demo/{file}")), 1, "{file}");
        }
        assert_eq!(harness.calls.count("mkdir /tmp/proj/demo/data"), 1);
        assert_eq!(harness.calls.count("write /tmp/proj/demo/LICENSE.txt"), 1);
    }

    #[test]
    fn broken_override_fails_only_the_step_using_it() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("setup.hbs"), "{{#each keywords}}unclosed").unwrap();
        let renderer = Renderer::with_overrides(tmp.path()).unwrap();

        let harness = Harness::new(PathState::Missing);
        let summary = harness.run_with(&["-c", "-s"], &renderer);
        assert!(summary.succeeded());
        assert!(matches!(summary.outcome(StepKind::MakeDirectory), Some(StepOutcome::Done(_))));
        assert!(matches!(summary.outcome(StepKind::WriteScript), Some(StepOutcome::Done(_))));

        let harness = Harness::new(PathState::Missing);
        let summary = harness.run_with(&["-c", "-r", "-k"], &renderer);
        assert!(matches!(
            summary.outcome(StepKind::WritePackaging),
            Some(StepOutcome::Failed(SetupError::TemplateSyntax { name, .. })) if name == "setup"
        ));
        assert!(matches!(summary.outcome(StepKind::WriteReadme), Some(StepOutcome::Done(_))));
        assert!(matches!(summary.outcome(StepKind::WriteLicense), Some(StepOutcome::Done(_))));
        assert_eq!(harness.calls.count("write /tmp/proj/demo/setup.py"), 0);
    }
}
