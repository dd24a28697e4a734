use std::{
    ffi::OsString,
    path::{self, PathBuf},
    time::Duration,
};

use clap::{ArgGroup, Parser, ValueEnum};

use crate::{
    error::SetupError,
    fetch::FetchPolicy,
    licenses::{self, DEFAULT_LICENSE, NO_LICENSE},
};

pub const DEFAULT_RUNTIME_VERSION: &str = "3";

/// Make a project directory with associated setup
#[derive(Parser, Debug, Clone)]
#[command(name = "mkproj", author, version, about, long_about = None)]
#[command(group(ArgGroup::new("verbosity").args(["quiet", "verbose", "very_verbose"])))]
pub struct Opts {
    /// Path to desired project directory
    #[arg(value_name = "WHERE", required_unless_present = "list_licenses")]
    pub target: Option<PathBuf>,

    /// Desired logging level
    #[arg(short = 'l', long = "loglevel", value_enum, ignore_case = true, default_value_t = LogLevel::Warning)]
    pub log_level: LogLevel,
    /// Verbose output (logging level == INFO)
    #[arg(short, long)]
    pub verbose: bool,
    /// Very verbose output (logging level == DEBUG)
    #[arg(short = 'w', long = "veryverbose")]
    pub very_verbose: bool,
    /// Suppress output (logging level == CRITICAL)
    #[arg(short, long)]
    pub quiet: bool,

    /// Create directory at indicated path
    #[arg(short, long)]
    pub create: bool,
    /// Create a new git repository
    #[arg(short, long)]
    pub git: bool,
    /// Create a python virtual environment
    #[arg(short = 'p', long)]
    pub pyvenv: bool,
    /// Version of python to use in the virtual environment and script
    #[arg(short = 'n', long = "pyversion", default_value = DEFAULT_RUNTIME_VERSION)]
    pub py_version: String,
    /// Set up with a python script
    #[arg(short, long, conflicts_with = "package")]
    pub script: bool,
    /// Set up as a python package
    #[arg(short = 'k', long)]
    pub package: bool,
    /// Add a readme file template
    #[arg(short, long)]
    pub readme: bool,
    /// License to use ("none" is an option) [default when needed: agpl-3.0]
    #[arg(short = 'x', long)]
    pub license: Option<String>,
    /// Print the known license identifiers and exit
    #[arg(long)]
    pub list_licenses: bool,

    /// PEP440 version number to use in setup.py
    #[arg(long = "pkgversion")]
    pub pkg_version: Option<String>,
    /// Description to use in setup.py
    #[arg(long = "pkgdescription")]
    pub pkg_description: Option<String>,
    /// Home page to use in setup.py
    #[arg(long = "pkghomepage")]
    pub pkg_homepage: Option<String>,
    /// User name to use in setup.py
    #[arg(long = "pkgauthor")]
    pub pkg_author: Option<String>,
    /// Email address to use in setup.py
    #[arg(long = "pkgemail")]
    pub pkg_email: Option<String>,
    /// Comma separated keywords to use in setup.py
    #[arg(long = "pkgkeywords")]
    pub pkg_keywords: Option<String>,
    /// Development status classifier to use in setup.py
    #[arg(long = "classdevstatus")]
    pub class_dev_status: Option<String>,
    /// Intended audience classifier to use in setup.py
    #[arg(long = "classaudience")]
    pub class_audience: Option<String>,
    /// Topic classifier to use in setup.py
    #[arg(long = "classtopic")]
    pub class_topic: Option<String>,

    /// Directory holding the virtual environments
    #[arg(long = "envs-root", env = "WORKON_HOME", value_name = "DIR")]
    pub envs_root: Option<PathBuf>,
    /// Directory of <name>.hbs files overriding the bundled templates
    #[arg(long = "templates", value_name = "DIR")]
    pub templates: Option<PathBuf>,
    /// Seconds before a download attempt is abandoned
    #[arg(long = "fetch-timeout", env = "MKPROJ_FETCH_TIMEOUT", default_value_t = 30)]
    pub fetch_timeout: u64,
    /// Extra download attempts after a failure
    #[arg(long = "fetch-retries", env = "MKPROJ_FETCH_RETRIES", default_value_t = 2)]
    pub fetch_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
    Critical,
}

impl Opts {
    /// The shortcut switches win over `--loglevel`.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.very_verbose {
            LogLevel::Debug
        } else if self.verbose {
            LogLevel::Info
        } else if self.quiet {
            LogLevel::Critical
        } else {
            self.log_level
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingMetadata {
    pub author: String,
    pub email: String,
    pub description: String,
    pub homepage: String,
    pub keywords: String,
    pub version: String,
    pub dev_status: String,
    pub audience: String,
    pub topic: String,
}

impl Default for PackagingMetadata {
    fn default() -> Self {
        Self {
            author: "Change Me".into(),
            email: "change@me.org".into(),
            description: "change me".into(),
            homepage: "http://change.me".into(),
            keywords: "change me, please change me".into(),
            version: "0.1".into(),
            dev_status: "1 - Planning".into(),
            audience: "Developers".into(),
            topic: "Change Me".into(),
        }
    }
}

impl PackagingMetadata {
    fn from_opts(opts: &Opts) -> Self {
        let defaults = Self::default();
        let pick = |given: &Option<String>, fallback: String| given.clone().unwrap_or(fallback);
        Self {
            author: pick(&opts.pkg_author, defaults.author),
            email: pick(&opts.pkg_email, defaults.email),
            description: pick(&opts.pkg_description, defaults.description),
            homepage: pick(&opts.pkg_homepage, defaults.homepage),
            keywords: pick(&opts.pkg_keywords, defaults.keywords),
            version: pick(&opts.pkg_version, defaults.version),
            dev_status: pick(&opts.class_dev_status, defaults.dev_status),
            audience: pick(&opts.class_audience, defaults.audience),
            topic: pick(&opts.class_topic, defaults.topic),
        }
    }
}

/// Validated, defaulted settings for one run. Read-only once built.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub target: PathBuf,
    pub project_name: String,
    pub create_directory: bool,
    pub init_vcs: bool,
    pub init_env: bool,
    pub init_script: bool,
    pub init_readme: bool,
    pub setup_package: bool,
    pub runtime_version: String,
    /// `None` is the "no license file" sentinel.
    pub license: Option<String>,
    pub packaging: Option<PackagingMetadata>,
    pub envs_root: Option<PathBuf>,
    pub templates: Option<PathBuf>,
    pub fetch_policy: FetchPolicy,
}

impl ProjectConfig {
    /// Parses raw command line arguments (program name first) into a config.
    pub fn from_args<I, T>(args: I) -> Result<Self, SetupError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let opts = Opts::try_parse_from(args)
            .map_err(|e| SetupError::InvalidArgument(e.to_string()))?;
        Self::build(&opts)
    }

    pub fn build(opts: &Opts) -> Result<Self, SetupError> {
        let raw_target = opts
            .target
            .as_ref()
            .filter(|t| !t.as_os_str().is_empty())
            .ok_or_else(|| SetupError::InvalidArgument("a project path is required".into()))?;
        let target = path::absolute(raw_target).map_err(|e| {
            SetupError::InvalidArgument(format!("cannot resolve {}: {e}", raw_target.display()))
        })?;
        let project_name = target
            .file_name()
            .and_then(|name| name.to_str())
            .map(String::from)
            .ok_or_else(|| {
                SetupError::InvalidArgument(format!(
                    "cannot derive a project name from {}",
                    raw_target.display()
                ))
            })?;

        if opts.script && opts.package {
            return Err(SetupError::InvalidArgument(
                "cannot create both a script and a package".into(),
            ));
        }
        if opts.py_version.trim().is_empty() {
            return Err(SetupError::InvalidArgument(
                "python version must not be empty".into(),
            ));
        }

        if let Some(dir) = opts.templates.as_deref().filter(|dir| !dir.is_dir()) {
            return Err(SetupError::InvalidArgument(format!(
                "template directory {} does not exist",
                dir.display()
            )));
        }

        let license = resolve_license(opts.license.as_deref(), opts.package || opts.readme)?;

        Ok(Self {
            target,
            project_name,
            create_directory: opts.create,
            init_vcs: opts.git,
            init_env: opts.pyvenv,
            init_script: opts.script,
            init_readme: opts.readme,
            setup_package: opts.package,
            runtime_version: opts.py_version.trim().to_string(),
            license,
            packaging: opts.package.then(|| PackagingMetadata::from_opts(opts)),
            envs_root: opts.envs_root.clone(),
            templates: opts.templates.clone(),
            fetch_policy: FetchPolicy {
                timeout: Duration::from_secs(opts.fetch_timeout),
                retries: opts.fetch_retries,
                ..FetchPolicy::default()
            },
        })
    }

    /// Name written into license texts as the copyright holder.
    pub fn holder(&self) -> String {
        self.packaging
            .as_ref()
            .map(|p| p.author.clone())
            .unwrap_or_else(|| PackagingMetadata::default().author)
    }

    /// True when any step besides the directory check was asked for.
    pub fn wants_content(&self) -> bool {
        self.init_vcs
            || self.init_env
            || self.init_script
            || self.init_readme
            || self.setup_package
            || self.license.is_some()
    }
}

fn resolve_license(given: Option<&str>, needed: bool) -> Result<Option<String>, SetupError> {
    let given = given
        .map(|id| id.trim().to_lowercase())
        .filter(|id| id != NO_LICENSE);
    let id = match (given, needed) {
        (Some(id), _) => id,
        (None, true) => DEFAULT_LICENSE.to_string(),
        (None, false) => return Ok(None),
    };
    if licenses::lookup(&id).is_none() {
        return Err(SetupError::InvalidArgument(format!(
            "unrecognized license `{id}` (see --list-licenses)"
        )));
    }
    Ok(Some(id))
}
