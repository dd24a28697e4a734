//! Retrieval of reference text that is not bundled: license texts, ignore-file
//! boilerplate and packaging skeleton files.

use std::{cell::RefCell, collections::HashMap, fmt, thread, time::Duration};

use tracing::{debug, warn};

use crate::{error::SetupError, licenses};

const GITIGNORE_PREFIX: &str = "https://raw.githubusercontent.com/github/gitignore/main/";
const SAMPLEPROJECT_PREFIX: &str = "https://raw.githubusercontent.com/pypa/sampleproject/main/";

/// Boilerplates concatenated into a new repository's `.gitignore`.
pub const IGNORE_BOILERPLATES: &[&str] = &["macOS", "Python"];
/// Files copied verbatim from the packaging sample project.
pub const PACKAGING_SKELETONS: &[&str] = &["setup.cfg", "MANIFEST.in"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    License,
    IgnoreBoilerplate,
    PackagingSkeleton,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::License => "license text",
            ResourceKind::IgnoreBoilerplate => "ignore boilerplate",
            ResourceKind::PackagingSkeleton => "packaging skeleton",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub text: String,
    /// Where the text came from, quoted in commit messages.
    pub origin: String,
}

pub trait ResourceFetcher {
    fn fetch(&self, kind: ResourceKind, id: &str) -> Result<Resource, SetupError>;
}

fn unavailable(kind: ResourceKind, id: &str, reason: impl ToString) -> SetupError {
    SetupError::ResourceUnavailable {
        what: format!("{kind} `{id}`"),
        reason: reason.to_string(),
    }
}

/// Where each kind of resource is published. Licenses with an absolute
/// source in the catalog are fetched from there regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    gitignore: String,
    sampleproject: String,
    choosealicense: String,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            gitignore: GITIGNORE_PREFIX.into(),
            sampleproject: SAMPLEPROJECT_PREFIX.into(),
            choosealicense: licenses::CHOOSEALICENSE_PREFIX.into(),
        }
    }
}

impl Sources {
    /// Every kind served from one base URL, e.g. a mirror.
    pub fn under(base: &str) -> Self {
        let base = format!("{}/", base.trim_end_matches('/'));
        Self {
            gitignore: base.clone(),
            sampleproject: base.clone(),
            choosealicense: base,
        }
    }

    pub fn url(&self, kind: ResourceKind, id: &str) -> Result<String, SetupError> {
        let Sources {
            gitignore,
            sampleproject,
            choosealicense,
        } = self;
        match kind {
            ResourceKind::License => licenses::lookup(id)
                .and_then(|info| info.source_url_from(&id.to_lowercase(), choosealicense))
                .ok_or_else(|| unavailable(kind, id, "no published text for this license")),
            ResourceKind::IgnoreBoilerplate => match id {
                "macOS" | "Windows" | "Linux" => Ok(format!("{gitignore}Global/{id}.gitignore")),
                _ if !id.is_empty() && !id.contains(['/', '.']) => {
                    Ok(format!("{gitignore}{id}.gitignore"))
                }
                _ => Err(unavailable(kind, id, "not a gitignore template name")),
            },
            ResourceKind::PackagingSkeleton if PACKAGING_SKELETONS.contains(&id) => {
                Ok(format!("{sampleproject}{id}"))
            }
            ResourceKind::PackagingSkeleton => Err(unavailable(kind, id, "unknown skeleton file")),
        }
    }
}

/// Maps a resource identifier to the URL it is published at.
pub fn source_url(kind: ResourceKind, id: &str) -> Result<String, SetupError> {
    Sources::default().url(kind, id)
}

/// Bounded network policy: each attempt has a timeout, failed attempts are
/// retried `retries` times with a linearly growing pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    policy: FetchPolicy,
    sources: Sources,
}

impl HttpFetcher {
    pub fn new(policy: FetchPolicy) -> anyhow::Result<Self> {
        Self::with_sources(policy, Sources::default())
    }

    /// Fetches everything from under `base` instead of the public hosts.
    pub fn with_base(policy: FetchPolicy, base: &str) -> anyhow::Result<Self> {
        Self::with_sources(policy, Sources::under(base))
    }

    fn with_sources(policy: FetchPolicy, sources: Sources) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(policy.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            policy,
            sources,
        })
    }

    fn get(&self, url: &str) -> Result<String, String> {
        let response = self.client.get(url).send().map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        response.text().map_err(|e| e.to_string())
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, kind: ResourceKind, id: &str) -> Result<Resource, SetupError> {
        let url = self.sources.url(kind, id)?;
        let mut last_error = String::new();
        for attempt in 0..=self.policy.retries {
            if attempt > 0 {
                thread::sleep(self.policy.backoff * attempt);
            }
            debug!(%url, attempt, "requesting");
            match self.get(&url) {
                Ok(text) => {
                    return Ok(Resource { text, origin: url });
                }
                Err(reason) => {
                    warn!(%url, attempt, %reason, "download failed");
                    last_error = reason;
                }
            }
        }
        Err(unavailable(
            kind,
            id,
            format!(
                "{last_error} (gave up after {} attempts)",
                self.policy.retries + 1
            ),
        ))
    }
}

/// Remembers successful fetches so a resource is downloaded at most once per run.
pub struct CachingFetcher<F> {
    inner: F,
    cache: RefCell<HashMap<(ResourceKind, String), Resource>>,
}

impl<F: ResourceFetcher> CachingFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl<F: ResourceFetcher> ResourceFetcher for CachingFetcher<F> {
    fn fetch(&self, kind: ResourceKind, id: &str) -> Result<Resource, SetupError> {
        let key = (kind, id.to_string());
        if let Some(hit) = self.cache.borrow().get(&key) {
            debug!(%kind, id, "served from cache");
            return Ok(hit.clone());
        }
        let resource = self.inner.fetch(kind, id)?;
        self.cache.borrow_mut().insert(key, resource.clone());
        Ok(resource)
    }
}
