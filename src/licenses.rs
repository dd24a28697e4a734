//! Bundled license catalog and the clean-up applied to fetched license text.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Deserialize;

/// Identifier used when a license is needed but none was chosen.
pub const DEFAULT_LICENSE: &str = "agpl-3.0";
/// Identifier meaning "do not write a license file".
pub const NO_LICENSE: &str = "none";
/// Trove classifier for licenses the catalog has none for.
pub const FALLBACK_CLASSIFIER: &str = "License :: Other/Proprietary License";

pub(crate) const CHOOSEALICENSE_PREFIX: &str =
    "https://raw.githubusercontent.com/github/choosealicense.com/gh-pages/_licenses/";
const CHOOSEALICENSE_SUFFIX: &str = ".txt";

static CATALOG: Lazy<IndexMap<String, LicenseInfo>> = Lazy::new(|| {
    toml::from_str(include_str!("../resources/licenses.toml"))
        .expect("bundled license catalog is valid TOML")
});

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseInfo {
    pub title: String,
    pub abbr: Option<String>,
    pub classifier: Option<String>,
    src: Option<String>,
}

impl LicenseInfo {
    pub fn classifier(&self) -> &str {
        self.classifier.as_deref().unwrap_or(FALLBACK_CLASSIFIER)
    }

    /// Where the text of license `id` is published, if anywhere.
    pub fn source_url(&self, id: &str) -> Option<String> {
        self.source_url_from(id, CHOOSEALICENSE_PREFIX)
    }

    /// Like [`source_url`](Self::source_url), with choosealicense texts
    /// looked up under `prefix`.
    pub(crate) fn source_url_from(&self, id: &str, prefix: &str) -> Option<String> {
        let src = self.src.as_deref()?;
        match src.strip_prefix("::") {
            Some("cal") => Some(format!("{prefix}{id}{CHOOSEALICENSE_SUFFIX}")),
            Some(_) => None,
            None => Some(src.to_string()),
        }
    }
}

pub fn lookup(id: &str) -> Option<&'static LicenseInfo> {
    CATALOG.get(&id.to_lowercase())
}

pub fn catalog() -> impl Iterator<Item = (&'static str, &'static LicenseInfo)> {
    CATALOG.iter().map(|(id, info)| (id.as_str(), info))
}

/// Drops a leading `---` delimited YAML block, as found in choosealicense texts.
pub fn strip_front_matter(text: &str) -> &str {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return text;
    };
    match rest.find("\n---") {
        Some(end) => {
            let after = &rest[end + "\n---".len()..];
            let after = after.trim_start_matches('-');
            after.trim_start_matches(['\r', '\n'])
        }
        None => text,
    }
}

/// Fills the `[year]` and `[fullname]` blanks license texts leave for the holder.
pub fn fill_holder(text: &str, year: &str, fullname: &str) -> String {
    text.replace("[year]", year).replace("[fullname]", fullname)
}
