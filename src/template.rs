//! Rendering of the bundled starter files.
//!
//! Templates are handlebars sources registered by name. The registry runs in
//! strict mode so a placeholder without a value is an error instead of an empty
//! string, and escaping is off because none of the output is HTML.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use chrono::Datelike;
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{error::SetupError, helpers::{PyStrHelper, QuoteListHelper}};

const TEMPLATE_EXTENSION: &str = "hbs";

const BUNDLED: &[(&str, &str)] = &[
    ("script-2", include_str!("../templates/script-2.hbs")),
    ("script-3", include_str!("../templates/script-3.hbs")),
    ("readme", include_str!("../templates/readme.hbs")),
    ("setup", include_str!("../templates/setup.hbs")),
    ("requirements", include_str!("../templates/requirements.hbs")),
];

/// Placeholder values for one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TemplateContext(BTreeMap<String, String>);

impl TemplateContext {
    /// Values every template may use: `project_name` and `year`.
    pub fn for_project(project_name: &str) -> Self {
        Self::default()
            .with("project_name", project_name)
            .with("year", chrono::Local::now().year().to_string())
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// An override that could not be registered; rendering that name reports it.
#[derive(Debug, Clone)]
enum Broken {
    Unreadable(String),
    Invalid(String),
}

pub struct Renderer {
    registry: Handlebars<'static>,
    broken: HashMap<String, Broken>,
}

impl Renderer {
    pub fn new() -> Result<Self, SetupError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        handlebars_misc_helpers::setup_handlebars(&mut registry);
        registry.register_helper("quote_list", Box::new(QuoteListHelper));
        registry.register_helper("py_str", Box::new(PyStrHelper));

        let mut renderer = Self {
            registry,
            broken: HashMap::new(),
        };
        for (name, source) in BUNDLED {
            renderer.register(name, source)?;
        }
        Ok(renderer)
    }

    /// Bundled templates, replaced by any `<name>.hbs` found under `dir`.
    ///
    /// An override that cannot be read or parsed does not fall back to the
    /// bundled template: the name stays broken and only `render` of that name
    /// fails, so steps using other templates still run.
    pub fn with_overrides(dir: &Path) -> Result<Self, SetupError> {
        let mut renderer = Self::new()?;
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), "skipping unreadable template location: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            debug!(name, path = %path.display(), "template override");
            let registered = fs::read_to_string(path)
                .map_err(|e| Broken::Unreadable(format!("{}: {e}", path.display())))
                .and_then(|source| {
                    renderer
                        .registry
                        .register_template_string(name, source)
                        .map_err(|e| Broken::Invalid(e.to_string()))
                });
            match registered {
                Ok(()) => {
                    renderer.broken.remove(name);
                }
                Err(problem) => {
                    warn!(name, path = %path.display(), "template override is unusable");
                    renderer.registry.unregister_template(name);
                    renderer.broken.insert(name.to_string(), problem);
                }
            }
        }
        Ok(renderer)
    }

    fn register(&mut self, name: &str, source: &str) -> Result<(), SetupError> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| SetupError::TemplateSyntax {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        self.broken.remove(name);
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<String, SetupError> {
        match self.broken.get(name) {
            Some(Broken::Unreadable(reason)) => {
                return Err(SetupError::TemplateMissing(reason.clone()));
            }
            Some(Broken::Invalid(reason)) => {
                return Err(SetupError::TemplateSyntax {
                    name: name.to_string(),
                    reason: reason.clone(),
                });
            }
            None => {}
        }
        if !self.has_template(name) {
            return Err(SetupError::TemplateMissing(name.to_string()));
        }
        self.registry
            .render(name, context)
            .map_err(|e| SetupError::TemplateSyntax {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_context() -> TemplateContext {
        TemplateContext::for_project("demo")
            .with("readme", "README.md")
            .with("version", "0.1")
            .with("description", "a demo & more")
            .with("homepage", "http://change.me")
            .with("author", "Change Me")
            .with("email", "change@me.org")
            .with("dev_status", "1 - Planning")
            .with("audience", "Developers")
            .with("topic", "Change Me")
            .with("license_classifier", "License :: OSI Approved :: MIT License")
            .with("python_version", "3")
            .with("keywords", "change me, please change me")
    }

    #[test]
    fn script_gets_project_name() {
        let renderer = Renderer::new().unwrap();
        let script = renderer
            .render("script-3", &TemplateContext::for_project("demo"))
            .unwrap();
        assert!(script.starts_with("#!/usr/bin/env python3\n"));
        assert!(script.contains("demo: describe what this script does"));
        assert!(script.contains("logging.getLogger('demo.main')"));
    }

    #[test]
    fn rendering_is_repeatable() {
        let renderer = Renderer::new().unwrap();
        let context = setup_context();
        let first = renderer.render("setup", &context).unwrap();
        let second = renderer.render("setup", &context).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn setup_is_filled_without_escaping() {
        let renderer = Renderer::new().unwrap();
        let setup = renderer.render("setup", &setup_context()).unwrap();
        assert!(setup.contains("description='a demo & more'"));
        assert!(setup.contains("keywords=['change me', 'please change me']"));
        assert!(setup.contains("'License :: OSI Approved :: MIT License',"));
        assert!(setup.contains("'demo=demo:main'"));
        assert!(!setup.contains("{{"));
    }

    #[test]
    fn unknown_template_is_missing() {
        let renderer = Renderer::new().unwrap();
        let err = renderer
            .render("script-4", &TemplateContext::for_project("demo"))
            .unwrap_err();
        assert!(matches!(err, SetupError::TemplateMissing(name) if name == "script-4"));
    }

    #[test]
    fn unresolved_placeholder_is_an_error() {
        let renderer = Renderer::new().unwrap();
        let context = TemplateContext::for_project("demo");
        let err = renderer.render("readme", &context).unwrap_err();
        assert!(matches!(err, SetupError::TemplateSyntax { .. }));
    }

    #[test]
    fn overrides_replace_and_extend_bundled_templates() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("readme.hbs"), "# {{project_name}} ({{year}})\n").unwrap();
        std::fs::write(tmp.path().join("notes.hbs"), "notes for {{project_name}}").unwrap();
        std::fs::write(tmp.path().join("ignored.txt"), "{{nope}}").unwrap();

        let renderer = Renderer::with_overrides(tmp.path()).unwrap();
        let context = TemplateContext::for_project("demo");
        let readme = renderer.render("readme", &context).unwrap();
        assert_eq!(readme, format!("# demo ({})\n", context.get("year").unwrap()));
        assert_eq!(renderer.render("notes", &context).unwrap(), "notes for demo");
        assert!(!renderer.has_template("ignored"));
        assert!(renderer.has_template("script-3"));
    }

    #[test]
    fn broken_override_fails_only_its_own_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("readme.hbs"), "{{#if project_name}}oops").unwrap();

        let renderer = Renderer::with_overrides(tmp.path()).unwrap();
        let context = TemplateContext::for_project("demo");
        assert!(matches!(
            renderer.render("readme", &context),
            Err(SetupError::TemplateSyntax { name, .. }) if name == "readme"
        ));
        assert!(renderer.render("script-3", &context).is_ok());
    }

    #[test]
    fn setup_strings_survive_apostrophes() {
        let renderer = Renderer::new().unwrap();
        let context = setup_context()
            .with("author", "Pat O'Brien")
            .with("description", "it's neat")
            .with("topic", "Kids' Tools");
        let setup = renderer.render("setup", &context).unwrap();
        assert!(setup.contains("author='Pat O\\'Brien',"));
        assert!(setup.contains("description='it\\'s neat',"));
        assert!(setup.contains("'Topic :: Kids\\' Tools',"));
        assert!(!setup.contains("O'Brien"));
    }
}
