use std::{
    io,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::debug;

use crate::error::SetupError;

/// Creates isolated runtime environments keyed by project name.
pub trait EnvironmentManager {
    /// Returns where the environment was created.
    fn create(&self, name: &str, runtime_version: &str) -> Result<PathBuf, SetupError>;
}

/// Environments made by `virtualenv` under a common root, the layout
/// virtualenvwrapper expects.
#[derive(Debug, Clone)]
pub struct Virtualenv {
    root: PathBuf,
    program: String,
}

impl Virtualenv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            program: "virtualenv".into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// `~/Envs`, or `./Envs` when no home directory is known.
    pub fn default_root() -> PathBuf {
        dirs::home_dir().unwrap_or_default().join("Envs")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl EnvironmentManager for Virtualenv {
    fn create(&self, name: &str, runtime_version: &str) -> Result<PathBuf, SetupError> {
        let location = self.root.join(name);
        if location.exists() {
            return Err(SetupError::tool(
                &self.program,
                format!("environment {} already exists", location.display()),
            ));
        }
        let interpreter = format!("python{runtime_version}");
        debug!(program = %self.program, %interpreter, location = %location.display(), "creating environment");

        let output = Command::new(&self.program)
            .arg("-p")
            .arg(&interpreter)
            .arg(&location)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    SetupError::tool(&self.program, "command not found on PATH")
                }
                _ => SetupError::tool(&self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SetupError::tool(
                &self.program,
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_environment_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("demo")).unwrap();
        let err = Virtualenv::new(tmp.path()).create("demo", "3").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn missing_tool_is_an_external_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Virtualenv::new(tmp.path())
            .with_program("mkproj-no-such-virtualenv")
            .create("demo", "3")
            .unwrap_err();
        assert!(matches!(err, SetupError::ExternalTool { .. }));
        assert!(!tmp.path().join("demo").exists());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_an_external_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Virtualenv::new(tmp.path())
            .with_program("false")
            .create("demo", "3")
            .unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn default_root_ends_in_envs() {
        assert!(Virtualenv::default_root().ends_with("Envs"));
    }
}
