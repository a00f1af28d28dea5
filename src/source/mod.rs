//! Source checkout
//!
//! Produces a fresh clone of one branch in the working directory. Whatever
//! was there before is removed first, so nothing from a previous platform's
//! build can leak into the next one.

use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

use crate::runner::{CommandRunner, CommandSpec};

/// Checkout failures
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to clear {path}: {source}")]
    Clear {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start git: {0}")]
    Spawn(#[source] io::Error),

    #[error("git clone of {repository} (branch {branch}) failed: {diagnostics}")]
    Clone {
        repository: String,
        branch: String,
        diagnostics: String,
    },

    #[error("git clone reported success but {0} does not exist")]
    MissingCheckout(String),
}

/// Clones a branch into a clean working directory
pub struct SourceFetcher<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Remove `workdir` and clone `branch` of `repository` into it.
    ///
    /// On failure the directory is left absent.
    pub fn fetch(&self, repository: &str, branch: &str, workdir: &Path) -> Result<(), FetchError> {
        clear_dir(workdir)?;

        let spec = CommandSpec::new("git")
            .args(["clone", "--quiet", "-b", branch, repository])
            .arg(workdir.to_string_lossy());
        info!(command = %spec.command_line(), "cloning source");

        let output = self.runner.run(&spec).map_err(FetchError::Spawn)?;
        if !output.success() {
            // A failed clone may leave a partial directory behind.
            let _ = clear_dir(workdir);
            return Err(FetchError::Clone {
                repository: repository.to_string(),
                branch: branch.to_string(),
                diagnostics: output.diagnostics(),
            });
        }

        if !workdir.is_dir() {
            return Err(FetchError::MissingCheckout(workdir.display().to_string()));
        }
        Ok(())
    }
}

fn clear_dir(dir: &Path) -> Result<(), FetchError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(FetchError::Clear {
            path: dir.display().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockRunner};

    #[test]
    fn test_fetch_clears_previous_checkout() {
        let tmp = tempfile::tempdir().unwrap();
        let workdir = tmp.path().join("src");
        fs::create_dir_all(&workdir).unwrap();
        fs::write(workdir.join("stale-binary"), b"old").unwrap();

        let runner = MockRunner::new();
        runner.respond("git clone", MockResponse::ok().with_dir(&workdir));

        SourceFetcher::new(&runner)
            .fetch("https://github.com/example/hk.git", "release", &workdir)
            .unwrap();

        assert!(workdir.is_dir());
        assert!(!workdir.join("stale-binary").exists());

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args[..5],
            ["clone", "--quiet", "-b", "release", "https://github.com/example/hk.git"]
        );
    }

    #[test]
    fn test_clone_failure_reports_diagnostics() {
        let tmp = tempfile::tempdir().unwrap();
        let workdir = tmp.path().join("src");

        let runner = MockRunner::new();
        runner.respond(
            "git clone",
            MockResponse::failure(128, "fatal: Remote branch nope not found in upstream origin"),
        );

        let err = SourceFetcher::new(&runner)
            .fetch("https://github.com/example/hk.git", "nope", &workdir)
            .unwrap_err();

        match err {
            FetchError::Clone { branch, diagnostics, .. } => {
                assert_eq!(branch, "nope");
                assert!(diagnostics.contains("Remote branch nope not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!workdir.exists());
    }

    #[test]
    fn test_spawn_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner.respond("git clone", MockResponse::spawn_error("git: not found"));

        let err = SourceFetcher::new(&runner)
            .fetch("repo", "main", &tmp.path().join("src"))
            .unwrap_err();
        assert!(matches!(err, FetchError::Spawn(_)));
    }

    #[test]
    fn test_clone_without_checkout_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner.respond("git clone", MockResponse::ok());

        let err = SourceFetcher::new(&runner)
            .fetch("repo", "main", &tmp.path().join("src"))
            .unwrap_err();
        assert!(matches!(err, FetchError::MissingCheckout(_)));
    }
}
