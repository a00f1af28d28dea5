//! Cross-compilation of one platform's artifact

mod toolchain;

pub use toolchain::{cargo_target, Toolchain, CARGO_VERSION_ENV, GO_VERSION_FILE, RELEASE_FLAG};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use distkit_protocol::Platform;

use crate::runner::CommandRunner;
use crate::version::ResolvedVersion;

/// Build failures
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{toolchain} has no target for platform {platform}")]
    UnsupportedTarget { toolchain: Toolchain, platform: String },

    #[error("failed to write {path}: {source}")]
    WriteVersionFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {code}:\n{diagnostics}")]
    Toolchain {
        command: String,
        code: String,
        diagnostics: String,
    },

    #[error("build succeeded but produced no binary at {0}")]
    MissingOutput(String),

    #[error("failed to stage binary {from} -> {to}: {source}")]
    Stage {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },
}

/// Compiles the checkout for a target platform
pub struct Builder<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: Toolchain,
}

impl<'a> Builder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, toolchain: Toolchain) -> Self {
        Self { runner, toolchain }
    }

    /// Build `name` for `platform` with `version` embedded.
    ///
    /// Returns the path of the executable, always `<workdir>/<name>`.
    pub fn build(
        &self,
        workdir: &Path,
        name: &str,
        version: &ResolvedVersion,
        platform: &Platform,
    ) -> Result<PathBuf, BuildError> {
        let unsupported = || BuildError::UnsupportedTarget {
            toolchain: self.toolchain,
            platform: platform.to_string(),
        };
        let spec = self
            .toolchain
            .build_command(workdir, name, version.as_str(), platform)
            .ok_or_else(unsupported)?;
        let produced = self
            .toolchain
            .output_path(workdir, name, platform)
            .ok_or_else(unsupported)?;

        if let Some((file, contents)) = self.toolchain.version_file(version.as_str()) {
            let path = workdir.join(file);
            fs::write(&path, contents).map_err(|source| BuildError::WriteVersionFile {
                path: path.display().to_string(),
                source,
            })?;
        }

        info!(command = %spec, "building");
        let output = self.runner.run(&spec).map_err(|source| BuildError::Spawn {
            command: spec.command_line(),
            source,
        })?;
        if !output.success() {
            return Err(BuildError::Toolchain {
                command: spec.command_line(),
                code: output
                    .code
                    .map(|c| format!("status {}", c))
                    .unwrap_or_else(|| "a signal".to_string()),
                diagnostics: output.diagnostics(),
            });
        }

        if !produced.is_file() {
            return Err(BuildError::MissingOutput(produced.display().to_string()));
        }

        let binary = workdir.join(name);
        if produced != binary {
            fs::copy(&produced, &binary).map_err(|source| BuildError::Stage {
                from: produced.display().to_string(),
                to: binary.display().to_string(),
                source,
            })?;
        }
        Ok(binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockRunner};

    fn version() -> ResolvedVersion {
        ResolvedVersion::parse("1.2.3").unwrap()
    }

    #[test]
    fn test_go_build_writes_version_file() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner.respond("go build", MockResponse::ok().with_file("hk", b"ELF..."));

        let binary = Builder::new(&runner, Toolchain::Go)
            .build(tmp.path(), "hk", &version(), &"linux-amd64".parse().unwrap())
            .unwrap();

        assert_eq!(binary, tmp.path().join("hk"));
        let relver = fs::read_to_string(tmp.path().join(GO_VERSION_FILE)).unwrap();
        assert!(relver.contains("\"1.2.3\""));
    }

    #[test]
    fn test_cargo_build_stages_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner.respond(
            "cargo build",
            MockResponse::ok().with_file("target/aarch64-apple-darwin/release/hk", b"MACHO"),
        );

        let binary = Builder::new(&runner, Toolchain::Cargo)
            .build(tmp.path(), "hk", &version(), &"darwin-arm64".parse().unwrap())
            .unwrap();

        assert_eq!(fs::read(binary).unwrap(), b"MACHO");
        assert!(!tmp.path().join(GO_VERSION_FILE).exists());
    }

    #[test]
    fn test_toolchain_failure_carries_output() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner.respond(
            "go build",
            MockResponse::failure(2, "./main.go:3:1: syntax error: non-declaration statement"),
        );

        let err = Builder::new(&runner, Toolchain::Go)
            .build(tmp.path(), "hk", &version(), &"linux-amd64".parse().unwrap())
            .unwrap_err();

        match err {
            BuildError::Toolchain { code, diagnostics, .. } => {
                assert_eq!(code, "status 2");
                assert!(diagnostics.contains("syntax error"));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_missing_output() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner.respond("go build", MockResponse::ok());

        let err = Builder::new(&runner, Toolchain::Go)
            .build(tmp.path(), "hk", &version(), &"linux-amd64".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingOutput(_)));
    }

    #[test]
    fn test_unsupported_target_runs_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();

        let err = Builder::new(&runner, Toolchain::Cargo)
            .build(tmp.path(), "hk", &version(), &"plan9-386".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedTarget { .. }));
        assert!(runner.calls().is_empty());
    }
}
