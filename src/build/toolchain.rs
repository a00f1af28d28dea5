//! Cross-compilation toolchains
//!
//! Maps a platform onto the toolchain's own target vocabulary and builds the
//! command that produces a release binary with the version embedded.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use distkit_protocol::Platform;

use crate::runner::CommandSpec;

/// Name of the generated Go file carrying the release version
pub const GO_VERSION_FILE: &str = "relver.go";

/// Build tag / cfg name that marks a release build
pub const RELEASE_FLAG: &str = "release";

/// Environment variable through which cargo builds receive the version
pub const CARGO_VERSION_ENV: &str = "RELEASE_VERSION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// `go build -tags release` with GOOS/GOARCH
    Go,
    /// `cargo build --release --target <triple>` with `--cfg release`
    Cargo,
}

impl Toolchain {
    /// Source file to write into the checkout before building, if any.
    pub fn version_file(&self, version: &str) -> Option<(&'static str, String)> {
        match self {
            Toolchain::Go => Some((
                GO_VERSION_FILE,
                format!(
                    "//go:build {flag}\n// +build {flag}\n\npackage main\n\nconst Version = {version:?}\n",
                    flag = RELEASE_FLAG,
                    version = version,
                ),
            )),
            Toolchain::Cargo => None,
        }
    }

    /// Command that compiles `name` for `platform` inside `workdir`.
    ///
    /// Returns None if the toolchain has no target for the platform.
    pub fn build_command(
        &self,
        workdir: &Path,
        name: &str,
        version: &str,
        platform: &Platform,
    ) -> Option<CommandSpec> {
        match self {
            Toolchain::Go => Some(
                CommandSpec::new("go")
                    .args(["build", "-tags", RELEASE_FLAG, "-o", name])
                    .current_dir(workdir)
                    .env("GOOS", platform.os())
                    .env("GOARCH", platform.arch()),
            ),
            Toolchain::Cargo => {
                let triple = cargo_target(platform)?;
                Some(
                    CommandSpec::new("cargo")
                        .args(["build", "--release", "--target", triple, "--bin", name])
                        .current_dir(workdir)
                        .env("RUSTFLAGS", format!("--cfg {}", RELEASE_FLAG))
                        .env(CARGO_VERSION_ENV, version),
                )
            }
        }
    }

    /// Where the compiler leaves the binary, relative to `workdir`.
    pub fn output_path(&self, workdir: &Path, name: &str, platform: &Platform) -> Option<PathBuf> {
        match self {
            Toolchain::Go => Some(workdir.join(name)),
            Toolchain::Cargo => {
                let triple = cargo_target(platform)?;
                let file = if platform.os() == "windows" {
                    format!("{}.exe", name)
                } else {
                    name.to_string()
                };
                Some(workdir.join("target").join(triple).join("release").join(file))
            }
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toolchain::Go => write!(f, "go"),
            Toolchain::Cargo => write!(f, "cargo"),
        }
    }
}

impl FromStr for Toolchain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "go" => Ok(Toolchain::Go),
            "cargo" => Ok(Toolchain::Cargo),
            other => Err(format!("unknown toolchain '{}' (expected go or cargo)", other)),
        }
    }
}

/// Rust target triple for a platform
pub fn cargo_target(platform: &Platform) -> Option<&'static str> {
    let triple = match (platform.os(), platform.arch()) {
        ("darwin", "amd64") => "x86_64-apple-darwin",
        ("darwin", "arm64") => "aarch64-apple-darwin",
        ("darwin", "386") => "i686-apple-darwin",
        ("freebsd", "amd64") => "x86_64-unknown-freebsd",
        ("freebsd", "386") => "i686-unknown-freebsd",
        ("freebsd", "arm") => "armv7-unknown-freebsd",
        ("linux", "amd64") => "x86_64-unknown-linux-gnu",
        ("linux", "386") => "i686-unknown-linux-gnu",
        ("linux", "arm") => "armv7-unknown-linux-gnueabihf",
        ("linux", "arm64") => "aarch64-unknown-linux-gnu",
        ("windows", "amd64") => "x86_64-pc-windows-gnu",
        ("windows", "386") => "i686-pc-windows-gnu",
        _ => return None,
    };
    Some(triple)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(s: &str) -> Platform {
        s.parse().unwrap()
    }

    #[test]
    fn test_go_version_file() {
        let (name, body) = Toolchain::Go.version_file("1.2.3").unwrap();
        assert_eq!(name, "relver.go");
        assert!(body.contains("// +build release"));
        assert!(body.contains("const Version = \"1.2.3\""));
        assert!(Toolchain::Cargo.version_file("1.2.3").is_none());
    }

    #[test]
    fn test_go_command() {
        let spec = Toolchain::Go
            .build_command(Path::new("/w"), "hk", "1.2.3", &platform("linux-arm"))
            .unwrap();
        assert_eq!(spec.command_line(), "go build -tags release -o hk");
        assert!(spec.env.contains(&("GOOS".to_string(), "linux".to_string())));
        assert!(spec.env.contains(&("GOARCH".to_string(), "arm".to_string())));
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/w")));
    }

    #[test]
    fn test_cargo_command_and_output() {
        let p = platform("windows-amd64");
        let spec = Toolchain::Cargo
            .build_command(Path::new("/w"), "hk", "1.2.3", &p)
            .unwrap();
        assert_eq!(
            spec.command_line(),
            "cargo build --release --target x86_64-pc-windows-gnu --bin hk"
        );
        assert!(spec.env.contains(&("RELEASE_VERSION".to_string(), "1.2.3".to_string())));
        assert!(spec.env.contains(&("RUSTFLAGS".to_string(), "--cfg release".to_string())));
        assert_eq!(
            Toolchain::Cargo.output_path(Path::new("/w"), "hk", &p).unwrap(),
            PathBuf::from("/w/target/x86_64-pc-windows-gnu/release/hk.exe")
        );
    }

    #[test]
    fn test_cargo_unknown_target() {
        let p = platform("plan9-amd64");
        assert!(Toolchain::Cargo
            .build_command(Path::new("/w"), "hk", "1", &p)
            .is_none());
        assert!(Toolchain::Go.build_command(Path::new("/w"), "hk", "1", &p).is_some());
    }

    #[test]
    fn test_parse() {
        assert_eq!("go".parse::<Toolchain>().unwrap(), Toolchain::Go);
        assert_eq!("cargo".parse::<Toolchain>().unwrap(), Toolchain::Cargo);
        assert!("make".parse::<Toolchain>().is_err());
    }
}
