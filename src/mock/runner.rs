//! Scripted command runner
//!
//! Responses are matched by command-line prefix (`"git clone"`,
//! `"go build"`). A response can create directories or files before it
//! returns, standing in for what the real command would leave on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

/// Side effect a scripted command has on the filesystem
#[derive(Debug, Clone)]
enum Effect {
    Dir(PathBuf),
    File(PathBuf, Vec<u8>),
}

/// A scripted result for one command
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Err simulates a process that could not be started
    output: Result<CommandOutput, String>,
    effects: Vec<Effect>,
}

impl MockResponse {
    /// Exit 0 with no output
    pub fn ok() -> Self {
        Self {
            output: Ok(CommandOutput {
                code: Some(0),
                ..Default::default()
            }),
            effects: Vec::new(),
        }
    }

    /// Exit `code` with `stderr`
    pub fn failure(code: i32, stderr: &str) -> Self {
        Self {
            output: Ok(CommandOutput {
                code: Some(code),
                stdout: Vec::new(),
                stderr: stderr.as_bytes().to_vec(),
            }),
            effects: Vec::new(),
        }
    }

    /// The program cannot be started
    pub fn spawn_error(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            effects: Vec::new(),
        }
    }

    pub fn with_stdout(mut self, stdout: &str) -> Self {
        if let Ok(output) = &mut self.output {
            output.stdout = stdout.as_bytes().to_vec();
        }
        self
    }

    /// Create `dir` (and parents) when the command runs
    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.effects.push(Effect::Dir(dir.as_ref().to_path_buf()));
        self
    }

    /// Write `contents` to `path` when the command runs; relative paths
    /// resolve against the command's working directory
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: &[u8]) -> Self {
        self.effects
            .push(Effect::File(path.as_ref().to_path_buf(), contents.to_vec()));
        self
    }

    fn apply(&self, spec: &CommandSpec) -> io::Result<()> {
        for effect in &self.effects {
            match effect {
                Effect::Dir(dir) => fs::create_dir_all(dir)?,
                Effect::File(path, contents) => {
                    let path = match &spec.cwd {
                        Some(cwd) if path.is_relative() => cwd.join(path),
                        _ => path.clone(),
                    };
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&path, contents)?;
                }
            }
        }
        Ok(())
    }
}

/// Command runner that replays scripted responses and records every call
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    responses: Arc<Mutex<Vec<(String, MockResponse)>>>,
    calls: Arc<Mutex<Vec<CommandSpec>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for commands whose command line starts with
    /// `prefix`. A later registration for the same prefix replaces the
    /// earlier one.
    pub fn respond(&self, prefix: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.retain(|(p, _)| p != prefix);
        responses.push((prefix.to_string(), response));
    }

    /// Every command run so far, in order
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose command line starts with `prefix`
    pub fn calls_matching(&self, prefix: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.command_line().starts_with(prefix))
            .collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        let line = spec.command_line();
        let response = {
            let responses = self.responses.lock().unwrap();
            responses
                .iter()
                .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, r)| r.clone())
        };

        let Some(response) = response else {
            return Ok(CommandOutput {
                code: Some(127),
                stdout: Vec::new(),
                stderr: format!("mock: no response scripted for `{}`", line).into_bytes(),
            });
        };

        match &response.output {
            Err(message) => Err(io::Error::new(io::ErrorKind::NotFound, message.clone())),
            Ok(output) => {
                response.apply(spec)?;
                Ok(output.clone())
            }
        }
    }
}
