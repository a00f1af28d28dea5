//! Minimal netrc reader
//!
//! Understands `machine`, `default`, `login`, `password`, `account` and
//! skips `macdef` bodies (which run until the next blank line).

use std::fs;
use std::io;
use std::path::Path;

/// One `machine` (or `default`) entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetrcEntry {
    /// Host name; None for the `default` entry
    pub machine: Option<String>,
    pub login: String,
    pub password: String,
    pub account: Option<String>,
}

/// Parsed netrc file
#[derive(Debug, Clone, Default)]
pub struct Netrc {
    entries: Vec<NetrcEntry>,
}

impl Netrc {
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut entries: Vec<NetrcEntry> = Vec::new();
        let mut in_macdef = false;

        for line in contents.lines() {
            if in_macdef {
                if line.trim().is_empty() {
                    in_macdef = false;
                }
                continue;
            }
            if line.trim_start().starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            while let Some(token) = tokens.next() {
                match token {
                    "machine" => entries.push(NetrcEntry {
                        machine: tokens.next().map(str::to_string),
                        ..Default::default()
                    }),
                    "default" => entries.push(NetrcEntry::default()),
                    "login" | "password" | "account" => {
                        let value = tokens.next().unwrap_or_default().to_string();
                        if let Some(entry) = entries.last_mut() {
                            match token {
                                "login" => entry.login = value,
                                "password" => entry.password = value,
                                _ => entry.account = Some(value),
                            }
                        }
                    }
                    "macdef" => {
                        in_macdef = true;
                        break;
                    }
                    _ => {}
                }
            }
        }

        Self { entries }
    }

    /// Entry for `host`, falling back to `default`.
    pub fn find(&self, host: &str) -> Option<&NetrcEntry> {
        self.entries
            .iter()
            .find(|e| e.machine.as_deref() == Some(host))
            .or_else(|| self.entries.iter().find(|e| e.machine.is_none()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_entries() {
        let netrc = Netrc::parse(
            "machine a.example login alice password apw\nmachine b.example login bob password bpw\n",
        );
        assert_eq!(netrc.find("b.example").unwrap().login, "bob");
        assert_eq!(netrc.find("a.example").unwrap().password, "apw");
        assert!(netrc.find("c.example").is_none());
    }

    #[test]
    fn test_multi_line_and_default() {
        let netrc = Netrc::parse(
            "# comment\nmachine dist.example\n  login ci\n  password s3cret\n  account ops\n\ndefault login anon password guest\n",
        );
        let entry = netrc.find("dist.example").unwrap();
        assert_eq!(entry.login, "ci");
        assert_eq!(entry.account.as_deref(), Some("ops"));

        let fallback = netrc.find("elsewhere.example").unwrap();
        assert_eq!(fallback.machine, None);
        assert_eq!(fallback.login, "anon");
    }

    #[test]
    fn test_macdef_body_skipped() {
        let netrc = Netrc::parse(
            "machine ftp.example login u password p\nmacdef init\ncd /pub\nmachine evil.example login x password y\n\nmachine dist.example login ci password pw\n",
        );
        assert!(netrc.find("evil.example").is_none());
        assert_eq!(netrc.find("dist.example").unwrap().login, "ci");
    }
}
