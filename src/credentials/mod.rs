//! Credential resolution for registry and storage requests
//!
//! Credentials come from, in order:
//! 1. `user:password@` embedded in the target URL (stripped before sending)
//! 2. the netrc file entry for the URL's host
//! 3. the netrc `default` entry

mod netrc;

pub use netrc::{Netrc, NetrcEntry};

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;
use url::Url;

/// Username/password pair sent as HTTP Basic authorization
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header
    pub fn basic_auth(&self) -> String {
        let pair = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(pair.as_bytes()))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Credential errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no credentials for host '{host}' (not in URL, no entry in {netrc})")]
    NoCredentials { host: String, netrc: String },

    #[error("URL has no host: {0}")]
    NoHost(String),

    #[error("failed to read netrc {path}: {message}")]
    NetrcRead { path: String, message: String },
}

/// Resolves credentials for a target URL
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    netrc_path: Option<PathBuf>,
}

impl CredentialResolver {
    pub fn new(netrc_path: Option<PathBuf>) -> Self {
        Self { netrc_path }
    }

    /// Resolve credentials for `url`.
    ///
    /// Returns the URL to request (userinfo removed) and the credentials.
    pub fn resolve(&self, url: &Url) -> Result<(Url, Credentials), CredentialError> {
        let host = url
            .host_str()
            .ok_or_else(|| CredentialError::NoHost(url.to_string()))?
            .to_string();

        let mut target = url.clone();
        if !url.username().is_empty() {
            let username = percent_decode(url.username());
            let password = url.password().map(percent_decode).unwrap_or_default();
            // set_username/set_password only fail for cannot-be-a-base URLs,
            // which have no host and were rejected above.
            let _ = target.set_username("");
            let _ = target.set_password(None);
            return Ok((target, Credentials::new(username, password)));
        }

        let netrc_display = self
            .netrc_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<no netrc configured>".to_string());

        let Some(path) = &self.netrc_path else {
            return Err(CredentialError::NoCredentials {
                host,
                netrc: netrc_display,
            });
        };

        let netrc = match Netrc::load(path) {
            Ok(netrc) => netrc,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::NoCredentials {
                    host,
                    netrc: netrc_display,
                })
            }
            Err(e) => {
                return Err(CredentialError::NetrcRead {
                    path: netrc_display,
                    message: e.to_string(),
                })
            }
        };

        match netrc.find(&host) {
            Some(entry) => Ok((target, Credentials::new(&entry.login, &entry.password))),
            None => Err(CredentialError::NoCredentials {
                host,
                netrc: netrc_display,
            }),
        }
    }
}

fn percent_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}
