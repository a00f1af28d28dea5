//! Canonical key naming.
//!
//! Every remote object is addressed by a flat file name built from the
//! artifact name, version and platform:
//!
//! | object           | key                                |
//! |------------------|------------------------------------|
//! | release record   | `{name}-{version}-{os}-{arch}.json` |
//! | current pointer  | `{name}-{os}-{arch}.json`           |
//! | package blob     | `{name}-{version}-{os}-{arch}.gz`   |
//!
//! Components are restricted to `[A-Za-z0-9.-]` so a key can never
//! introduce a path separator or query syntax.

use crate::error::ProtocolError;
use crate::platform::Platform;

/// Returns true if `ch` may appear in a version or artifact name.
pub fn is_allowed_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '.' || ch == '-'
}

/// Validate one key component.
pub fn validate_component(field: &'static str, value: &str) -> Result<(), ProtocolError> {
    if value.is_empty() {
        return Err(ProtocolError::EmptyComponent { field });
    }
    if let Some(ch) = value.chars().find(|c| !is_allowed_char(*c)) {
        return Err(ProtocolError::DisallowedChar {
            field,
            value: value.to_string(),
            ch,
        });
    }
    Ok(())
}

/// Identity of one release: artifact name + version + platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseKey {
    name: String,
    version: String,
    platform: Platform,
}

impl ReleaseKey {
    /// Build a key, validating the name and version.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        platform: Platform,
    ) -> Result<Self, ProtocolError> {
        let name = name.into();
        let version = version.into();
        validate_component("artifact name", &name)?;
        validate_component("version", &version)?;
        Ok(Self {
            name,
            version,
            platform,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// `{name}-{version}`, also the name stored inside the gzip header.
    pub fn release_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Key of the immutable release record.
    pub fn record_key(&self) -> String {
        format!("{}-{}.json", self.release_name(), self.platform)
    }

    /// Key of the compressed package in content storage.
    pub fn package_key(&self) -> String {
        format!("{}-{}.gz", self.release_name(), self.platform)
    }

    /// Key of the mutable current-version pointer for this platform.
    pub fn pointer_key(&self) -> String {
        pointer_key(&self.name, &self.platform)
    }
}

/// Key of the current-version pointer for `name` on `platform`.
pub fn pointer_key(name: &str, platform: &Platform) -> String {
    format!("{}-{}.json", name, platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> ReleaseKey {
        ReleaseKey::new("widget", "1.2.3", Platform::new("linux", "amd64").unwrap()).unwrap()
    }

    #[test]
    fn test_key_names() {
        let key = widget();
        assert_eq!(key.release_name(), "widget-1.2.3");
        assert_eq!(key.record_key(), "widget-1.2.3-linux-amd64.json");
        assert_eq!(key.package_key(), "widget-1.2.3-linux-amd64.gz");
        assert_eq!(key.pointer_key(), "widget-linux-amd64.json");
    }

    #[test]
    fn test_allowed_chars() {
        assert!(validate_component("version", "1.2.3-rc.1").is_ok());
        assert!(validate_component("version", "20240101").is_ok());

        for bad in ["1.2/3", "1.2 3", "1.2?x=1", "1.2#3", "1.2_3", "1.2+build"] {
            assert!(
                validate_component("version", bad).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_non_ascii_alphanumerics() {
        let err = validate_component("version", "1.2.３").unwrap_err();
        assert!(matches!(err, ProtocolError::DisallowedChar { ch: '３', .. }));
    }

    #[test]
    fn test_empty_component() {
        let err = ReleaseKey::new("widget", "", Platform::new("linux", "amd64").unwrap());
        assert_eq!(
            err.unwrap_err(),
            ProtocolError::EmptyComponent { field: "version" }
        );
    }
}
