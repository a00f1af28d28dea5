//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use distkit_protocol::DEFAULT_PLATFORMS;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Checkout directory, wiped and re-cloned for every platform
    pub workdir: String,

    /// Toolchain used to cross-compile (default: "go")
    pub toolchain: String,

    /// HTTP connect timeout in seconds (default: 15)
    pub connect_timeout_seconds: u64,

    /// HTTP request timeout in seconds, covers large uploads (default: 300)
    pub timeout_seconds: u64,

    /// Region used when signing storage requests (default: "us-east-1")
    pub storage_region: String,

    /// Platforms accepted on the command line and built by `all`
    pub platforms: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            workdir: "distkit-src".to_string(),
            toolchain: "go".to_string(),
            connect_timeout_seconds: 15,
            timeout_seconds: 300,
            storage_region: "us-east-1".to_string(),
            platforms: DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "source": {
                "workdir": self.workdir
            },
            "build": {
                "toolchain": self.toolchain
            },
            "storage": {
                "region": self.storage_region
            },
            "http": {
                "connect_timeout_seconds": self.connect_timeout_seconds,
                "timeout_seconds": self.timeout_seconds
            },
            "platforms": self.platforms
        })
    }
}
