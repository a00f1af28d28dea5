//! Environment (layer 3) and CLI override (layer 4) documents

use serde_json::{Map, Value};

/// Environment variables read into the configuration, with their key paths.
pub const ENV_VARS: &[(&str, &str)] = &[
    ("DISTURL", "registry.url"),
    ("S3DISTURL", "storage.url"),
    ("S3_ACCESS_KEY", "storage.access_key"),
    ("S3_SECRET_KEY", "storage.secret_key"),
    ("S3_REGION", "storage.region"),
    ("BUILDNAME", "artifact.name"),
    ("BUILDBRANCH", "source.branch"),
    ("BUILDREPO", "source.repository"),
    ("NETRC", "credentials.netrc"),
];

/// Build the environment layer using `lookup` to read variables.
///
/// Unset and empty variables contribute nothing.
pub fn env_layer<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut root = Map::new();
    for (var, path) in ENV_VARS {
        let Some(value) = lookup(var).filter(|v| !v.is_empty()) else {
            continue;
        };
        insert_path(&mut root, path, Value::String(value));
    }
    Value::Object(root)
}

/// Build a layer from `(key path, value)` pairs; `None` values are skipped.
pub fn overrides_layer<'a, I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'a str, Option<String>)>,
{
    let mut root = Map::new();
    for (path, value) in pairs {
        if let Some(value) = value {
            insert_path(&mut root, path, Value::String(value));
        }
    }
    Value::Object(root)
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(leaf) = parts.pop() else {
        return;
    };
    let mut current = root;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else {
            return;
        };
        current = map;
    }
    current.insert(leaf.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overrides_layer() {
        let layer = overrides_layer([
            ("registry.url", Some("https://r.test/".to_string())),
            ("source.branch", None),
            ("source.workdir", Some("/tmp/src".to_string())),
        ]);
        assert_eq!(layer["registry"]["url"], "https://r.test/");
        assert_eq!(layer["source"]["workdir"], "/tmp/src");
        assert!(layer["source"].get("branch").is_none());
    }

    #[test]
    fn test_env_layer_maps_vars() {
        let vars: HashMap<&str, &str> = [
            ("DISTURL", "https://dist.example/"),
            ("BUILDNAME", "hk"),
            ("BUILDBRANCH", "release"),
        ]
        .into_iter()
        .collect();

        let layer = env_layer(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(layer["registry"]["url"], "https://dist.example/");
        assert_eq!(layer["artifact"]["name"], "hk");
        assert_eq!(layer["source"]["branch"], "release");
        assert!(layer.get("storage").is_none());
    }

    #[test]
    fn test_empty_vars_are_ignored() {
        let layer = env_layer(|k| (k == "S3DISTURL").then(String::new));
        assert_eq!(layer, serde_json::json!({}));
    }

    #[test]
    fn test_storage_keys_share_table() {
        let layer = env_layer(|k| match k {
            "S3DISTURL" => Some("https://store.example/dist/".to_string()),
            "S3_ACCESS_KEY" => Some("AKID".to_string()),
            _ => None,
        });
        assert_eq!(layer["storage"]["url"], "https://store.example/dist/");
        assert_eq!(layer["storage"]["access_key"], "AKID");
    }
}
