//! Layer merge
//!
//! - Objects: merged key by key, recursively
//! - Arrays: replaced wholesale by the later layer
//! - Scalars (including null): replaced by the later layer

use serde_json::Value;

/// Merge `overlay` on top of `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Fold layers in precedence order (first is lowest).
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_overrides_file_scalar() {
        let file = json!({"artifact": {"name": "hk"}});
        let env = json!({"artifact": {"name": "widget"}});
        assert_eq!(deep_merge(file, env)["artifact"]["name"], "widget");
    }

    #[test]
    fn test_sibling_keys_survive() {
        let defaults = json!({"http": {"connect_timeout_seconds": 15, "timeout_seconds": 300}});
        let file = json!({"http": {"timeout_seconds": 60}});
        let merged = deep_merge(defaults, file);

        assert_eq!(merged["http"]["timeout_seconds"], 60);
        assert_eq!(merged["http"]["connect_timeout_seconds"], 15);
    }

    #[test]
    fn test_platform_list_is_replaced() {
        let defaults = json!({"platforms": ["linux-amd64", "linux-386", "darwin-amd64"]});
        let file = json!({"platforms": ["linux-arm64"]});
        let merged = deep_merge(defaults, file);

        assert_eq!(merged["platforms"], json!(["linux-arm64"]));
    }

    #[test]
    fn test_null_clears_value() {
        let merged = deep_merge(json!({"build": {"toolchain": "go"}}), json!({"build": {"toolchain": null}}));
        assert!(merged["build"]["toolchain"].is_null());
    }

    #[test]
    fn test_merge_layers_precedence() {
        let merged = merge_layers(vec![
            json!({"source": {"workdir": "src", "branch": "main"}}),
            json!({"source": {"branch": "release"}}),
            json!({"registry": {"url": "https://dist.example/"}}),
            json!({"source": {"workdir": "/tmp/co"}}),
        ]);

        assert_eq!(merged["source"]["workdir"], "/tmp/co");
        assert_eq!(merged["source"]["branch"], "release");
        assert_eq!(merged["registry"]["url"], "https://dist.example/");
    }
}
