//! Configuration loading and environment parsing.

use serde_json::Value;
use std::fs;
use std::path::Path;

use super::Config;

/// Load configuration with the following precedence (highest first):
/// 1) `ARCADE_LOBBY_CONFIG_JSON` env var containing raw JSON
/// 2) File pointed at by `ARCADE_LOBBY_CONFIG_PATH`
/// 3) `config.json` in the current working directory
/// 4) Defaults compiled into the binary
///
/// Individual fields can be overridden with `ARCADE_LOBBY__`-prefixed env
/// vars using `__` as a nested separator, e.g. `ARCADE_LOBBY__PORT=8080` or
/// `ARCADE_LOBBY__LOGGING__LEVEL=debug`. The deployment variables the
/// platform sets directly — `PORT`, `CLIENT_URL`, `DEBUG_LOGGING`,
/// `NOCODE_BACKEND_URL`, `NOCODE_API_KEY` — are honored as first-class
/// aliases on top of everything else.
///
/// Errors while reading or parsing any layer are printed to stderr and that
/// layer is skipped; `load()` always returns a usable `Config`.
#[must_use]
pub fn load() -> Config {
    use std::env;
    use std::path::PathBuf;

    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    if let Ok(json) = env::var("ARCADE_LOBBY_CONFIG_JSON") {
        if let Some(value) = parse_json_document(&json, "ARCADE_LOBBY_CONFIG_JSON") {
            merge_values(&mut merged, value);
        }
    }

    if let Ok(path) = env::var("ARCADE_LOBBY_CONFIG_PATH") {
        merge_file_source(&mut merged, &PathBuf::from(path));
    }

    merge_file_source(&mut merged, &PathBuf::from("config.json"));

    apply_env_overrides(&mut merged);
    apply_deployment_aliases(&mut merged);

    match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    }
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Failed to parse config from {label}: {err}");
            None
        }
    }
}

fn merge_file_source(target: &mut Value, path: &Path) {
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }
    match fs::read_to_string(path) {
        Ok(contents) => {
            if let Some(value) = parse_json_document(&contents, &format!("file {}", path.display()))
            {
                merge_values(target, value);
            }
        }
        Err(err) => {
            eprintln!("Failed to read config from {}: {}", path.display(), err);
        }
    }
}

fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => {
            *target_slot = source_value;
        }
    }
}

fn apply_env_overrides(root: &mut Value) {
    for (key, raw_value) in std::env::vars() {
        let Some(stripped) = key.strip_prefix("ARCADE_LOBBY__") else {
            continue;
        };
        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if segments.is_empty() {
            continue;
        }
        set_nested_value(root, &segments, parse_scalar(raw_value.trim()));
    }
}

/// Deployment platforms set these without a prefix; map them onto the
/// nested config shape.
fn apply_deployment_aliases(root: &mut Value) {
    let alias = |root: &mut Value, var: &str, path: &[&str]| {
        if let Ok(raw) = std::env::var(var) {
            if !raw.trim().is_empty() {
                let segments: Vec<String> = path.iter().map(|s| s.to_string()).collect();
                set_nested_value(root, &segments, parse_scalar(raw.trim()));
            }
        }
    };

    alias(root, "PORT", &["port"]);
    alias(root, "CLIENT_URL", &["client_url"]);
    alias(root, "NOCODE_BACKEND_URL", &["upstream", "backend_url"]);
    alias(root, "NOCODE_API_KEY", &["upstream", "api_key"]);

    if let Ok(raw) = std::env::var("DEBUG_LOGGING") {
        if matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
            let segments = vec!["logging".to_string(), "level".to_string()];
            set_nested_value(root, &segments, Value::String("debug".to_string()));
        }
    }
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    let map = ensure_object(target);
    if rest.is_empty() {
        map.insert(head.clone(), value);
    } else {
        let entry = map
            .entry(head.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        set_nested_value(entry, rest, value);
    }
}

fn ensure_object(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(serde_json::Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was coerced into an object above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_scalars_and_unions_objects() {
        let mut target = serde_json::json!({"port": 3210, "server": {"max_players": 4}});
        merge_values(
            &mut target,
            serde_json::json!({"port": 9000, "server": {"host_grace_secs": 10}}),
        );
        assert_eq!(target["port"], 9000);
        assert_eq!(target["server"]["max_players"], 4);
        assert_eq!(target["server"]["host_grace_secs"], 10);
    }

    #[test]
    fn nested_set_creates_intermediate_objects() {
        let mut root = serde_json::json!({});
        set_nested_value(
            &mut root,
            &["upstream".to_string(), "backend_url".to_string()],
            Value::String("https://example.test".to_string()),
        );
        assert_eq!(root["upstream"]["backend_url"], "https://example.test");
    }

    #[test]
    fn scalars_parse_to_native_json_types() {
        assert_eq!(parse_scalar("8080"), Value::from(8080));
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(
            parse_scalar("https://a.example"),
            Value::String("https://a.example".to_string())
        );
    }
}
