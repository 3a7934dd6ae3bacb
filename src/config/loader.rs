//! Configuration Loader
//!
//! Reads a [`BackendConfig`] from a YAML or JSON file, layering it over
//! the built-in defaults and then applying environment overrides.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use super::BackendConfig;
use crate::error::{BackendError, Result};

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "GRIDRUNNER__";

/// Loads configuration from `path`, or only defaults when `path` is `None`.
///
/// This function:
/// 1. Starts from [`BackendConfig::with_defaults`]
/// 2. Merges the file (`.json` is parsed as JSON, anything else as YAML)
/// 3. Applies `GRIDRUNNER__SECTION__KEY` environment variables
///
/// # Example
///
/// ```rust,no_run
/// use gridrunner::config::load_config;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cfg = load_config(Some("gridrunner.yaml"))?;
///     println!("{:?}", cfg.get("grid", "extra_args"));
///     Ok(())
/// }
/// ```
pub fn load_config(path: Option<&str>) -> Result<BackendConfig> {
    let mut cfg = BackendConfig::with_defaults();

    if let Some(path) = path {
        info!("Loading configuration from: {}", path);
        let content = fs::read_to_string(path).map_err(|e| {
            BackendError::Configuration(format!(
                "failed to read configuration file '{}': {}",
                path, e
            ))
        })?;
        cfg.override_with(parse_sections(&content, Path::new(path))?);
    }

    apply_env_overrides(&mut cfg, std::env::vars());
    Ok(cfg)
}

/// Parses file content into section maps with stringified scalar values.
fn parse_sections(
    content: &str,
    path: &Path,
) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let raw: BTreeMap<String, BTreeMap<String, serde_json::Value>> =
            serde_json::from_str(content)?;
        stringify(raw, json_scalar)
    } else {
        // An empty YAML document deserializes to unit, not a map
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let raw: BTreeMap<String, BTreeMap<String, serde_yaml::Value>> =
            serde_yaml::from_str(content)?;
        stringify(raw, yaml_scalar)
    }
}

/// Converts every value with `scalar`, failing on the first non-scalar.
fn stringify<V>(
    raw: BTreeMap<String, BTreeMap<String, V>>,
    scalar: fn(&str, &str, V) -> Result<String>,
) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
    raw.into_iter()
        .map(|(section, values)| {
            values
                .into_iter()
                .map(|(key, v)| scalar(&section, &key, v).map(|s| (key, s)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(|values| (section, values))
        })
        .collect()
}

fn yaml_scalar(section: &str, key: &str, value: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value as Y;

    match value {
        Y::Null => Ok(String::new()),
        Y::Bool(b) => Ok(b.to_string()),
        Y::Number(n) => Ok(n.to_string()),
        Y::String(s) => Ok(s),
        _ => Err(non_scalar(section, key)),
    }
}

fn json_scalar(section: &str, key: &str, value: serde_json::Value) -> Result<String> {
    use serde_json::Value as J;

    match value {
        J::Null => Ok(String::new()),
        J::Bool(b) => Ok(b.to_string()),
        J::Number(n) => Ok(n.to_string()),
        J::String(s) => Ok(s),
        _ => Err(non_scalar(section, key)),
    }
}

fn non_scalar(section: &str, key: &str) -> BackendError {
    BackendError::Configuration(format!(
        "[{}] {} must be a scalar value",
        section, key
    ))
}

/// Applies `GRIDRUNNER__SECTION__KEY=value` pairs onto `cfg`.
///
/// Section and key names are lowercased. Variables that do not split into
/// exactly a section and a key are ignored with a warning.
pub fn apply_env_overrides<I>(cfg: &mut BackendConfig, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, value) in vars {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let parts: Vec<&str> = rest.split("__").collect();
        match parts.as_slice() {
            [section, key] if !section.is_empty() && !key.is_empty() => {
                let section = section.to_lowercase();
                let key = key.to_lowercase();
                debug!("Environment override: [{}] {} = {:?}", section, key, value);
                cfg.set(&section, &key, value);
            }
            _ => warn!("Ignoring malformed configuration variable: {}", name),
        }
    }
}
