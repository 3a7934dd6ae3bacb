//! Backend Configuration
//!
//! Sectioned key/value configuration shared by the container runtime and
//! the scheduler backends. Values are strings; an empty string means the
//! setting is unset and may be replaced by a computed default.
//!
//! # Example YAML Format
//!
//! ```yaml
//! singularity:
//!   image_cache: /shared/images
//! grid:
//!   default_queue: all.q
//!   extra_args: -P bioinfo -l h_rt=24:00:00
//! ```
//!
//! Any key can also be set through the environment as
//! `GRIDRUNNER__<SECTION>__<KEY>=value`.

pub mod loader;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use loader::{load_config, ENV_PREFIX};

/// Section and key of the shared image cache.
pub const IMAGE_CACHE_KEY: &str = "image_cache";

/// Key holding passthrough scheduler arguments.
pub const EXTRA_ARGS_KEY: &str = "extra_args";

/// Key holding a queue used when a task names none.
pub const DEFAULT_QUEUE_KEY: &str = "default_queue";

type Section = BTreeMap<String, String>;

/// Sectioned configuration with override semantics.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct BackendConfig {
    sections: BTreeMap<String, Section>,
}

impl BackendConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration holding the built-in defaults.
    pub fn with_defaults() -> Self {
        let mut cfg = Self::new();
        cfg.set("singularity", "exe", "singularity");
        cfg.set("singularity", IMAGE_CACHE_KEY, "");
        cfg.set("singularity", "run_options", "--containall --no-mount hostfs");
        cfg.set("singularity", "default_image", "ubuntu:22.04");
        cfg
    }

    /// Returns the raw value of `section.key`, empty strings included.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// Returns the value of `section.key` unless it is missing or empty.
    pub fn get_set(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|v| !v.is_empty())
    }

    /// Checks whether a section exists.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Sets a single value.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Merges `overrides` on top of the current values, section by section.
    pub fn override_with(&mut self, overrides: BTreeMap<String, BTreeMap<String, String>>) {
        for (section, values) in overrides {
            let target = self.sections.entry(section).or_default();
            target.extend(values);
        }
    }

    /// Section names in sorted order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}
