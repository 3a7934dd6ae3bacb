//! Singularity / Apptainer Container Runtime
//!
//! Builds `singularity exec` command lines for task containers.
//!
//! # Image Resolution
//!
//! Images are looked up in the shared image cache first: an image
//! `quay.io/biocontainers/samtools:1.17` is expected at
//! `{image_cache}/quay.io_biocontainers_samtools_1.17.sif`. When no cached
//! file exists, the image reference is handed to Singularity as a
//! `docker://` URI (unless it already carries a scheme).

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{ContainerRuntime, ContainerTask, MEMORY_KEYS};
use crate::config::{BackendConfig, IMAGE_CACHE_KEY};
use crate::error::{BackendError, Result};
use crate::runtime::{ResourceRequest, RuntimeValues};
use crate::scheduler::words::split_words;

/// Configuration section of this runtime.
pub const SECTION: &str = "singularity";

/// Runtime keys naming the task image, in priority order.
const IMAGE_KEYS: &[&str] = &["docker", "container"];

/// Singularity container runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct Singularity;

impl Singularity {
    pub fn new() -> Self {
        Self
    }

    fn image_uri(&self, cfg: &BackendConfig, image: &str) -> String {
        if image.contains("://") {
            return image.to_string();
        }

        if let Some(cache) = cfg.get_set(SECTION, IMAGE_CACHE_KEY) {
            let cached = cached_image_path(Path::new(cache), image);
            if cached.exists() {
                debug!("Using cached image: {}", cached.display());
                return cached.display().to_string();
            }
        }

        format!("docker://{}", image)
    }
}

/// Location of the `.sif` file for `image` inside the cache directory.
pub fn cached_image_path(cache: &Path, image: &str) -> PathBuf {
    let file_name: String = image
        .chars()
        .map(|c| match c {
            '/' | ':' | '@' => '_',
            c => c,
        })
        .collect();
    cache.join(format!("{}.sif", file_name))
}

impl ContainerRuntime for Singularity {
    fn config_section(&self) -> &'static str {
        SECTION
    }

    fn global_init(&self, cfg: &BackendConfig) -> Result<()> {
        let exe = cfg.get_set(SECTION, "exe").ok_or_else(|| {
            BackendError::Configuration(format!("[{}] exe must be set", SECTION))
        })?;

        let cache = cfg.get_set(SECTION, IMAGE_CACHE_KEY).ok_or_else(|| {
            BackendError::Configuration(format!("[{}] {} must be set", SECTION, IMAGE_CACHE_KEY))
        })?;

        fs::create_dir_all(cache).map_err(|e| {
            BackendError::Configuration(format!(
                "cannot create image cache directory '{}': {}",
                cache, e
            ))
        })?;

        info!("Singularity executable: {}, image cache: {}", exe, cache);
        Ok(())
    }

    fn process_runtime(
        &self,
        runtime: &RuntimeValues,
        request: &mut ResourceRequest,
    ) -> Result<()> {
        if let Some(cpu) = runtime.get("cpu") {
            request.cpu = Some(cpu.coerce_count()?);
        }

        if let Some(memory) = MEMORY_KEYS.iter().find_map(|key| runtime.get(*key)) {
            request.memory_bytes = Some(memory.coerce_byte_size()?);
        }

        if let Some(image) = IMAGE_KEYS.iter().find_map(|key| runtime.get(*key)) {
            request.image = Some(image.coerce_string()?);
        }

        debug!(
            "Container runtime values: cpu={:?} memory={:?} image={:?}",
            request.cpu, request.memory_bytes, request.image
        );
        Ok(())
    }

    fn run_invocation(
        &self,
        cfg: &BackendConfig,
        request: &ResourceRequest,
        task: &ContainerTask,
    ) -> Result<Vec<String>> {
        let exe = cfg.get_set(SECTION, "exe").unwrap_or("singularity");

        let image = match request.image.as_deref() {
            Some(image) => image,
            None => cfg.get_set(SECTION, "default_image").ok_or_else(|| {
                BackendError::Configuration(
                    "task declares no image and no default_image is configured".to_string(),
                )
            })?,
        };

        let run_options = cfg.get(SECTION, "run_options").unwrap_or_default();
        let options = split_words(run_options).map_err(|e| {
            BackendError::Configuration(format!("[{}] run_options: {}", SECTION, e))
        })?;

        let mut tokens = vec![exe.to_string(), "exec".to_string()];
        tokens.extend(options);
        tokens.push("--pwd".to_string());
        tokens.push(task.work_dir.clone());

        for mount in &task.mounts {
            let mode = if mount.writable { "" } else { ":ro" };
            tokens.push("--bind".to_string());
            tokens.push(format!("{}:{}{}", mount.host.display(), mount.guest, mode));
        }

        tokens.push(self.image_uri(cfg, image));
        tokens.extend(task.command.iter().cloned());

        Ok(tokens)
    }
}
