//! Slurm Backend
//!
//! Runs each task with `srun`, which allocates resources, runs the
//! command and exits with its status.
//!
//! # Runtime Keys
//!
//! - `slurm_partition` (String): target partition, passed as `--partition`
//! - `time_minutes` (Int): wall-clock limit, passed as `--time`

use std::path::{Path, PathBuf};

use super::{Scheduler, Vocabulary, IMAGE_CACHE_DIR_NAME};

/// Identifier of the Slurm backend.
pub const NAME: &str = "slurm_singularity";

static VOCABULARY: Vocabulary = Vocabulary {
    label: "Slurm",
    // srun blocks by itself and runs the command without a job script
    preamble: &["srun", "--export=ALL"],
    job_name: "--job-name",
    queue: "--partition",
    slots: &["--cpus-per-task"],
    memory: "--mem-per-cpu",
    memory_value: "",
    walltime: Some("--time"),
    cancel: &["scancel", "--name"],
};

/// Slurm workload manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlurmScheduler;

impl Scheduler for SlurmScheduler {
    fn cli_name(&self) -> &'static str {
        NAME
    }

    fn config_section(&self) -> &'static str {
        "slurm"
    }

    fn queue_key(&self) -> &'static str {
        "slurm_partition"
    }

    fn vocabulary(&self) -> &'static Vocabulary {
        &VOCABULARY
    }

    /// Relative to the directory `srun` is started from.
    fn default_image_cache(&self, _cwd: &Path) -> PathBuf {
        PathBuf::from(IMAGE_CACHE_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::IMAGE_CACHE_KEY;
    use crate::error::BackendError;
    use crate::runtime::{ResourceRequest, RuntimeValues, Value};
    use crate::scheduler::testing::*;
    use crate::scheduler::{ClusterBackend, ContainerBackend, NoAdmission};
    use crate::config::BackendConfig;

    fn backend() -> ClusterBackend<SlurmScheduler> {
        ClusterBackend::new(SlurmScheduler, Arc::new(FakeRuntime::default()))
    }

    #[test]
    fn test_slurm_invocation() {
        let backend = backend();
        let ctx = backend.global_init(config_with_cache(), &NoAdmission).unwrap();

        let mut runtime = RuntimeValues::new();
        runtime.insert("cpu".to_string(), Value::Int(8));
        runtime.insert("memory_reservation".to_string(), Value::from("16 GiB"));
        runtime.insert("slurm_partition".to_string(), Value::from("highmem"));
        runtime.insert("time_minutes".to_string(), Value::Int(120));

        let mut request = ResourceRequest::new();
        backend.process_runtime(&ctx, &runtime, &mut request).unwrap();

        let container = strings(&["singularity", "exec", "docker://ubuntu:22.04"]);
        let invocation = backend
            .wrap_invocation(&ctx, &request, "call-sort-1", &container)
            .unwrap();

        assert_eq!(
            invocation.directives(),
            strings(&[
                "srun",
                "--export=ALL",
                "--job-name",
                "call-sort-1",
                "--partition",
                "highmem",
                "--cpus-per-task",
                "8",
                "--mem-per-cpu",
                "2048M",
                "--time",
                "120",
            ])
            .as_slice()
        );
        assert_eq!(invocation.container_tokens(), container.as_slice());
    }

    #[test]
    fn test_slurm_limits_include_time() {
        let backend = backend();
        let ctx = backend.global_init(config_with_cache(), &NoAdmission).unwrap();

        let limits = backend.detect_resource_limits(&ctx);
        assert_eq!(limits.time, Some(u64::MAX));
        assert_eq!(limits.as_map().len(), 3);
    }

    #[test]
    fn test_slurm_default_cache_is_relative() {
        let ctx = backend()
            .global_init(BackendConfig::with_defaults(), &NoAdmission)
            .unwrap();
        assert_eq!(
            ctx.config().get("singularity", IMAGE_CACHE_KEY),
            Some(IMAGE_CACHE_DIR_NAME)
        );
    }

    #[test]
    fn test_slurm_time_minutes_type() {
        let backend = backend();
        let ctx = backend.global_init(config_with_cache(), &NoAdmission).unwrap();

        let mut runtime = RuntimeValues::new();
        runtime.insert("time_minutes".to_string(), Value::from("2h"));

        let mut request = ResourceRequest::new();
        let result = backend.process_runtime(&ctx, &runtime, &mut request);
        assert!(matches!(result, Err(BackendError::TypeCoercion(_))));
    }

    #[test]
    fn test_slurm_default_partition() {
        let backend = backend();
        let mut cfg = config_with_cache();
        cfg.set("slurm", "default_queue", "batch");
        let ctx = backend.global_init(cfg, &NoAdmission).unwrap();

        let mut request = ResourceRequest::new();
        backend
            .process_runtime(&ctx, &RuntimeValues::new(), &mut request)
            .unwrap();
        let invocation = backend
            .wrap_invocation(&ctx, &request, "t", &strings(&["true"]))
            .unwrap();
        assert!(invocation
            .directives()
            .ends_with(&strings(&["--partition", "batch"])));
    }

    #[test]
    fn test_slurm_cancel() {
        assert_eq!(
            backend().cancel_invocation("call-sort-1"),
            strings(&["scancel", "--name", "call-sort-1"])
        );
    }
}
