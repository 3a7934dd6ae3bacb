//! Backend Registry
//!
//! Maps backend identifiers to constructors. The engine picks one at
//! startup, typically from its configuration, and keeps using it.

use std::sync::Arc;

use log::debug;

use super::{grid, slurm, ClusterBackend, ContainerBackend, GridScheduler, SlurmScheduler};
use crate::container::ContainerRuntime;
use crate::error::{BackendError, Result};

/// Identifiers of all registered backends.
const BACKENDS: &[&str] = &[grid::NAME, slurm::NAME];

/// Returns the identifiers the engine can select.
pub fn available_backends() -> &'static [&'static str] {
    BACKENDS
}

/// Creates the backend registered as `name`, wrapping `container`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use gridrunner::container::Singularity;
/// use gridrunner::scheduler::create_backend;
///
/// let backend = create_backend("slurm_singularity", Arc::new(Singularity::new())).unwrap();
/// assert_eq!(backend.cli_name(), "slurm_singularity");
/// ```
pub fn create_backend(
    name: &str,
    container: Arc<dyn ContainerRuntime>,
) -> Result<Box<dyn ContainerBackend>> {
    debug!("Creating backend: {}", name);

    match name {
        grid::NAME => Ok(Box::new(ClusterBackend::new(GridScheduler, container))),
        slurm::NAME => Ok(Box::new(ClusterBackend::new(SlurmScheduler, container))),
        other => Err(BackendError::UnknownBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, IMAGE_CACHE_KEY};
    use crate::container::{ContainerTask, Singularity};
    use crate::runtime::{ResourceRequest, RuntimeValues, Value};
    use crate::scheduler::testing::strings;
    use crate::scheduler::NoAdmission;
    use tempfile::tempdir;

    #[test]
    fn test_available_backends() {
        assert_eq!(
            available_backends(),
            &["grid_singularity", "slurm_singularity"]
        );
    }

    #[test]
    fn test_create_each_backend() {
        for name in available_backends() {
            let backend = create_backend(name, Arc::new(Singularity::new())).unwrap();
            assert_eq!(backend.cli_name(), *name);
            assert_eq!(backend.container().config_section(), "singularity");
        }
    }

    #[test]
    fn test_create_unknown_backend() {
        let result = create_backend("pbs_singularity", Arc::new(Singularity::new()));
        match result {
            Err(BackendError::UnknownBackend(name)) => assert_eq!(name, "pbs_singularity"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_grid_singularity_end_to_end() {
        let temp_dir = tempdir().unwrap();
        let mut cfg = BackendConfig::with_defaults();
        cfg.set("singularity", IMAGE_CACHE_KEY, temp_dir.path().to_str().unwrap());

        let backend = create_backend("grid_singularity", Arc::new(Singularity::new())).unwrap();
        let ctx = backend.global_init(cfg, &NoAdmission).unwrap();

        let mut runtime = RuntimeValues::new();
        runtime.insert("cpu".to_string(), Value::Int(4));
        runtime.insert("memory_reservation".to_string(), Value::Int(4_294_967_296));
        runtime.insert("grid_queue".to_string(), Value::from("all.q"));

        let mut request = ResourceRequest::new();
        backend.process_runtime(&ctx, &runtime, &mut request).unwrap();

        let task = ContainerTask::new("/mnt/task/work", strings(&["/bin/bash", "../command"]));
        let invocation = backend.run_invocation(&ctx, &request, "task123", &task).unwrap();

        assert_eq!(
            invocation.directives(),
            strings(&[
                "qsub", "-b", "yes", "-now", "no", "-sync", "yes", "-S", "/bin/bash", "-V", "-R",
                "yes", "-N", "task123", "-q", "all.q", "-pe", "smp", "4", "-l", "mem_free=1024M",
            ])
            .as_slice()
        );
        assert_eq!(
            invocation.container_tokens(),
            strings(&[
                "singularity", "exec", "--containall", "--no-mount", "hostfs", "--pwd",
                "/mnt/task/work", "docker://ubuntu:22.04", "/bin/bash", "../command",
            ])
            .as_slice()
        );
    }
}
