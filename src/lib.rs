//! GridRunner - Cluster Scheduler Backends for Containerized Tasks
//!
//! Runs workflow task containers through a cluster batch scheduler
//! instead of on the local host. The hosting engine keeps ownership of
//! process spawning and exit codes; this library decides what to spawn.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`config`]: Sectioned backend configuration and its loader
//! - [`runtime`]: Task runtime values, resource requests and limits
//! - [`container`]: The container runtime backends delegate to
//! - [`scheduler`]: Grid Engine and Slurm backends and their registry
//! - [`logging`]: Optional `env_logger` setup for hosts
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gridrunner::config::load_config;
//! use gridrunner::container::{ContainerTask, Singularity};
//! use gridrunner::runtime::{ResourceRequest, RuntimeValues};
//! use gridrunner::scheduler::{create_backend, NoAdmission};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = create_backend("grid_singularity", Arc::new(Singularity::new()))?;
//!     let ctx = backend.global_init(load_config(Some("gridrunner.yaml"))?, &NoAdmission)?;
//!
//!     let runtime: RuntimeValues =
//!         serde_json::from_str(r#"{"cpu": 4, "memory": "4 GiB", "grid_queue": "all.q"}"#)?;
//!     let mut request = ResourceRequest::new();
//!     backend.process_runtime(&ctx, &runtime, &mut request)?;
//!
//!     let task = ContainerTask::new("/mnt/task/work", vec!["/bin/bash".into(), "../command".into()]);
//!     let invocation = backend.run_invocation(&ctx, &request, "call-align-0", &task)?;
//!     println!("{}", invocation);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod scheduler;

// Re-export commonly used types
pub use config::BackendConfig;
pub use error::{BackendError, Result};
pub use runtime::{JobInvocation, ResourceLimits, ResourceRequest};
pub use scheduler::{create_backend, BackendContext, ContainerBackend};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::container::Singularity;

    #[test]
    fn test_module_exports_request() {
        let request = ResourceRequest::new().with_cpu(2);
        assert_eq!(request.cpu, Some(2));
    }

    #[test]
    fn test_module_exports_config() {
        let cfg = BackendConfig::with_defaults();
        assert!(cfg.has_section("singularity"));
    }

    #[test]
    fn test_module_exports_backend() {
        let backend: Box<dyn ContainerBackend> =
            create_backend("slurm_singularity", Arc::new(Singularity::new())).unwrap();
        assert_eq!(backend.cancel_invocation("task123"), vec!["scancel", "--name", "task123"]);

        let unknown = create_backend("lsf_singularity", Arc::new(Singularity::new()));
        assert!(matches!(unknown, Err(BackendError::UnknownBackend(_))));
    }
}
