//! Container Runtime Module
//!
//! The container runtime builds the command that runs a task inside its
//! image. Scheduler backends wrap that command; they never inspect or
//! change it.
//!
//! - [`ContainerRuntime`]: the collaborator interface backends delegate to
//! - [`singularity`]: Singularity/Apptainer implementation

pub mod singularity;

use std::path::PathBuf;

use crate::config::BackendConfig;
use crate::error::Result;
use crate::runtime::{ResourceRequest, RuntimeValues};

pub use singularity::Singularity;

/// Runtime keys carrying the memory reservation, in priority order.
pub const MEMORY_KEYS: &[&str] = &["memory_reservation", "memory"];

/// A host path made visible inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub guest: String,
    pub writable: bool,
}

impl Mount {
    /// Read-only mount.
    pub fn read_only(host: impl Into<PathBuf>, guest: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            guest: guest.into(),
            writable: false,
        }
    }

    /// Read-write mount.
    pub fn writable(host: impl Into<PathBuf>, guest: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            guest: guest.into(),
            writable: true,
        }
    }
}

/// What to run inside the container for one task attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTask {
    /// Working directory inside the container
    pub work_dir: String,
    /// Host paths bound into the container
    pub mounts: Vec<Mount>,
    /// Command and arguments executed in the container
    pub command: Vec<String>,
}

impl ContainerTask {
    pub fn new(work_dir: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            mounts: Vec::new(),
            command,
        }
    }

    /// Adds a mount.
    pub fn with_mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }
}

/// Container runtime the scheduler backends delegate to.
///
/// Backends call [`global_init`](Self::global_init) once with the adjusted
/// configuration, let [`process_runtime`](Self::process_runtime) read the
/// generic runtime keys first, and wrap whatever
/// [`run_invocation`](Self::run_invocation) returns.
pub trait ContainerRuntime: Send + Sync {
    /// Configuration section holding this runtime's settings.
    fn config_section(&self) -> &'static str;

    /// One-time process setup. Fails on invalid configuration.
    fn global_init(&self, cfg: &BackendConfig) -> Result<()>;

    /// Reads the generic runtime keys (cpu, memory, image) into `request`.
    fn process_runtime(&self, runtime: &RuntimeValues, request: &mut ResourceRequest)
        -> Result<()>;

    /// Builds the container-execution tokens for a task.
    fn run_invocation(
        &self,
        cfg: &BackendConfig,
        request: &ResourceRequest,
        task: &ContainerTask,
    ) -> Result<Vec<String>>;
}
