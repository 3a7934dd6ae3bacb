//! Cluster Scheduler Backends
//!
//! Runs task containers through a cluster batch scheduler instead of on
//! the local host. Each backend wraps the container runtime's command in
//! a blocking scheduler submission.
//!
//! # Architecture
//!
//! - [`ContainerBackend`]: the lifecycle contract the engine drives
//! - [`ClusterBackend`]: the contract implemented once, generic over
//!   a [`Scheduler`] variant
//! - [`grid`] / [`slurm`]: the variants and their flag vocabularies
//! - [`invocation`]: directive assembly
//! - [`registry`]: name-based lookup used at engine startup
//!
//! # Lifecycle
//!
//! 1. [`ContainerBackend::global_init`] runs once per process and returns
//!    a [`BackendContext`]
//! 2. For every task attempt, [`ContainerBackend::process_runtime`] fills
//!    a fresh [`ResourceRequest`]
//! 3. [`ContainerBackend::run_invocation`] returns the [`JobInvocation`]
//!    the engine spawns and waits on
//!
//! # Cancellation
//!
//! Submissions block until the remote job ends (`qsub -sync yes`, `srun`).
//! To cancel, the engine terminates the submit process; both clients
//! forward the termination to the scheduler. If the submit process is
//! already gone, [`ContainerBackend::cancel_invocation`] gives the command
//! that deletes the job by name.

pub mod grid;
pub mod invocation;
pub mod registry;
pub mod slurm;
pub mod words;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use sysinfo::System;

use crate::config::{BackendConfig, DEFAULT_QUEUE_KEY, EXTRA_ARGS_KEY, IMAGE_CACHE_KEY};
use crate::container::{ContainerRuntime, ContainerTask};
use crate::error::Result;
use crate::runtime::{CoercionError, JobInvocation, ResourceLimits, ResourceRequest, RuntimeValues};

pub use grid::GridScheduler;
pub use invocation::{memory_per_slot_mb, InvocationBuilder};
pub use registry::{available_backends, create_backend};
pub use slurm::SlurmScheduler;

/// Folder name of the shared image cache when none is configured.
pub const IMAGE_CACHE_DIR_NAME: &str = "singularity_image_cache";

/// Runtime key carrying a wall-clock limit in minutes.
pub const TIME_MINUTES_KEY: &str = "time_minutes";

/// Literal flags a scheduler variant uses on its command line.
#[derive(Debug)]
pub struct Vocabulary {
    /// Name used in log lines
    pub label: &'static str,
    /// Submit program and the flags present on every submission
    pub preamble: &'static [&'static str],
    /// Flag preceding the job name
    pub job_name: &'static str,
    /// Flag preceding the queue name
    pub queue: &'static str,
    /// Tokens preceding the slot count
    pub slots: &'static [&'static str],
    /// Flag preceding the memory value
    pub memory: &'static str,
    /// Prefix of the memory value, before `<megabytes>M`
    pub memory_value: &'static str,
    /// Flag preceding the wall-clock limit, for variants that track it
    pub walltime: Option<&'static str>,
    /// Command that deletes a job, followed by its name
    pub cancel: &'static [&'static str],
}

/// A cluster scheduler variant.
///
/// Variants differ only in data: flag vocabulary, the runtime key that
/// selects a queue, and where the shared image cache goes by default.
pub trait Scheduler: Send + Sync + 'static {
    /// Identifier the backend is registered under.
    fn cli_name(&self) -> &'static str;

    /// Configuration section with `extra_args` and `default_queue`.
    fn config_section(&self) -> &'static str;

    /// Runtime key holding the queue override.
    fn queue_key(&self) -> &'static str;

    fn vocabulary(&self) -> &'static Vocabulary;

    /// Image cache location used when the configuration leaves it unset.
    fn default_image_cache(&self, cwd: &Path) -> PathBuf;

    /// Whether the variant advertises and accepts a wall-clock limit.
    fn tracks_walltime(&self) -> bool {
        self.vocabulary().walltime.is_some()
    }
}

/// Local task-admission logic of the hosting engine.
///
/// Receives the advertised ceiling once, during global initialization.
pub trait TaskAdmission {
    fn set_limits(&self, limits: &ResourceLimits);
}

/// Admission stand-in for engines without local admission control.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdmission;

impl TaskAdmission for NoAdmission {
    fn set_limits(&self, _limits: &ResourceLimits) {}
}

/// Immutable state produced by global initialization.
///
/// Every per-task operation takes the context, so initialization must
/// have run before any task can be processed.
#[derive(Debug, Clone)]
pub struct BackendContext {
    limits: ResourceLimits,
    config: Arc<BackendConfig>,
}

impl BackendContext {
    /// The advertised resource ceiling.
    pub fn resource_limits(&self) -> ResourceLimits {
        self.limits
    }

    /// The configuration as adjusted during initialization.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

/// The lifecycle contract between the engine and a backend.
pub trait ContainerBackend: Send + Sync {
    /// Identifier the backend is registered under.
    fn cli_name(&self) -> &'static str;

    /// The container runtime this backend wraps.
    fn container(&self) -> &dyn ContainerRuntime;

    /// One-time process setup; see [`ClusterBackend`] for the details.
    fn global_init(&self, cfg: BackendConfig, admission: &dyn TaskAdmission)
        -> Result<BackendContext>;

    /// The ceiling the engine's admission logic should use.
    fn detect_resource_limits(&self, ctx: &BackendContext) -> ResourceLimits {
        ctx.resource_limits()
    }

    /// Reads a task's runtime block into `request`.
    fn process_runtime(
        &self,
        ctx: &BackendContext,
        runtime: &RuntimeValues,
        request: &mut ResourceRequest,
    ) -> Result<()>;

    /// Prepends scheduler directives to already built container tokens.
    fn wrap_invocation(
        &self,
        ctx: &BackendContext,
        request: &ResourceRequest,
        run_id: &str,
        container_tokens: &[String],
    ) -> Result<JobInvocation>;

    /// Builds the container command for `task` and wraps it.
    fn run_invocation(
        &self,
        ctx: &BackendContext,
        request: &ResourceRequest,
        run_id: &str,
        task: &ContainerTask,
    ) -> Result<JobInvocation> {
        let container_tokens = self.container().run_invocation(ctx.config(), request, task)?;
        self.wrap_invocation(ctx, request, run_id, &container_tokens)
    }

    /// Command deleting the job submitted under `run_id`.
    fn cancel_invocation(&self, run_id: &str) -> Vec<String>;
}

/// A scheduler variant combined with the container runtime it wraps.
pub struct ClusterBackend<S: Scheduler> {
    scheduler: S,
    container: Arc<dyn ContainerRuntime>,
}

impl<S: Scheduler> ClusterBackend<S> {
    pub fn new(scheduler: S, container: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            scheduler,
            container,
        }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    fn builder(&self) -> InvocationBuilder<'static> {
        InvocationBuilder::new(self.scheduler.vocabulary())
    }

    /// Fills an unset image cache with the variant default.
    fn resolve_image_cache(&self, cfg: &mut BackendConfig) -> Result<()> {
        let section = self.container.config_section();
        if cfg.get_set(section, IMAGE_CACHE_KEY).is_some() {
            return Ok(());
        }

        let cwd = std::env::current_dir()?;
        let cache = self.scheduler.default_image_cache(&cwd);
        info!(
            "No image cache configured; pulling images to {}",
            cache.display()
        );
        cfg.set(section, IMAGE_CACHE_KEY, cache.display().to_string());
        Ok(())
    }
}

/// Cpu count and memory of the submit host, for logging only.
fn host_capacity() -> (usize, u64) {
    let mut system = System::new();
    system.refresh_memory();
    (num_cpus::get(), system.total_memory())
}

impl<S: Scheduler> ContainerBackend for ClusterBackend<S> {
    fn cli_name(&self) -> &'static str {
        self.scheduler.cli_name()
    }

    fn container(&self) -> &dyn ContainerRuntime {
        self.container.as_ref()
    }

    /// Advertises an unbounded ceiling, then prepares the shared image cache.
    ///
    /// Cluster nodes must not pull into per-node caches concurrently, so
    /// all images go to one directory owned by the submit host. When
    /// `image_cache` is unset the variant default is written back into
    /// the configuration before the container runtime initializes.
    /// Container runtime errors propagate unchanged.
    fn global_init(
        &self,
        mut cfg: BackendConfig,
        admission: &dyn TaskAdmission,
    ) -> Result<BackendContext> {
        let limits = ResourceLimits::unbounded(self.scheduler.tracks_walltime());
        admission.set_limits(&limits);

        let (cpus, memory) = host_capacity();
        info!(
            "{}: ignoring submit host capacity ({} cpus, {} MiB); admission is left to the cluster",
            self.scheduler.cli_name(),
            cpus,
            memory / bytesize::MIB
        );

        self.resolve_image_cache(&mut cfg)?;
        self.container.global_init(&cfg)?;

        Ok(BackendContext {
            limits,
            config: Arc::new(cfg),
        })
    }

    fn process_runtime(
        &self,
        ctx: &BackendContext,
        runtime: &RuntimeValues,
        request: &mut ResourceRequest,
    ) -> Result<()> {
        self.container.process_runtime(runtime, request)?;
        read_scheduler_keys(&self.scheduler, runtime, request)?;

        if request.queue.is_none() {
            let section = self.scheduler.config_section();
            if let Some(queue) = ctx.config().get_set(section, DEFAULT_QUEUE_KEY) {
                request.queue = Some(queue.to_string());
            }
        }

        debug!(
            "{} runtime values: queue={:?} time_minutes={:?}",
            self.scheduler.cli_name(),
            request.queue,
            request.time_minutes
        );
        Ok(())
    }

    fn wrap_invocation(
        &self,
        ctx: &BackendContext,
        request: &ResourceRequest,
        run_id: &str,
        container_tokens: &[String],
    ) -> Result<JobInvocation> {
        let section = self.scheduler.config_section();
        let extra_args = match request.extra_args.as_deref() {
            Some(args) => Some(args),
            None => ctx.config().get(section, EXTRA_ARGS_KEY),
        };

        self.builder()
            .build(request, run_id, extra_args, section, container_tokens)
    }

    fn cancel_invocation(&self, run_id: &str) -> Vec<String> {
        self.builder().cancel(run_id)
    }
}

/// Reads the variant's own runtime keys. Wrong types fail unchanged.
fn read_scheduler_keys<S: Scheduler>(
    scheduler: &S,
    runtime: &RuntimeValues,
    request: &mut ResourceRequest,
) -> std::result::Result<(), CoercionError> {
    if let Some(queue) = runtime.get(scheduler.queue_key()) {
        request.queue = Some(queue.coerce_string()?);
    }

    if scheduler.tracks_walltime() {
        if let Some(minutes) = runtime.get(TIME_MINUTES_KEY) {
            request.time_minutes = Some(minutes.coerce_count()?);
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles shared by the scheduler tests.

    use std::cell::RefCell;

    use super::*;
    use crate::container::MEMORY_KEYS;

    /// Container runtime returning fixed tokens and recording its init config.
    #[derive(Default)]
    pub struct FakeRuntime {
        pub fail_init: bool,
        pub seen_config: std::sync::Mutex<Option<BackendConfig>>,
    }

    impl ContainerRuntime for FakeRuntime {
        fn config_section(&self) -> &'static str {
            "singularity"
        }

        fn global_init(&self, cfg: &BackendConfig) -> Result<()> {
            if self.fail_init {
                return Err(crate::error::BackendError::Configuration(
                    "runtime refused".to_string(),
                ));
            }
            if let Ok(mut seen) = self.seen_config.lock() {
                *seen = Some(cfg.clone());
            }
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
            Ok(())
        }

        fn run_invocation(
            &self,
            _cfg: &BackendConfig,
            _request: &ResourceRequest,
            task: &ContainerTask,
        ) -> Result<Vec<String>> {
            let mut tokens = vec!["singularity".to_string(), "exec".to_string()];
            tokens.extend(task.command.iter().cloned());
            Ok(tokens)
        }
    }

    /// Admission double remembering the limits it was given.
    #[derive(Default)]
    pub struct RecordingAdmission {
        pub limits: RefCell<Option<ResourceLimits>>,
    }

    impl TaskAdmission for RecordingAdmission {
        fn set_limits(&self, limits: &ResourceLimits) {
            *self.limits.borrow_mut() = Some(*limits);
        }
    }

    pub fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Configuration with the image cache already set.
    pub fn config_with_cache() -> BackendConfig {
        let mut cfg = BackendConfig::with_defaults();
        cfg.set("singularity", IMAGE_CACHE_KEY, "/shared/images");
        cfg
    }
}
