//! Grid Engine (SGE/UGE) Backend
//!
//! Submits each task with `qsub -sync yes`, which blocks until the job
//! finishes and exits with the job's status.
//!
//! # Runtime Keys
//!
//! - `grid_queue` (String): target queue, passed as `-q`
//!
//! # Configuration
//!
//! ```yaml
//! grid:
//!   default_queue: all.q
//!   extra_args: -P bioinfo -l h_rt=24:00:00
//! ```

use std::path::{Path, PathBuf};

use super::{Scheduler, Vocabulary, IMAGE_CACHE_DIR_NAME};

/// Identifier of the grid backend.
pub const NAME: &str = "grid_singularity";

static VOCABULARY: Vocabulary = Vocabulary {
    label: "Grid",
    preamble: &[
        "qsub", "-b", "yes", // binary command, not a job script
        "-now", "no", // queue the job when no slot is free
        "-sync", "yes", // block until the job completes
        "-S", "/bin/bash", // job shell
        "-V", // export the environment
        "-R", "yes", // reserve slots for large jobs
    ],
    job_name: "-N",
    queue: "-q",
    slots: &["-pe", "smp"],
    memory: "-l",
    memory_value: "mem_free=",
    walltime: None,
    cancel: &["qdel"],
};

/// Sun/Univa Grid Engine scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridScheduler;

impl Scheduler for GridScheduler {
    fn cli_name(&self) -> &'static str {
        NAME
    }

    fn config_section(&self) -> &'static str {
        "grid"
    }

    fn queue_key(&self) -> &'static str {
        "grid_queue"
    }

    fn vocabulary(&self) -> &'static Vocabulary {
        &VOCABULARY
    }

    /// `<cwd>/singularity_image_cache`, shared through the submit directory.
    fn default_image_cache(&self, cwd: &Path) -> PathBuf {
        cwd.join(IMAGE_CACHE_DIR_NAME)
    }
}
