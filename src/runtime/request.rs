//! Per-Task Requests and Process-Wide Limits
//!
//! - [`ResourceRequest`]: values retained for one task attempt
//! - [`ResourceLimits`]: the ceiling advertised to local admission logic
//! - [`JobInvocation`]: the final token sequence handed to the engine

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Resources and overrides retained for a single task attempt.
///
/// Built fresh for every attempt, filled by the container runtime and
/// the scheduler variant, then consumed by the invocation builder.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Number of cpu slots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u64>,

    /// Memory reservation in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,

    /// Scheduler queue (grid) or partition (Slurm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,

    /// Raw passthrough arguments from the scheduler's config section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<String>,

    /// Wall-clock limit, for schedulers that track it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_minutes: Option<u64>,

    /// Container image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ResourceRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cpu count.
    pub fn with_cpu(mut self, cpu: u64) -> Self {
        self.cpu = Some(cpu);
        self
    }

    /// Sets the memory reservation in bytes.
    pub fn with_memory(mut self, bytes: u64) -> Self {
        self.memory_bytes = Some(bytes);
        self
    }

    /// Sets the queue.
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Sets the passthrough argument string.
    pub fn with_extra_args(mut self, args: impl Into<String>) -> Self {
        self.extra_args = Some(args.into());
        self
    }

    /// Sets the wall-clock limit in minutes.
    pub fn with_time_minutes(mut self, minutes: u64) -> Self {
        self.time_minutes = Some(minutes);
        self
    }
}

/// Resource ceiling a backend advertises to the engine.
///
/// Cluster backends advertise unbounded values so the engine never
/// throttles launches on the submit host's capacity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub cpu: u64,
    pub mem_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

impl ResourceLimits {
    /// Unbounded cpu and memory; `time` is included when `with_time` is set.
    pub fn unbounded(with_time: bool) -> Self {
        Self {
            cpu: u64::MAX,
            mem_bytes: u64::MAX,
            time: with_time.then_some(u64::MAX),
        }
    }

    /// Returns the limits keyed the way the engine's admission logic expects.
    pub fn as_map(&self) -> BTreeMap<&'static str, u64> {
        let mut map = BTreeMap::new();
        map.insert("cpu", self.cpu);
        map.insert("mem_bytes", self.mem_bytes);
        if let Some(time) = self.time {
            map.insert("time", time);
        }
        map
    }
}

/// A fully assembled scheduler submission.
///
/// Scheduler directive tokens come first; the container-execution tokens
/// follow as an unmodified, contiguous suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInvocation {
    tokens: Vec<String>,
    directive_len: usize,
}

impl JobInvocation {
    /// Joins directive tokens with a copy of the container tokens.
    pub fn new(directives: Vec<String>, container: &[String]) -> Self {
        let directive_len = directives.len();
        let mut tokens = directives;
        tokens.extend_from_slice(container);
        Self {
            tokens,
            directive_len,
        }
    }

    /// All tokens in submission order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The scheduler directive prefix.
    pub fn directives(&self) -> &[String] {
        &self.tokens[..self.directive_len]
    }

    /// The wrapped container-execution suffix.
    pub fn container_tokens(&self) -> &[String] {
        &self.tokens[self.directive_len..]
    }

    /// The program to spawn (first token).
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Shell-quoted rendering, suitable for logs and copy-paste.
    pub fn quoted(&self) -> String {
        crate::scheduler::words::quote_all(&self.tokens)
    }

    /// Consumes the invocation, returning the argv to spawn.
    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }
}

impl fmt::Display for JobInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}
