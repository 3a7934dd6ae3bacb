//! Job Invocation Assembly
//!
//! Turns a [`ResourceRequest`] into scheduler directive tokens and joins
//! them with the container command.
//!
//! # Token Order
//!
//! 1. Preamble (submit program, blocking submission, shell, environment
//!    export, reservation) and the job name
//! 2. Queue pair, only when a queue is set
//! 3. Slot count, only when cpu is set
//! 4. Memory per slot, only when a memory reservation is set
//! 5. Wall-clock limit, only for variants that track it
//! 6. Configured passthrough arguments, in their original order
//!
//! Passthrough arguments come last so they can override earlier flags.

use bytesize::MIB;
use log::info;

use super::words::split_words;
use super::Vocabulary;
use crate::error::{BackendError, Result};
use crate::runtime::{JobInvocation, ResourceRequest};

/// Memory per slot in whole megabytes.
///
/// With a non-zero cpu count this is `memory_bytes / cpu / 2^20`. Without
/// one, the divisor is `1 / 2^20`, which multiplies instead of dividing;
/// deployed pipelines depend on the resulting values, so it is kept as is.
/// Ties round to even. The result is `u128` so the fallback product is
/// exact for every `u64` input.
pub fn memory_per_slot_mb(memory_bytes: u64, cpu: Option<u64>) -> u128 {
    let memory = u128::from(memory_bytes);
    let mib = u128::from(MIB);

    match cpu {
        Some(cpu) if cpu > 0 => round_div_ties_even(memory, u128::from(cpu) * mib),
        _ => memory * mib,
    }
}

fn round_div_ties_even(numerator: u128, divisor: u128) -> u128 {
    let quotient = numerator / divisor;
    let twice_rem = (numerator % divisor) * 2;

    if twice_rem > divisor || (twice_rem == divisor && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

/// Builds invocations from a variant's vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct InvocationBuilder<'a> {
    vocabulary: &'a Vocabulary,
}

impl<'a> InvocationBuilder<'a> {
    pub fn new(vocabulary: &'a Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Scheduler directive tokens for `request`.
    ///
    /// `extra_args` is split with shell quoting rules; `section` names its
    /// configuration section in errors.
    pub fn directives(
        &self,
        request: &ResourceRequest,
        run_id: &str,
        extra_args: Option<&str>,
        section: &str,
    ) -> Result<Vec<String>> {
        let vocab = self.vocabulary;
        let mut args: Vec<String> = vocab.preamble.iter().map(|s| s.to_string()).collect();
        args.push(vocab.job_name.to_string());
        args.push(run_id.to_string());

        if let Some(queue) = &request.queue {
            args.push(vocab.queue.to_string());
            args.push(queue.clone());
        }

        if let Some(cpu) = request.cpu {
            args.extend(vocab.slots.iter().map(|s| s.to_string()));
            args.push(cpu.to_string());
        }

        if let Some(memory) = request.memory_bytes {
            let per_slot = memory_per_slot_mb(memory, request.cpu);
            args.push(vocab.memory.to_string());
            args.push(format!("{}{}M", vocab.memory_value, per_slot));
        }

        if let (Some(flag), Some(minutes)) = (vocab.walltime, request.time_minutes) {
            args.push(flag.to_string());
            args.push(minutes.to_string());
        }

        if let Some(extra) = extra_args {
            let words = split_words(extra).map_err(|e| BackendError::MalformedExtraArgs {
                section: section.to_string(),
                value: extra.to_string(),
                reason: e.to_string(),
            })?;
            args.extend(words);
        }

        Ok(args)
    }

    /// Full invocation: directives followed by `container_tokens`.
    ///
    /// Logs the shell-quoted command line before returning it.
    pub fn build(
        &self,
        request: &ResourceRequest,
        run_id: &str,
        extra_args: Option<&str>,
        section: &str,
        container_tokens: &[String],
    ) -> Result<JobInvocation> {
        let directives = self.directives(request, run_id, extra_args, section)?;
        let invocation = JobInvocation::new(directives, container_tokens);

        info!("{} invocation: {}", self.vocabulary.label, invocation.quoted());
        Ok(invocation)
    }

    /// Command deleting the job named `run_id`.
    pub fn cancel(&self, run_id: &str) -> Vec<String> {
        let mut args: Vec<String> = self.vocabulary.cancel.iter().map(|s| s.to_string()).collect();
        args.push(run_id.to_string());
        args
    }
}
