//! Logging Setup
//!
//! Backends log through the `log` facade. Hosts without a logger of their
//! own can install this compact `env_logger` format.

use std::io::Write;

/// Initializes `env_logger`; `RUST_LOG` takes precedence over `verbose`.
///
/// Warnings and errors carry a level prefix, everything else is printed
/// as is so logged invocations stay copy-pastable. Calling this twice
/// is harmless.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| match record.level() {
            log::Level::Warn | log::Level::Error => {
                writeln!(buf, "[{}] {}", record.level(), record.args())
            }
            _ => writeln!(buf, "{}", record.args()),
        })
        .try_init();
}
