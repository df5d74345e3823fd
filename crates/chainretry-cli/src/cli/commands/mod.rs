//! CLI command handlers, one per file.

mod classify;
mod config;
mod exec;
mod schedule;

pub use classify::run_classify;
pub use config::run_config;
pub use exec::{exit_code, run_exec};
pub use schedule::run_schedule;

pub(crate) use classify::format_policy;

#[cfg(test)]
pub(crate) use classify::build_failure;
#[cfg(test)]
pub(crate) use exec::{exec_captured, failure_from_output, http_status_hint, EXIT_ABORTED};
#[cfg(test)]
pub(crate) use schedule::schedule_lines;
