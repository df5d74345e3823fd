//! `chainretry exec` – run a command under the retry executor.
//!
//! A non-zero exit becomes a `CallFailure` whose message is the exit status
//! plus trimmed stderr, so the usual markers (`ConsensusFailure`, `503`, ...)
//! drive classification. A program that cannot be found or executed fails
//! with `ENOENT`/`EACCES` and is not retried. Ctrl-C triggers the abort token.

use anyhow::{Context, Result};
use chainretry_core::abort::AbortToken;
use chainretry_core::retry::{
    CallFailure, Classifier, FailureDetails, RetryError, RetryExecutor, Sleeper,
};
use std::io::Write;
use tokio::process::Command;

pub const EXIT_FAILURE: i32 = 1;
/// Exit status when the retry loop was stopped by Ctrl-C.
pub const EXIT_ABORTED: i32 = 130;

/// Process exit status for an error returned by a command handler.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let aborted = err
        .downcast_ref::<RetryError<CallFailure>>()
        .is_some_and(RetryError::is_aborted);
    if aborted {
        EXIT_ABORTED
    } else {
        EXIT_FAILURE
    }
}

/// Pull an HTTP status out of curl-style stderr
/// (`The requested URL returned error: 404`).
pub(crate) fn http_status_hint(stderr: &str) -> Option<u16> {
    const MARKER: &str = "returned error: ";
    let start = stderr.find(MARKER)? + MARKER.len();
    let digits: String = stderr[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() != 3 {
        return None;
    }
    digits.parse().ok()
}

pub(crate) fn failure_from_output(exit_code: Option<i32>, stderr: &[u8]) -> CallFailure {
    let stderr = String::from_utf8_lossy(stderr);
    let detail = stderr.trim();
    let exit = match exit_code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    };
    let message = if detail.is_empty() {
        exit
    } else {
        format!("{}: {}", exit, detail)
    };
    let failure = CallFailure::new(message);
    match http_status_hint(detail) {
        Some(status) => failure.with_status(status),
        None => failure,
    }
}

async fn run_once(program: &str, args: &[String]) -> Result<Vec<u8>, CallFailure> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| {
            let failure = CallFailure::new(format!("spawning {}: {}", program, e));
            match e.system_code() {
                Some(code) => failure.with_system_code(code),
                None => failure,
            }
        })?;
    if output.status.success() {
        return Ok(output.stdout);
    }
    Err(failure_from_output(output.status.code(), &output.stderr))
}

/// Run `command` under `executor` until it succeeds, and return its stdout.
pub(crate) async fn exec_captured<C, S>(
    executor: &RetryExecutor<C, S>,
    name: &str,
    abort: &AbortToken,
    command: &[String],
) -> Result<Vec<u8>>
where
    C: Classifier,
    S: Sleeper,
{
    let (program, args) = command.split_first().context("no command given")?;
    let stdout = executor
        .execute_with_abort(name, abort, || run_once(program, args))
        .await?;
    Ok(stdout)
}

pub async fn run_exec<C, S>(
    executor: &RetryExecutor<C, S>,
    name: &str,
    command: &[String],
) -> Result<()>
where
    C: Classifier,
    S: Sleeper,
{
    let abort = AbortToken::new();
    let ctrl_c = {
        let abort = abort.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                abort.trigger();
            }
        })
    };

    let result = exec_captured(executor, name, &abort, command).await;
    ctrl_c.abort();

    let stdout = result?;
    std::io::stdout()
        .write_all(&stdout)
        .context("writing command output")?;
    tracing::info!(operation = name, "command succeeded");
    Ok(())
}
