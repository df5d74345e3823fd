//! Logging init: file under XDG state dir, or graceful fallback to stderr.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,chainretry=debug,chainretry_core=debug";

/// Writer that is either a file or stderr (used when file clone fails).
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => io::Write::write(f, buf),
            FileOrStderr::Stderr => io::Write::write(&mut io::stderr().lock(), buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => io::Write::flush(f),
            FileOrStderr::Stderr => io::Write::flush(&mut io::stderr().lock()),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize structured logging to `~/.local/state/chainretry/chainretry.log`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("chainretry")?;
    let log_dir = xdg_dirs.get_state_home();

    fs::create_dir_all(&log_dir)?;
    let log_file_path: PathBuf = log_dir.join("chainretry.log");

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    struct FileMakeWriter(std::fs::File);

    impl<'a> MakeWriter<'a> for FileMakeWriter {
        type Writer = FileOrStderr;

        fn make_writer(&'a self) -> Self::Writer {
            self.0
                .try_clone()
                .map(FileOrStderr::File)
                .unwrap_or(FileOrStderr::Stderr)
        }
    }

    let writer: BoxMakeWriter = BoxMakeWriter::new(FileMakeWriter(file));

    let env_filter = env_filter();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {}", e))?;

    tracing::info!("chainretry logging initialized at {}", log_file_path.display());

    Ok(())
}

/// Initialize logging to stderr only (no file). Used when `init_logging()` fails.
pub fn init_logging_stderr() {
    // try_init: a subscriber may already be set (tests, embedding apps).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn stderr_writer_accepts_writes() {
        let mut w = FileOrStderr::Stderr;
        w.write_all(b"").unwrap();
        w.flush().unwrap();
    }

    #[test]
    fn file_writer_appends() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let mut w = FileOrStderr::File(f.reopen().unwrap());
        w.write_all(b"attempt failed\n").unwrap();
        w.flush().unwrap();
        let content = std::fs::read_to_string(f.path()).unwrap();
        assert_eq!(content, "attempt failed\n");
    }

    #[test]
    fn stderr_init_is_idempotent() {
        init_logging_stderr();
        init_logging_stderr();
    }
}
