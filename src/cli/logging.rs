//! Tracing subscriber setup

use crate::domain::config::LoggingConf;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use tracing_subscriber::EnvFilter;

/// Stderr output captured while the inline dashboard owns the terminal.
static HELD: Mutex<Option<Vec<u8>>> = Mutex::new(None);

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// Logs go to the configured file when there is one. Otherwise they go to
/// stderr, held back while the inline dashboard is drawing.
pub fn init(conf: &LoggingConf) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&conf.level))
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", conf.level, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match &conf.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", path, e))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(|| HeldStderr).try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Buffer stderr logs until [`release_stderr`].
pub fn hold_stderr() {
    held().get_or_insert_with(Vec::new);
}

/// Write out everything held since [`hold_stderr`] and log straight to stderr again.
pub fn release_stderr() {
    if let Some(buf) = take_held() {
        let mut stderr = io::stderr().lock();
        // Nothing left to report a failed stderr write to.
        let _ = stderr.write_all(&buf).and_then(|_| stderr.flush());
    }
}

fn take_held() -> Option<Vec<u8>> {
    held().take()
}

fn held() -> MutexGuard<'static, Option<Vec<u8>>> {
    HELD.lock().unwrap_or_else(|e| e.into_inner())
}

struct HeldStderr;

impl Write for HeldStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match held().as_mut() {
            Some(held) => {
                held.extend_from_slice(buf);
                Ok(buf.len())
            }
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if held().is_some() {
            return Ok(());
        }
        io::stderr().flush()
    }
}
