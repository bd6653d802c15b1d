//! Tracing subscriber setup for the binaries.
//!
//! Stderr honours `RUST_LOG` and falls back to the configured level. When a
//! log file is configured, everything at DEBUG and above is also written to a
//! daily-rolling file next to it.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{expand_path, LoggingSettings};
use crate::error::Error;

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process, otherwise buffered file output is lost.
pub fn init(settings: &LoggingSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false).with_filter(stderr_filter);

    let (file_layer, guard) = match settings.file.as_deref() {
        Some(file) => {
            let path = expand_path(file);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
            let prefix = path.file_name().map_or_else(|| "docchat.log".into(), std::ffi::OsStr::to_os_string);
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, prefix));
            let layer = fmt::layer().with_ansi(false).with_writer(writer).with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(stderr_layer).with(file_layer).try_init()?;
    Ok(guard)
}
