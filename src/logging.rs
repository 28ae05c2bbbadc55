use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Arc,
};

use color_eyre::eyre::{Result, WrapErr};
use directories::ProjectDirs;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub const LOG_ENV: &str = "EVENTDESK_LOG";
const LOG_FILE: &str = "eventdesk.log";

/// Install the global subscriber. The terminal belongs to the UI, so events go
/// to a file under the platform data directory. Returns the file path when
/// one could be opened.
pub fn init(verbosity: u8) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_ENV))
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let log_path = log_dir().map(|dir| dir.join(LOG_FILE));
    let file = match log_path.as_ref() {
        Some(path) => open_log_file(path).ok(),
        None => None,
    };

    let registry = tracing_subscriber::registry().with(ErrorLayer::default());
    match file {
        Some(file) => registry
            .with(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(filter),
            )
            .try_init()
            .wrap_err("failed to install tracing subscriber")?,
        None => registry
            .try_init()
            .wrap_err("failed to install tracing subscriber")?,
    }
    tracing::debug!(path = ?log_path, "logging initialised");
    Ok(log_path)
}

fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,eventdesk={level}")
}

fn log_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "eventdesk").map(|dirs| dirs.data_local_dir().join("logs"))
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::default_directive;

    #[test]
    fn verbosity_raises_crate_level() {
        assert_eq!(default_directive(0), "warn,eventdesk=info");
        assert_eq!(default_directive(1), "warn,eventdesk=debug");
        assert_eq!(default_directive(4), "warn,eventdesk=trace");
    }
}
