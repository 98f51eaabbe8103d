use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::error::ClientError;

/// Installs the global subscriber, appending to `log_file` from a background
/// thread. Keep the guard alive for as long as logs should be flushed.
pub fn init(config: &AppConfig) -> Result<WorkerGuard, ClientError> {
    let filter = build_filter(&config.log_level)?;
    let path = Path::new(&config.log_file);
    let file_name = path
        .file_name()
        .ok_or_else(|| ClientError::InvalidLogFile(config.log_file.clone()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .try_init()
        .map_err(|e| ClientError::Logging(e.to_string()))?;

    Ok(guard)
}

/// `RUST_LOG` wins over the configured level.
fn build_filter(level: &str) -> Result<EnvFilter, ClientError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|_| ClientError::InvalidLogLevel(level.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_needs_a_name() {
        let config = AppConfig {
            log_file: "/".to_string(),
            ..Default::default()
        };
        assert!(matches!(init(&config), Err(ClientError::InvalidLogFile(_))));
    }

    #[test]
    fn test_init_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("client.log");
        let config = AppConfig {
            log_file: log_file.to_string_lossy().into_owned(),
            log_level: "info".to_string(),
            ..Default::default()
        };

        let guard = init(&config).unwrap();
        tracing::error!(peer_id = "bob", "negotiation session created");
        drop(guard);

        let written = std::fs::read_to_string(&log_file).unwrap();
        assert!(written.contains("negotiation session created"));
        assert!(written.contains("peer_id=\"bob\""));
    }
}
