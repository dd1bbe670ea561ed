/// Unified logger for centralized logging configuration
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Include thread IDs
    pub include_thread_ids: bool,

    /// Include target module paths
    pub include_targets: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            include_thread_ids: false,
            include_targets: true,
        }
    }
}

/// Unified logger
pub struct Logger;

impl Logger {
    /// Initialize the global logger
    ///
    /// `RUST_LOG` wins over the configured level when set. Fails if a
    /// global subscriber is already installed.
    pub fn init(config: LoggerConfig) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))?;

        let console_layer = fmt::layer()
            .with_target(config.include_targets)
            .with_thread_ids(config.include_thread_ids)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .try_init()?;

        Ok(())
    }
}
