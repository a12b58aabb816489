//! Logging utilities and configuration for term-expect.
//!
//! The library only emits `tracing` events. Binaries choose how to render
//! them through [`setup::init_logging`].

/// Truncates a string to the maximum field length if needed.
///
/// Truncation happens on a character boundary so multi-byte values are safe.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Utilities for setting up structured logging.
pub mod setup {
    use tracing::Level;

    /// Configuration for the logging setup.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for term-expect components specifically
        pub term_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Whether to print span targets
        pub with_target: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                term_level: Level::INFO,
                json_format: false,
                with_target: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_expect={},term_expect_walkthroughs={}",
                    self.level.as_str().to_lowercase(),
                    self.term_level.as_str().to_lowercase(),
                    self.term_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Initializes logging. `RUST_LOG` takes precedence over the config.
    ///
    /// Calling this more than once is not an error; the first subscriber wins.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_expect::logging::setup::{LoggingConfig, init_logging};
    ///
    /// init_logging(LoggingConfig::default()).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(config.with_target)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(config.with_target)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!("Global subscriber already installed, keeping it");
        }

        Ok(())
    }
}
