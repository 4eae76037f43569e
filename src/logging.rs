//! Logging setup
//!
//! The library only emits `tracing` events; embedders that do not install
//! their own subscriber can call [`init_logging`].

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a formatting subscriber for the configured level
///
/// `RUST_LOG` takes precedence over the configured level when set. Calling
/// this when a global subscriber already exists leaves that subscriber in
/// place.
///
/// # Returns
/// * `bool` - Whether this call installed the subscriber
pub fn init_logging(config: &LoggingConfig) -> bool {
    let level = config.level.to_tracing_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // Configure timestamps
    if config.timestamps {
        subscriber.try_init().is_ok()
    } else {
        subscriber.without_time().try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_second_init_is_harmless() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            timestamps: false,
        };
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
