use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{BeyondError, Result};

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|err| BeyondError::Logging(format!("level `{}`: {err}", config.level)))?,
    };
    let fmt_layer = fmt::layer().with_target(true);

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };
    installed.map_err(|err| BeyondError::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_installs_once() {
        init_logging(&LoggingConfig::default()).expect("first install");
        let err = init_logging(&LoggingConfig::default()).expect_err("already installed");
        assert!(matches!(err, BeyondError::Logging(_)));
    }
}
