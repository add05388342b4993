use mock_core::MockError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates that are too chatty at the agent's default level
const QUIET_MODULES: &[(&str, &str)] = &[("hyper", "warn"), ("rustls", "warn"), ("hudsucker", "info")];

/// Build the log filter. `RUST_LOG` wins over `level` when it is set.
pub fn build_filter(level: &str) -> Result<EnvFilter, MockError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(level)
        .map_err(|e| MockError::Configuration(format!("Invalid log level {:?}: {}", level, e)))?;
    for (module, module_level) in QUIET_MODULES {
        let directive = format!("{}={}", module, module_level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| MockError::Configuration(format!("Invalid log directive: {}", e)))?,
        );
    }
    Ok(filter)
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(level: &str, json: bool) -> Result<(), MockError> {
    let registry = tracing_subscriber::registry().with(build_filter(level)?);

    let result = if json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    match result {
        Ok(_) => tracing::info!("Logging initialized at level {}", level),
        Err(_) => tracing::debug!("Logging already initialized, skipping"),
    }
    Ok(())
}
