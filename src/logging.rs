//! `tracing` subscriber installed when the Python module loads.

use tracing_subscriber::EnvFilter;

use crate::config::{BindingConfig, DEFAULT_LOG_FILTER};

/// Parse `directives`, falling back to the default filter if they are
/// malformed.
pub fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("jetson_segnet: ignoring log filter {directives:?}: {err}");
        EnvFilter::new(DEFAULT_LOG_FILTER)
    })
}

/// Install a stderr `fmt` subscriber. Leaves an existing global subscriber
/// in place.
pub fn init(config: &BindingConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_filter))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_target_directives() {
        let filter = env_filter("jetson_segnet=debug,warn");
        assert!(filter.to_string().contains("jetson_segnet=debug"));
    }

    #[test]
    fn malformed_filter_falls_back() {
        let filter = env_filter("jetson_segnet=notalevel");
        assert_eq!(filter.to_string(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = BindingConfig::default();
        init(&config);
        init(&config);
    }
}
