//! Environment-driven settings read once at module registration.

use std::path::PathBuf;

/// Native library opened when `JETSON_SEGNET_LIBRARY` is unset.
pub const DEFAULT_LIBRARY: &str = "libjetson-inference.so";

/// Filter used when neither `JETSON_SEGNET_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "warn";

pub const LIBRARY_ENV: &str = "JETSON_SEGNET_LIBRARY";
pub const LOG_ENV: &str = "JETSON_SEGNET_LOG";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingConfig {
    /// Path or soname of the native segmentation library.
    pub library_path: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_filter: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from(DEFAULT_LIBRARY),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl BindingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            library_path: get(LIBRARY_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.library_path),
            log_filter: get(LOG_ENV)
                .or_else(|| get("RUST_LOG"))
                .unwrap_or(defaults.log_filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(BindingConfig::from_lookup(lookup(&[])), BindingConfig::default());
    }

    #[test]
    fn library_override() {
        let cfg = BindingConfig::from_lookup(lookup(&[(LIBRARY_ENV, "/opt/segnet/libsegnet_c.so")]));
        assert_eq!(cfg.library_path, PathBuf::from("/opt/segnet/libsegnet_c.so"));
    }

    #[test]
    fn log_filter_prefers_own_variable() {
        let cfg = BindingConfig::from_lookup(lookup(&[
            (LOG_ENV, "jetson_segnet=debug"),
            ("RUST_LOG", "info"),
        ]));
        assert_eq!(cfg.log_filter, "jetson_segnet=debug");

        let cfg = BindingConfig::from_lookup(lookup(&[("RUST_LOG", "info")]));
        assert_eq!(cfg.log_filter, "info");

        let cfg = BindingConfig::from_lookup(lookup(&[(LOG_ENV, "  ")]));
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);
    }
}
