//! One-time registration of the native engine factory.
//!
//! [`init`] loads the native library described by a [`BindingConfig`] and
//! stores the resulting [`Registration`]; later calls return the same value.
//! A host embedding the binding can call [`install`] first to supply its own
//! factory instead.
//!
//! A library that fails to load does not fail registration. The reason is
//! kept and returned as `Construction` from [`Registration::factory`], so
//! the Python module still imports.

use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::config::BindingConfig;
use crate::engine::EngineFactory;
use crate::error::{Error, Result};
use crate::ffi::{NativeFactory, NativeLibrary};

static REGISTRATION: OnceLock<Registration> = OnceLock::new();

pub struct Registration {
    factory: std::result::Result<Arc<dyn EngineFactory>, String>,
}

impl Registration {
    fn load(config: &BindingConfig) -> Self {
        let factory = match NativeLibrary::open(&config.library_path) {
            Ok(lib) => Ok(Arc::new(NativeFactory::new(lib)) as Arc<dyn EngineFactory>),
            Err(err) => {
                warn!(%err, "segmentation library unavailable");
                Err(err.to_string())
            }
        };
        Self { factory }
    }

    pub fn factory(&self) -> Result<&dyn EngineFactory> {
        match &self.factory {
            Ok(factory) => Ok(factory.as_ref()),
            Err(reason) => Err(Error::construction(format!(
                "segmentation library unavailable: {reason}"
            ))),
        }
    }
}

/// Register the native library. Idempotent.
pub fn init(config: &BindingConfig) -> &'static Registration {
    REGISTRATION.get_or_init(|| Registration::load(config))
}

/// Register a caller-supplied factory.
///
/// Returns `false` if a registration already exists; the existing one is
/// kept.
pub fn install(factory: Arc<dyn EngineFactory>) -> bool {
    REGISTRATION
        .set(Registration {
            factory: Ok(factory),
        })
        .is_ok()
}

/// The current registration, or `InvalidState` if none was made.
pub fn get() -> Result<&'static Registration> {
    REGISTRATION
        .get()
        .ok_or_else(|| Error::invalid_state("segNet module not registered"))
}

/// Register an accepting mock factory unless something is registered
/// already. Shared by every test that reaches the global registration.
#[cfg(test)]
pub(crate) fn ensure_mock_registered() -> &'static Registration {
    REGISTRATION.get_or_init(|| Registration {
        factory: Ok(Arc::new(crate::engine::mock::MockFactory::new(true))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockFactory;
    use crate::network::NetworkType;

    #[test]
    fn unavailable_library_surfaces_as_construction_error() {
        let registration = Registration::load(&BindingConfig {
            library_path: "libsegnet-does-not-exist.so".into(),
            ..BindingConfig::default()
        });
        let err = registration.factory().err().unwrap();
        assert!(matches!(err, Error::Construction(_)));
        assert!(err.to_string().contains("libsegnet-does-not-exist.so"));
    }

    #[test]
    fn registration_is_idempotent() {
        let first = ensure_mock_registered();
        assert!(!install(Arc::new(MockFactory::new(false))));

        let again = init(&BindingConfig::default());
        assert!(std::ptr::eq(first, again));
        assert!(std::ptr::eq(first, get().unwrap()));

        let factory = first.factory().unwrap();
        assert_eq!(factory.network_type_from_str("aerial-fpv"), NetworkType::AerialFpv);
        assert!(factory.create(NetworkType::AerialFpv).is_some());
    }
}
