//! Process-wide backend registry.
//!
//! Built once, on first use or explicitly through [`init_registry`], and
//! read-only afterwards. The portable Filipsson-Gunnar and additive backends
//! are always registered; the accelerated backend is registered when it can
//! be built, and "default" points at it in that case.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use log::{debug, warn};
use scatter_model::{Result, ScatterError};

use super::additive::{ADDITIVE_BACKEND, AdditiveBackend};
use super::fg::{FG_BACKEND, FilipssonGunnarBackend};
use super::traits::{Backend, DependencyUnavailable};

pub const DEFAULT_BACKEND: &str = "default";

#[derive(Debug)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn Backend>>,
    fallback: Option<DependencyUnavailable>,
}

impl BackendRegistry {
    /// Registry holding only the portable backends.
    pub fn portable() -> Self {
        let fg: Arc<dyn Backend> = Arc::new(FilipssonGunnarBackend);
        let mut backends: BTreeMap<String, Arc<dyn Backend>> = BTreeMap::new();
        backends.insert(ADDITIVE_BACKEND.to_string(), Arc::new(AdditiveBackend));
        backends.insert("fg".to_string(), Arc::clone(&fg));
        backends.insert(FG_BACKEND.to_string(), Arc::clone(&fg));
        backends.insert(DEFAULT_BACKEND.to_string(), fg);
        Self {
            backends,
            fallback: None,
        }
    }

    /// Registry with the outcome of building the accelerated backend.
    ///
    /// On `Err` the registry keeps the portable backend as "default" and
    /// logs a warning; nothing is returned to the caller.
    pub fn with_accelerated(
        accelerated: std::result::Result<Arc<dyn Backend>, DependencyUnavailable>,
    ) -> Self {
        let mut registry = Self::portable();
        match accelerated {
            Ok(backend) => {
                debug!("registered accelerated backend '{}'", backend.name());
                registry
                    .backends
                    .insert(backend.name().to_string(), Arc::clone(&backend));
                registry
                    .backends
                    .insert(DEFAULT_BACKEND.to_string(), backend);
            }
            Err(missing) => {
                warn!(
                    "{missing}; falling back to '{FG_BACKEND}'. Enable the `lapack` \
                     feature for faster circuit evaluation"
                );
                registry.fallback = Some(missing);
            }
        }
        registry
    }

    /// Look a backend up by name; "default" always resolves.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Backend>> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| ScatterError::UnknownBackend(name.to_string()))
    }

    pub fn default_backend(&self) -> Arc<dyn Backend> {
        match self.backends.get(DEFAULT_BACKEND) {
            Some(backend) => Arc::clone(backend),
            None => Arc::new(FilipssonGunnarBackend),
        }
    }

    /// Registered names, aliases included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    /// Why the accelerated backend is missing, if it is.
    pub fn fallback(&self) -> Option<&DependencyUnavailable> {
        self.fallback.as_ref()
    }
}

/// Build the accelerated backend, if this build carries its dependency.
pub fn accelerated_backend() -> std::result::Result<Arc<dyn Backend>, DependencyUnavailable> {
    #[cfg(feature = "lapack")]
    {
        Ok(Arc::new(super::lapack::LapackBackend))
    }
    #[cfg(not(feature = "lapack"))]
    {
        Err(DependencyUnavailable::new(
            "lapack",
            "scatter-solver was built without the `lapack` feature",
        ))
    }
}

static REGISTRY: OnceLock<BackendRegistry> = OnceLock::new();

/// The process-wide registry, built on first use.
pub fn registry() -> &'static BackendRegistry {
    REGISTRY.get_or_init(|| BackendRegistry::with_accelerated(accelerated_backend()))
}

/// Install `built` as the process-wide registry.
///
/// Only the first initialization wins; a registry that arrives late is
/// handed back.
pub fn init_registry(
    built: BackendRegistry,
) -> std::result::Result<&'static BackendRegistry, BackendRegistry> {
    REGISTRY.set(built)?;
    Ok(registry())
}

pub fn get_backend(name: &str) -> Result<Arc<dyn Backend>> {
    registry().get(name)
}
