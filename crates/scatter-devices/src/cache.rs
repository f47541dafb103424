//! Memoization of synthesized devices.
//!
//! Keyed by device kind and the full [`PortSpec`]; entries are never
//! evicted. A miss builds outside the lock. If two threads miss on the same
//! key, both build, the first insert is kept and both callers get that `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use log::debug;
use scatter_model::{Model, Result, SharedModel};

use crate::ports::PortSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum DeviceKind {
    Unitary,
    Copier,
}

type Cache = HashMap<(DeviceKind, PortSpec), SharedModel>;

static CACHE: LazyLock<RwLock<Cache>> = LazyLock::new(|| RwLock::new(HashMap::new()));

pub(crate) fn get_or_build<M, F>(kind: DeviceKind, spec: &PortSpec, build: F) -> Result<SharedModel>
where
    M: Model + 'static,
    F: FnOnce() -> Result<M>,
{
    let key = (kind, spec.clone());
    if let Some(hit) = CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        debug!("{kind:?} cache hit for {spec:?}");
        return Ok(Arc::clone(hit));
    }

    let built: SharedModel = Arc::new(build()?);
    let mut cache = CACHE.write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(cache.entry(key).or_insert(built)))
}
