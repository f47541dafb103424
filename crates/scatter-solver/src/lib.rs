//! Circuit evaluation for multiport optical networks.
//!
//! Composes per-instance scattering matrices into the response of a whole
//! circuit through a pluggable [`Backend`], selected by name from the
//! process-wide [`BackendRegistry`].

use std::collections::BTreeMap;

use scatter_model::{Instance, ModelMap, Result, SMatrix};

pub mod analysis;
pub mod backend;
pub mod circuit;

pub use analysis::{AnalyzedCircuit, AnalyzedInstance, AnalyzedInstances, InstanceSlot};
#[cfg(feature = "lapack")]
pub use backend::LapackBackend;
pub use backend::{
    AdditiveBackend, Backend, BackendRegistry, DEFAULT_BACKEND, DependencyUnavailable,
    FilipssonGunnarBackend, accelerated_backend, get_backend, init_registry, registry,
};
pub use circuit::{Circuit, CircuitOptions};

/// First stage on the default backend.
pub fn analyze_instances(
    instances: &BTreeMap<String, Instance>,
    models: &ModelMap,
) -> Result<AnalyzedInstances> {
    registry()
        .default_backend()
        .analyze_instances(instances, models)
}

/// Second stage on the default backend.
pub fn analyze_circuit(
    analyzed: &AnalyzedInstances,
    connections: &BTreeMap<String, String>,
    ports: &BTreeMap<String, String>,
) -> Result<AnalyzedCircuit> {
    registry()
        .default_backend()
        .analyze_circuit(analyzed, connections, ports)
}

/// Third stage on the default backend.
pub fn evaluate_circuit(
    analyzed: &AnalyzedCircuit,
    instances: &BTreeMap<String, SMatrix>,
) -> Result<SMatrix> {
    registry()
        .default_backend()
        .evaluate_circuit(analyzed, instances)
}
