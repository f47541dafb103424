//! Backend trait definition.
//!
//! A backend is the ordered triple analyze-instances, analyze-circuit,
//! evaluate-circuit. The first two stages are structural and shared by all
//! backends through default methods; backends differ in how they reduce the
//! per-instance S-matrices.

use std::collections::BTreeMap;

use scatter_model::{Instance, ModelMap, Result, SMatrix};

use crate::analysis::{self, AnalyzedCircuit, AnalyzedInstances};

pub trait Backend: Send + Sync {
    /// Canonical name, stamped into every circuit this backend analyzes.
    fn name(&self) -> &str;

    /// Port maps of every instance. Fails with `UnknownModel` when an
    /// instance references a model missing from `models`.
    fn analyze_instances(
        &self,
        instances: &BTreeMap<String, Instance>,
        models: &ModelMap,
    ) -> Result<AnalyzedInstances> {
        analysis::analyze_instances(instances, models)
    }

    /// Elimination plan for the connection graph.
    fn analyze_circuit(
        &self,
        analyzed: &AnalyzedInstances,
        connections: &BTreeMap<String, String>,
        ports: &BTreeMap<String, String>,
    ) -> Result<AnalyzedCircuit> {
        analysis::analyze_circuit(self.name(), analyzed, connections, ports)
    }

    /// Reduce the instance S-matrices to the circuit response over the
    /// external ports.
    fn evaluate_circuit(
        &self,
        analyzed: &AnalyzedCircuit,
        instances: &BTreeMap<String, SMatrix>,
    ) -> Result<SMatrix>;
}

impl std::fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Backend({})", self.name())
    }
}

/// The accelerated backend could not be constructed.
///
/// Never surfaced to callers: the registry falls back to the portable
/// backend and logs a warning instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyUnavailable {
    pub backend: String,
    pub reason: String,
}

impl DependencyUnavailable {
    pub fn new(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for DependencyUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "backend '{}' unavailable: {}", self.backend, self.reason)
    }
}
