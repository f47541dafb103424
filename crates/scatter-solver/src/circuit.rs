//! Compiled circuits.
//!
//! A [`Circuit`] runs the two structural stages once, at construction, and
//! the evaluate stage on every call. It implements [`Model`], so circuits
//! nest inside other circuits.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use rayon::prelude::*;
use scatter_model::{
    Instance, Model, ModelMap, Netlist, Params, Port, Result, SMatrix, ScatterError,
};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalyzedCircuit;
use crate::backend::{Backend, DEFAULT_BACKEND, get_backend};

/// Options for building a [`Circuit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitOptions {
    /// Registry name of the backend, "default" unless overridden.
    #[serde(default = "default_backend_name")]
    pub backend: String,
}

fn default_backend_name() -> String {
    DEFAULT_BACKEND.to_string()
}

impl Default for CircuitOptions {
    fn default() -> Self {
        Self {
            backend: default_backend_name(),
        }
    }
}

#[derive(Debug)]
pub struct Circuit {
    name: String,
    backend: Arc<dyn Backend>,
    models: ModelMap,
    instances: BTreeMap<String, Instance>,
    analyzed: AnalyzedCircuit,
    ports: Vec<Port>,
}

impl Circuit {
    /// Analyze `netlist` with the backend named in `options`.
    pub fn new(
        name: impl Into<String>,
        netlist: &Netlist,
        models: &ModelMap,
        options: &CircuitOptions,
    ) -> Result<Self> {
        Self::with_backend(name, netlist, models, get_backend(&options.backend)?)
    }

    pub fn with_backend(
        name: impl Into<String>,
        netlist: &Netlist,
        models: &ModelMap,
        backend: Arc<dyn Backend>,
    ) -> Result<Self> {
        let name = name.into();
        let analyzed_instances = backend.analyze_instances(&netlist.instances, models)?;
        let analyzed =
            backend.analyze_circuit(&analyzed_instances, &netlist.connections, &netlist.ports)?;

        let used = netlist
            .instances
            .values()
            .filter_map(|inst| {
                models
                    .get(&inst.component)
                    .map(|m| (inst.component.clone(), Arc::clone(m)))
            })
            .collect();

        debug!(
            "compiled circuit '{name}' with {} instances on backend '{}'",
            netlist.instances.len(),
            backend.name()
        );

        Ok(Self {
            ports: analyzed.external.names().to_vec(),
            name,
            backend,
            models: used,
            instances: netlist.instances.clone(),
            analyzed,
        })
    }

    pub fn analyzed(&self) -> &AnalyzedCircuit {
        &self.analyzed
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// S-matrix of every instance at `params`, with each instance's
    /// settings layered over the global parameters.
    pub fn instance_matrices(&self, params: &Params) -> Result<BTreeMap<String, SMatrix>> {
        self.instances
            .par_iter()
            .map(|(name, instance)| -> Result<(String, SMatrix)> {
                let model = self.models.get(&instance.component).ok_or_else(|| {
                    ScatterError::UnknownModel(instance.component.clone())
                })?;
                let s = model.evaluate(&params.merged(&instance.settings))?;
                Ok((name.clone(), s))
            })
            .collect()
    }
}

impl Model for Circuit {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn evaluate(&self, params: &Params) -> Result<SMatrix> {
        let matrices = self.instance_matrices(params)?;
        self.backend.evaluate_circuit(&self.analyzed, &matrices)
    }
}
