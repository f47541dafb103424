//! Structural analysis shared by every backend.
//!
//! Nothing here depends on parameter values, so an analyzed circuit can be
//! evaluated many times with different wavelengths or settings.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use scatter_model::{
    Batch, Instance, InstancePort, ModelMap, PortMap, Result, SMatrix, ScatterError,
};

/// Port layout of one instance, taken from its model.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedInstance {
    pub component: String,
    pub ports: PortMap,
}

/// Result of the first stage: port maps per instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyzedInstances {
    pub instances: BTreeMap<String, AnalyzedInstance>,
}

/// Where an instance's ports live in the circuit-wide index space.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSlot {
    pub offset: usize,
    pub ports: PortMap,
}

impl InstanceSlot {
    pub fn global(&self, port: &str) -> Option<usize> {
        self.ports.index_of(port).map(|i| self.offset + i)
    }
}

/// Result of the second stage: the elimination plan.
///
/// Every instance port gets a circuit-wide index. `connections` lists the
/// port pairs to eliminate, in order, and `external` names the ports that
/// survive, with `external_ids[e]` the circuit-wide index of external port
/// `e`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedCircuit {
    pub backend: String,
    pub instances: BTreeMap<String, InstanceSlot>,
    pub num_ports: usize,
    pub connections: Vec<(usize, usize)>,
    pub external: PortMap,
    pub external_ids: Vec<usize>,
}

impl AnalyzedCircuit {
    pub fn ensure_backend(&self, evaluating: &str) -> Result<()> {
        if self.backend == evaluating {
            Ok(())
        } else {
            Err(ScatterError::BackendMismatch {
                analyzed: self.backend.clone(),
                evaluating: evaluating.to_string(),
            })
        }
    }

    /// Partner of every port that takes part in a connection.
    pub fn partners(&self) -> Vec<Option<usize>> {
        let mut partner = vec![None; self.num_ports];
        for &(a, b) in &self.connections {
            partner[a] = Some(b);
            partner[b] = Some(a);
        }
        partner
    }

    /// External index of every exposed port.
    pub fn external_columns(&self) -> Vec<Option<usize>> {
        let mut column = vec![None; self.num_ports];
        for (e, &id) in self.external_ids.iter().enumerate() {
            column[id] = Some(e);
        }
        column
    }

    /// The S-matrix supplied for every planned instance.
    pub fn instance_matrices<'a>(
        &self,
        matrices: &'a BTreeMap<String, SMatrix>,
    ) -> Result<Vec<(&InstanceSlot, &'a SMatrix)>> {
        self.instances
            .iter()
            .map(|(name, slot)| {
                matrices.get(name).map(|s| (slot, s)).ok_or_else(|| {
                    ScatterError::config(format!("no S-matrix given for instance '{name}'"))
                })
            })
            .collect()
    }

    /// Batch shared by all instance matrices.
    pub fn common_batch(&self, matrices: &BTreeMap<String, SMatrix>) -> Result<Batch> {
        self.instance_matrices(matrices)?
            .into_iter()
            .try_fold(Batch::Scalar, |acc, (_, s)| acc.broadcast(s.batch()))
    }
}

pub fn analyze_instances(
    instances: &BTreeMap<String, Instance>,
    models: &ModelMap,
) -> Result<AnalyzedInstances> {
    let mut analyzed = BTreeMap::new();
    for (name, instance) in instances {
        let model = models.get(&instance.component).ok_or_else(|| {
            ScatterError::UnknownModel(format!(
                "instance '{name}' uses model '{}'",
                instance.component
            ))
        })?;
        let ports = PortMap::new(model.ports().iter().cloned())?;
        analyzed.insert(
            name.clone(),
            AnalyzedInstance {
                component: instance.component.clone(),
                ports,
            },
        );
    }
    Ok(AnalyzedInstances {
        instances: analyzed,
    })
}

/// Build the elimination plan for `backend`.
///
/// Fails with `DanglingPort` when an endpoint names an unknown instance or
/// port, and with `PortReuse` when a port is used by more than one
/// connection or is both connected and exposed.
pub fn analyze_circuit(
    backend: &str,
    analyzed: &AnalyzedInstances,
    connections: &BTreeMap<String, String>,
    ports: &BTreeMap<String, String>,
) -> Result<AnalyzedCircuit> {
    let mut slots = BTreeMap::new();
    let mut offset = 0;
    for (name, instance) in &analyzed.instances {
        slots.insert(
            name.clone(),
            InstanceSlot {
                offset,
                ports: instance.ports.clone(),
            },
        );
        offset += instance.ports.len();
    }

    let resolve = |reference: &str| -> Result<usize> {
        let port = InstancePort::parse(reference)?;
        slots
            .get(&port.instance)
            .and_then(|slot| slot.global(&port.port))
            .ok_or_else(|| ScatterError::DanglingPort(reference.to_string()))
    };

    let mut used = HashSet::new();
    let mut claim = |reference: &str| -> Result<usize> {
        let id = resolve(reference)?;
        if !used.insert(id) {
            return Err(ScatterError::PortReuse(reference.to_string()));
        }
        Ok(id)
    };

    let mut plan = Vec::with_capacity(connections.len());
    for (a, b) in connections {
        plan.push((claim(a.as_str())?, claim(b.as_str())?));
    }

    let external = PortMap::new(ports.keys().cloned())?;
    let mut external_ids = Vec::with_capacity(ports.len());
    for internal in ports.values() {
        external_ids.push(claim(internal.as_str())?);
    }

    debug!(
        "planned circuit for '{backend}': {} ports, {} connections, {} external",
        offset,
        plan.len(),
        external_ids.len()
    );

    Ok(AnalyzedCircuit {
        backend: backend.to_string(),
        instances: slots,
        num_ports: offset,
        connections: plan,
        external,
        external_ids,
    })
}
