//! Instances and the connection graph supplied by netlist tooling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A placed, named occurrence of a component model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Name of the model in the circuit's model map.
    pub component: String,
    /// Per-instance parameter overrides.
    #[serde(default)]
    pub settings: BTreeMap<String, f64>,
}

impl Instance {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            settings: BTreeMap::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: f64) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

/// Instances plus their wiring.
///
/// `connections` maps `instance,port` to `instance,port`; `ports` maps an
/// external circuit port name to the `instance,port` it exposes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Netlist {
    pub instances: BTreeMap<String, Instance>,
    #[serde(default)]
    pub connections: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: BTreeMap<String, String>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(mut self, name: impl Into<String>, instance: Instance) -> Self {
        self.instances.insert(name.into(), instance);
        self
    }

    pub fn connect(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.connections.insert(a.into(), b.into());
        self
    }

    pub fn expose(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.ports.insert(external.into(), internal.into());
        self
    }
}
