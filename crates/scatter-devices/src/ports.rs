//! Port specification shared by the device synthesizers.

use scatter_model::{Port, Result, ScatterError, split_inputs_outputs};
use serde::{Deserialize, Serialize};

/// How a synthesized device's ports are chosen.
///
/// Either give both counts (ports default to `in0..`, `out0..`, or are taken
/// from `ports`, inputs first), or give only `ports` and let the names decide
/// which side each port is on. Also the cache key of the synthesizers, so two
/// specs describing the same ports differently are cached separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortSpec {
    pub num_inputs: Option<usize>,
    pub num_outputs: Option<usize>,
    pub ports: Option<Vec<Port>>,
    #[serde(default = "default_true")]
    pub reciprocal: bool,
    #[serde(default)]
    pub diagonal: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PortSpec {
    fn default() -> Self {
        Self {
            num_inputs: None,
            num_outputs: None,
            ports: None,
            reciprocal: true,
            diagonal: false,
        }
    }
}

/// Ordered input and output port names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPorts {
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

impl ResolvedPorts {
    /// Inputs followed by outputs, the index order of the port map.
    pub fn all(&self) -> Vec<Port> {
        self.inputs.iter().chain(&self.outputs).cloned().collect()
    }
}

impl PortSpec {
    pub fn counts(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            num_inputs: Some(num_inputs),
            num_outputs: Some(num_outputs),
            ..Self::default()
        }
    }

    pub fn named<I, P>(ports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Port>,
    {
        Self::default().with_ports(ports)
    }

    pub fn with_ports<I, P>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Port>,
    {
        self.ports = Some(ports.into_iter().map(Into::into).collect());
        self
    }

    pub fn reciprocal(mut self, reciprocal: bool) -> Self {
        self.reciprocal = reciprocal;
        self
    }

    pub fn diagonal(mut self, diagonal: bool) -> Self {
        self.diagonal = diagonal;
        self
    }

    pub fn resolve(&self) -> Result<ResolvedPorts> {
        let resolved = match (&self.ports, self.num_inputs, self.num_outputs) {
            (None, Some(ni), Some(no)) => ResolvedPorts {
                inputs: (0..ni).map(|i| format!("in{i}")).collect(),
                outputs: (0..no).map(|i| format!("out{i}")).collect(),
            },
            (None, _, _) => {
                return Err(ScatterError::config(
                    "without explicit ports, both num_inputs and num_outputs must be given",
                ));
            }
            (Some(ports), Some(ni), Some(no)) => {
                if ni + no != ports.len() {
                    return Err(ScatterError::config(format!(
                        "num_inputs + num_outputs = {} but {} ports were given",
                        ni + no,
                        ports.len()
                    )));
                }
                ResolvedPorts {
                    inputs: ports[..ni].to_vec(),
                    outputs: ports[ni..].to_vec(),
                }
            }
            (Some(ports), None, None) => {
                let (inputs, outputs) = split_inputs_outputs(ports);
                ResolvedPorts { inputs, outputs }
            }
            (Some(_), _, _) => {
                return Err(ScatterError::config(
                    "num_inputs and num_outputs must be given together",
                ));
            }
        };

        if resolved.inputs.is_empty() && resolved.outputs.is_empty() {
            return Err(ScatterError::config("a device needs at least one port"));
        }
        if self.diagonal && resolved.inputs.len() != resolved.outputs.len() {
            return Err(ScatterError::config(format!(
                "a diagonal device needs as many inputs as outputs, got {} and {}",
                resolved.inputs.len(),
                resolved.outputs.len()
            )));
        }
        Ok(resolved)
    }
}
