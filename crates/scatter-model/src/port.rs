//! Port names and the `instance,port` reference syntax used by netlists.

use std::fmt;

use crate::error::{Result, ScatterError};

/// A symbolic connection point on a device or circuit.
pub type Port = String;

/// A port on a named instance, written `instance,port` in netlists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstancePort {
    pub instance: String,
    pub port: Port,
}

impl InstancePort {
    pub fn new(instance: impl Into<String>, port: impl Into<Port>) -> Self {
        Self {
            instance: instance.into(),
            port: port.into(),
        }
    }

    /// Parse an `instance,port` reference.
    pub fn parse(reference: &str) -> Result<Self> {
        let (instance, port) = reference.split_once(',').ok_or_else(|| {
            ScatterError::config(format!(
                "port reference '{reference}' is not of the form 'instance,port'"
            ))
        })?;
        let instance = instance.trim();
        let port = port.trim();
        if instance.is_empty() || port.is_empty() || port.contains(',') {
            return Err(ScatterError::config(format!(
                "port reference '{reference}' is not of the form 'instance,port'"
            )));
        }
        Ok(Self::new(instance, port))
    }
}

impl fmt::Display for InstancePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.instance, self.port)
    }
}

/// Split a port list into inputs and outputs by name.
///
/// Ports starting with `in` (case-insensitive) are inputs and everything else
/// is an output. When no port starts with `in`, ports starting with `out` are
/// the outputs and the remainder are inputs. Order is preserved on both sides.
pub fn split_inputs_outputs(ports: &[Port]) -> (Vec<Port>, Vec<Port>) {
    let starts = |p: &Port, prefix: &str| p.to_ascii_lowercase().starts_with(prefix);

    let (inputs, outputs): (Vec<Port>, Vec<Port>) =
        ports.iter().cloned().partition(|p| starts(p, "in"));
    if !inputs.is_empty() {
        return (inputs, outputs);
    }

    let (outputs, inputs): (Vec<Port>, Vec<Port>) =
        ports.iter().cloned().partition(|p| starts(p, "out"));
    (inputs, outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<Port> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_instance_port_references() {
        let p = InstancePort::parse("mmi1,out0").unwrap();
        assert_eq!(p.instance, "mmi1");
        assert_eq!(p.port, "out0");
        assert_eq!(p.to_string(), "mmi1,out0");

        assert!(InstancePort::parse("mmi1").is_err());
        assert!(InstancePort::parse(",out0").is_err());
        assert!(InstancePort::parse("a,b,c").is_err());
    }

    #[test]
    fn splits_on_in_prefix() {
        let (i, o) = split_inputs_outputs(&names(&["in0", "out0", "IN1", "drop"]));
        assert_eq!(i, names(&["in0", "IN1"]));
        assert_eq!(o, names(&["out0", "drop"]));
    }

    #[test]
    fn falls_back_to_out_prefix() {
        let (i, o) = split_inputs_outputs(&names(&["a", "out0", "b", "Out1"]));
        assert_eq!(i, names(&["a", "b"]));
        assert_eq!(o, names(&["out0", "Out1"]));
    }
}
