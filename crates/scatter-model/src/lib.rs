//! Scattering-matrix data model for multiport optical networks.
//!
//! Devices are described by [`Model`]s that map parameters (at least a
//! wavelength) to an [`SMatrix`] in one of three encodings. Circuits are
//! described by a [`Netlist`] of [`Instance`]s and their wiring.

pub mod batch;
pub mod error;
pub mod format;
pub mod model;
pub mod netlist;
pub mod port;

pub use batch::{Batch, Wavelength};
pub use error::{Result, ScatterError};
pub use format::{PortMap, SCoo, SDense, SDict, SMatrix, SValue, broadcast_value};
pub use model::{FnModel, Model, ModelMap, Params, SharedModel};
pub use netlist::{Instance, Netlist};
pub use port::{InstancePort, Port, split_inputs_outputs};

pub use num_complex::Complex64;
