//! Idealized multiport device models.
//!
//! Ready-made [`Model`](scatter_model::Model)s for circuits: balanced
//! lossless splitters/combiners ([`unitary`]), ideal copiers ([`copier`]) and
//! straight-through links ([`passthru`]), plus a name to constructor
//! registry.

mod cache;
pub mod ports;
pub mod registry;
pub mod synth;

pub use ports::{PortSpec, ResolvedPorts};
pub use registry::{ModelConstructor, ModelRegistry, get_models, models_live};
pub use synth::{SynthesizedModel, copier, passthru, unitary};
