//! Name to constructor mapping for the built-in devices.

use std::collections::BTreeMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use scatter_model::{Result, ScatterError, SharedModel};

use crate::ports::PortSpec;
use crate::synth::{copier, passthru, unitary};

/// Builds a device from its port specification.
pub type ModelConstructor = fn(&PortSpec) -> Result<SharedModel>;

pub type ModelRegistry = BTreeMap<String, ModelConstructor>;

/// `passthru` reads its link count from `num_inputs`, or `num_outputs` when
/// only that is set. Both counts, when given, must agree; the device is
/// always diagonal, whatever `diagonal` says.
fn passthru_from_spec(spec: &PortSpec) -> Result<SharedModel> {
    let links = match (spec.num_inputs, spec.num_outputs) {
        (Some(ni), Some(no)) if ni != no => {
            return Err(ScatterError::config(format!(
                "passthru links inputs one to one, got {ni} inputs and {no} outputs"
            )));
        }
        (ni, no) => ni.or(no),
    };
    passthru(links, spec.ports.clone(), spec.reciprocal)
}

fn builtin() -> ModelRegistry {
    let mut models = ModelRegistry::new();
    models.insert("copier".to_string(), copier as ModelConstructor);
    models.insert("passthru".to_string(), passthru_from_spec as ModelConstructor);
    models.insert("unitary".to_string(), unitary as ModelConstructor);
    models
}

static MODELS: LazyLock<RwLock<ModelRegistry>> = LazyLock::new(|| RwLock::new(builtin()));

/// A private copy of the registry; changing it affects nobody else.
pub fn get_models() -> ModelRegistry {
    MODELS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// The shared registry itself. Writes are visible process-wide.
pub fn models_live() -> &'static RwLock<ModelRegistry> {
    &MODELS
}
