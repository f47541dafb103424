//! The model contract: parameters in, scattering matrix out.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::batch::{Batch, Wavelength};
use crate::error::Result;
use crate::format::SMatrix;
use crate::port::Port;

/// Named parameters passed to a model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub wl: Wavelength,
    #[serde(flatten)]
    pub extra: BTreeMap<String, f64>,
}

impl Params {
    pub fn wl(wl: impl Into<Wavelength>) -> Self {
        Self {
            wl: wl.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.extra.get(key).copied()
    }

    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    pub fn batch(&self) -> Batch {
        self.wl.batch()
    }

    /// Copy of these parameters with `overrides` taking precedence.
    pub fn merged(&self, overrides: &BTreeMap<String, f64>) -> Params {
        let mut out = self.clone();
        out.extra
            .extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        out
    }
}

/// A device response: a pure function from parameters to an S-matrix.
///
/// The port set is fixed when the model is built and never changes between
/// calls.
pub trait Model: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn ports(&self) -> &[Port];

    fn evaluate(&self, params: &Params) -> Result<SMatrix>;
}

pub type SharedModel = Arc<dyn Model>;

/// Models available to a circuit, keyed by component name.
pub type ModelMap = BTreeMap<String, SharedModel>;

/// A model backed by a closure, for devices defined outside this workspace.
pub struct FnModel<F> {
    name: String,
    ports: Vec<Port>,
    func: F,
}

impl<F> FnModel<F>
where
    F: Fn(&Params) -> Result<SMatrix> + Send + Sync,
{
    pub fn new<I, P>(name: impl Into<String>, ports: I, func: F) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Port>,
    {
        Self {
            name: name.into(),
            ports: ports.into_iter().map(Into::into).collect(),
            func,
        }
    }

    pub fn shared(self) -> SharedModel
    where
        F: 'static,
    {
        Arc::new(self)
    }
}

impl<F> fmt::Debug for FnModel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("name", &self.name)
            .field("ports", &self.ports)
            .finish()
    }
}

impl<F> Model for FnModel<F>
where
    F: Fn(&Params) -> Result<SMatrix> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn evaluate(&self, params: &Params) -> Result<SMatrix> {
        (self.func)(params)
    }
}
