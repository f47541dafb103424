//! Parameter batching: scalar wavelengths versus sampled sweeps.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScatterError};

/// Shape of the sample axis carried by every scattering value.
///
/// A `Scalar` batch stores exactly one sample per value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Batch {
    Scalar,
    Samples(usize),
}

impl Batch {
    /// Number of samples stored per value.
    pub fn len(self) -> usize {
        match self {
            Batch::Scalar => 1,
            Batch::Samples(k) => k,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Common batch of two inputs, broadcasting scalars and single samples.
    pub fn broadcast(self, other: Batch) -> Result<Batch> {
        match (self, other) {
            (Batch::Scalar, b) | (b, Batch::Scalar) => Ok(b),
            (Batch::Samples(a), Batch::Samples(b)) if a == b => Ok(Batch::Samples(a)),
            (Batch::Samples(1), b) | (b, Batch::Samples(1)) => Ok(b),
            (Batch::Samples(a), Batch::Samples(b)) => Err(ScatterError::Shape(format!(
                "cannot broadcast {a} samples against {b} samples"
            ))),
        }
    }
}

/// Wavelength argument of a model, in micrometres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Wavelength {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Wavelength {
    pub fn batch(&self) -> Batch {
        match self {
            Wavelength::Scalar(_) => Batch::Scalar,
            Wavelength::Array(values) => Batch::Samples(values.len()),
        }
    }

    pub fn samples(&self) -> Vec<f64> {
        match self {
            Wavelength::Scalar(wl) => vec![*wl],
            Wavelength::Array(values) => values.clone(),
        }
    }
}

impl Default for Wavelength {
    fn default() -> Self {
        Wavelength::Scalar(1.55)
    }
}

impl From<f64> for Wavelength {
    fn from(wl: f64) -> Self {
        Wavelength::Scalar(wl)
    }
}

impl From<Vec<f64>> for Wavelength {
    fn from(values: Vec<f64>) -> Self {
        Wavelength::Array(values)
    }
}

impl From<&[f64]> for Wavelength {
    fn from(values: &[f64]) -> Self {
        Wavelength::Array(values.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_rules() {
        assert_eq!(Batch::Scalar.broadcast(Batch::Scalar).unwrap(), Batch::Scalar);
        assert_eq!(
            Batch::Scalar.broadcast(Batch::Samples(4)).unwrap(),
            Batch::Samples(4)
        );
        assert_eq!(
            Batch::Samples(1).broadcast(Batch::Samples(4)).unwrap(),
            Batch::Samples(4)
        );
        assert!(matches!(
            Batch::Samples(3).broadcast(Batch::Samples(4)),
            Err(ScatterError::Shape(_))
        ));
    }

    #[test]
    fn wavelength_batches() {
        assert_eq!(Wavelength::from(1.31).batch(), Batch::Scalar);
        let sweep = Wavelength::from(vec![1.5, 1.55, 1.6]);
        assert_eq!(sweep.batch(), Batch::Samples(3));
        assert_eq!(sweep.samples().len(), 3);
    }
}
