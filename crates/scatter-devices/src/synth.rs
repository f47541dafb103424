//! Idealized multiport devices.
//!
//! - [`unitary`]: lossless, equal-power splitting between every allowed
//!   input/output pair, obtained by projecting the coupling pattern onto its
//!   unitary part with an SVD.
//! - [`copier`]: every allowed coupling set to 1. Not power conserving.
//! - [`passthru`]: a diagonal unitary, `in_i <-> out_i`.
//!
//! All three are memoized on their full argument list and return the same
//! `Arc` for identical requests.

use log::debug;
use nalgebra::DMatrix;
use num_complex::Complex64;
use scatter_model::{Model, Params, Port, PortMap, Result, SCoo, SMatrix, ScatterError, SharedModel};

use crate::cache::{self, DeviceKind};
use crate::ports::{PortSpec, ResolvedPorts};

/// Singular values above this are part of the unitary projection.
const SINGULAR_THRESHOLD: f64 = 1e-12;

/// Coefficients at or below this magnitude are SVD residue and dropped.
const SPARSITY_THRESHOLD: f64 = 1e-6;

/// A device with wavelength-independent coupling coefficients.
#[derive(Debug)]
pub struct SynthesizedModel {
    name: String,
    ports: Vec<Port>,
    port_map: PortMap,
    rows: Vec<usize>,
    cols: Vec<usize>,
    coefficients: Vec<Complex64>,
}

impl SynthesizedModel {
    fn from_matrix(name: String, resolved: &ResolvedPorts, s: &DMatrix<f64>) -> Result<Self> {
        let ports = resolved.all();
        let port_map = PortMap::new(ports.iter().cloned())?;

        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut coefficients = Vec::new();
        for r in 0..s.nrows() {
            for c in 0..s.ncols() {
                let v = s[(r, c)];
                if v.abs() > SPARSITY_THRESHOLD {
                    rows.push(r);
                    cols.push(c);
                    coefficients.push(Complex64::new(v, 0.0));
                }
            }
        }

        Ok(Self {
            name,
            ports,
            port_map,
            rows,
            cols,
            coefficients,
        })
    }

    pub fn port_map(&self) -> &PortMap {
        &self.port_map
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    pub fn coefficients(&self) -> &[Complex64] {
        &self.coefficients
    }
}

impl Model for SynthesizedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn evaluate(&self, params: &Params) -> Result<SMatrix> {
        let batch = params.batch();
        let values = DMatrix::from_fn(batch.len(), self.coefficients.len(), |_, t| {
            self.coefficients[t]
        });
        let coo = SCoo::new(
            batch,
            self.rows.clone(),
            self.cols.clone(),
            values,
            self.port_map.clone(),
        )?;
        Ok(coo.into())
    }
}

/// Set allowed couplings to 1: inputs occupy `0..ni`, outputs start at
/// `offset`.
fn mark_couplings(
    s: &mut DMatrix<f64>,
    offset: usize,
    ni: usize,
    no: usize,
    reciprocal: bool,
    diagonal: bool,
) {
    for i in 0..ni {
        for j in 0..no {
            if diagonal && i != j {
                continue;
            }
            s[(i, offset + j)] = 1.0;
            if reciprocal {
                s[(offset + j, i)] = 1.0;
            }
        }
    }
}

/// Equal-magnitude lossless couplings over the allowed pattern.
///
/// The pattern is laid out in a square template of size `2 max(ni, no)`,
/// every non-zero singular value is replaced by 1, and the elementwise square
/// root of the reconstructed magnitudes gives the coefficients. The template
/// is then cut down to the real inputs and outputs.
fn unitary_matrix(ni: usize, no: usize, reciprocal: bool, diagonal: bool) -> Result<DMatrix<f64>> {
    let n = ni.max(no);
    let mut template = DMatrix::zeros(2 * n, 2 * n);
    mark_couplings(&mut template, n, n, n, reciprocal, diagonal);

    let svd = template.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(ScatterError::Computation(
                "SVD of the coupling template did not produce singular vectors".into(),
            ));
        }
    };
    let mask = svd
        .singular_values
        .map(|s| if s > SINGULAR_THRESHOLD { 1.0 } else { 0.0 });
    let projected = u * DMatrix::from_diagonal(&mask) * v_t;
    let magnitude = projected.map(|x| x.abs().sqrt());

    let keep: Vec<usize> = (0..ni).chain(n..n + no).collect();
    Ok(magnitude.select_rows(&keep).select_columns(&keep))
}

fn copier_matrix(ni: usize, no: usize, reciprocal: bool, diagonal: bool) -> DMatrix<f64> {
    let mut s = DMatrix::zeros(ni + no, ni + no);
    mark_couplings(&mut s, ni, ni, no, reciprocal, diagonal);
    s
}

/// Lossless multiport splitting power equally over all allowed paths.
pub fn unitary(spec: &PortSpec) -> Result<SharedModel> {
    cache::get_or_build(DeviceKind::Unitary, spec, || {
        let resolved = spec.resolve()?;
        let (ni, no) = (resolved.inputs.len(), resolved.outputs.len());
        let s = unitary_matrix(ni, no, spec.reciprocal, spec.diagonal)?;
        let model = SynthesizedModel::from_matrix(format!("unitary_{ni}_{no}"), &resolved, &s)?;
        debug!("built {} with {} couplings", model.name, model.coefficients.len());
        Ok(model)
    })
}

/// Multiport copying its inputs to every allowed output at full amplitude.
pub fn copier(spec: &PortSpec) -> Result<SharedModel> {
    cache::get_or_build(DeviceKind::Copier, spec, || {
        let resolved = spec.resolve()?;
        let (ni, no) = (resolved.inputs.len(), resolved.outputs.len());
        let s = copier_matrix(ni, no, spec.reciprocal, spec.diagonal);
        let model = SynthesizedModel::from_matrix(format!("copier_{ni}_{no}"), &resolved, &s)?;
        debug!("built {} with {} couplings", model.name, model.coefficients.len());
        Ok(model)
    })
}

/// `num_links` independent straight-through links; the diagonal
/// [`unitary`], sharing its cache.
pub fn passthru(
    num_links: Option<usize>,
    ports: Option<Vec<Port>>,
    reciprocal: bool,
) -> Result<SharedModel> {
    unitary(&PortSpec {
        num_inputs: num_links,
        num_outputs: num_links,
        ports,
        reciprocal,
        diagonal: true,
    })
}
