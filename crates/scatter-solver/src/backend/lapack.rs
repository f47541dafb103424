//! Accelerated backend: one linear solve per sample through LAPACK.
//!
//! With `T` the block-diagonal matrix of all instance S-matrices (entry
//! `(i, j)` is the transmission from `i` to `j`), `C` the symmetric
//! connection matrix and `P` the selection of exposed ports, the circuit
//! response is
//!
//! ```text
//! S = P (I - T C)^-1 T P^T
//! ```
//!
//! `I - T C` is assembled from instance triplets as a nalgebra-sparse COO
//! matrix, expanded to dense storage and factorized with LAPACK's complex LU.
//! The solve is dense: its cost grows with the cube of the circuit's port
//! count. Samples are solved in parallel with rayon.

use std::collections::BTreeMap;

use log::debug;
use nalgebra::DMatrix;
use nalgebra_lapack::LU;
use nalgebra_sparse::CooMatrix;
use num_complex::Complex64;
use rayon::prelude::*;
use scatter_model::{Batch, Result, SCoo, SMatrix, ScatterError};

use super::traits::Backend;
use crate::analysis::AnalyzedCircuit;

pub const LAPACK_BACKEND: &str = "lapack";

/// Backend solving the whole circuit as a single linear system.
pub struct LapackBackend;

/// Instance triplets translated to circuit-wide indices.
struct GlobalTriplets {
    rows: Vec<usize>,
    cols: Vec<usize>,
    /// `samples x nnz`, already broadcast to the circuit batch.
    values: DMatrix<Complex64>,
}

impl LapackBackend {
    fn collect_triplets(
        analyzed: &AnalyzedCircuit,
        instances: &BTreeMap<String, SMatrix>,
        samples: usize,
    ) -> Result<Vec<GlobalTriplets>> {
        let mut blocks = Vec::with_capacity(analyzed.instances.len());
        for (slot, s) in analyzed.instance_matrices(instances)? {
            let coo = s.to_coo();
            let mut local_to_global = Vec::with_capacity(coo.ports().len());
            for name in coo.ports().names() {
                let id = slot.global(name).ok_or_else(|| {
                    ScatterError::config(format!(
                        "S-matrix port '{name}' is not declared by the model"
                    ))
                })?;
                local_to_global.push(id);
            }
            let values = match coo.values().nrows() {
                n if n == samples => coo.values().clone(),
                1 => DMatrix::from_fn(samples, coo.nnz(), |_, t| coo.values()[(0, t)]),
                n => {
                    return Err(ScatterError::Shape(format!(
                        "instance has {n} samples, circuit has {samples}"
                    )));
                }
            };
            blocks.push(GlobalTriplets {
                rows: coo.rows().iter().map(|&r| local_to_global[r]).collect(),
                cols: coo.cols().iter().map(|&c| local_to_global[c]).collect(),
                values,
            });
        }
        Ok(blocks)
    }

    fn solve_sample(
        analyzed: &AnalyzedCircuit,
        blocks: &[GlobalTriplets],
        partners: &[Option<usize>],
        columns: &[Option<usize>],
        sample: usize,
    ) -> Result<DMatrix<Complex64>> {
        let n = analyzed.num_ports;
        let ne = analyzed.external_ids.len();

        let mut system = CooMatrix::new(n, n);
        for i in 0..n {
            system.push(i, i, Complex64::new(1.0, 0.0));
        }
        let mut rhs = DMatrix::zeros(n, ne);
        for block in blocks {
            for (t, (&i, &m)) in block.rows.iter().zip(&block.cols).enumerate() {
                let v = block.values[(sample, t)];
                if let Some(p) = partners[m] {
                    system.push(i, p, -v);
                }
                if let Some(e) = columns[m] {
                    rhs[(i, e)] += v;
                }
            }
        }

        let lu = LU::new(DMatrix::from(&system));
        let x = lu.solve(&rhs).ok_or_else(|| {
            ScatterError::Computation(format!("circuit system is singular at sample {sample}"))
        })?;

        Ok(DMatrix::from_fn(ne, ne, |r, c| x[(analyzed.external_ids[r], c)]))
    }
}

impl Backend for LapackBackend {
    fn name(&self) -> &str {
        LAPACK_BACKEND
    }

    fn evaluate_circuit(
        &self,
        analyzed: &AnalyzedCircuit,
        instances: &BTreeMap<String, SMatrix>,
    ) -> Result<SMatrix> {
        analyzed.ensure_backend(self.name())?;
        let batch = analyzed.common_batch(instances)?;
        let samples = batch.len();
        let ne = analyzed.external_ids.len();

        if ne == 0 {
            let values = DMatrix::zeros(samples, 0);
            return Ok(SCoo::new(batch, vec![], vec![], values, analyzed.external.clone())?.into());
        }

        let blocks = Self::collect_triplets(analyzed, instances, samples)?;
        let partners = analyzed.partners();
        let columns = analyzed.external_columns();
        debug!(
            "solving {} samples of a {}-port system",
            samples, analyzed.num_ports
        );

        let solved = (0..samples)
            .into_par_iter()
            .map(|s| Self::solve_sample(analyzed, &blocks, &partners, &columns, s))
            .collect::<Result<Vec<_>>>()?;

        Ok(to_coo(batch, &solved, analyzed)?.into())
    }
}

/// Keep every external pair that is non-zero for at least one sample.
fn to_coo(batch: Batch, solved: &[DMatrix<Complex64>], analyzed: &AnalyzedCircuit) -> Result<SCoo> {
    let ne = analyzed.external_ids.len();
    let zero = Complex64::new(0.0, 0.0);
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    for r in 0..ne {
        for c in 0..ne {
            if solved.iter().any(|m| m[(r, c)] != zero) {
                rows.push(r);
                cols.push(c);
            }
        }
    }
    let values = DMatrix::from_fn(solved.len(), rows.len(), |s, t| solved[s][(rows[t], cols[t])]);
    SCoo::new(batch, rows, cols, values, analyzed.external.clone())
}
