//! Additive backend: sum of transmissions over every path.
//!
//! Light entering an exposed port travels through an instance (`S[i][j]`),
//! crosses a connection to the partner port and continues until it leaves
//! through another exposed port. The circuit entry between two exposed ports
//! is the sum, over all simple paths between them, of the product of the
//! instance coefficients along the path.
//!
//! Exact for feedback-free circuits. A path never revisits a port, so the
//! round trips of a cavity are not summed; use `fg` or `lapack` for circuits
//! with loops.

use std::collections::BTreeMap;

use log::trace;
use nalgebra::DVector;
use num_complex::Complex64;
use scatter_model::{Result, SDict, SMatrix, SValue, ScatterError, broadcast_value};

use super::traits::Backend;
use crate::analysis::AnalyzedCircuit;

pub const ADDITIVE_BACKEND: &str = "additive";

/// Path-sum backend for circuits without feedback.
pub struct AdditiveBackend;

/// Walk state shared by the depth-first path search.
struct PathSearch<'a> {
    /// `edges[i]` lists every `(j, S[i][j])` inside the instance owning `i`.
    edges: &'a [Vec<(usize, SValue)>],
    partners: &'a [Option<usize>],
    columns: &'a [Option<usize>],
    visited: Vec<bool>,
    sums: BTreeMap<usize, SValue>,
}

impl PathSearch<'_> {
    fn walk(&mut self, port: usize, gain: &SValue) {
        let edges = self.edges;
        for (next, coefficient) in &edges[port] {
            let next = *next;
            let gain = gain.component_mul(coefficient);
            if let Some(e) = self.columns[next] {
                match self.sums.get_mut(&e) {
                    Some(sum) => *sum += &gain,
                    None => {
                        self.sums.insert(e, gain);
                    }
                }
                continue;
            }
            let Some(partner) = self.partners[next] else {
                continue;
            };
            if self.visited[next] || self.visited[partner] {
                continue;
            }
            self.visited[next] = true;
            self.visited[partner] = true;
            self.walk(partner, &gain);
            self.visited[next] = false;
            self.visited[partner] = false;
        }
    }
}

impl AdditiveBackend {
    fn collect_edges(
        analyzed: &AnalyzedCircuit,
        instances: &BTreeMap<String, SMatrix>,
        samples: usize,
    ) -> Result<Vec<Vec<(usize, SValue)>>> {
        let mut edges = vec![Vec::new(); analyzed.num_ports];
        for (slot, s) in analyzed.instance_matrices(instances)? {
            for ((a, b), v) in s.to_dict().iter() {
                let (i, j) = match (slot.global(a), slot.global(b)) {
                    (Some(i), Some(j)) => (i, j),
                    _ => {
                        return Err(ScatterError::config(format!(
                            "S-matrix entry ({a}, {b}) names a port the model does not declare"
                        )));
                    }
                };
                edges[i].push((j, broadcast_value(v, samples)?));
            }
        }
        Ok(edges)
    }
}

impl Backend for AdditiveBackend {
    fn name(&self) -> &str {
        ADDITIVE_BACKEND
    }

    fn evaluate_circuit(
        &self,
        analyzed: &AnalyzedCircuit,
        instances: &BTreeMap<String, SMatrix>,
    ) -> Result<SMatrix> {
        analyzed.ensure_backend(self.name())?;
        let batch = analyzed.common_batch(instances)?;
        let samples = batch.len();

        let edges = Self::collect_edges(analyzed, instances, samples)?;
        let partners = analyzed.partners();
        let columns = analyzed.external_columns();
        let unit = DVector::from_element(samples, Complex64::new(1.0, 0.0));

        let mut result = SDict::new(batch);
        for (e, &start) in analyzed.external_ids.iter().enumerate() {
            let mut search = PathSearch {
                edges: &edges,
                partners: &partners,
                columns: &columns,
                visited: vec![false; analyzed.num_ports],
                sums: BTreeMap::new(),
            };
            search.visited[start] = true;
            search.walk(start, &unit);
            trace!("port {start} reaches {} exposed ports", search.sums.len());

            let from = analyzed.external.name(e);
            for (f, v) in search.sums {
                if let (Some(a), Some(b)) = (from, analyzed.external.name(f)) {
                    result.insert(a, b, v)?;
                }
            }
        }
        Ok(result.into())
    }
}
