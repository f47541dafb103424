//! Filipsson-Gunnar pairwise reduction.
//!
//! Portable backend with no native dependencies. Each instance starts as its
//! own sparse network; every planned connection `(k, l)` first merges the two
//! networks owning `k` and `l` (block-diagonally, if they differ) and then
//! eliminates the pair with
//!
//! ```text
//! S'ij = Sij + [Skj Sil (1 - Slk) + Slj Sik (1 - Skl) + Skj Sll Sik + Slj Skk Sil]
//!              / [(1 - Skl)(1 - Slk) - Skk Sll]
//! ```
//!
//! (G. Filipsson, "A new general computer algorithm for S-matrix calculation
//! of interconnected multiports", 1981.) Values stay sampled, so every term
//! is evaluated elementwise over the batch.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;
use nalgebra::DVector;
use num_complex::Complex64;
use scatter_model::{Result, SDict, SMatrix, SValue, ScatterError, broadcast_value};

use super::traits::Backend;
use crate::analysis::AnalyzedCircuit;

/// Pairwise-reduction backend.
pub struct FilipssonGunnarBackend;

pub const FG_BACKEND: &str = "filipsson_gunnar";

/// A sub-network over circuit-wide port indices.
#[derive(Debug, Default)]
struct Network {
    ports: BTreeSet<usize>,
    entries: BTreeMap<(usize, usize), SValue>,
}

impl Network {
    fn absorb(&mut self, other: Network) {
        self.ports.extend(other.ports);
        self.entries.extend(other.entries);
    }

    fn lookup(&self, i: usize, j: usize, samples: usize) -> SValue {
        self.entries
            .get(&(i, j))
            .cloned()
            .unwrap_or_else(|| DVector::zeros(samples))
    }

    /// Eliminate the connected pair `(k, l)`.
    fn interconnect(&mut self, k: usize, l: usize, samples: usize) -> Result<()> {
        let one = DVector::from_element(samples, Complex64::new(1.0, 0.0));
        let skk = self.lookup(k, k, samples);
        let skl = self.lookup(k, l, samples);
        let slk = self.lookup(l, k, samples);
        let sll = self.lookup(l, l, samples);

        let one_minus_skl = &one - &skl;
        let one_minus_slk = &one - &slk;
        let det = one_minus_skl.component_mul(&one_minus_slk) - skk.component_mul(&sll);
        if det.iter().any(|d| d.norm() == 0.0) {
            return Err(ScatterError::Computation(format!(
                "lossless feedback loop between ports {k} and {l} has no steady state"
            )));
        }

        let internal = |p: usize| p == k || p == l;
        let mut into_pair = BTreeSet::new();
        let mut out_of_pair = BTreeSet::new();
        for &(i, j) in self.entries.keys() {
            if internal(j) && !internal(i) {
                into_pair.insert(i);
            }
            if internal(i) && !internal(j) {
                out_of_pair.insert(j);
            }
        }

        let mut updates = Vec::with_capacity(into_pair.len() * out_of_pair.len());
        for &i in &into_pair {
            let sik = self.lookup(i, k, samples);
            let sil = self.lookup(i, l, samples);
            for &j in &out_of_pair {
                let skj = self.lookup(k, j, samples);
                let slj = self.lookup(l, j, samples);
                let numerator = skj.component_mul(&sil).component_mul(&one_minus_slk)
                    + slj.component_mul(&sik).component_mul(&one_minus_skl)
                    + skj.component_mul(&sll).component_mul(&sik)
                    + slj.component_mul(&skk).component_mul(&sil);
                updates.push(((i, j), numerator.component_div(&det)));
            }
        }

        self.entries.retain(|&(i, j), _| !internal(i) && !internal(j));
        for (key, delta) in updates {
            match self.entries.get_mut(&key) {
                Some(existing) => *existing += delta,
                None => {
                    self.entries.insert(key, delta);
                }
            }
        }
        self.ports.remove(&k);
        self.ports.remove(&l);
        trace!("eliminated ports {k} and {l}, {} entries remain", self.entries.len());
        Ok(())
    }
}

fn merged(network: usize) -> ScatterError {
    ScatterError::Computation(format!("network {network} was already merged"))
}

impl Backend for FilipssonGunnarBackend {
    fn name(&self) -> &str {
        FG_BACKEND
    }

    fn evaluate_circuit(
        &self,
        analyzed: &AnalyzedCircuit,
        instances: &BTreeMap<String, SMatrix>,
    ) -> Result<SMatrix> {
        analyzed.ensure_backend(self.name())?;
        let batch = analyzed.common_batch(instances)?;
        let samples = batch.len();

        let mut owner = vec![0usize; analyzed.num_ports];
        let mut networks: Vec<Option<Network>> = Vec::with_capacity(analyzed.instances.len());
        for (slot, s) in analyzed.instance_matrices(instances)? {
            let index = networks.len();
            let mut network = Network::default();
            for id in slot.offset..slot.offset + slot.ports.len() {
                owner[id] = index;
                network.ports.insert(id);
            }
            for ((a, b), v) in s.to_dict().iter() {
                let (i, j) = match (slot.global(a), slot.global(b)) {
                    (Some(i), Some(j)) => (i, j),
                    _ => {
                        return Err(ScatterError::config(format!(
                            "S-matrix entry ({a}, {b}) names a port the model does not declare"
                        )));
                    }
                };
                network.entries.insert((i, j), broadcast_value(v, samples)?);
            }
            networks.push(Some(network));
        }

        for &(k, l) in &analyzed.connections {
            let (nk, nl) = (owner[k], owner[l]);
            if nk != nl {
                let moved = networks[nl].take().ok_or_else(|| merged(nl))?;
                for &p in &moved.ports {
                    owner[p] = nk;
                }
                networks[nk].as_mut().ok_or_else(|| merged(nk))?.absorb(moved);
            }
            networks[nk]
                .as_mut()
                .ok_or_else(|| merged(nk))?
                .interconnect(k, l, samples)?;
        }

        let columns = analyzed.external_columns();
        let name = |id: usize| columns[id].and_then(|e| analyzed.external.name(e));
        let mut result = SDict::new(batch);
        for network in networks.into_iter().flatten() {
            for ((i, j), v) in network.entries {
                if let (Some(a), Some(b)) = (name(i), name(j)) {
                    result.insert(a, b, v)?;
                }
            }
        }
        Ok(result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn scalar(v: Complex64) -> SValue {
        DVector::from_element(1, v)
    }

    #[test]
    fn cascading_two_transmissions_multiplies() {
        // ports: 0 -> 1 (t1), then 2 -> 3 (t2); connect 1 and 2
        let mut net = Network::default();
        net.ports.extend([0, 1, 2, 3]);
        net.entries.insert((0, 1), scalar(c(0.5, 0.0)));
        net.entries.insert((1, 0), scalar(c(0.5, 0.0)));
        net.entries.insert((2, 3), scalar(c(0.0, 0.8)));
        net.entries.insert((3, 2), scalar(c(0.0, 0.8)));

        net.interconnect(1, 2, 1).unwrap();
        assert_eq!(net.ports, BTreeSet::from([0, 3]));
        let t = net.lookup(0, 3, 1)[0];
        assert!((t - c(0.0, 0.4)).norm() < 1e-12);
        assert_eq!(net.lookup(3, 0, 1)[0], t);
    }

    #[test]
    fn reflection_at_junction_builds_cavity() {
        // mirror (reflection r at port 1) facing another mirror across a link
        let r = 0.5;
        let mut net = Network::default();
        net.ports.extend([0, 1, 2, 3]);
        net.entries.insert((1, 1), scalar(c(r, 0.0)));
        net.entries.insert((0, 1), scalar(c(0.5, 0.0)));
        net.entries.insert((1, 0), scalar(c(0.5, 0.0)));
        net.entries.insert((2, 2), scalar(c(r, 0.0)));
        net.entries.insert((2, 3), scalar(c(0.5, 0.0)));
        net.entries.insert((3, 2), scalar(c(0.5, 0.0)));

        net.interconnect(1, 2, 1).unwrap();
        // Fabry-Perot: t = t1 t2 / (1 - r1 r2)
        let expected = 0.25 / (1.0 - r * r);
        assert!((net.lookup(0, 3, 1)[0] - c(expected, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn singular_loop_is_a_computation_error() {
        let mut net = Network::default();
        net.ports.extend([0, 1]);
        net.entries.insert((0, 1), scalar(c(1.0, 0.0)));
        let err = net.interconnect(0, 1, 1).unwrap_err();
        assert!(matches!(err, ScatterError::Computation(_)));
    }
}
