//! The three interchangeable scattering-matrix encodings.
//!
//! - [`SDict`]: sparse-by-key, `(from, to) -> value`. Missing pairs are zero.
//! - [`SCoo`]: coordinate triplets over a [`PortMap`], with one row of
//!   values per sample (`samples x nnz`).
//! - [`SDense`]: one full matrix per sample, indexed through a [`PortMap`].
//!
//! Entry `(a, b)` is the transmission from port `a` to port `b`; in the
//! indexed encodings it lives at row `index(a)`, column `index(b)`. Every
//! value carries `batch.len()` samples.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::batch::Batch;
use crate::error::{Result, ScatterError};
use crate::port::Port;

/// A complex amplitude sampled over the batch axis.
pub type SValue = DVector<Complex64>;

/// Bijection between port names and matrix indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortMap {
    names: Vec<Port>,
    index: BTreeMap<Port, usize>,
}

impl PortMap {
    /// Build a port map assigning indices in iteration order.
    pub fn new<I, P>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<Port>,
    {
        let mut map = PortMap::default();
        for name in names {
            let name = name.into();
            if map.index.contains_key(&name) {
                return Err(ScatterError::config(format!("duplicate port '{name}'")));
            }
            map.index.insert(name.clone(), map.names.len());
            map.names.push(name);
        }
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Port names ordered by index.
    pub fn names(&self) -> &[Port] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.names.iter().enumerate().map(|(i, n)| (n.as_str(), i))
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| ScatterError::config(format!("port '{name}' is not in the port map")))
    }
}

/// Broadcast a value to `samples` samples.
pub fn broadcast_value(value: &SValue, samples: usize) -> Result<SValue> {
    match value.len() {
        n if n == samples => Ok(value.clone()),
        1 => Ok(DVector::from_element(samples, value[0])),
        n => Err(ScatterError::Shape(format!(
            "value with {n} samples cannot be broadcast to {samples}"
        ))),
    }
}

fn is_zero(value: &SValue) -> bool {
    value.iter().all(|v| *v == Complex64::new(0.0, 0.0))
}

/// Sparse-by-key scattering matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SDict {
    batch: Batch,
    entries: BTreeMap<(Port, Port), SValue>,
}

impl SDict {
    pub fn new(batch: Batch) -> Self {
        Self {
            batch,
            entries: BTreeMap::new(),
        }
    }

    pub fn batch(&self) -> Batch {
        self.batch
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a sampled value, broadcasting single samples to the batch.
    pub fn insert(
        &mut self,
        from: impl Into<Port>,
        to: impl Into<Port>,
        value: SValue,
    ) -> Result<()> {
        let value = broadcast_value(&value, self.batch.len())?;
        self.entries.insert((from.into(), to.into()), value);
        Ok(())
    }

    /// Insert a value that is the same for every sample.
    pub fn insert_constant(
        &mut self,
        from: impl Into<Port>,
        to: impl Into<Port>,
        value: Complex64,
    ) {
        let value = DVector::from_element(self.batch.len(), value);
        self.entries.insert((from.into(), to.into()), value);
    }

    pub fn get(&self, from: &str, to: &str) -> Option<&SValue> {
        self.entries.get(&(from.to_string(), to.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Port, Port), &SValue)> {
        self.entries.iter()
    }

    /// Every port named by at least one entry, sorted.
    pub fn ports(&self) -> BTreeSet<Port> {
        self.entries
            .keys()
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect()
    }

    /// Mirror every `(a, b)` entry to `(b, a)`.
    ///
    /// Entries that are already present on both sides keep their own value.
    pub fn reciprocal(mut self) -> Self {
        let mirrored: Vec<_> = self
            .entries
            .iter()
            .map(|((a, b), v)| ((b.clone(), a.clone()), v.clone()))
            .collect();
        for (key, value) in mirrored {
            self.entries.entry(key).or_insert(value);
        }
        self
    }

    pub fn to_coo(&self) -> SCoo {
        let ports = sorted_port_map(self.ports());
        let mut rows = Vec::with_capacity(self.entries.len());
        let mut cols = Vec::with_capacity(self.entries.len());
        let mut values = DMatrix::zeros(self.batch.len(), self.entries.len());
        for (n, ((a, b), v)) in self.entries.iter().enumerate() {
            rows.push(ports.index[a]);
            cols.push(ports.index[b]);
            values.set_column(n, v);
        }
        SCoo {
            batch: self.batch,
            rows,
            cols,
            values,
            ports,
        }
    }

    pub fn to_dense(&self) -> SDense {
        let ports = sorted_port_map(self.ports());
        let n = ports.len();
        let mut matrices = vec![DMatrix::zeros(n, n); self.batch.len()];
        for ((a, b), v) in &self.entries {
            let (i, j) = (ports.index[a], ports.index[b]);
            for (s, m) in matrices.iter_mut().enumerate() {
                m[(i, j)] = v[s];
            }
        }
        SDense {
            batch: self.batch,
            matrices,
            ports,
        }
    }
}

fn sorted_port_map(ports: BTreeSet<Port>) -> PortMap {
    let mut map = PortMap::default();
    for (i, p) in ports.into_iter().enumerate() {
        map.index.insert(p.clone(), i);
        map.names.push(p);
    }
    map
}

/// Coordinate (triplet) scattering matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SCoo {
    batch: Batch,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: DMatrix<Complex64>,
    ports: PortMap,
}

impl SCoo {
    /// `values` holds one row per sample and one column per triplet.
    pub fn new(
        batch: Batch,
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: DMatrix<Complex64>,
        ports: PortMap,
    ) -> Result<Self> {
        let nnz = rows.len();
        if cols.len() != nnz || values.ncols() != nnz {
            return Err(ScatterError::Shape(format!(
                "coordinate arrays disagree: {} rows, {} cols, {} values",
                nnz,
                cols.len(),
                values.ncols()
            )));
        }
        if values.nrows() != batch.len() {
            return Err(ScatterError::Shape(format!(
                "{} value samples for a batch of {}",
                values.nrows(),
                batch.len()
            )));
        }
        if let Some(bad) = rows.iter().chain(&cols).find(|&&i| i >= ports.len()) {
            return Err(ScatterError::Shape(format!(
                "index {bad} out of range for {} ports",
                ports.len()
            )));
        }
        Ok(Self {
            batch,
            rows,
            cols,
            values,
            ports,
        })
    }

    pub fn batch(&self) -> Batch {
        self.batch
    }

    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Values laid out `samples x nnz`.
    pub fn values(&self) -> &DMatrix<Complex64> {
        &self.values
    }

    pub fn ports(&self) -> &PortMap {
        &self.ports
    }

    /// Value of the `n`-th triplet across all samples.
    pub fn value(&self, n: usize) -> SValue {
        self.values.column(n).into_owned()
    }

    /// Triplets as `(row, col, value)`, in storage order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, SValue)> + '_ {
        (0..self.nnz()).map(move |n| (self.rows[n], self.cols[n], self.value(n)))
    }

    pub fn to_dict(&self) -> SDict {
        let mut dict = SDict::new(self.batch);
        for (i, j, v) in self.triplets() {
            let key = (self.ports.names[i].clone(), self.ports.names[j].clone());
            match dict.entries.get_mut(&key) {
                Some(existing) => *existing += v,
                None => {
                    dict.entries.insert(key, v);
                }
            }
        }
        dict
    }

    pub fn to_dense(&self) -> SDense {
        let n = self.ports.len();
        let mut matrices = vec![DMatrix::zeros(n, n); self.batch.len()];
        for (t, (&i, &j)) in self.rows.iter().zip(&self.cols).enumerate() {
            for (s, m) in matrices.iter_mut().enumerate() {
                m[(i, j)] += self.values[(s, t)];
            }
        }
        SDense {
            batch: self.batch,
            matrices,
            ports: self.ports.clone(),
        }
    }
}

/// Dense scattering matrix, one square matrix per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SDense {
    batch: Batch,
    matrices: Vec<DMatrix<Complex64>>,
    ports: PortMap,
}

impl SDense {
    pub fn new(batch: Batch, matrices: Vec<DMatrix<Complex64>>, ports: PortMap) -> Result<Self> {
        if matrices.len() != batch.len() {
            return Err(ScatterError::Shape(format!(
                "{} matrices for a batch of {}",
                matrices.len(),
                batch.len()
            )));
        }
        let n = ports.len();
        if let Some(m) = matrices.iter().find(|m| m.shape() != (n, n)) {
            return Err(ScatterError::Shape(format!(
                "matrix of shape {:?} does not match {n} ports",
                m.shape()
            )));
        }
        Ok(Self {
            batch,
            matrices,
            ports,
        })
    }

    pub fn batch(&self) -> Batch {
        self.batch
    }

    pub fn matrices(&self) -> &[DMatrix<Complex64>] {
        &self.matrices
    }

    pub fn ports(&self) -> &PortMap {
        &self.ports
    }

    /// Non-zero entries only; a pair that is zero for every sample is omitted.
    pub fn to_dict(&self) -> SDict {
        let mut dict = SDict::new(self.batch);
        let n = self.ports.len();
        for i in 0..n {
            for j in 0..n {
                let v = DVector::from_iterator(
                    self.matrices.len(),
                    self.matrices.iter().map(|m| m[(i, j)]),
                );
                if !is_zero(&v) {
                    let key = (self.ports.names[i].clone(), self.ports.names[j].clone());
                    dict.entries.insert(key, v);
                }
            }
        }
        dict
    }

    pub fn to_coo(&self) -> SCoo {
        let n = self.ports.len();
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut columns = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let v = DVector::from_iterator(
                    self.matrices.len(),
                    self.matrices.iter().map(|m| m[(i, j)]),
                );
                if !is_zero(&v) {
                    rows.push(i);
                    cols.push(j);
                    columns.push(v);
                }
            }
        }
        let mut values = DMatrix::zeros(self.batch.len(), columns.len());
        for (t, v) in columns.iter().enumerate() {
            values.set_column(t, v);
        }
        SCoo {
            batch: self.batch,
            rows,
            cols,
            values,
            ports: self.ports.clone(),
        }
    }
}

/// A scattering matrix in any one of the three encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum SMatrix {
    Dict(SDict),
    Coo(SCoo),
    Dense(SDense),
}

impl SMatrix {
    pub fn batch(&self) -> Batch {
        match self {
            SMatrix::Dict(s) => s.batch(),
            SMatrix::Coo(s) => s.batch(),
            SMatrix::Dense(s) => s.batch(),
        }
    }

    pub fn to_dict(&self) -> SDict {
        match self {
            SMatrix::Dict(s) => s.clone(),
            SMatrix::Coo(s) => s.to_dict(),
            SMatrix::Dense(s) => s.to_dict(),
        }
    }

    pub fn to_coo(&self) -> SCoo {
        match self {
            SMatrix::Dict(s) => s.to_coo(),
            SMatrix::Coo(s) => s.clone(),
            SMatrix::Dense(s) => s.to_coo(),
        }
    }

    pub fn to_dense(&self) -> SDense {
        match self {
            SMatrix::Dict(s) => s.to_dense(),
            SMatrix::Coo(s) => s.to_dense(),
            SMatrix::Dense(s) => s.clone(),
        }
    }

    /// Ports known to this matrix. For a dict these are only the ports that
    /// appear in some entry.
    pub fn ports(&self) -> Vec<Port> {
        match self {
            SMatrix::Dict(s) => s.ports().into_iter().collect(),
            SMatrix::Coo(s) => s.ports().names().to_vec(),
            SMatrix::Dense(s) => s.ports().names().to_vec(),
        }
    }

    /// Value of `(from, to)`; pairs that are not stored are zero.
    pub fn value(&self, from: &str, to: &str) -> Result<SValue> {
        let zeros = || DVector::zeros(self.batch().len());
        match self {
            SMatrix::Dict(s) => Ok(s.get(from, to).cloned().unwrap_or_else(zeros)),
            SMatrix::Coo(s) => {
                let (i, j) = (s.ports.require(from)?, s.ports.require(to)?);
                let mut total = zeros();
                for (r, c, v) in s.triplets() {
                    if r == i && c == j {
                        total += v;
                    }
                }
                Ok(total)
            }
            SMatrix::Dense(s) => {
                let (i, j) = (s.ports.require(from)?, s.ports.require(to)?);
                Ok(DVector::from_iterator(
                    s.matrices.len(),
                    s.matrices.iter().map(|m| m[(i, j)]),
                ))
            }
        }
    }
}

impl From<SDict> for SMatrix {
    fn from(s: SDict) -> Self {
        SMatrix::Dict(s)
    }
}

impl From<SCoo> for SMatrix {
    fn from(s: SCoo) -> Self {
        SMatrix::Coo(s)
    }
}

impl From<SDense> for SMatrix {
    fn from(s: SDense) -> Self {
        SMatrix::Dense(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn coupler_dict() -> SDict {
        let mut s = SDict::new(Batch::Scalar);
        s.insert_constant("in0", "out0", c(0.8_f64.sqrt(), 0.0));
        s.insert_constant("in0", "out1", c(0.0, 0.2_f64.sqrt()));
        s.insert_constant("in1", "out0", c(0.0, 0.2_f64.sqrt()));
        s.insert_constant("in1", "out1", c(0.8_f64.sqrt(), 0.0));
        s.reciprocal()
    }

    #[test]
    fn port_map_rejects_duplicates() {
        assert!(PortMap::new(["a", "b", "a"]).is_err());
        let pm = PortMap::new(["a", "b"]).unwrap();
        assert_eq!(pm.index_of("b"), Some(1));
        assert_eq!(pm.name(0), Some("a"));
        assert_eq!(pm.index_of("z"), None);
    }

    #[test]
    fn reciprocal_mirrors_entries() {
        let s = coupler_dict();
        assert_eq!(s.len(), 8);
        assert_eq!(s.get("out1", "in0"), s.get("in0", "out1"));
    }

    #[test]
    fn dict_coo_dense_agree() {
        let dict = coupler_dict();
        let coo = dict.to_coo();
        let dense = dict.to_dense();
        assert_eq!(coo.nnz(), 8);
        assert_eq!(dense.ports(), coo.ports());

        for ((a, b), v) in dict.iter() {
            let i = dense.ports().index_of(a).unwrap();
            let j = dense.ports().index_of(b).unwrap();
            assert!((dense.matrices()[0][(i, j)] - v[0]).norm() < 1e-15);
        }

        // Omitted pairs are exact zeros in the dense form.
        let i = dense.ports().index_of("in0").unwrap();
        let j = dense.ports().index_of("in1").unwrap();
        assert_eq!(dense.matrices()[0][(i, j)], c(0.0, 0.0));

        assert_eq!(coo.to_dict(), dict);
        assert_eq!(dense.to_dict(), dict);
        assert_eq!(dense.to_coo().to_dict(), dict);
    }

    #[test]
    fn coo_validates_shapes() {
        let pm = PortMap::new(["a", "b"]).unwrap();
        let values = DMatrix::from_element(1, 1, c(1.0, 0.0));
        assert!(SCoo::new(Batch::Scalar, vec![0], vec![1], values.clone(), pm.clone()).is_ok());
        assert!(SCoo::new(Batch::Scalar, vec![0], vec![2], values.clone(), pm.clone()).is_err());
        assert!(SCoo::new(Batch::Samples(3), vec![0], vec![1], values, pm).is_err());
    }

    #[test]
    fn batched_values_broadcast_on_insert() {
        let mut s = SDict::new(Batch::Samples(3));
        s.insert("a", "b", DVector::from_element(1, c(0.5, 0.0))).unwrap();
        assert_eq!(s.get("a", "b").unwrap().len(), 3);
        assert!(s.insert("a", "b", DVector::from_element(2, c(0.5, 0.0))).is_err());
    }

    #[test]
    fn value_lookup_defaults_to_zero() {
        let s = SMatrix::from(coupler_dict().to_coo());
        assert!((s.value("in0", "out0").unwrap()[0].norm() - 0.8_f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.value("in0", "in1").unwrap()[0], c(0.0, 0.0));
        assert!(s.value("in0", "nowhere").is_err());
    }
}
