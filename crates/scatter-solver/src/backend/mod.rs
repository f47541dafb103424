//! Circuit backends.
//!
//! Each backend implements the three-stage protocol of [`Backend`]:
//! analyze the instances, plan the circuit, evaluate it. All three stages of
//! one evaluation must come from the same backend.
//!
//! # Backends
//!
//! - **filipsson_gunnar** (alias `fg`): pairwise network reduction over
//!   sparse dictionaries. Pure Rust, always available.
//! - **additive**: sums transmissions over every path between exposed ports.
//!   Exact only for circuits without feedback loops.
//! - **lapack** (optional, `--features lapack`, on by default): assembles the
//!   whole circuit as one linear system and solves it with LAPACK.
//!
//! # Architecture
//!
//! ```text
//! Netlist + Models
//!         │
//!         ▼
//! analyze_instances  (port maps)
//!         │
//!         ▼
//! analyze_circuit    (global indices, elimination plan)
//!         │
//!         ▼
//! evaluate_circuit   (per-instance S-matrices in, circuit S-matrix out)
//!    ┌────┼─────────┐
//!    ▼    ▼         ▼
//!   FG  additive  LAPACK
//! ```

pub mod additive;
pub mod fg;
#[cfg(feature = "lapack")]
pub mod lapack;
pub mod registry;
pub mod traits;

pub use additive::AdditiveBackend;
pub use fg::FilipssonGunnarBackend;
#[cfg(feature = "lapack")]
pub use lapack::LapackBackend;
pub use registry::{
    BackendRegistry, DEFAULT_BACKEND, accelerated_backend, get_backend, init_registry, registry,
};
pub use traits::*;
