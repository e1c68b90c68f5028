//! Deterministic simulation testing for the B-tree.
//!
//! Drives trees through seeded random operation sequences and compares every
//! observable result against a `BTreeSet` model:
//! - Reproducible random operations (insert, delete, min/max removal, clear)
//! - Clones taken mid-run, each tracked against its own copy of the model
//! - Structural invariant checking after each operation
//!
//! # Usage
//!
//! ```ignore
//! use simulation::simulator::{Simulator, SimulatorConfig};
//!
//! let mut sim = Simulator::new(SimulatorConfig::new(12345).with_degree(2));
//! let result = sim.run(1000);
//!
//! assert!(result.passed(), "{:?}", result.invariant_violations);
//! ```

mod invariants;

pub use invariants::check_tree;
