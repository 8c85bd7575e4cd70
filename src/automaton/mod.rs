//! Core automaton logic.
//!
//! This module contains the lattice storage, the transition kernel and the
//! step pacing. `crate::state::Simulation` wires them together and the FFI
//! layer in `ffi/` calls into that.

pub mod grid;
pub mod incremental;
pub mod region;
pub mod scheduler;
pub mod stepping;

pub use grid::{Dims, Grid, GridStore, SeedPolicy};
pub use incremental::StepController;
pub use region::{extract_region, import_region, Region};
pub use scheduler::StepScheduler;
pub use stepping::{count_neighbors, next_state, step, step_in_order, step_parallel, RuleSet};
