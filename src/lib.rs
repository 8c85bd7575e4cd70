//! Cubic Automata - 3D Cellular Automata Library
//!
//! Simulates a binary cellular automaton on a toroidal cubic lattice.
//! Birth and survival rules are compiled from strings like `"1,3"` or
//! `"0-6"`, cells are stored bit-packed in two buffers, and steps are paced
//! against host time independently of how often the host polls or redraws.
//!
//! `Simulation` is the entry point for hosts; `ffi` exposes it over a C ABI.
//! The `automaton` module holds the pieces it is built from, usable on their
//! own.

pub mod arena;
pub mod automaton;
pub mod config;
pub mod error;
pub mod ffi;
pub mod neighborhood;
pub mod rules;
pub mod state;

pub use automaton::{Dims, GridStore, SeedPolicy, StepController, StepScheduler};
pub use config::{ConfigChange, RuleCategory, SimConfig};
pub use error::{AutomatonError, Result};
pub use neighborhood::{offsets_for, NeighborhoodKind};
pub use rules::{compile, CountSet, InvertedRange, RuleTable};
pub use state::{Simulation, StepProgress};
