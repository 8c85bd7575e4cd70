//! C ABI for hosts and renderers.
//!
//! Every function here is a thin wrapper over `Simulation`: it checks
//! pointers, converts C values and maps errors to sentinel return values.
//! Errors are logged through `tracing` before being flattened.
//!
//! Status codes: `0` success, `1` null pointer or bad argument, `-1` the
//! operation itself failed.

pub mod config;
pub mod grid;
pub mod lifecycle;
pub mod region;

pub use config::{
    va_queue_grid_size, va_queue_mixed, va_queue_neighborhood, va_queue_rules, va_restart,
    va_set_step_duration,
};
pub use grid::{va_active_words, va_dims, va_get_cell, va_live_count, va_set_cell};
pub use lifecycle::{
    va_create, va_create_from_toml, va_destroy, va_get_step_index, va_step, va_tick,
    va_tick_budgeted,
};
pub use region::{va_extract_region, va_import_region};
