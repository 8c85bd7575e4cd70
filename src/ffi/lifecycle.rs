//! Simulation creation, destruction, and stepping.

use std::ffi::{c_char, CStr};

use tracing::warn;

use crate::config::SimConfig;
use crate::state::{Simulation, StepProgress};

/// Creates a simulation with default settings, the given cube side and step
/// duration, and returns an opaque pointer.
///
/// # Returns
/// A pointer to a new Simulation, or null if the settings are invalid or the
/// grid can't be allocated.
///
/// # Safety
/// The returned pointer must eventually be freed with `va_destroy()`.
#[no_mangle]
pub extern "C" fn va_create(grid_size: u32, step_duration_ms: u32) -> *mut Simulation {
    let config = SimConfig {
        grid_size,
        step_duration_ms,
        ..SimConfig::default()
    };
    match Simulation::new(config) {
        Ok(sim) => Box::into_raw(Box::new(sim)),
        Err(err) => {
            warn!(%err, "va_create failed");
            std::ptr::null_mut()
        }
    }
}

/// Creates a simulation from a NUL-terminated TOML document.
///
/// # Safety
/// - `text` must be a valid NUL-terminated string, or null
/// - The returned pointer must eventually be freed with `va_destroy()`
///
/// # Returns
/// A pointer to a new Simulation, or null on any error.
#[no_mangle]
pub unsafe extern "C" fn va_create_from_toml(text: *const c_char) -> *mut Simulation {
    if text.is_null() {
        return std::ptr::null_mut();
    }
    let Ok(text) = CStr::from_ptr(text).to_str() else {
        warn!("va_create_from_toml: configuration is not valid UTF-8");
        return std::ptr::null_mut();
    };

    match Simulation::from_toml_str(text) {
        Ok(sim) => Box::into_raw(Box::new(sim)),
        Err(err) => {
            warn!(%err, "va_create_from_toml failed");
            std::ptr::null_mut()
        }
    }
}

/// Destroys a simulation and frees its memory.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `va_create*()`, or null
/// - `ptr` must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn va_destroy(ptr: *mut Simulation) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

/// Gets the number of completed steps since the last restart.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// The step index, or 0 if ptr is null.
#[no_mangle]
pub unsafe extern "C" fn va_get_step_index(ptr: *const Simulation) -> u64 {
    if ptr.is_null() {
        return 0;
    }
    (*ptr).step_index()
}

/// Feeds elapsed host time and runs a whole step if one is due.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// 1 if a step ran, 0 if not, -1 if ptr is null.
#[no_mangle]
pub unsafe extern "C" fn va_tick(ptr: *mut Simulation, elapsed_ms: f64) -> i32 {
    if ptr.is_null() {
        return -1;
    }
    (*ptr).tick(elapsed_ms) as i32
}

/// Feeds elapsed host time and works on the current step for about
/// `budget_us` microseconds.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// 0 if idle, 1 if a step is still in flight, 2 if a step completed,
/// -1 if ptr is null.
#[no_mangle]
pub unsafe extern "C" fn va_tick_budgeted(
    ptr: *mut Simulation,
    elapsed_ms: f64,
    budget_us: u64,
) -> i32 {
    if ptr.is_null() {
        return -1;
    }
    match (*ptr).tick_budgeted(elapsed_ms, budget_us) {
        StepProgress::Idle => 0,
        StepProgress::InFlight => 1,
        StepProgress::Completed => 2,
    }
}

/// Runs one step immediately, ignoring the scheduler.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
#[no_mangle]
pub unsafe extern "C" fn va_step(ptr: *mut Simulation) {
    if ptr.is_null() {
        return;
    }
    (*ptr).step();
}
