//! Queued configuration changes and restart.
//!
//! Queued changes are not checked until `va_restart`, which applies them all
//! or none.

use std::ffi::{c_char, CStr};

use tracing::warn;

use crate::config::{ConfigChange, RuleCategory};
use crate::neighborhood::NeighborhoodKind;
use crate::state::Simulation;

fn category_from_u8(category: u8) -> Option<RuleCategory> {
    match category {
        0 => Some(RuleCategory::Main),
        1 => Some(RuleCategory::Edges),
        2 => Some(RuleCategory::Corners),
        _ => None,
    }
}

unsafe fn str_arg<'a>(text: *const c_char) -> Option<&'a str> {
    if text.is_null() {
        return None;
    }
    CStr::from_ptr(text).to_str().ok()
}

/// Queues new born and survive rule strings for one category
/// (0 = main, 1 = edges, 2 = corners). A null string leaves that side
/// unchanged.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
/// - `born` and `survive` must be valid NUL-terminated strings, or null
///
/// # Returns
/// 0 on success, 1 on a null `ptr`, an unknown category or non-UTF-8 text.
#[no_mangle]
pub unsafe extern "C" fn va_queue_rules(
    ptr: *mut Simulation,
    category: u8,
    born: *const c_char,
    survive: *const c_char,
) -> i32 {
    if ptr.is_null() {
        return 1;
    }
    let Some(category) = category_from_u8(category) else {
        return 1;
    };
    let born_str = str_arg(born);
    let survive_str = str_arg(survive);
    if (!born.is_null() && born_str.is_none()) || (!survive.is_null() && survive_str.is_none()) {
        return 1;
    }

    let sim = &mut *ptr;
    if let Some(rule) = born_str {
        sim.queue_change(ConfigChange::BornRule(category, rule.to_string()));
    }
    if let Some(rule) = survive_str {
        sim.queue_change(ConfigChange::SurviveRule(category, rule.to_string()));
    }
    0
}

/// Queues a neighborhood change. Accepts names like `moore_2d` or labels
/// like `moore 2D`.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
/// - `name` must be a valid NUL-terminated string, or null
///
/// # Returns
/// 0 on success, 1 on a null argument, -1 for an unknown name.
#[no_mangle]
pub unsafe extern "C" fn va_queue_neighborhood(ptr: *mut Simulation, name: *const c_char) -> i32 {
    if ptr.is_null() {
        return 1;
    }
    let Some(name) = str_arg(name) else {
        return 1;
    };

    match name.parse::<NeighborhoodKind>() {
        Ok(kind) => {
            (*ptr).queue_change(ConfigChange::Neighborhood(kind));
            0
        }
        Err(err) => {
            warn!(%err, "va_queue_neighborhood rejected");
            -1
        }
    }
}

/// Queues a new cube side length.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// 0 on success, 1 if ptr is null.
#[no_mangle]
pub unsafe extern "C" fn va_queue_grid_size(ptr: *mut Simulation, grid_size: u32) -> i32 {
    if ptr.is_null() {
        return 1;
    }
    (*ptr).queue_change(ConfigChange::GridSize(grid_size));
    0
}

/// Queues enabling (non-zero) or disabling (0) mixed-neighborhood mode.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// 0 on success, 1 if ptr is null.
#[no_mangle]
pub unsafe extern "C" fn va_queue_mixed(ptr: *mut Simulation, mixed: u8) -> i32 {
    if ptr.is_null() {
        return 1;
    }
    (*ptr).queue_change(ConfigChange::Mixed(mixed != 0));
    0
}

/// Changes the step duration immediately, without a restart.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// 0 on success, 1 if ptr is null, -1 if the duration is 0.
#[no_mangle]
pub unsafe extern "C" fn va_set_step_duration(ptr: *mut Simulation, step_duration_ms: u32) -> i32 {
    if ptr.is_null() {
        return 1;
    }
    match (*ptr).set_step_duration(step_duration_ms) {
        Ok(()) => 0,
        Err(err) => {
            warn!(%err, "va_set_step_duration rejected");
            -1
        }
    }
}

/// Applies every queued change and reseeds the grid.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// 0 on success, 1 if ptr is null, -1 if the changes were rejected. On
/// rejection the simulation keeps its previous configuration and grid.
#[no_mangle]
pub unsafe extern "C" fn va_restart(ptr: *mut Simulation) -> i32 {
    if ptr.is_null() {
        return 1;
    }
    match (*ptr).restart() {
        Ok(()) => 0,
        Err(err) => {
            warn!(%err, "va_restart rejected");
            -1
        }
    }
}
