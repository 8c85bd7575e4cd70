//! Cell access and read-only views of the active buffer.

use tracing::warn;

use crate::state::Simulation;

/// Sets a cell of the active buffer to alive (non-zero) or dead (0).
/// Coordinates wrap around each axis.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// 0 on success, 1 if ptr is null, -1 if a step is in flight.
#[no_mangle]
pub unsafe extern "C" fn va_set_cell(ptr: *mut Simulation, x: i32, y: i32, z: i32, alive: u8) -> i32 {
    if ptr.is_null() {
        return 1;
    }

    match (*ptr).set_cell(x, y, z, alive != 0) {
        Ok(()) => 0,
        Err(err) => {
            warn!(%err, x, y, z, "va_set_cell refused");
            -1
        }
    }
}

/// Gets the state of a cell in the active buffer (0 = dead, 1 = alive).
/// Coordinates wrap around each axis.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// 0 if dead or ptr is null; 1 if alive.
#[no_mangle]
pub unsafe extern "C" fn va_get_cell(ptr: *const Simulation, x: i32, y: i32, z: i32) -> u8 {
    if ptr.is_null() {
        return 0;
    }
    (*ptr).get_cell(x, y, z) as u8
}

/// Writes the grid dimensions to `out_dims[0..3]` as x, y, z.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
/// - `out_dims` must point to at least 3 writable `u32`s, or be null
///
/// # Returns
/// 0 on success, 1 on a null pointer.
#[no_mangle]
pub unsafe extern "C" fn va_dims(ptr: *const Simulation, out_dims: *mut u32) -> i32 {
    if ptr.is_null() || out_dims.is_null() {
        return 1;
    }

    let dims = (*ptr).dims();
    let out = std::slice::from_raw_parts_mut(out_dims, 3);
    out.copy_from_slice(&[dims.x, dims.y, dims.z]);
    0
}

/// Returns the packed words of the active buffer and writes their count to
/// `out_len`.
///
/// Word `x / 32 + y * cols + z * cols * dims.y` holds cell `(x, y, z)` at bit
/// `x % 32`, with `cols = ceil(dims.x / 32)`.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
/// - `out_len` must be writable, or null
/// - The returned pointer is invalidated by the next step, restart or
///   `va_destroy()`
///
/// # Returns
/// The word pointer, or null on a null argument.
#[no_mangle]
pub unsafe extern "C" fn va_active_words(ptr: *const Simulation, out_len: *mut usize) -> *const u32 {
    if ptr.is_null() || out_len.is_null() {
        return std::ptr::null();
    }

    let words = (*ptr).active_words();
    *out_len = words.len();
    words.as_ptr()
}

/// Counts the live cells in the active buffer.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
///
/// # Returns
/// The live count, or 0 if ptr is null.
#[no_mangle]
pub unsafe extern "C" fn va_live_count(ptr: *const Simulation) -> u64 {
    if ptr.is_null() {
        return 0;
    }
    (*ptr).live_count()
}
