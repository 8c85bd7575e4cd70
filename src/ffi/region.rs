//! Region extraction and import FFI functions.

use tracing::warn;

use crate::automaton::Region;
use crate::state::Simulation;

/// Bytes covered by the box, or `None` if no slice can be that long.
fn region_len(min: [i32; 3], max: [i32; 3]) -> Option<usize> {
    (0..3)
        .try_fold(1usize, |len, axis| {
            let extent = usize::try_from((max[axis] as i64 - min[axis] as i64).max(0)).ok()?;
            len.checked_mul(extent)
        })
        .filter(|&len| len <= isize::MAX as usize)
}

/// Extracts a box of cells from the active buffer into a flat output buffer.
///
/// # Layout
/// The buffer is filled in z,y,x order (z changes slowest, x changes fastest).
/// This matches the layout expected by `va_import_region`. The box is
/// clamped to the grid.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
/// - `out_buf` must point to a buffer with at least
///   `(max_x - min_x) * (max_y - min_y) * (max_z - min_z)` bytes
///
/// # Returns
/// Number of bytes written, or 0 on error.
#[no_mangle]
pub unsafe extern "C" fn va_extract_region(
    ptr: *const Simulation,
    out_buf: *mut u8,
    min_x: i32,
    min_y: i32,
    min_z: i32,
    max_x: i32,
    max_y: i32,
    max_z: i32,
) -> u64 {
    if ptr.is_null() || out_buf.is_null() {
        return 0;
    }

    let region = Region::new([min_x, min_y, min_z], [max_x, max_y, max_z]);
    let Some(len) = region_len(region.min, region.max) else {
        warn!("va_extract_region: box size overflows");
        return 0;
    };
    let buf_slice = std::slice::from_raw_parts_mut(out_buf, len);
    (*ptr).extract_region(buf_slice, region) as u64
}

/// Imports a box of cells from a flat buffer into the active buffer.
///
/// # Layout
/// The buffer is expected to be in z,y,x order (matching `va_extract_region`).
/// Input values are normalized: 0 = dead, non-zero = alive.
///
/// # Safety
/// - `ptr` must be a valid pointer to a Simulation, or null
/// - `in_buf` must point to a buffer with at least
///   `(max_x - min_x) * (max_y - min_y) * (max_z - min_z)` bytes
///
/// # Returns
/// Number of bytes read, or 0 on error or while a step is in flight.
#[no_mangle]
pub unsafe extern "C" fn va_import_region(
    ptr: *mut Simulation,
    in_buf: *const u8,
    min_x: i32,
    min_y: i32,
    min_z: i32,
    max_x: i32,
    max_y: i32,
    max_z: i32,
) -> u64 {
    if ptr.is_null() || in_buf.is_null() {
        return 0;
    }

    let region = Region::new([min_x, min_y, min_z], [max_x, max_y, max_z]);
    let Some(len) = region_len(region.min, region.max) else {
        warn!("va_import_region: box size overflows");
        return 0;
    };
    let buf_slice = std::slice::from_raw_parts(in_buf, len);
    match (*ptr).import_region(buf_slice, region) {
        Ok(read) => read as u64,
        Err(err) => {
            warn!(%err, "va_import_region refused");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{grid, lifecycle};
    use std::ptr;

    #[test]
    fn test_extract_region() {
        unsafe {
            let sim = lifecycle::va_create(8, 48);
            grid::va_set_cell(sim, 2, 2, 2, 1);
            grid::va_set_cell(sim, 3, 2, 2, 1);

            let mut buffer = vec![0u8; 64];
            let bytes = va_extract_region(sim, buffer.as_mut_ptr(), 2, 2, 2, 6, 6, 6);

            assert_eq!(bytes, 64);
            assert_eq!(buffer[0], 1);
            assert_eq!(buffer[1], 1);
            // Seeded centroid at (3,3,3).
            assert_eq!(buffer[1 + 4 + 16], 1);
            assert_eq!(buffer.iter().filter(|&&c| c != 0).count(), 3);

            lifecycle::va_destroy(sim);
        }
    }

    #[test]
    fn test_import_region() {
        unsafe {
            let sim = lifecycle::va_create(8, 48);

            let mut buffer = vec![0u8; 64];
            buffer[0] = 1;
            buffer[1] = 9;

            let bytes = va_import_region(sim, buffer.as_ptr(), 2, 2, 2, 6, 6, 6);

            assert_eq!(bytes, 64);
            assert_eq!(grid::va_get_cell(sim, 2, 2, 2), 1);
            assert_eq!(grid::va_get_cell(sim, 3, 2, 2), 1);
            // The seeded centroid was inside the box and got cleared.
            assert_eq!(grid::va_live_count(sim), 2);

            lifecycle::va_destroy(sim);
        }
    }

    #[test]
    fn test_inverted_box_is_empty() {
        unsafe {
            let sim = lifecycle::va_create(8, 48);
            let mut buffer = vec![0u8; 8];
            assert_eq!(va_extract_region(sim, buffer.as_mut_ptr(), 4, 4, 4, 2, 2, 2), 0);
            lifecycle::va_destroy(sim);
        }
    }

    #[test]
    fn test_extreme_bounds_return_zero() {
        unsafe {
            let sim = lifecycle::va_create(8, 48);
            let mut buffer = vec![0u8; 64];
            let (lo, hi) = (i32::MIN, i32::MAX);

            assert_eq!(va_extract_region(sim, buffer.as_mut_ptr(), lo, lo, lo, hi, hi, hi), 0);
            assert_eq!(va_import_region(sim, buffer.as_ptr(), lo, lo, lo, hi, hi, hi), 0);
            assert_eq!(grid::va_live_count(sim), 1);

            lifecycle::va_destroy(sim);
        }
    }

    #[test]
    fn test_region_len() {
        assert_eq!(region_len([2; 3], [6; 3]), Some(64));
        assert_eq!(region_len([4; 3], [2; 3]), Some(0));
        assert_eq!(region_len([i32::MIN; 3], [i32::MAX; 3]), None);
        assert_eq!(region_len([i32::MIN, i32::MIN, 0], [i32::MAX, i32::MAX, 1]), None);
    }

    #[test]
    fn test_null_pointer_handling() {
        unsafe {
            let mut buffer = vec![0u8; 64];

            assert_eq!(
                va_extract_region(ptr::null(), buffer.as_mut_ptr(), 0, 0, 0, 4, 4, 4),
                0
            );
            assert_eq!(
                va_import_region(ptr::null_mut(), buffer.as_ptr(), 0, 0, 0, 4, 4, 4),
                0
            );

            let sim = lifecycle::va_create(8, 48);
            assert_eq!(va_extract_region(sim, ptr::null_mut(), 0, 0, 0, 4, 4, 4), 0);
            assert_eq!(va_import_region(sim, ptr::null(), 0, 0, 0, 4, 4, 4), 0);
            lifecycle::va_destroy(sim);
        }
    }
}
