//! Region extraction and import, one byte per cell.

use super::grid::Grid;

/// Half-open box `[min, max)` in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl Region {
    pub const fn new(min: [i32; 3], max: [i32; 3]) -> Self {
        Region { min, max }
    }

    /// Clamp to the grid bounds. `None` if nothing is left.
    fn clamp_to(&self, grid: &Grid) -> Option<([i32; 3], [i32; 3])> {
        let dims = grid.dims();
        let limits = [dims.x as i32, dims.y as i32, dims.z as i32];
        let mut min = [0; 3];
        let mut max = [0; 3];
        for axis in 0..3 {
            min[axis] = self.min[axis].clamp(0, limits[axis]);
            max[axis] = self.max[axis].clamp(0, limits[axis]);
            if min[axis] >= max[axis] {
                return None;
            }
        }
        Some((min, max))
    }

    fn volume(min: [i32; 3], max: [i32; 3]) -> usize {
        (0..3).map(|axis| (max[axis] - min[axis]) as usize).product()
    }
}

/// Extract a box of cells into a flat buffer.
///
/// # Layout
/// The buffer is filled in z,y,x order (z changes slowest, x changes fastest).
/// This order matches the order used by `import_region` for symmetry.
/// Coordinates are clamped to the grid, not wrapped.
///
/// # Returns
/// Number of bytes written, or 0 if the region is empty or `out` too small.
pub fn extract_region(grid: &Grid, out: &mut [u8], region: Region) -> usize {
    let Some((min, max)) = region.clamp_to(grid) else {
        return 0;
    };
    if out.len() < Region::volume(min, max) {
        return 0;
    }

    let mut offset = 0;
    for z in min[2]..max[2] {
        for y in min[1]..max[1] {
            for x in min[0]..max[0] {
                out[offset] = grid.get(x, y, z) as u8;
                offset += 1;
            }
        }
    }

    offset
}

/// Import a flat z,y,x ordered buffer into a box of cells.
/// Input values are normalized: 0 = dead, any non-zero = alive.
///
/// # Returns
/// Number of bytes read, or 0 if the region is empty or `input` too short.
pub fn import_region(grid: &mut Grid, input: &[u8], region: Region) -> usize {
    let Some((min, max)) = region.clamp_to(grid) else {
        return 0;
    };
    if input.len() < Region::volume(min, max) {
        return 0;
    }

    let mut offset = 0;
    for z in min[2]..max[2] {
        for y in min[1]..max[1] {
            for x in min[0]..max[0] {
                grid.set(x, y, z, input[offset] != 0);
                offset += 1;
            }
        }
    }

    offset
}
