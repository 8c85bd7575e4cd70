//! Bit-packed, double-buffered toroidal lattice.
//!
//! The X axis is packed 32 cells per `u32` word: cell `(x, y, z)` lives in
//! word `x / 32 + y * cols + z * cols * dims.y` at bit `x % 32`, where
//! `cols = ceil(dims.x / 32)`. Bits past `dims.x` in the last word of a row
//! are padding and always stay zero.

use std::collections::TryReserveError;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AutomatonError, Result};

pub const WORD_BITS: u32 = 32;

/// Largest buffer (in bytes) a single grid may occupy unless overridden.
pub const DEFAULT_MAX_BUFFER_BYTES: u64 = 1 << 30;

/// Side length of the random cluster seeded around the centroid.
pub const CLUSTER_SPAN: i32 = 5;

/// Lattice dimensions in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dims {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Dims { x, y, z }
    }

    pub const fn cube(side: u32) -> Self {
        Dims::new(side, side, side)
    }

    /// Words per X row.
    #[inline]
    pub fn cols(&self) -> usize {
        self.x.div_ceil(WORD_BITS) as usize
    }

    /// Number of X rows, i.e. `dims.y * dims.z`.
    #[inline]
    pub fn rows(&self) -> usize {
        self.y as usize * self.z as usize
    }

    pub fn cell_count(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    /// Total words per buffer, or `None` if it overflows.
    pub fn word_count(&self) -> Option<u64> {
        (self.cols() as u64)
            .checked_mul(self.y as u64)?
            .checked_mul(self.z as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Seed position: `(n - 1) / 2` on every axis, the middle cell for odd
    /// sides and the lower of the two middle cells for even ones.
    pub fn centroid(&self) -> [i32; 3] {
        let mid = |n: u32| (n.saturating_sub(1) / 2) as i32;
        [mid(self.x), mid(self.y), mid(self.z)]
    }

    /// Wrap signed coordinates onto the torus.
    #[inline]
    pub fn wrap(&self, x: i32, y: i32, z: i32) -> (u32, u32, u32) {
        (wrap_axis(x, self.x), wrap_axis(y, self.y), wrap_axis(z, self.z))
    }
}

#[inline]
fn wrap_axis(c: i32, n: u32) -> u32 {
    if c >= 0 && (c as u32) < n {
        c as u32
    } else {
        (c as i64).rem_euclid(n as i64) as u32
    }
}

/// How both buffers are initialised on create/restart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Only the centroid cell is alive.
    #[default]
    SingleCell,
    /// Each cell of a 5x5x5 cube around the centroid is alive with probability 0.5.
    /// `None` draws the seed from OS entropy.
    RandomCluster { seed: Option<u64> },
}

/// One bit-packed buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    dims: Dims,
    cols: usize,
    words: Vec<u32>,
}

impl Grid {
    fn zeroed(dims: Dims, len: usize) -> std::result::Result<Self, TryReserveError> {
        let mut words = Vec::new();
        words.try_reserve_exact(len)?;
        words.resize(len, 0);
        Ok(Grid {
            dims,
            cols: dims.cols(),
            words,
        })
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Word index for in-range coordinates.
    #[inline]
    pub fn word_index(&self, x: u32, y: u32, z: u32) -> usize {
        (x / WORD_BITS) as usize + y as usize * self.cols + z as usize * self.cols * self.dims.y as usize
    }

    /// Read a cell. Coordinates wrap around every axis.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> bool {
        let (x, y, z) = self.dims.wrap(x, y, z);
        (self.words[self.word_index(x, y, z)] >> (x % WORD_BITS)) & 1 != 0
    }

    /// Write a cell. Coordinates wrap around every axis.
    pub fn set(&mut self, x: i32, y: i32, z: i32, alive: bool) {
        let (x, y, z) = self.dims.wrap(x, y, z);
        let idx = self.word_index(x, y, z);
        let mask = 1u32 << (x % WORD_BITS);
        if alive {
            self.words[idx] |= mask;
        } else {
            self.words[idx] &= !mask;
        }
    }

    /// Raw packed words, row by row.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    pub fn live_count(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    fn seed(&mut self, policy: &SeedPolicy) {
        let [cx, cy, cz] = self.dims.centroid();
        match *policy {
            SeedPolicy::SingleCell => self.set(cx, cy, cz, true),
            SeedPolicy::RandomCluster { seed } => {
                let mut rng = match seed {
                    Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                    None => ChaCha8Rng::from_entropy(),
                };
                let reach = CLUSTER_SPAN / 2;
                for dz in -reach..=reach {
                    for dy in -reach..=reach {
                        for dx in -reach..=reach {
                            self.set(cx + dx, cy + dy, cz + dz, rng.gen_bool(0.5));
                        }
                    }
                }
            }
        }
    }
}

/// Two equally sized grids; one is read as the current state while the
/// other receives the next generation.
#[derive(Clone, Debug)]
pub struct GridStore {
    dims: Dims,
    buffers: [Grid; 2],
    step_index: u64,
}

impl GridStore {
    pub fn create(dims: Dims) -> Result<Self> {
        Self::create_with_limit(dims, DEFAULT_MAX_BUFFER_BYTES)
    }

    /// Allocate two zeroed buffers, refusing anything above `limit_bytes` per buffer.
    pub fn create_with_limit(dims: Dims, limit_bytes: u64) -> Result<Self> {
        if dims.is_empty() {
            return Err(AutomatonError::InvalidConfig(format!(
                "grid dimensions must be non-zero, got {}x{}x{}",
                dims.x, dims.y, dims.z
            )));
        }

        if dims.x > i32::MAX as u32 || dims.y > i32::MAX as u32 || dims.z > i32::MAX as u32 {
            return Err(AutomatonError::InvalidConfig(format!(
                "grid axes must not exceed {} cells, got {}x{}x{}",
                i32::MAX,
                dims.x,
                dims.y,
                dims.z
            )));
        }

        let words = dims.word_count().unwrap_or(u64::MAX);
        let bytes = words.saturating_mul(4);
        let too_large = AutomatonError::Allocation {
            words,
            bytes,
            limit: limit_bytes,
        };
        if bytes > limit_bytes {
            return Err(too_large);
        }
        let len = usize::try_from(words).map_err(|_| too_large.clone())?;

        let front = Grid::zeroed(dims, len).map_err(|_| too_large.clone())?;
        let back = Grid::zeroed(dims, len).map_err(|_| too_large)?;

        info!(x = dims.x, y = dims.y, z = dims.z, words, "created grid store");

        Ok(GridStore {
            dims,
            buffers: [front, back],
            step_index: 0,
        })
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    /// Index of the buffer holding the current generation.
    pub fn active_buffer(&self) -> usize {
        (self.step_index % 2) as usize
    }

    /// Index of the buffer the next step writes into.
    pub fn staging_buffer(&self) -> usize {
        1 - self.active_buffer()
    }

    /// # Panics
    /// If `index` is not 0 or 1.
    pub fn buffer(&self, index: usize) -> &Grid {
        &self.buffers[index]
    }

    /// The current generation. Renderers read only this.
    pub fn active(&self) -> &Grid {
        &self.buffers[self.active_buffer()]
    }

    /// The current generation, for edits between steps.
    pub fn active_mut(&mut self) -> &mut Grid {
        let active = self.active_buffer();
        &mut self.buffers[active]
    }

    pub fn set_cell(&mut self, buffer: usize, x: i32, y: i32, z: i32, alive: bool) {
        self.buffers[buffer].set(x, y, z, alive);
    }

    pub fn get_cell(&self, buffer: usize, x: i32, y: i32, z: i32) -> bool {
        self.buffers[buffer].get(x, y, z)
    }

    pub fn live_count(&self) -> u64 {
        self.active().live_count()
    }

    /// Reinitialise both buffers identically and rewind the step index.
    pub fn reset(&mut self, seed: &SeedPolicy) {
        let [first, second] = &mut self.buffers;
        first.clear();
        first.seed(seed);
        second.words.copy_from_slice(&first.words);
        self.step_index = 0;
        debug!(?seed, live = self.buffers[0].live_count(), "grid store reset");
    }

    /// Active buffer to read from and staging buffer to write into.
    pub(crate) fn split_for_step(&mut self) -> (&Grid, &mut Grid) {
        let active = self.active_buffer();
        let [first, second] = &mut self.buffers;
        if active == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        }
    }

    /// Promote the staging buffer. Call only once every staging word is written.
    pub(crate) fn complete_step(&mut self) {
        self.step_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_grid_store() {
        let store = GridStore::create(Dims::cube(64)).unwrap();
        assert_eq!(store.dims(), Dims::cube(64));
        assert_eq!(store.step_index(), 0);
        for buffer in 0..2 {
            assert_eq!(store.buffer(buffer).words().len(), 2 * 64 * 64);
            assert_eq!(store.buffer(buffer).live_count(), 0);
        }
    }

    #[test]
    fn test_word_count_rounds_up_columns() {
        let store = GridStore::create(Dims::new(33, 4, 5)).unwrap();
        assert_eq!(store.active().cols(), 2);
        assert_eq!(store.active().words().len(), 2 * 4 * 5);

        let store = GridStore::create(Dims::cube(8)).unwrap();
        assert_eq!(store.active().words().len(), 64);
    }

    #[test]
    fn test_zero_dims_rejected() {
        assert!(matches!(
            GridStore::create(Dims::new(0, 8, 8)),
            Err(AutomatonError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_allocation_limit() {
        let result = GridStore::create_with_limit(Dims::cube(64), 1024);
        match result {
            Err(AutomatonError::Allocation { words, bytes, limit }) => {
                assert_eq!(words, 2 * 64 * 64);
                assert_eq!(bytes, words * 4);
                assert_eq!(limit, 1024);
            }
            other => panic!("expected allocation error, got {:?}", other.map(|s| s.dims())),
        }

        assert!(GridStore::create(Dims::cube(u32::MAX)).is_err());
    }

    #[test]
    fn test_axis_past_i32_rejected() {
        // Thin enough to fit the byte limit, but not addressable with i32 coordinates.
        for dims in [
            Dims::new(1 << 31, 1, 1),
            Dims::new(1, 1 << 31, 1),
            Dims::new(1, 1, u32::MAX),
        ] {
            assert!(matches!(
                GridStore::create_with_limit(dims, u64::MAX),
                Err(AutomatonError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_word_index_layout() {
        let store = GridStore::create(Dims::cube(64)).unwrap();
        let grid = store.active();
        assert_eq!(grid.word_index(0, 0, 0), 0);
        assert_eq!(grid.word_index(31, 0, 0), 0);
        assert_eq!(grid.word_index(32, 0, 0), 1);
        assert_eq!(grid.word_index(0, 1, 0), 2);
        assert_eq!(grid.word_index(0, 0, 1), 2 * 64);
        assert_eq!(grid.word_index(63, 63, 63), 2 * 64 * 64 - 1);
    }

    #[test]
    fn test_set_get_and_bit_position() {
        let mut store = GridStore::create(Dims::cube(64)).unwrap();
        store.set_cell(0, 37, 2, 3, true);
        assert!(store.get_cell(0, 37, 2, 3));
        assert!(!store.get_cell(1, 37, 2, 3));

        let grid = store.buffer(0);
        assert_eq!(grid.words()[grid.word_index(37, 2, 3)], 1 << 5);

        store.set_cell(0, 37, 2, 3, false);
        assert!(!store.get_cell(0, 37, 2, 3));
        assert_eq!(store.buffer(0).live_count(), 0);
    }

    #[test]
    fn test_set_leaves_neighbouring_bits_alone() {
        let mut store = GridStore::create(Dims::cube(32)).unwrap();
        for x in 0..32 {
            store.set_cell(0, x, 0, 0, true);
        }
        store.set_cell(0, 7, 0, 0, false);
        assert_eq!(store.buffer(0).words()[0], !(1u32 << 7));
    }

    #[test]
    fn test_toroidal_addressing() {
        let mut store = GridStore::create(Dims::cube(32)).unwrap();
        store.set_cell(0, 0, 5, 5, true);
        assert!(store.get_cell(0, 0, 5, 5));
        assert!(store.get_cell(0, 32, 5, 5));
        assert!(store.get_cell(0, -32, 5, 5));
        assert!(store.get_cell(0, 0, 37, -27));

        store.set_cell(0, -1, -1, -1, true);
        assert!(store.get_cell(0, 31, 31, 31));
    }

    #[test]
    fn test_padding_bits_stay_clear() {
        let mut store = GridStore::create(Dims::cube(8)).unwrap();
        store.set_cell(0, 8, 0, 0, true); // wraps to x = 0
        assert_eq!(store.buffer(0).words()[0], 1);
    }

    #[test]
    fn test_active_and_staging_alternate() {
        let mut store = GridStore::create(Dims::cube(8)).unwrap();
        assert_eq!((store.active_buffer(), store.staging_buffer()), (0, 1));
        store.complete_step();
        assert_eq!((store.active_buffer(), store.staging_buffer()), (1, 0));
        store.complete_step();
        assert_eq!((store.active_buffer(), store.staging_buffer()), (0, 1));
    }

    #[test]
    fn test_split_for_step_follows_active() {
        let mut store = GridStore::create(Dims::cube(8)).unwrap();
        store.set_cell(0, 1, 1, 1, true);
        {
            let (read, write) = store.split_for_step();
            assert!(read.get(1, 1, 1));
            write.set(2, 2, 2, true);
        }
        assert!(store.get_cell(1, 2, 2, 2));

        store.complete_step();
        let (read, _) = store.split_for_step();
        assert!(read.get(2, 2, 2));
    }

    #[test]
    fn test_reset_single_cell() {
        let mut store = GridStore::create(Dims::cube(8)).unwrap();
        store.set_cell(1, 0, 0, 0, true);
        store.complete_step();

        store.reset(&SeedPolicy::SingleCell);
        assert_eq!(store.step_index(), 0);
        for buffer in 0..2 {
            assert_eq!(store.buffer(buffer).live_count(), 1);
            assert!(store.get_cell(buffer, 3, 3, 3));
        }
    }

    #[test]
    fn test_reset_random_cluster_is_reproducible_and_local() {
        let dims = Dims::cube(32);
        let mut a = GridStore::create(dims).unwrap();
        let mut b = GridStore::create(dims).unwrap();
        let seed = SeedPolicy::RandomCluster { seed: Some(7) };
        a.reset(&seed);
        b.reset(&seed);

        assert_eq!(a.buffer(0), b.buffer(0));
        assert_eq!(a.buffer(0), a.buffer(1));

        let live = a.live_count();
        assert!(live > 0 && live <= 125, "unexpected cluster population {}", live);

        let [cx, cy, cz] = dims.centroid();
        for z in 0..32 {
            for y in 0..32 {
                for x in 0..32 {
                    if a.get_cell(0, x, y, z) {
                        assert!((x - cx).abs() <= 2 && (y - cy).abs() <= 2 && (z - cz).abs() <= 2);
                    }
                }
            }
        }
    }

    #[test]
    fn test_centroid() {
        assert_eq!(Dims::cube(8).centroid(), [3, 3, 3]);
        assert_eq!(Dims::cube(64).centroid(), [31, 31, 31]);
        assert_eq!(Dims::new(1, 3, 5).centroid(), [0, 1, 2]);
        assert_eq!(Dims::cube(3).centroid(), [1, 1, 1]);
        assert_eq!(Dims::cube(9).centroid(), [4, 4, 4]);
    }

    #[test]
    fn test_reset_single_cell_odd_side() {
        let mut store = GridStore::create(Dims::cube(3)).unwrap();
        store.reset(&SeedPolicy::SingleCell);
        assert_eq!(store.live_count(), 1);
        assert!(store.get_cell(0, 1, 1, 1));
        assert!(!store.get_cell(0, 0, 0, 0));
    }
}
