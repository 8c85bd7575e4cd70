//! Non-blocking incremental stepping with tiled work distribution.
//!
//! Splits one generation into tiles of whole `(y, z)` rows that can be
//! processed across several host ticks without blocking frames. Rows inside a
//! tile run on the controller's rayon pool.
//!
//! Core invariant: all reads come from the active buffer, which nothing
//! mutates while a step is in flight, and all writes go to the staging buffer.
//! Tile order therefore doesn't affect the result. The staging buffer is only
//! promoted once every tile has been written; an abandoned step leaves the
//! active buffer and step index untouched.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, warn};

use super::grid::{GridStore, SeedPolicy};
use super::stepping::{compute_row, RuleSet};
use crate::error::{AutomatonError, Result};

/// Rows per tile.
pub const TILE_ROWS: usize = 64;

/// Cursor over the tiles of an in-progress generation.
#[derive(Clone, Copy, Debug)]
struct IncrementalStep {
    next_tile: usize,
    total_tiles: usize,
}

/// Owns a grid store and its rules, and steps it either all at once or in
/// time-budgeted slices.
pub struct StepController {
    grid: GridStore,
    rules: RuleSet,
    active_step: Option<IncrementalStep>,
    thread_pool: rayon::ThreadPool,
}

fn build_pool(num_threads: u8) -> Result<rayon::ThreadPool> {
    let num_threads = num_threads.max(1) as usize;
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .or_else(|err| {
            warn!(num_threads, %err, "falling back to a single worker thread");
            rayon::ThreadPoolBuilder::new().num_threads(1).build()
        })
        .map_err(|err| AutomatonError::InvalidConfig(format!("cannot start worker pool: {}", err)))
}

impl StepController {
    /// `num_threads` of 0 is treated as 1.
    pub fn new(grid: GridStore, rules: RuleSet, num_threads: u8) -> Result<Self> {
        Ok(StepController {
            grid,
            rules,
            active_step: None,
            thread_pool: build_pool(num_threads)?,
        })
    }

    pub fn grid(&self) -> &GridStore {
        &self.grid
    }

    pub fn into_grid(self) -> GridStore {
        self.grid
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn num_threads(&self) -> usize {
        self.thread_pool.current_num_threads()
    }

    pub fn is_stepping(&self) -> bool {
        self.active_step.is_some()
    }

    /// `(tiles done, total tiles)` of the in-flight step.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.active_step.map(|step| (step.next_tile, step.total_tiles))
    }

    /// Swap rules. Refused while a step is in flight.
    pub fn set_rules(&mut self, rules: RuleSet) -> Result<()> {
        if self.is_stepping() {
            return Err(AutomatonError::StepInProgress);
        }
        self.rules = rules;
        Ok(())
    }

    /// Write a cell of the active buffer. Refused while a step is in flight.
    pub fn set_cell(&mut self, x: i32, y: i32, z: i32, alive: bool) -> Result<()> {
        if self.is_stepping() {
            return Err(AutomatonError::StepInProgress);
        }
        let active = self.grid.active_buffer();
        self.grid.set_cell(active, x, y, z, alive);
        Ok(())
    }

    /// Mutable access to the store between steps.
    pub fn grid_mut(&mut self) -> Result<&mut GridStore> {
        if self.is_stepping() {
            return Err(AutomatonError::StepInProgress);
        }
        Ok(&mut self.grid)
    }

    /// Abandon any in-flight step, then reseed both buffers.
    pub fn reset(&mut self, seed: &SeedPolicy) {
        self.abandon_step();
        self.grid.reset(seed);
    }

    /// Abandon any in-flight step and install a new store.
    pub fn replace_grid(&mut self, grid: GridStore) -> GridStore {
        self.abandon_step();
        std::mem::replace(&mut self.grid, grid)
    }

    /// Begin a new incremental step. Fails if one is already in progress.
    pub fn begin_step(&mut self) -> Result<()> {
        if self.is_stepping() {
            return Err(AutomatonError::StepInProgress);
        }

        let rows = self.grid.dims().rows();
        self.active_step = Some(IncrementalStep {
            next_tile: 0,
            total_tiles: rows.div_ceil(TILE_ROWS),
        });
        Ok(())
    }

    /// Do bounded work within the given time budget (microseconds).
    /// Returns true if the step completed during this tick (or none was
    /// running), false if more work remains. At least one tile is processed
    /// per call.
    pub fn tick(&mut self, budget_us: u64) -> bool {
        if !self.is_stepping() {
            return true;
        }

        let deadline = Instant::now().checked_add(Duration::from_micros(budget_us));
        while let Some(tile) = self.claim_tile() {
            self.process_tile(tile);
            if self.has_pending_tiles() && deadline.is_some_and(|d| Instant::now() >= d) {
                return false;
            }
        }

        self.finalize_step();
        true
    }

    /// Run a full step to completion, finishing the in-flight one if any.
    pub fn step_blocking(&mut self) {
        if !self.is_stepping() {
            self.active_step = Some(IncrementalStep {
                next_tile: 0,
                total_tiles: self.grid.dims().rows().div_ceil(TILE_ROWS),
            });
        }
        while !self.tick(u64::MAX) {}
    }

    /// Drop the in-flight step. Its partial output is never promoted and is
    /// fully overwritten by the next step. Returns whether a step was dropped.
    pub fn abandon_step(&mut self) -> bool {
        match self.active_step.take() {
            Some(step) => {
                debug!(
                    tiles_done = step.next_tile,
                    total_tiles = step.total_tiles,
                    "abandoned in-flight step"
                );
                true
            }
            None => false,
        }
    }

    fn claim_tile(&mut self) -> Option<usize> {
        let step = self.active_step.as_mut()?;
        if step.next_tile < step.total_tiles {
            step.next_tile += 1;
            Some(step.next_tile - 1)
        } else {
            None
        }
    }

    fn has_pending_tiles(&self) -> bool {
        self.active_step
            .is_some_and(|step| step.next_tile < step.total_tiles)
    }

    /// Compute every staging word in the tile's rows.
    fn process_tile(&mut self, tile: usize) {
        let (active, staging) = self.grid.split_for_step();
        let cols = active.cols();
        let rows = active.dims().rows();
        let first = tile * TILE_ROWS;
        let last = (first + TILE_ROWS).min(rows);

        let rules = &self.rules;
        let words = &mut staging.words_mut()[first * cols..last * cols];
        self.thread_pool.install(|| {
            words
                .par_chunks_mut(cols)
                .enumerate()
                .for_each(|(i, out)| compute_row(active, rules, first + i, out));
        });
    }

    /// Promote the staging buffer by advancing the step index.
    fn finalize_step(&mut self) {
        if self.active_step.take().is_some() {
            self.grid.complete_step();
            debug!(
                step = self.grid.step_index(),
                live = self.grid.live_count(),
                "step complete"
            );
        }
    }
}
