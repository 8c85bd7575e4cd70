//! Per-cell transition kernel.
//!
//! A cell's next state depends only on the active buffer, so cells can be
//! evaluated in any order or in parallel. Writes go to the staging buffer
//! and the step index only advances once every staging word is written.

use rayon::prelude::*;

use super::grid::{Grid, GridStore, WORD_BITS};
use crate::arena::{Arena, Slot};
use crate::error::Result;
use crate::neighborhood::{NeighborhoodKind, Offset};
use crate::rules::{RuleTable, COUNT_SLOTS};

/// Category slots in the packed rule layout: main, edges, corners.
pub const PACKED_CATEGORIES: usize = 3;

/// One counted neighborhood and the table that judges its count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Category {
    pub kind: NeighborhoodKind,
    pub table: RuleTable,
}

/// The full transition rule: a cell changes state only if every category permits it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSet {
    categories: Vec<Category>,
}

/// Where `RuleSet::stage` put its flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleSlots {
    pub born: Slot,
    pub survive: Slot,
}

impl RuleSet {
    pub fn single(kind: NeighborhoodKind, table: RuleTable) -> Self {
        RuleSet {
            categories: vec![Category { kind, table }],
        }
    }

    /// Main neighborhood plus separately counted edges and corners.
    pub fn mixed(kind: NeighborhoodKind, main: RuleTable, edges: RuleTable, corners: RuleTable) -> Self {
        RuleSet {
            categories: vec![
                Category { kind, table: main },
                Category {
                    kind: NeighborhoodKind::Edges,
                    table: edges,
                },
                Category {
                    kind: NeighborhoodKind::Corners,
                    table: corners,
                },
            ],
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_mixed(&self) -> bool {
        self.categories.len() > 1
    }

    /// Pack born and survive flags as `3 x 27` `u32`s each (main, edges,
    /// corners). Absent categories are packed permissive.
    pub fn stage(&self, arena: &mut Arena<u32>) -> Result<RuleSlots> {
        let len = COUNT_SLOTS * PACKED_CATEGORIES;
        let born = arena.alloc(len)?;
        let survive = arena.alloc(len)?;

        let mut born_flags = vec![1u32; len];
        let mut survive_flags = vec![1u32; len];
        for (i, category) in self.categories.iter().take(PACKED_CATEGORIES).enumerate() {
            let range = i * COUNT_SLOTS..(i + 1) * COUNT_SLOTS;
            let packed = |table: &[bool; COUNT_SLOTS]| table.map(u32::from);
            born_flags[range.clone()].copy_from_slice(&packed(category.table.born.as_array()));
            survive_flags[range].copy_from_slice(&packed(category.table.survive.as_array()));
        }

        arena.write(born, &born_flags);
        arena.write(survive, &survive_flags);
        Ok(RuleSlots { born, survive })
    }
}

/// Count live cells at the given offsets from `(x, y, z)`, wrapping toroidally.
#[inline]
pub fn count_neighbors(grid: &Grid, x: i32, y: i32, z: i32, offsets: &[Offset]) -> u32 {
    offsets
        .iter()
        .filter(|[dx, dy, dz]| grid.get(x + dx, y + dy, z + dz))
        .count() as u32
}

/// Next state of one cell.
#[inline]
pub fn next_state(grid: &Grid, rules: &RuleSet, x: i32, y: i32, z: i32) -> bool {
    let current = grid.get(x, y, z);
    rules.categories.iter().all(|category| {
        let count = count_neighbors(grid, x, y, z, category.kind.offsets());
        category.table.permits(current, count)
    })
}

/// Compute every word of one `(y, z)` row. Padding bits come out zero.
pub(crate) fn compute_row(active: &Grid, rules: &RuleSet, row: usize, out: &mut [u32]) {
    let dims = active.dims();
    let y = (row % dims.y as usize) as i32;
    let z = (row / dims.y as usize) as i32;

    for (col, word) in out.iter_mut().enumerate() {
        let x_start = col as u32 * WORD_BITS;
        let x_end = (x_start + WORD_BITS).min(dims.x);
        let mut bits = 0u32;
        for x in x_start..x_end {
            if next_state(active, rules, x as i32, y, z) {
                bits |= 1 << (x - x_start);
            }
        }
        *word = bits;
    }
}

/// Advance one generation on the calling thread.
pub fn step(store: &mut GridStore, rules: &RuleSet) {
    let (active, staging) = store.split_for_step();
    let cols = active.cols();
    for (row, out) in staging.words_mut().chunks_mut(cols).enumerate() {
        compute_row(active, rules, row, out);
    }
    store.complete_step();
}

/// Advance one generation, one rayon task per row, on the current pool.
pub fn step_parallel(store: &mut GridStore, rules: &RuleSet) {
    let (active, staging) = store.split_for_step();
    let cols = active.cols();
    staging
        .words_mut()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(row, out)| compute_row(active, rules, row, out));
    store.complete_step();
}

/// Advance one generation visiting cells in the given order.
///
/// `order` holds linear cell ids `x + y * dims.x + z * dims.x * dims.y`.
/// The staging buffer is cleared first, so cells missing from `order` come
/// out dead; ids past the cell count wrap.
pub fn step_in_order(store: &mut GridStore, rules: &RuleSet, order: &[u64]) {
    let (active, staging) = store.split_for_step();
    let dims = active.dims();
    let plane = dims.x as u64 * dims.y as u64;
    staging.clear();

    for &id in order {
        let id = id % dims.cell_count();
        let x = (id % dims.x as u64) as i32;
        let y = (id % plane / dims.x as u64) as i32;
        let z = (id / plane) as i32;
        staging.set(x, y, z, next_state(active, rules, x, y, z));
    }
    store.complete_step();
}
