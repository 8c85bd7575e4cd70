//! Fixed-capacity staging arena.
//!
//! Packed rule flags and neighborhood offsets are laid out here before a
//! renderer or accelerator uploads them. Each simulation owns its arenas;
//! slots are handed out bump-style and only reclaimed all at once by `clear`.

use tracing::debug;

use crate::error::{AutomatonError, Result};
use crate::neighborhood::Offset;

/// A contiguous range inside an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub start: usize,
    pub len: usize,
}

impl Slot {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

#[derive(Clone, Debug)]
pub struct Arena<T> {
    data: Vec<T>,
    next: usize,
}

impl<T: Copy + Default> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            data: vec![T::default(); capacity],
            next: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn used(&self) -> usize {
        self.next
    }

    pub fn available(&self) -> usize {
        self.data.len() - self.next
    }

    /// Reserve `len` values.
    pub fn alloc(&mut self, len: usize) -> Result<Slot> {
        if len == 0 {
            return Err(AutomatonError::EmptyAllocation);
        }
        if len > self.available() {
            return Err(AutomatonError::ArenaExhausted {
                requested: len,
                available: self.available(),
            });
        }

        let slot = Slot {
            start: self.next,
            len,
        };
        self.next += len;
        debug!(start = slot.start, len, used = self.next, "arena slot allocated");
        Ok(slot)
    }

    /// Copy `values` to the start of `slot`. Values past the slot's end are dropped.
    pub fn write(&mut self, slot: Slot, values: &[T]) {
        for (dst, src) in self.data[slot.range()].iter_mut().zip(values) {
            *dst = *src;
        }
    }

    pub fn slice(&self, slot: Slot) -> &[T] {
        &self.data[slot.range()]
    }

    /// The whole backing buffer, for upload in one transfer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Release every slot and zero the backing buffer.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
        self.next = 0;
    }
}

/// Pack offset triples as consecutive `i32`s.
pub fn stage_offsets(offsets: &[Offset], arena: &mut Arena<i32>) -> Result<Slot> {
    let slot = arena.alloc(offsets.len() * 3)?;
    let flat: Vec<i32> = offsets.iter().flatten().copied().collect();
    arena.write(slot, &flat);
    Ok(slot)
}
