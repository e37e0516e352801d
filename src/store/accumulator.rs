// Per-entity bucketed accumulator
//
// Rows are state slots (classifications plus Unknown), columns are
// all-time and screen-off-only. A cell stays None until a non-zero delta
// has been attributed to it.

use crate::classification::StateSlot;
use crate::time_base::Column;
use crate::vector;

/// Accumulated vectors for one entity
#[derive(Debug, Clone, Default)]
pub struct BucketedAccumulator {
    cells: [[Option<Vec<u64>>; Column::COUNT]; StateSlot::COUNT],
}

impl BucketedAccumulator {
    pub fn get(&self, slot: StateSlot, column: Column) -> Option<&[u64]> {
        self.cells[slot.index()][column.index()].as_deref()
    }

    /// Add `delta` to one cell, creating it on first write
    pub(crate) fn add(&mut self, slot: StateSlot, column: Column, delta: &[u64]) {
        let cell = &mut self.cells[slot.index()][column.index()];
        match cell {
            Some(acc) => vector::accumulate(acc, delta),
            None => *cell = Some(delta.to_vec()),
        }
    }

    /// Slots with at least one present cell, in row order
    pub fn recorded_slots(&self) -> impl Iterator<Item = StateSlot> + '_ {
        self.cells.iter().enumerate().filter_map(|(index, row)| {
            if row.iter().any(Option::is_some) {
                StateSlot::from_index(index)
            } else {
                None
            }
        })
    }
}
