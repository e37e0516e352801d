// Counter store: per-entity accumulated vectors keyed by state and column
//
// The store only knows vectors, slots and columns. It never learns whether a
// delta came from a per-entity tick or a bulk resync.

mod accumulator;

pub use accumulator::BucketedAccumulator;

use crate::classification::StateSlot;
use crate::error::{LedgerError, Result};
use crate::time_base::Column;
use crate::vector;
use crate::EntityId;
use std::collections::BTreeMap;

/// Holds one [`BucketedAccumulator`] per entity
///
/// # Example
/// ```
/// use procstate_ledger::classification::{Classification, StateSlot};
/// use procstate_ledger::store::CounterStore;
///
/// let mut store = CounterStore::new(3);
/// let top = StateSlot::Known(Classification::Top);
/// assert!(store.get_bucket(10032, top, false).is_none());
///
/// store.record_delta(10032, top, false, &[1, 2, 3])?;
/// assert_eq!(store.get_bucket(10032, top, false), Some(&[1, 2, 3][..]));
/// assert!(store.get_bucket(10032, top, true).is_none());
/// # Ok::<(), procstate_ledger::LedgerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CounterStore {
    vector_len: usize,
    entities: BTreeMap<EntityId, BucketedAccumulator>,
}

impl CounterStore {
    pub fn new(vector_len: usize) -> Self {
        Self {
            vector_len,
            entities: BTreeMap::new(),
        }
    }

    pub fn vector_len(&self) -> usize {
        self.vector_len
    }

    /// Fail unless `v` has the configured length
    pub fn check_len(&self, entity: EntityId, v: &[u64]) -> Result<()> {
        if v.len() != self.vector_len {
            return Err(LedgerError::VectorLengthMismatch {
                entity,
                expected: self.vector_len,
                actual: v.len(),
            });
        }
        Ok(())
    }

    /// Attribute `delta` to `slot`
    ///
    /// Always adds to the all-time column; also adds to the screen-off column
    /// when `screen_off` is set. An all-zero delta changes nothing.
    ///
    /// # Returns
    /// `Ok(true)` if any cell changed, `Ok(false)` for a zero delta.
    ///
    /// # Errors
    /// [`LedgerError::VectorLengthMismatch`] if `delta` does not have the
    /// configured length; no cell is touched in that case.
    pub fn record_delta(
        &mut self,
        entity: EntityId,
        slot: StateSlot,
        screen_off: bool,
        delta: &[u64],
    ) -> Result<bool> {
        self.check_len(entity, delta)?;
        if vector::is_zero(delta) {
            return Ok(false);
        }

        let acc = self.entities.entry(entity).or_default();
        acc.add(slot, Column::AllTime, delta);
        if screen_off {
            acc.add(slot, Column::ScreenOff, delta);
        }
        Ok(true)
    }

    /// Accumulated vector, `None` if nothing was ever recorded there
    pub fn get_bucket(&self, entity: EntityId, slot: StateSlot, screen_off: bool) -> Option<&[u64]> {
        let column = if screen_off {
            Column::ScreenOff
        } else {
            Column::AllTime
        };
        self.entities.get(&entity)?.get(slot, column)
    }

    pub fn accumulator(&self, entity: EntityId) -> Option<&BucketedAccumulator> {
        self.entities.get(&entity)
    }

    /// Entities with at least one recorded cell
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }
}
