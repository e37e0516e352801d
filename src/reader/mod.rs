//! Cumulative CPU-time readers
//!
//! A reader produces, per entity, a monotonic cumulative vector since boot.
//! It owns the baseline used by [`CpuTimeReader::read_delta_since_last`], so
//! the ledger never sees raw cumulative values on the per-entity path.
//!
//! Two implementations ship with the crate:
//! - [`UidTimeInStateReader`]: parses the kernel `uid_time_in_state` layout
//! - [`ScriptedReader`]: returns scripted vectors, for tests and replays

mod baseline;
mod scripted;
mod uid_time_in_state;

pub use baseline::BaselineTracker;
pub use scripted::ScriptedReader;
pub use uid_time_in_state::{parse_uid_time_in_state, UidTimeInState, UidTimeInStateReader};

use crate::EntityId;
use std::collections::BTreeMap;

/// Outcome of a read that may legitimately produce nothing this round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading<T> {
    Available(T),
    /// The source cannot produce data right now; retry on a later tick
    Unavailable,
}

impl<T> Reading<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Available(_))
    }

    pub fn available(self) -> Option<T> {
        match self {
            Reading::Available(v) => Some(v),
            Reading::Unavailable => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Reading<U> {
        match self {
            Reading::Available(v) => Reading::Available(f(v)),
            Reading::Unavailable => Reading::Unavailable,
        }
    }
}

impl<T> From<Option<T>> for Reading<T> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Reading::Unavailable, Reading::Available)
    }
}

/// Source of cumulative per-entity CPU time vectors
pub trait CpuTimeReader {
    /// Cumulative vector since boot for `entity`
    fn read_cumulative(&mut self, entity: EntityId) -> Reading<Vec<u64>>;

    /// Baselines backing [`read_delta_since_last`](Self::read_delta_since_last)
    fn baselines_mut(&mut self) -> &mut BaselineTracker;

    /// Delta since the previous call for `entity`, never negative
    ///
    /// An unavailable read leaves the baseline untouched.
    fn read_delta_since_last(&mut self, entity: EntityId, timestamp_ms: u64) -> Reading<Vec<u64>> {
        match self.read_cumulative(entity) {
            Reading::Available(current) => {
                Reading::Available(self.baselines_mut().advance(entity, &current, timestamp_ms))
            }
            Reading::Unavailable => Reading::Unavailable,
        }
    }

    /// Whole-system snapshot, when the source can produce one cheaply
    fn read_all_cumulative(&mut self) -> Reading<BTreeMap<EntityId, Vec<u64>>> {
        Reading::Unavailable
    }
}
