// Last-cumulative baselines for delta computation
//
// The per-entity reader path and the ledger's bulk path each own one of
// these; they must never share an instance.

use crate::vector;
use crate::EntityId;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone)]
struct Sample {
    values: Vec<u64>,
    timestamp_ms: u64,
}

/// Tracks the last cumulative vector seen per entity
#[derive(Debug, Clone, Default)]
pub struct BaselineTracker {
    last: HashMap<EntityId, Sample>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta of `current` against the stored baseline, then store `current`
    ///
    /// The first observation of an entity has an implicit zero baseline, so
    /// its delta is the full cumulative value. Slots that went backwards
    /// (counter reset) contribute zero.
    pub fn advance(&mut self, entity: EntityId, current: &[u64], timestamp_ms: u64) -> Vec<u64> {
        let delta = match self.last.get(&entity) {
            Some(prev) => {
                let (delta, clamped) = vector::clamped_delta(current, &prev.values);
                if clamped {
                    trace!(
                        entity,
                        since_ms = prev.timestamp_ms,
                        now_ms = timestamp_ms,
                        "cumulative counter went backwards, clamping delta"
                    );
                }
                delta
            }
            None => current.to_vec(),
        };
        self.last.insert(
            entity,
            Sample {
                values: current.to_vec(),
                timestamp_ms,
            },
        );
        delta
    }

    pub fn last(&self, entity: EntityId) -> Option<&[u64]> {
        self.last.get(&entity).map(|s| s.values.as_slice())
    }

    pub fn last_timestamp_ms(&self, entity: EntityId) -> Option<u64> {
        self.last.get(&entity).map(|s| s.timestamp_ms)
    }
}
