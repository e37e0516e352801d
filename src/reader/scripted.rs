// Reader returning scripted cumulative vectors
//
// Used by unit/integration tests and by `procstate-ledger replay`, where a
// scenario file provides the samples instead of the kernel.

use super::{BaselineTracker, CpuTimeReader, Reading};
use crate::EntityId;
use std::collections::{BTreeMap, HashMap};

/// In-memory [`CpuTimeReader`] driven by explicit samples
#[derive(Debug, Clone, Default)]
pub struct ScriptedReader {
    cumulative: HashMap<EntityId, Vec<u64>>,
    bulk: Option<BTreeMap<EntityId, Vec<u64>>>,
    baselines: BaselineTracker,
}

impl ScriptedReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cumulative value returned for `entity` from now on
    pub fn set_cumulative(&mut self, entity: EntityId, values: Vec<u64>) {
        self.cumulative.insert(entity, values);
    }

    /// Make per-entity reads for `entity` unavailable
    pub fn set_unavailable(&mut self, entity: EntityId) {
        self.cumulative.remove(&entity);
    }

    /// Add one entry to the whole-system snapshot
    pub fn set_bulk_cumulative(&mut self, entity: EntityId, values: Vec<u64>) {
        self.bulk.get_or_insert_with(BTreeMap::new).insert(entity, values);
    }

    /// Make the whole-system snapshot unavailable
    pub fn clear_bulk(&mut self) {
        self.bulk = None;
    }
}

impl CpuTimeReader for ScriptedReader {
    fn read_cumulative(&mut self, entity: EntityId) -> Reading<Vec<u64>> {
        self.cumulative.get(&entity).cloned().into()
    }

    fn baselines_mut(&mut self) -> &mut BaselineTracker {
        &mut self.baselines
    }

    fn read_all_cumulative(&mut self) -> Reading<BTreeMap<EntityId, Vec<u64>>> {
        self.bulk.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscripted_entity_unavailable() {
        let mut r = ScriptedReader::new();
        assert_eq!(r.read_cumulative(5), Reading::Unavailable);
    }

    #[test]
    fn test_bulk_snapshot() {
        let mut r = ScriptedReader::new();
        assert_eq!(r.read_all_cumulative(), Reading::Unavailable);

        r.set_bulk_cumulative(2, vec![2]);
        r.set_bulk_cumulative(1, vec![1]);
        let all = r.read_all_cumulative().available().unwrap();
        assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

        r.clear_bulk();
        assert!(!r.read_all_cumulative().is_available());
    }
}
