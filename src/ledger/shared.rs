// Mutex-serialised handle to a ledger
//
// Every operation takes the one lock for its whole duration, so readers see
// either the pre-tick or the post-tick state of all entities.

use super::{ProcStateLedger, TickReport};
use crate::classification::Classification;
use crate::error::Result;
use crate::reader::CpuTimeReader;
use crate::report::LedgerSnapshot;
use crate::EntityId;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable, thread-safe handle to a [`ProcStateLedger`]
#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<ProcStateLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: ProcStateLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Exclusive access for compound operations
    ///
    /// A poisoned lock is recovered: a tick commits each entity atomically,
    /// so a panic mid-tick leaves no half-applied entity behind.
    pub fn lock(&self) -> MutexGuard<'_, ProcStateLedger> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with<T, F: FnOnce(&mut ProcStateLedger) -> T>(&self, f: F) -> T {
        f(&mut self.lock())
    }

    pub fn on_classification_changed(
        &self,
        entity: EntityId,
        classification: Classification,
        timestamp_ms: u64,
    ) {
        self.lock()
            .on_classification_changed(entity, classification, timestamp_ms);
    }

    pub fn on_time_base_changed(&self, on_battery: bool, screen_off: bool, timestamp_ms: u64) {
        self.lock()
            .on_time_base_changed(on_battery, screen_off, timestamp_ms);
    }

    pub fn add_isolated(&self, parent: EntityId, child: EntityId) -> Result<()> {
        self.lock().add_isolated(parent, child)
    }

    pub fn on_wakelock_acquired(&self, entity: EntityId, timestamp_ms: u64) {
        self.lock().on_wakelock_acquired(entity, timestamp_ms);
    }

    pub fn on_wakelock_released(&self, entity: EntityId, timestamp_ms: u64) -> bool {
        self.lock().on_wakelock_released(entity, timestamp_ms)
    }

    pub fn wakelock_time_ms(&self, entity: EntityId, now_ms: u64) -> u64 {
        self.lock().wakelock_time_ms(entity, now_ms)
    }

    pub fn update_proc_state_times<R: CpuTimeReader + ?Sized>(
        &self,
        reader: &mut R,
        timestamp_ms: u64,
    ) -> TickReport {
        self.lock().update_proc_state_times(reader, timestamp_ms)
    }

    pub fn copy_from_all_cumulative<R: CpuTimeReader + ?Sized>(
        &self,
        reader: &mut R,
        timestamp_ms: u64,
    ) -> TickReport {
        self.lock().copy_from_all_cumulative(reader, timestamp_ms)
    }

    /// Owned copy of one bucket
    pub fn get_bucket(
        &self,
        entity: EntityId,
        classification: Classification,
        screen_off: bool,
    ) -> Option<Vec<u64>> {
        self.lock()
            .get_bucket(entity, classification, screen_off)
            .map(<[u64]>::to_vec)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::reader::ScriptedReader;
    use std::thread;

    #[test]
    fn test_concurrent_notifications_and_ticks() {
        let ledger = ProcStateLedger::new(LedgerConfig::with_vector_len(2)).unwrap();
        let shared = SharedLedger::new(ledger);

        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared.on_classification_changed(1000 + i, Classification::Top, 10);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.lock().pending().len(), 4);

        let mut reader = ScriptedReader::new();
        for i in 0..4u32 {
            reader.set_cumulative(1000 + i, vec![i as u64 + 1, 0]);
        }
        let report = shared.update_proc_state_times(&mut reader, 20);
        assert_eq!(report.updated.len(), 4);
        assert!(shared.lock().pending().is_empty());
        assert_eq!(
            shared.get_bucket(1003, Classification::Top, false),
            Some(vec![4, 0])
        );
    }

    #[test]
    fn test_snapshot_under_lock() {
        let ledger = ProcStateLedger::new(LedgerConfig::with_vector_len(1)).unwrap();
        let shared = SharedLedger::new(ledger);
        shared.on_classification_changed(7, Classification::Cached, 0);
        let snap = shared.snapshot();
        assert_eq!(snap.entities.len(), 1);
        assert_eq!(snap.entities[0].entity, 7);
    }

    #[test]
    fn test_with_closure() {
        let ledger = ProcStateLedger::new(LedgerConfig::with_vector_len(1)).unwrap();
        let shared = SharedLedger::new(ledger);
        shared.add_isolated(1, 2).unwrap();
        let parent = shared.with(|l| l.isolated().parent_of(2));
        assert_eq!(parent, Some(1));
    }

    #[test]
    fn test_concurrent_wakelocks() {
        let ledger = ProcStateLedger::new(LedgerConfig::with_vector_len(1)).unwrap();
        let shared = SharedLedger::new(ledger);
        shared.on_time_base_changed(true, false, 0);

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || shared.on_wakelock_acquired(10032, 100 + i))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.with(|l| l.wakelocks().get(10032).map(|t| t.nesting())), Some(4));
        for _ in 0..4 {
            assert!(shared.on_wakelock_released(10032, 200));
        }
        assert!(!shared.on_wakelock_released(10032, 210));
        let held = shared.wakelock_time_ms(10032, 300);
        assert!((97..=100).contains(&held), "held {}", held);
    }
}
