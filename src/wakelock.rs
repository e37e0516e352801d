//! Per-entity wakelock hold time
//!
//! A wakelock may be acquired several times before it is released; the
//! entity holds it while the nesting count is above zero. Hold time only
//! accrues while the device is on battery, and a lock still held counts up
//! to the query time.

use crate::EntityId;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Nesting-counted stopwatch for one entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefCountedTimer {
    nesting: u32,
    running_since_ms: Option<u64>,
    total_ms: u64,
}

impl RefCountedTimer {
    /// Nest one more hold; the stopwatch starts on the first one
    pub fn acquire(&mut self, timestamp_ms: u64, counting: bool) {
        self.nesting += 1;
        if self.nesting == 1 && counting {
            self.running_since_ms = Some(timestamp_ms);
        }
    }

    /// Drop one hold; the stopwatch stops with the last one
    ///
    /// Returns `false` for a release without a matching acquire.
    pub fn release(&mut self, timestamp_ms: u64) -> bool {
        if self.nesting == 0 {
            return false;
        }
        self.nesting -= 1;
        if self.nesting == 0 {
            self.pause(timestamp_ms);
        }
        true
    }

    fn pause(&mut self, timestamp_ms: u64) {
        if let Some(start) = self.running_since_ms.take() {
            self.total_ms += timestamp_ms.saturating_sub(start);
        }
    }

    fn resume(&mut self, timestamp_ms: u64) {
        if self.nesting > 0 && self.running_since_ms.is_none() {
            self.running_since_ms = Some(timestamp_ms);
        }
    }

    pub fn is_held(&self) -> bool {
        self.nesting > 0
    }

    pub fn nesting(&self) -> u32 {
        self.nesting
    }

    /// Accrued hold time, including a hold still running at `now_ms`
    pub fn total_ms(&self, now_ms: u64) -> u64 {
        self.total_ms
            + self
                .running_since_ms
                .map_or(0, |start| now_ms.saturating_sub(start))
    }
}

/// Wakelock timers keyed by owning entity
#[derive(Debug, Clone, Default)]
pub struct WakelockTimers {
    timers: BTreeMap<EntityId, RefCountedTimer>,
}

impl WakelockTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, entity: EntityId, timestamp_ms: u64, counting: bool) {
        self.timers
            .entry(entity)
            .or_default()
            .acquire(timestamp_ms, counting);
    }

    pub fn release(&mut self, entity: EntityId, timestamp_ms: u64) -> bool {
        let released = self
            .timers
            .get_mut(&entity)
            .is_some_and(|t| t.release(timestamp_ms));
        if !released {
            warn!(entity, timestamp_ms, "wakelock released without being held");
        }
        released
    }

    /// Start or stop every held timer when accrual is switched on or off
    pub fn set_counting(&mut self, counting: bool, timestamp_ms: u64) {
        for timer in self.timers.values_mut() {
            if counting {
                timer.resume(timestamp_ms);
            } else {
                timer.pause(timestamp_ms);
            }
        }
    }

    pub fn get(&self, entity: EntityId) -> Option<&RefCountedTimer> {
        self.timers.get(&entity)
    }

    /// Total hold time of `entity` as of `now_ms`, zero if it never held one
    pub fn total_ms(&self, entity: EntityId, now_ms: u64) -> u64 {
        self.timers.get(&entity).map_or(0, |t| t.total_ms(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UID: EntityId = 10032;

    fn on_battery() -> WakelockTimers {
        WakelockTimers::new()
    }

    #[test]
    fn test_acquire_release() {
        let mut w = on_battery();
        w.acquire(UID, 1000, true);
        assert!(w.release(UID, 1005));
        assert_eq!(w.total_ms(UID, 1011), 5);
    }

    #[test]
    fn test_acquire_without_release_counts_to_now() {
        let mut w = on_battery();
        w.acquire(UID, 1000, true);
        assert!(w.get(UID).unwrap().is_held());
        assert_eq!(w.total_ms(UID, 1011), 11);
    }

    #[test]
    fn test_nested_acquire_release() {
        let mut w = on_battery();
        w.acquire(UID, 1000, true);
        w.acquire(UID, 1002, true);
        assert_eq!(w.get(UID).unwrap().nesting(), 2);
        w.release(UID, 1005);
        assert!(w.get(UID).unwrap().is_held());
        w.release(UID, 1009);
        assert_eq!(w.total_ms(UID, 1011), 9);
    }

    #[test]
    fn test_sequential_holds_add_up() {
        let mut w = on_battery();
        w.acquire(UID, 1000, true);
        w.release(UID, 1002);
        w.acquire(UID, 1005, true);
        w.release(UID, 1009);
        assert_eq!(w.total_ms(UID, 1011), 2 + 4);
    }

    #[test]
    fn test_unbalanced_release_ignored() {
        let mut w = on_battery();
        assert!(!w.release(UID, 10));
        w.acquire(UID, 20, true);
        w.release(UID, 30);
        assert!(!w.release(UID, 40));
        assert_eq!(w.total_ms(UID, 50), 10);
    }

    #[test]
    fn test_only_counts_while_counting() {
        let mut w = WakelockTimers::new();
        w.acquire(UID, 100, false);
        assert_eq!(w.total_ms(UID, 200), 0);

        w.set_counting(true, 200);
        w.set_counting(false, 250);
        w.set_counting(true, 300);
        w.release(UID, 310);
        assert_eq!(w.total_ms(UID, 1000), 60);
    }

    #[test]
    fn test_unknown_entity_is_zero() {
        assert_eq!(WakelockTimers::new().total_ms(UID, 1000), 0);
    }
}
