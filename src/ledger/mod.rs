//! Per-entity process-state CPU time ledger
//!
//! [`ProcStateLedger`] owns the counter store, the pending set, the time base
//! and the isolated-entity relation. It is driven by three kinds of calls:
//!
//! - notifications: [`on_classification_changed`](ProcStateLedger::on_classification_changed),
//!   [`on_process_state_changed`](ProcStateLedger::on_process_state_changed),
//!   [`on_time_base_changed`](ProcStateLedger::on_time_base_changed)
//! - ticks: [`update_proc_state_times`](ProcStateLedger::update_proc_state_times)
//!   (per-entity reads) and
//!   [`copy_from_all_cumulative`](ProcStateLedger::copy_from_all_cumulative)
//!   (one whole-system read)
//! - reads: [`get_bucket`](ProcStateLedger::get_bucket),
//!   [`snapshot`](ProcStateLedger::snapshot)
//!
//! A tick attributes each entity's whole delta to the classification pending
//! at tick start, or to its standing classification when nothing is pending.
//! Usage right before a transition is therefore credited to the new state.
//!
//! Both read paths keep their own baselines, but the ledger remembers the
//! cumulative level it has already attributed per entity and never
//! attributes below it again, so interleaving the two paths over one source
//! counts each unit of usage once.
//!
//! The ledger itself is not synchronised; wrap it in [`SharedLedger`] to
//! serialise access from several threads.

mod bulk;
mod shared;
mod tick;

pub use shared::SharedLedger;
pub use tick::{TickFailure, TickPhase, TickReport};

use crate::classification::{Classification, StateSlot};
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::isolated::IsolatedEntities;
use crate::reader::BaselineTracker;
use crate::store::CounterStore;
use crate::time_base::TimeBase;
use crate::vector;
use crate::wakelock::WakelockTimers;
use crate::EntityId;
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// In-memory accounting state
#[derive(Debug, Clone)]
pub struct ProcStateLedger {
    config: LedgerConfig,
    store: CounterStore,
    /// Known entities and their standing classification (`None` until first set)
    standing: BTreeMap<EntityId, Option<Classification>>,
    pending: BTreeMap<EntityId, Classification>,
    time_base: TimeBase,
    isolated: IsolatedEntities,
    /// Baselines for the copy-all path only
    bulk_baselines: BaselineTracker,
    /// Cumulative level already attributed, whichever path committed it
    accounted: BTreeMap<EntityId, Vec<u64>>,
    wakelocks: WakelockTimers,
}

impl ProcStateLedger {
    /// Create an empty ledger
    ///
    /// # Errors
    /// [`crate::LedgerError::InvalidConfig`] if the config does not validate.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: CounterStore::new(config.vector_len),
            config,
            standing: BTreeMap::new(),
            pending: BTreeMap::new(),
            time_base: TimeBase::default(),
            isolated: IsolatedEntities::new(),
            bulk_baselines: BaselineTracker::new(),
            accounted: BTreeMap::new(),
            wakelocks: WakelockTimers::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn vector_len(&self) -> usize {
        self.store.vector_len()
    }

    /// Record that `entity` moved to `classification`
    ///
    /// The delta attributed on the next tick lands in `classification`.
    /// Notifications for isolated children are ignored; they follow their
    /// parent.
    pub fn on_classification_changed(
        &mut self,
        entity: EntityId,
        classification: Classification,
        timestamp_ms: u64,
    ) {
        if let Some(parent) = self.isolated.parent_of(entity) {
            debug!(
                entity,
                parent, "ignoring classification change for isolated entity"
            );
            return;
        }
        self.standing.entry(entity).or_insert(None);
        if let Some(previous) = self.pending.insert(entity, classification) {
            if previous != classification {
                debug!(
                    entity,
                    %previous,
                    %classification,
                    timestamp_ms,
                    "pending classification replaced before tick"
                );
            }
        }
    }

    /// Record a raw scheduler importance code for `entity`
    ///
    /// Returns the classification it mapped to, or `None` when the code
    /// means the process is gone (nothing is recorded then).
    pub fn on_process_state_changed(
        &mut self,
        entity: EntityId,
        importance: i32,
        timestamp_ms: u64,
    ) -> Option<Classification> {
        let classification = self.config.bands.classify(importance);
        match classification {
            Some(c) => self.on_classification_changed(entity, c, timestamp_ms),
            None => debug!(entity, importance, "process no longer exists"),
        }
        classification
    }

    /// Switch which columns subsequent deltas land in
    pub fn on_time_base_changed(&mut self, on_battery: bool, screen_off: bool, timestamp_ms: u64) {
        let previous = self.time_base.last_transition_ms;
        if !self.time_base.transition(on_battery, screen_off, timestamp_ms) {
            warn!(
                previous_ms = previous,
                timestamp_ms, "time base transition went backwards"
            );
        }
        self.wakelocks.set_counting(on_battery, timestamp_ms);
        debug!(on_battery, screen_off, timestamp_ms, "time base changed");
    }

    /// Register `child` as an isolated entity of `parent`
    ///
    /// The child stops being tracked on its own; buckets it already has are
    /// left as they are.
    ///
    /// # Errors
    /// [`crate::LedgerError::InvalidIsolation`] when `child == parent`, when `parent`
    /// is itself isolated, or when `child` has isolated entities of its own.
    /// Nothing changes in that case.
    pub fn add_isolated(&mut self, parent: EntityId, child: EntityId) -> Result<()> {
        match self.isolated.add_child(parent, child) {
            Ok(Some(old)) if old != parent => {
                debug!(child, old_parent = old, parent, "isolated entity moved");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(parent, child, error = %e, "isolated entity rejected");
                return Err(e);
            }
        }
        self.standing.remove(&child);
        self.pending.remove(&child);
        Ok(())
    }

    /// Unregister an isolated entity, returning its former parent
    pub fn remove_isolated(&mut self, child: EntityId) -> Option<EntityId> {
        self.isolated.remove_child(child)
    }

    /// Record a wakelock acquisition by `entity`
    ///
    /// Isolated children hold the lock on behalf of their parent. Hold time
    /// only accrues while on battery.
    pub fn on_wakelock_acquired(&mut self, entity: EntityId, timestamp_ms: u64) {
        let owner = self.isolated.parent_of(entity).unwrap_or(entity);
        self.wakelocks
            .acquire(owner, timestamp_ms, self.time_base.on_battery);
        trace!(entity, owner, timestamp_ms, "wakelock acquired");
    }

    /// Record a wakelock release by `entity`
    ///
    /// Returns `false` when the owner held no wakelock; nothing changes then.
    pub fn on_wakelock_released(&mut self, entity: EntityId, timestamp_ms: u64) -> bool {
        let owner = self.isolated.parent_of(entity).unwrap_or(entity);
        self.wakelocks.release(owner, timestamp_ms)
    }

    /// On-battery wakelock hold time of `entity` up to `now_ms`
    pub fn wakelock_time_ms(&self, entity: EntityId, now_ms: u64) -> u64 {
        self.wakelocks.total_ms(entity, now_ms)
    }

    pub fn wakelocks(&self) -> &WakelockTimers {
        &self.wakelocks
    }

    /// Accumulated vector for `(entity, classification, column)`
    ///
    /// `None` means nothing was ever attributed there, which is different from
    /// zero usage.
    pub fn get_bucket(
        &self,
        entity: EntityId,
        classification: Classification,
        screen_off: bool,
    ) -> Option<&[u64]> {
        self.store
            .get_bucket(entity, StateSlot::Known(classification), screen_off)
    }

    /// Like [`get_bucket`](Self::get_bucket) but addressable by slot, including
    /// [`StateSlot::Unknown`]
    pub fn get_slot_bucket(&self, entity: EntityId, slot: StateSlot, screen_off: bool) -> Option<&[u64]> {
        self.store.get_bucket(entity, slot, screen_off)
    }

    /// Standing classification, as of the last committed tick
    pub fn classification_of(&self, entity: EntityId) -> Option<Classification> {
        self.standing.get(&entity).copied().flatten()
    }

    pub fn pending(&self) -> &BTreeMap<EntityId, Classification> {
        &self.pending
    }

    pub fn time_base(&self) -> &TimeBase {
        &self.time_base
    }

    pub fn isolated(&self) -> &IsolatedEntities {
        &self.isolated
    }

    pub fn store(&self) -> &CounterStore {
        &self.store
    }

    /// Entities tracked on their own (never isolated children)
    pub fn known_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.standing.keys().copied()
    }

    /// Attribute a computed delta and drain the pending entry
    ///
    /// `observed` holds the cumulative readings the delta was built from;
    /// they become the accounted level only once the delta is recorded.
    fn commit(
        &mut self,
        entity: EntityId,
        slot: StateSlot,
        screen_off: bool,
        delta: &[u64],
        observed: Vec<(EntityId, Vec<u64>)>,
    ) -> Result<bool> {
        let changed = self.store.record_delta(entity, slot, screen_off, delta)?;
        let standing = self.standing.entry(entity).or_insert(None);
        if let StateSlot::Known(c) = slot {
            *standing = Some(c);
        }
        self.pending.remove(&entity);
        for (source, cumulative) in observed {
            self.accounted.insert(source, cumulative);
        }
        if changed {
            debug!(entity, state = %slot, screen_off, "delta committed");
        }
        Ok(changed)
    }

    /// Cap `delta` to the usage not yet attributed for `entity`
    ///
    /// `cumulative` is the reading `delta` was computed from. A slot below the
    /// accounted level is a counter reset and attributes nothing.
    fn unaccounted(&self, entity: EntityId, cumulative: &[u64], mut delta: Vec<u64>) -> Vec<u64> {
        if let Some(accounted) = self.accounted.get(&entity) {
            let (headroom, _) = vector::clamped_delta(cumulative, accounted);
            for (slot, room) in delta.iter_mut().zip(headroom) {
                if *slot > room {
                    trace!(entity, delta = *slot, room, "usage already attributed, capping");
                    *slot = room;
                }
            }
        }
        delta
    }

    /// Slot a delta for `entity` lands in this tick
    fn target_slot(&self, entity: EntityId, pending: &BTreeMap<EntityId, Classification>) -> StateSlot {
        pending
            .get(&entity)
            .copied()
            .or_else(|| self.classification_of(entity))
            .into()
    }
}
