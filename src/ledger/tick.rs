// Per-entity tick: ReadingPending -> ComputingDeltas -> Merging -> Committing

use super::ProcStateLedger;
use crate::error::LedgerError;
use crate::reader::{CpuTimeReader, Reading};
use crate::vector;
use crate::EntityId;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, trace, warn};

/// Stage of a tick, reported with failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    ReadingPending,
    ComputingDeltas,
    Merging,
    Committing,
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TickPhase::ReadingPending => "reading_pending",
            TickPhase::ComputingDeltas => "computing_deltas",
            TickPhase::Merging => "merging",
            TickPhase::Committing => "committing",
        };
        f.write_str(s)
    }
}

/// An entity whose update was abandoned this tick
#[derive(Debug)]
pub struct TickFailure {
    pub entity: EntityId,
    pub phase: TickPhase,
    pub error: LedgerError,
}

impl fmt::Display for TickFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {} failed during {}: {}", self.entity, self.phase, self.error)
    }
}

/// Outcome of one tick
#[derive(Debug, Default)]
pub struct TickReport {
    /// Entities whose delta was committed (zero deltas included)
    pub updated: Vec<EntityId>,
    /// Entities whose reader had no data; still pending if they were
    pub skipped: Vec<EntityId>,
    /// Entities abandoned because of a configuration/programming error
    pub failures: Vec<TickFailure>,
    /// Copy-all only: the whole-system read was unavailable
    pub bulk_unavailable: bool,
}

impl TickReport {
    /// True when every entity was either updated or legitimately skipped
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(super) fn fail(&mut self, entity: EntityId, phase: TickPhase, error: LedgerError) {
        warn!(entity, %phase, error = %error, "entity update abandoned");
        self.failures.push(TickFailure {
            entity,
            phase,
            error,
        });
    }
}

impl ProcStateLedger {
    /// Attribute every entity's CPU time since the previous tick
    ///
    /// Each non-isolated known or pending entity is read through
    /// `reader.read_delta_since_last`; the deltas of its isolated children are
    /// added on top; the sum goes to the pending classification (or standing
    /// one) in the all-time column, and to the screen-off column as well when
    /// the time base is on battery with the screen off. Usage already
    /// attributed by [`copy_from_all_cumulative`](Self::copy_from_all_cumulative)
    /// is not attributed again.
    ///
    /// Unavailable readings skip the entity and keep it pending. A vector
    /// length mismatch abandons that entity only and is listed in
    /// [`TickReport::failures`].
    pub fn update_proc_state_times<R: CpuTimeReader + ?Sized>(
        &mut self,
        reader: &mut R,
        timestamp_ms: u64,
    ) -> TickReport {
        let mut report = TickReport::default();

        // ReadingPending
        let pending = self.pending.clone();
        let targets: BTreeSet<EntityId> = self
            .standing
            .keys()
            .chain(pending.keys())
            .copied()
            .filter(|e| !self.isolated.is_child(*e))
            .collect();
        let screen_off = self.time_base.screen_off_active();
        trace!(
            entities = targets.len(),
            pending = pending.len(),
            isolated = self.isolated.len(),
            screen_off,
            timestamp_ms,
            "tick started"
        );

        for entity in targets {
            let slot = self.target_slot(entity, &pending);

            // ComputingDeltas
            let delta = match reader.read_delta_since_last(entity, timestamp_ms) {
                Reading::Available(d) => d,
                Reading::Unavailable => {
                    trace!(entity, "no reading this tick");
                    report.skipped.push(entity);
                    continue;
                }
            };
            if let Err(e) = self.store.check_len(entity, &delta) {
                report.fail(entity, TickPhase::ComputingDeltas, e);
                continue;
            }
            let mut observed = Vec::new();
            let mut delta = self.observe(reader, entity, delta, &mut observed);

            // Merging
            if let Err(e) =
                self.merge_children(reader, entity, &mut delta, &mut observed, timestamp_ms)
            {
                report.fail(entity, TickPhase::Merging, e);
                continue;
            }

            // Committing
            match self.commit(entity, slot, screen_off, &delta, observed) {
                Ok(_) => report.updated.push(entity),
                Err(e) => report.fail(entity, TickPhase::Committing, e),
            }
        }

        debug!(
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "tick finished"
        );
        report
    }

    /// Fold every isolated child's delta into `delta`
    ///
    /// A child without a reading contributes nothing this tick.
    fn merge_children<R: CpuTimeReader + ?Sized>(
        &self,
        reader: &mut R,
        parent: EntityId,
        delta: &mut [u64],
        observed: &mut Vec<(EntityId, Vec<u64>)>,
        timestamp_ms: u64,
    ) -> crate::error::Result<()> {
        let children: Vec<EntityId> = self.isolated.children_of(parent).collect();
        for child in children {
            match reader.read_delta_since_last(child, timestamp_ms) {
                Reading::Available(child_delta) => {
                    self.store.check_len(child, &child_delta)?;
                    let child_delta = self.observe(reader, child, child_delta, observed);
                    vector::accumulate(delta, &child_delta);
                }
                Reading::Unavailable => trace!(child, parent, "no reading for isolated entity"),
            }
        }
        Ok(())
    }

    /// Cap a per-entity delta against the accounted level
    ///
    /// The cumulative reading is taken from the reader's baseline, which
    /// `read_delta_since_last` has just moved. Readers that keep no baseline
    /// are trusted as is.
    fn observe<R: CpuTimeReader + ?Sized>(
        &self,
        reader: &mut R,
        entity: EntityId,
        delta: Vec<u64>,
        observed: &mut Vec<(EntityId, Vec<u64>)>,
    ) -> Vec<u64> {
        match reader.baselines_mut().last(entity).map(<[u64]>::to_vec) {
            Some(cumulative) => {
                let delta = self.unaccounted(entity, &cumulative, delta);
                observed.push((entity, cumulative));
                delta
            }
            None => delta,
        }
    }
}
