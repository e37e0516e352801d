// Copy-all resync from one whole-system read
//
// Deltas are computed against the ledger's own bulk baselines so this path
// never disturbs the per-entity reader baselines. Both paths are capped by
// the accounted level, so usage seen by a tick is not attributed twice.

use super::{ProcStateLedger, TickPhase, TickReport};
use crate::reader::{CpuTimeReader, Reading};
use crate::vector;
use crate::EntityId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

impl ProcStateLedger {
    /// Attribute deltas from a single `read_all_cumulative` snapshot
    ///
    /// Every entity in the snapshot is tracked from now on (created lazily if
    /// new). Isolated children are folded into their parent when the parent is
    /// known or present in the snapshot. Entities absent from the snapshot are
    /// untouched and stay pending.
    pub fn copy_from_all_cumulative<R: CpuTimeReader + ?Sized>(
        &mut self,
        reader: &mut R,
        timestamp_ms: u64,
    ) -> TickReport {
        let mut report = TickReport::default();
        let all = match reader.read_all_cumulative() {
            Reading::Available(all) => all,
            Reading::Unavailable => {
                debug!(timestamp_ms, "whole-system read unavailable");
                report.bulk_unavailable = true;
                return report;
            }
        };

        let pending = self.pending.clone();
        let screen_off = self.time_base.screen_off_active();

        // ComputingDeltas
        let mut failed = BTreeSet::new();
        let mut deltas: BTreeMap<EntityId, (Vec<u64>, Vec<u64>)> = BTreeMap::new();
        for (entity, cumulative) in all {
            if let Err(e) = self.store.check_len(entity, &cumulative) {
                failed.insert(self.isolated.parent_of(entity).unwrap_or(entity));
                report.fail(entity, TickPhase::ComputingDeltas, e);
                continue;
            }
            let delta = self.bulk_baselines.advance(entity, &cumulative, timestamp_ms);
            let delta = self.unaccounted(entity, &cumulative, delta);
            deltas.insert(entity, (delta, cumulative));
        }

        // Merging
        let mut merged: BTreeMap<EntityId, (Vec<u64>, Vec<(EntityId, Vec<u64>)>)> =
            BTreeMap::new();
        let vector_len = self.store.vector_len();
        let present: BTreeSet<EntityId> = deltas.keys().copied().collect();
        for (entity, (delta, cumulative)) in deltas {
            let owner = match self.isolated.parent_of(entity) {
                None => entity,
                Some(parent)
                    if self.standing.contains_key(&parent) || present.contains(&parent) =>
                {
                    parent
                }
                Some(parent) => {
                    trace!(child = entity, parent, "parent never seen, dropping child delta");
                    continue;
                }
            };
            if failed.contains(&owner) {
                continue;
            }
            let (acc, observed) = merged
                .entry(owner)
                .or_insert_with(|| (vec![0; vector_len], Vec::new()));
            vector::accumulate(acc, &delta);
            observed.push((entity, cumulative));
        }

        // Committing
        for (entity, (delta, observed)) in merged {
            let slot = self.target_slot(entity, &pending);
            match self.commit(entity, slot, screen_off, &delta, observed) {
                Ok(_) => report.updated.push(entity),
                Err(e) => report.fail(entity, TickPhase::Committing, e),
            }
        }

        debug!(
            updated = report.updated.len(),
            failed = report.failures.len(),
            "copy-all finished"
        );
        report
    }
}
