//! Point-in-time view of a ledger for reporting
//!
//! Text output is a fixed-width table; JSON output is the serde form of
//! [`LedgerSnapshot`].

use crate::classification::{Classification, StateSlot};
use crate::ledger::ProcStateLedger;
use crate::time_base::{Column, TimeBase};
use crate::EntityId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// One recorded row of an entity's accumulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSnapshot {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_time: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_off: Option<Vec<u64>>,
}

/// Accounting state of one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    pub entity: EntityId,
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<Classification>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntityId>,
    pub buckets: Vec<BucketSnapshot>,
}

/// Whole-ledger snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub vector_len: usize,
    pub time_base: TimeBase,
    pub entities: Vec<EntitySnapshot>,
}

impl ProcStateLedger {
    /// Capture every known entity and every entity with recorded buckets
    pub fn snapshot(&self) -> LedgerSnapshot {
        let ids: BTreeSet<EntityId> = self
            .known_entities()
            .chain(self.store().entities())
            .collect();

        let entities = ids
            .into_iter()
            .map(|entity| {
                let buckets = self
                    .store()
                    .accumulator(entity)
                    .map(|acc| {
                        acc.recorded_slots()
                            .map(|slot| BucketSnapshot {
                                state: slot.to_string(),
                                all_time: acc.get(slot, Column::AllTime).map(<[u64]>::to_vec),
                                screen_off: acc.get(slot, Column::ScreenOff).map(<[u64]>::to_vec),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                EntitySnapshot {
                    entity,
                    classification: self.classification_of(entity),
                    pending: self.pending().get(&entity).copied(),
                    children: self.isolated().children_of(entity).collect(),
                    buckets,
                }
            })
            .collect();

        LedgerSnapshot {
            vector_len: self.vector_len(),
            time_base: *self.time_base(),
            entities,
        }
    }
}

impl LedgerSnapshot {
    pub fn entity(&self, entity: EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.entity == entity)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for LedgerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "time base: on_battery={} screen_off={} since={}ms",
            self.time_base.on_battery, self.time_base.screen_off, self.time_base.last_transition_ms
        )?;
        writeln!(
            f,
            "{:>8} {:<20} {:<10} {}",
            "entity", "state", "column", "cpu time per frequency"
        )?;
        writeln!(f, "{}", "─".repeat(64))?;

        for e in &self.entities {
            let label = e
                .classification
                .map_or_else(|| StateSlot::Unknown.to_string(), |c| c.to_string());
            if e.buckets.is_empty() {
                writeln!(f, "{:>8} {:<20} {:<10} -", e.entity, label, "")?;
            }
            for b in &e.buckets {
                if let Some(v) = &b.all_time {
                    writeln!(f, "{:>8} {:<20} {:<10} {}", e.entity, b.state, "all", join(v))?;
                }
                if let Some(v) = &b.screen_off {
                    writeln!(
                        f,
                        "{:>8} {:<20} {:<10} {}",
                        e.entity,
                        b.state,
                        "screen_off",
                        join(v)
                    )?;
                }
            }
            if !e.children.is_empty() {
                let children: Vec<String> = e.children.iter().map(ToString::to_string).collect();
                writeln!(f, "{:>8} isolated: {}", "", children.join(", "))?;
            }
        }
        Ok(())
    }
}

fn join(v: &[u64]) -> String {
    v.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}
