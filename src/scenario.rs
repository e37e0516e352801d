//! Scripted replay of ledger events
//!
//! A scenario is a JSON document listing notifications, reader samples and
//! ticks in order. Replaying it drives a [`ProcStateLedger`] with a
//! [`ScriptedReader`], which makes accounting runs reproducible from a file.
//!
//! ```json
//! {
//!   "vector_len": 3,
//!   "events": [
//!     { "event": "classify", "entity": 10032, "state": "top", "at_ms": 0 },
//!     { "event": "sample", "entity": 10032, "cumulative": [5, 0, 1] },
//!     { "event": "tick", "at_ms": 1000 }
//!   ]
//! }
//! ```

use crate::classification::Classification;
use crate::config::LedgerConfig;
use crate::ledger::{ProcStateLedger, TickReport};
use crate::reader::ScriptedReader;
use crate::EntityId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// One scripted step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScenarioEvent {
    Classify {
        entity: EntityId,
        state: Classification,
        #[serde(default)]
        at_ms: u64,
    },
    ProcessState {
        entity: EntityId,
        importance: i32,
        #[serde(default)]
        at_ms: u64,
    },
    TimeBase {
        on_battery: bool,
        screen_off: bool,
        #[serde(default)]
        at_ms: u64,
    },
    Isolated {
        parent: EntityId,
        child: EntityId,
    },
    WakelockAcquire {
        entity: EntityId,
        at_ms: u64,
    },
    WakelockRelease {
        entity: EntityId,
        at_ms: u64,
    },
    Sample {
        entity: EntityId,
        cumulative: Vec<u64>,
    },
    Unavailable {
        entity: EntityId,
    },
    BulkSample {
        entity: EntityId,
        cumulative: Vec<u64>,
    },
    Tick {
        at_ms: u64,
    },
    CopyAll {
        at_ms: u64,
    },
}

/// A full scenario document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Overrides the configured vector length when present
    #[serde(default)]
    pub vector_len: Option<usize>,
    pub events: Vec<ScenarioEvent>,
}

/// Ledger state and per-tick reports after a replay
#[derive(Debug)]
pub struct ReplayOutcome {
    pub ledger: ProcStateLedger,
    pub ticks: Vec<TickReport>,
}

impl ReplayOutcome {
    /// Total number of abandoned entity updates across all ticks
    pub fn failure_count(&self) -> usize {
        self.ticks.iter().map(|t| t.failures.len()).sum()
    }
}

impl Scenario {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse scenario JSON")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read scenario: {}", path.as_ref().display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid scenario: {}", path.as_ref().display()))
    }

    /// Run every event in order against a fresh ledger
    pub fn replay(&self, mut config: LedgerConfig) -> Result<ReplayOutcome> {
        if let Some(len) = self.vector_len {
            config.vector_len = len;
        }
        let mut ledger = ProcStateLedger::new(config).context("Invalid ledger configuration")?;
        let mut reader = ScriptedReader::new();
        let mut ticks = Vec::new();

        for (index, event) in self.events.iter().enumerate() {
            match event {
                ScenarioEvent::Classify {
                    entity,
                    state,
                    at_ms,
                } => ledger.on_classification_changed(*entity, *state, *at_ms),
                ScenarioEvent::ProcessState {
                    entity,
                    importance,
                    at_ms,
                } => {
                    ledger.on_process_state_changed(*entity, *importance, *at_ms);
                }
                ScenarioEvent::TimeBase {
                    on_battery,
                    screen_off,
                    at_ms,
                } => ledger.on_time_base_changed(*on_battery, *screen_off, *at_ms),
                ScenarioEvent::Isolated { parent, child } => ledger
                    .add_isolated(*parent, *child)
                    .with_context(|| format!("Invalid isolated event #{}", index + 1))?,
                ScenarioEvent::WakelockAcquire { entity, at_ms } => {
                    ledger.on_wakelock_acquired(*entity, *at_ms)
                }
                ScenarioEvent::WakelockRelease { entity, at_ms } => {
                    ledger.on_wakelock_released(*entity, *at_ms);
                }
                ScenarioEvent::Sample { entity, cumulative } => {
                    reader.set_cumulative(*entity, cumulative.clone())
                }
                ScenarioEvent::Unavailable { entity } => reader.set_unavailable(*entity),
                ScenarioEvent::BulkSample { entity, cumulative } => {
                    reader.set_bulk_cumulative(*entity, cumulative.clone())
                }
                ScenarioEvent::Tick { at_ms } => {
                    ticks.push(ledger.update_proc_state_times(&mut reader, *at_ms));
                }
                ScenarioEvent::CopyAll { at_ms } => {
                    ticks.push(ledger.copy_from_all_cumulative(&mut reader, *at_ms));
                }
            }
        }

        info!(
            events = self.events.len(),
            ticks = ticks.len(),
            "scenario replayed"
        );
        Ok(ReplayOutcome { ledger, ticks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "vector_len": 2,
        "events": [
            { "event": "classify", "entity": 10, "state": "top", "at_ms": 0 },
            { "event": "process_state", "entity": 20, "importance": 19 },
            { "event": "isolated", "parent": 10, "child": 99 },
            { "event": "sample", "entity": 10, "cumulative": [1, 2] },
            { "event": "sample", "entity": 99, "cumulative": [10, 10] },
            { "event": "tick", "at_ms": 100 },
            { "event": "time_base", "on_battery": true, "screen_off": true, "at_ms": 150 },
            { "event": "bulk_sample", "entity": 20, "cumulative": [4, 4] },
            { "event": "copy_all", "at_ms": 200 }
        ]
    }"#;

    #[test]
    fn test_parse_events() {
        let s = Scenario::from_json_str(SCENARIO).unwrap();
        assert_eq!(s.vector_len, Some(2));
        assert_eq!(s.events.len(), 9);
        assert_eq!(
            s.events[0],
            ScenarioEvent::Classify {
                entity: 10,
                state: Classification::Top,
                at_ms: 0
            }
        );
        assert_eq!(
            s.events[1],
            ScenarioEvent::ProcessState {
                entity: 20,
                importance: 19,
                at_ms: 0
            }
        );
    }

    #[test]
    fn test_replay() {
        let outcome = Scenario::from_json_str(SCENARIO)
            .unwrap()
            .replay(LedgerConfig::default())
            .unwrap();
        assert_eq!(outcome.ticks.len(), 2);
        assert_eq!(outcome.failure_count(), 0);

        let l = &outcome.ledger;
        assert_eq!(l.vector_len(), 2);
        assert_eq!(l.get_bucket(10, Classification::Top, false), Some(&[11, 12][..]));
        assert_eq!(l.get_bucket(20, Classification::Cached, false), Some(&[4, 4][..]));
        assert_eq!(l.get_bucket(20, Classification::Cached, true), Some(&[4, 4][..]));
    }

    #[test]
    fn test_unknown_event_rejected() {
        let err = Scenario::from_json_str(r#"{"events": [{"event": "reboot"}]}"#).unwrap_err();
        assert!(format!("{:#}", err).contains("scenario"));
    }

    #[test]
    fn test_invalid_isolation_fails_replay() {
        let s = Scenario::from_json_str(
            r#"{"events": [
                {"event": "isolated", "parent": 10, "child": 99},
                {"event": "isolated", "parent": 99, "child": 7}
            ]}"#,
        )
        .unwrap();
        let err = s.replay(LedgerConfig::default()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("isolated event #2"));
        assert!(msg.contains("parent is itself isolated"));
    }

    #[test]
    fn test_wakelock_events() {
        let s = Scenario::from_json_str(
            r#"{"events": [
                {"event": "time_base", "on_battery": true, "screen_off": true, "at_ms": 0},
                {"event": "isolated", "parent": 10, "child": 99},
                {"event": "wakelock_acquire", "entity": 10, "at_ms": 1000},
                {"event": "wakelock_acquire", "entity": 99, "at_ms": 1002},
                {"event": "wakelock_release", "entity": 10, "at_ms": 1005},
                {"event": "wakelock_release", "entity": 99, "at_ms": 1009}
            ]}"#,
        )
        .unwrap();
        let outcome = s.replay(LedgerConfig::default()).unwrap();
        assert_eq!(outcome.ledger.wakelock_time_ms(10, 2000), 9);
        assert_eq!(outcome.ledger.wakelock_time_ms(99, 2000), 0);
    }

    #[test]
    fn test_failures_counted() {
        let s = Scenario::from_json_str(
            r#"{"vector_len": 3, "events": [
                {"event": "classify", "entity": 1, "state": "cached"},
                {"event": "sample", "entity": 1, "cumulative": [1]},
                {"event": "tick", "at_ms": 1}
            ]}"#,
        )
        .unwrap();
        let outcome = s.replay(LedgerConfig::default()).unwrap();
        assert_eq!(outcome.failure_count(), 1);
    }
}
