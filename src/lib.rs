//! procstate-ledger - per-entity CPU time accounting by process state
//!
//! This library attributes cumulative per-frequency CPU time of process
//! owners (UIDs) to the process state they were in, split into an all-time
//! column and an on-battery screen-off column. Isolated entities are folded
//! into their parent, and deltas come either from per-entity reads or from
//! a whole-system snapshot. Wakelock hold time is tracked per entity alongside.

pub mod classification;
pub mod cli;
pub mod config;
pub mod error;
pub mod isolated;
pub mod ledger;
pub mod reader;
pub mod report;
pub mod scenario;
pub mod store;
pub mod time_base;
pub mod vector;
pub mod wakelock;

/// Identifier of a tracked entity (a UID)
pub type EntityId = u32;

pub use classification::Classification;
pub use error::LedgerError;
pub use ledger::{ProcStateLedger, SharedLedger, TickReport};
