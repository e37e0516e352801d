//! Error types for the accounting core
//!
//! Unavailable reader data is not an error (see [`crate::reader::Reading`]);
//! only configuration and programming faults end up here.

use std::path::PathBuf;
use thiserror::Error;

use crate::EntityId;

/// Errors surfaced by the ledger, store, readers and config loader
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("vector length mismatch for entity {entity}: expected {expected}, got {actual}")]
    VectorLengthMismatch {
        entity: EntityId,
        expected: usize,
        actual: usize,
    },

    #[error("cannot isolate entity {child} under {parent}: {reason}")]
    InvalidIsolation {
        parent: EntityId,
        child: EntityId,
        reason: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
