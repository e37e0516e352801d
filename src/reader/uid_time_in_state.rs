// Reader over the kernel `uid_time_in_state` text layout
//
//   uid: 300000 576000 748800
//   0: 12 0 4
//   10032: 901 33 7
//
// Header lists frequency labels; each data line is a uid followed by one
// cumulative time per frequency, in header order.

use super::{BaselineTracker, CpuTimeReader, Reading};
use crate::error::{LedgerError, Result};
use crate::EntityId;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parsed contents of one `uid_time_in_state` snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidTimeInState {
    /// Frequency labels from the header
    pub freqs: Vec<u64>,
    /// Cumulative times per uid, same length as `freqs`
    pub times: BTreeMap<EntityId, Vec<u64>>,
}

/// Parse a `uid_time_in_state` snapshot
///
/// # Errors
/// [`LedgerError::Parse`] naming the 1-based line for a missing or malformed
/// header, a bad number, a row of the wrong width or a duplicated uid.
///
/// # Example
/// ```
/// use procstate_ledger::reader::parse_uid_time_in_state;
///
/// let parsed = parse_uid_time_in_state("uid: 100 200\n10032: 5 7\n")?;
/// assert_eq!(parsed.freqs, vec![100, 200]);
/// assert_eq!(parsed.times[&10032], vec![5, 7]);
/// # Ok::<(), procstate_ledger::LedgerError>(())
/// ```
pub fn parse_uid_time_in_state(content: &str) -> Result<UidTimeInState> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (header_line, header) = lines.next().ok_or_else(|| LedgerError::Parse {
        line: 1,
        reason: "empty input".to_string(),
    })?;
    let labels = header
        .strip_prefix("uid:")
        .ok_or_else(|| LedgerError::Parse {
            line: header_line,
            reason: "header must start with 'uid:'".to_string(),
        })?;
    let freqs = parse_numbers(labels, header_line)?;
    if freqs.is_empty() {
        return Err(LedgerError::Parse {
            line: header_line,
            reason: "header lists no frequencies".to_string(),
        });
    }

    let mut times = BTreeMap::new();
    for (line_no, line) in lines {
        let (uid, rest) = line.split_once(':').ok_or_else(|| LedgerError::Parse {
            line: line_no,
            reason: "expected '<uid>: <times...>'".to_string(),
        })?;
        let uid: EntityId = uid.trim().parse().map_err(|_| LedgerError::Parse {
            line: line_no,
            reason: format!("invalid uid '{}'", uid.trim()),
        })?;
        let values = parse_numbers(rest, line_no)?;
        if values.len() != freqs.len() {
            return Err(LedgerError::Parse {
                line: line_no,
                reason: format!(
                    "uid {} has {} values, header has {} frequencies",
                    uid,
                    values.len(),
                    freqs.len()
                ),
            });
        }
        if times.insert(uid, values).is_some() {
            return Err(LedgerError::Parse {
                line: line_no,
                reason: format!("duplicate uid {}", uid),
            });
        }
    }

    Ok(UidTimeInState { freqs, times })
}

fn parse_numbers(s: &str, line: usize) -> Result<Vec<u64>> {
    s.split_whitespace()
        .map(|tok| {
            tok.parse::<u64>().map_err(|_| LedgerError::Parse {
                line,
                reason: format!("invalid number '{}'", tok),
            })
        })
        .collect()
}

/// [`CpuTimeReader`] backed by a `uid_time_in_state` file
///
/// Every read re-reads the file. A missing file, a malformed snapshot or an
/// absent uid make the read unavailable for this round.
#[derive(Debug, Clone)]
pub struct UidTimeInStateReader {
    path: PathBuf,
    baselines: BaselineTracker,
}

impl UidTimeInStateReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            baselines: BaselineTracker::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file
    pub fn load(&self) -> Result<UidTimeInState> {
        let content = fs::read_to_string(&self.path).map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_uid_time_in_state(&content)
    }

    fn snapshot(&self) -> Option<UidTimeInState> {
        match self.load() {
            Ok(s) => Some(s),
            Err(LedgerError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "uid_time_in_state not present");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable uid_time_in_state");
                None
            }
        }
    }
}

impl CpuTimeReader for UidTimeInStateReader {
    fn read_cumulative(&mut self, entity: EntityId) -> Reading<Vec<u64>> {
        self.snapshot()
            .and_then(|mut s| s.times.remove(&entity))
            .into()
    }

    fn baselines_mut(&mut self) -> &mut BaselineTracker {
        &mut self.baselines
    }

    fn read_all_cumulative(&mut self) -> Reading<BTreeMap<EntityId, Vec<u64>>> {
        self.snapshot().map(|s| s.times).into()
    }
}
