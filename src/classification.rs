//! Process-state classification
//!
//! Every entity is attributed to exactly one of a small closed set of
//! operating states. The accumulator keeps one extra row, [`StateSlot::Unknown`],
//! for usage seen before the first classification arrived.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating state of an entity, ordered from most to least important
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Top,
    ForegroundService,
    Foreground,
    Background,
    TopSleeping,
    HeavyWeight,
    Cached,
}

impl Classification {
    /// Number of real classifications
    pub const COUNT: usize = 7;

    /// All classifications in slot order
    pub const ALL: [Classification; Self::COUNT] = [
        Classification::Top,
        Classification::ForegroundService,
        Classification::Foreground,
        Classification::Background,
        Classification::TopSleeping,
        Classification::HeavyWeight,
        Classification::Cached,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Top => "top",
            Classification::ForegroundService => "foreground_service",
            Classification::Foreground => "foreground",
            Classification::Background => "background",
            Classification::TopSleeping => "top_sleeping",
            Classification::HeavyWeight => "heavy_weight",
            Classification::Cached => "cached",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the bucketed accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSlot {
    Known(Classification),
    Unknown,
}

impl StateSlot {
    /// Number of accumulator rows (classifications plus `Unknown`)
    pub const COUNT: usize = Classification::COUNT + 1;

    pub fn index(self) -> usize {
        match self {
            StateSlot::Known(c) => c as usize,
            StateSlot::Unknown => Classification::COUNT,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index == Classification::COUNT {
            Some(StateSlot::Unknown)
        } else {
            Classification::ALL.get(index).copied().map(StateSlot::Known)
        }
    }
}

impl From<Classification> for StateSlot {
    fn from(c: Classification) -> Self {
        StateSlot::Known(c)
    }
}

impl From<Option<Classification>> for StateSlot {
    fn from(c: Option<Classification>) -> Self {
        c.map_or(StateSlot::Unknown, StateSlot::Known)
    }
}

impl fmt::Display for StateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateSlot::Known(c) => c.fmt(f),
            StateSlot::Unknown => f.write_str("unknown"),
        }
    }
}

/// Thresholds mapping a raw scheduler importance code to a classification
///
/// Lower codes are more important. Each field is the inclusive upper bound of
/// its band, except `top` (exact match) and `nonexistent` (first code that
/// means the process is gone).
///
/// # Example
/// ```
/// use procstate_ledger::classification::{Classification, ImportanceBands};
///
/// let bands = ImportanceBands::default();
/// assert_eq!(bands.classify(11), Some(Classification::Background));
/// assert_eq!(bands.classify(19), Some(Classification::Cached));
/// assert_eq!(bands.classify(20), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceBands {
    pub top: i32,
    pub foreground_service: i32,
    pub foreground: i32,
    pub background: i32,
    pub top_sleeping: i32,
    pub heavy_weight: i32,
    pub nonexistent: i32,
}

impl Default for ImportanceBands {
    fn default() -> Self {
        Self {
            top: 2,
            foreground_service: 4,
            foreground: 6,
            background: 11,
            top_sleeping: 12,
            heavy_weight: 13,
            nonexistent: 20,
        }
    }
}

impl ImportanceBands {
    /// Map a raw importance code, `None` when the process no longer exists
    pub fn classify(&self, code: i32) -> Option<Classification> {
        if code >= self.nonexistent {
            return None;
        }
        let c = if code == self.top {
            Classification::Top
        } else if code <= self.foreground_service {
            Classification::ForegroundService
        } else if code <= self.foreground {
            Classification::Foreground
        } else if code <= self.background {
            Classification::Background
        } else if code <= self.top_sleeping {
            Classification::TopSleeping
        } else if code <= self.heavy_weight {
            Classification::HeavyWeight
        } else {
            Classification::Cached
        };
        Some(c)
    }

    /// Bands must be strictly increasing
    pub fn validate(&self) -> Result<(), String> {
        let bounds = [
            ("top", self.top),
            ("foreground_service", self.foreground_service),
            ("foreground", self.foreground),
            ("background", self.background),
            ("top_sleeping", self.top_sleeping),
            ("heavy_weight", self.heavy_weight),
            ("nonexistent", self.nonexistent),
        ];
        for pair in bounds.windows(2) {
            let (lo_name, lo) = pair[0];
            let (hi_name, hi) = pair[1];
            if hi <= lo {
                return Err(format!(
                    "importance band {} ({}) must be greater than {} ({})",
                    hi_name, hi, lo_name, lo
                ));
            }
        }
        Ok(())
    }
}
