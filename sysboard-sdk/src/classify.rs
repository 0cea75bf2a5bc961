use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity band of a numeric measurement.
#[derive(
    Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Normal => "normal",
            Band::Warning => "warning",
            Band::Critical => "critical",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning and critical boundaries; a value equal to a boundary belongs to the higher band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    pub warn: f64,
    pub critical: f64,
}

impl Thresholds {
    /// CPU, memory and other percentage metrics.
    pub const PERCENT: Thresholds = Thresholds {
        warn: 50.0,
        critical: 80.0,
    };

    /// Filesystem usage.
    pub const DISK: Thresholds = Thresholds {
        warn: 75.0,
        critical: 90.0,
    };

    /// Per-process CPU and memory share in a process listing.
    pub const PROCESS: Thresholds = Thresholds {
        warn: 20.0,
        critical: 50.0,
    };

    pub const fn new(warn: f64, critical: f64) -> Self {
        Self { warn, critical }
    }

    pub fn classify(&self, value: f64) -> Band {
        classify(value, *self)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::PERCENT
    }
}

pub fn classify(value: f64, thresholds: Thresholds) -> Band {
    if value >= thresholds.critical {
        Band::Critical
    } else if value >= thresholds.warn {
        Band::Warning
    } else {
        Band::Normal
    }
}
