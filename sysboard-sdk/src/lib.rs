use anyhow::Result;
use serde::Serialize;
use std::fmt;

mod classify;
mod config;
mod input;
mod outcome;
pub mod table;

pub use classify::{Band, Thresholds, classify};
pub use config::{DashboardConfig, ThresholdConfig, WindowConfig};
pub use input::{
    ArchiveEntry, BackupFeed, CommandKind, DashboardInput, Fetched, JsonObject, MonitoringFeed,
    SecurityFeed,
};
pub use outcome::{CommandOutput, Outcome, UpstreamError};

/// Panel metadata used for ordering, rendering and logging.
#[derive(Debug, Clone, Copy)]
pub struct PanelMetadata {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub order: u16,
}

/// Section status describing how much of a panel could be produced.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Success,
    Degraded,
    Empty,
    Error,
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SectionStatus::Success => "success",
            SectionStatus::Degraded => "degraded",
            SectionStatus::Empty => "no data",
            SectionStatus::Error => "error",
        };
        f.write_str(value)
    }
}

/// A classified observation a panel wants surfaced in the health digest.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Flag {
    pub band: Band,
    pub message: String,
}

/// Result produced by a panel.
#[derive(Debug, Serialize)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    pub status: SectionStatus,
    pub summary: Option<String>,
    pub body: serde_json::Value,
    pub notes: Vec<String>,
    pub flags: Vec<Flag>,
}

impl Section {
    pub fn success(id: &'static str, title: &'static str, body: serde_json::Value) -> Self {
        Self {
            id,
            title,
            status: SectionStatus::Success,
            summary: None,
            body,
            notes: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn degraded(
        id: &'static str,
        title: &'static str,
        summary: String,
        body: serde_json::Value,
    ) -> Self {
        Self {
            id,
            title,
            status: SectionStatus::Degraded,
            summary: Some(summary),
            body,
            notes: Vec::new(),
            flags: Vec::new(),
        }
    }

    /// The "no data" state: the source answered but nothing usable was in it.
    pub fn empty(id: &'static str, title: &'static str, summary: String) -> Self {
        Self {
            id,
            title,
            status: SectionStatus::Empty,
            summary: Some(summary),
            body: serde_json::Value::Null,
            notes: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn error(id: &'static str, title: &'static str, error: String) -> Self {
        Self {
            id,
            title,
            status: SectionStatus::Error,
            summary: Some(error.clone()),
            body: serde_json::json!({ "error": error }),
            notes: Vec::new(),
            flags: Vec::new(),
        }
    }

    /// Adds a flag and downgrades a successful section to degraded.
    pub fn flag(&mut self, band: Band, message: impl Into<String>) {
        if band == Band::Normal {
            return;
        }
        if self.status == SectionStatus::Success {
            self.status = SectionStatus::Degraded;
        }
        self.flags.push(Flag {
            band,
            message: message.into(),
        });
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }
}

/// Common interface for dashboard panels.
pub trait Panel: Send + Sync + 'static {
    fn metadata(&self) -> PanelMetadata;
    fn build(&self, input: &DashboardInput) -> Result<Section>;
}

/// Descriptor of a compile-time registry entry.
pub struct PanelRegistration {
    pub constructor: fn() -> Box<dyn Panel>,
}

inventory::collect!(PanelRegistration);

pub use inventory;

/// Helper macro to register a panel inside a module.
#[macro_export]
macro_rules! register_panel {
    ($ctor:expr) => {
        ::sysboard_sdk::inventory::submit! {
            ::sysboard_sdk::PanelRegistration {
                constructor: $ctor,
            }
        }
    };
}

pub fn iter_registered_panels() -> impl Iterator<Item = &'static PanelRegistration> {
    inventory::iter::<PanelRegistration>.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flag_degrades_successful_section() {
        let mut section = Section::success("demo", "Demo", json!({}));
        section.flag(Band::Warning, "disk filling up");
        assert_eq!(section.status, SectionStatus::Degraded);
        assert_eq!(section.flags.len(), 1);
    }

    #[test]
    fn normal_flags_are_ignored() {
        let mut section = Section::success("demo", "Demo", json!({}));
        section.flag(Band::Normal, "fine");
        assert_eq!(section.status, SectionStatus::Success);
        assert!(section.flags.is_empty());
    }

    #[test]
    fn flag_keeps_error_status() {
        let mut section = Section::error("demo", "Demo", "boom".into());
        section.flag(Band::Critical, "still bad");
        assert_eq!(section.status, SectionStatus::Error);
    }

    #[test]
    fn empty_status_renders_as_no_data() {
        assert_eq!(SectionStatus::Empty.to_string(), "no data");
        let section = Section::empty("demo", "Demo", "No demo data available".into());
        assert!(section.body.is_null());
    }
}
