use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use sysboard_sdk::{self, DashboardInput, Section};

use crate::health::{HealthDigest, build_health_digest};
pub use health::{Finding, Severity};

mod render;
pub mod schema;

pub use sysboard_sdk::{DashboardConfig, SectionStatus};

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub sections: usize,
}

impl ReportMetadata {
    pub fn generated_at_utc(&self) -> Option<DateTime<Utc>> {
        let seconds = self.generated_at.parse::<i64>().ok()?;
        DateTime::<Utc>::from_timestamp(seconds, 0)
    }

    pub fn generated_at_iso8601(&self) -> String {
        self.generated_at_utc()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub sections: Vec<Section>,
    pub health_digest: HealthDigest,
}

impl Report {
    pub fn new(sections: Vec<Section>) -> Self {
        let generated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .unwrap_or_else(|_| "0".to_string());

        let count = sections.len();
        let health_digest = build_health_digest(&sections);

        Self {
            metadata: ReportMetadata {
                generated_at,
                sections: count,
            },
            sections,
            health_digest,
        }
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "metadata": {
                "generated_at": self.metadata.generated_at,
                "sections": self.metadata.sections,
                "health_digest": self.health_digest,
            },
            "sections": self.sections,
        })
    }

    pub fn to_markdown(&self) -> Result<String> {
        render::render_markdown(self).map_err(Into::into)
    }

    pub fn to_html(&self) -> Result<String> {
        render::render_html(self).map_err(Into::into)
    }
}

fn collect_sections(input: &DashboardInput) -> Vec<Section> {
    let mut panels: Vec<_> = sysboard_sdk::iter_registered_panels()
        .map(|entry| (entry.constructor)())
        .collect();
    panels.sort_by_key(|panel| {
        let metadata = panel.metadata();
        (metadata.order, metadata.id)
    });

    let mut sections = Vec::with_capacity(panels.len());
    for panel in panels {
        let metadata = panel.metadata();
        match panel.build(input) {
            Ok(section) => {
                tracing::debug!(panel = metadata.id, status = %section.status, "panel built");
                sections.push(section);
            }
            Err(error) => {
                tracing::warn!(panel = metadata.id, error = %format!("{error:#}"), "panel failed");
                sections.push(Section::error(
                    metadata.id,
                    metadata.title,
                    error.to_string(),
                ));
            }
        }
    }

    sections
}

/// Builds every registered panel against `input`, in panel order.
pub fn build_report(input: &DashboardInput) -> Report {
    Report::new(collect_sections(input))
}

mod health {
    use super::{Section, SectionStatus};
    use serde::Serialize;
    use sysboard_sdk::Band;

    #[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, PartialOrd, Ord)]
    #[serde(rename_all = "lowercase")]
    pub enum Severity {
        #[default]
        Info,
        Warning,
        Critical,
    }

    impl Severity {
        pub fn as_str(&self) -> &'static str {
            match self {
                Severity::Info => "info",
                Severity::Warning => "warning",
                Severity::Critical => "critical",
            }
        }

        pub fn display_label(&self) -> &'static str {
            match self {
                Severity::Info => "Info",
                Severity::Warning => "Warning",
                Severity::Critical => "Critical",
            }
        }

        fn from_band(band: Band) -> Self {
            match band {
                Band::Normal => Severity::Info,
                Band::Warning => Severity::Warning,
                Band::Critical => Severity::Critical,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Default)]
    pub struct HealthDigest {
        pub overall: Severity,
        pub findings: Vec<Finding>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct Finding {
        pub source_id: String,
        pub source_title: String,
        pub severity: Severity,
        pub message: String,
    }

    impl Finding {
        fn new(section: &Section, severity: Severity, message: String) -> Self {
            Self {
                source_id: section.id.to_string(),
                source_title: section.title.to_string(),
                severity,
                message,
            }
        }
    }

    pub fn build_health_digest(sections: &[Section]) -> HealthDigest {
        let mut findings: Vec<Finding> = Vec::new();

        for section in sections {
            match section.status {
                SectionStatus::Success | SectionStatus::Empty => {}
                SectionStatus::Degraded if !section.flags.is_empty() => {}
                SectionStatus::Degraded => {
                    let message = section
                        .summary
                        .clone()
                        .unwrap_or_else(|| "Panel reported a degraded state".to_string());
                    findings.push(Finding::new(section, Severity::Warning, message));
                }
                SectionStatus::Error => {
                    let message = section
                        .summary
                        .clone()
                        .unwrap_or_else(|| "Panel failed".to_string());
                    findings.push(Finding::new(section, Severity::Critical, message));
                }
            }

            for flag in &section.flags {
                findings.push(Finding::new(
                    section,
                    Severity::from_band(flag.band),
                    flag.message.clone(),
                ));
            }
        }

        findings.sort_by(|a, b| b.severity.cmp(&a.severity));

        let overall = findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Info);

        HealthDigest { overall, findings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sysboard_sdk::{Band, CommandKind, CommandOutput, MonitoringFeed, UpstreamError};

    // Link panels so their registrations are collected.
    use mod_backups as _;
    use mod_monitoring as _;
    use mod_network as _;
    use mod_processes as _;
    use mod_security as _;
    use mod_storage as _;
    use mod_system as _;

    fn sample_input() -> DashboardInput {
        let mut input = DashboardInput::new();
        let mut system = sysboard_sdk::JsonObject::new();
        system.insert("hostname".into(), json!("web01"));
        system.insert("os".into(), json!("Debian GNU/Linux 12"));
        input.set_system(Ok(system));

        let mut monitoring = MonitoringFeed::default();
        monitoring.push_point(json!({"type": "cpu", "timestamp": 1_700_000_000, "value": 35.0}));
        monitoring.push_point(json!({"type": "memory", "timestamp": 1_700_000_000, "value": 61.0}));
        input.set_monitoring(Ok(monitoring));

        input.set_command(
            CommandKind::DiskUsage,
            CommandOutput::ok(
                "Filesystem Size Used Avail Use% Mounted on\n/dev/sda1 50G 46G 4G 92% /\n",
            ),
        );
        input
    }

    #[test]
    fn report_orders_sections_by_panel() {
        let report = build_report(&sample_input());
        let ids: Vec<&str> = report.sections.iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                "system",
                "monitoring",
                "alerts",
                "processes",
                "storage",
                "network",
                "backups",
                "security"
            ]
        );
        assert_eq!(report.metadata.sections, report.sections.len());
    }

    #[test]
    fn uncaptured_commands_become_error_sections() {
        let report = build_report(&sample_input());
        let processes = report.section("processes").unwrap();
        assert_eq!(processes.status, SectionStatus::Error);
        assert!(processes.summary.as_deref().unwrap().contains("not captured"));
    }

    #[test]
    fn digest_collects_flags_and_errors() {
        let report = build_report(&sample_input());
        let digest = &report.health_digest;
        assert_eq!(digest.overall, Severity::Critical);
        assert!(
            digest
                .findings
                .iter()
                .any(|f| f.source_id == "storage" && f.message.contains("92%"))
        );
        assert!(
            digest
                .findings
                .iter()
                .any(|f| f.source_id == "monitoring" && f.severity == Severity::Warning)
        );
        assert!(digest.findings.windows(2).all(|w| w[0].severity >= w[1].severity));
    }

    #[test]
    fn digest_uses_summary_for_unflagged_degradation() {
        let degraded = Section::degraded("demo", "Demo", "something off".to_string(), json!({}));
        let report = Report::new(vec![degraded]);
        assert_eq!(report.health_digest.overall, Severity::Warning);
        assert_eq!(report.health_digest.findings.len(), 1);
        assert!(
            report.health_digest.findings[0]
                .message
                .contains("something off")
        );
    }

    #[test]
    fn flags_replace_the_summary_finding() {
        let mut section = Section::success("demo", "Demo", json!({}));
        section.summary = Some("two problems".into());
        section.flag(Band::Warning, "first");
        section.flag(Band::Critical, "second");
        let report = Report::new(vec![section]);
        let messages: Vec<&str> = report
            .health_digest
            .findings
            .iter()
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(messages, vec!["second", "first"]);
    }

    #[test]
    fn empty_sections_are_not_findings() {
        let empty = Section::empty("demo", "Demo", "No demo data available".into());
        let report = Report::new(vec![empty]);
        assert_eq!(report.health_digest.overall, Severity::Info);
        assert!(report.health_digest.findings.is_empty());
    }

    #[test]
    fn failed_feed_reports_error_state() {
        let mut input = sample_input();
        input.set_security(Err(UpstreamError::Unavailable("scanner offline".into())));
        let report = build_report(&input);
        let security = report.section("security").unwrap();
        assert_eq!(security.status, SectionStatus::Error);
        assert_eq!(security.body["error"], "Error loading security data: scanner offline");
    }

    #[test]
    fn metadata_provides_iso8601_timestamp() {
        let report = Report::new(Vec::new());
        let iso = report.metadata.generated_at_iso8601();
        assert!(iso.contains('T'));
        assert!(iso.ends_with("+00:00"));
    }

    #[test]
    fn markdown_render_contains_sections() {
        let report = build_report(&sample_input());
        let md = report.to_markdown().expect("markdown render");
        assert!(md.contains("# Dashboard Report"));
        assert!(md.contains("## Health Digest"));
        assert!(md.contains("## Disk Usage"));
        assert!(md.contains("/dev/sda1"));
    }

    #[test]
    fn html_render_contains_structure() {
        let report = build_report(&sample_input());
        let html = report.to_html().expect("html render");
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("Dashboard Report"));
        assert!(html.contains("class=\"card status-"));
        assert!(html.contains("Overall Status"));
    }

    #[test]
    fn json_report_matches_schema() {
        let report = build_report(&sample_input());
        let instance = report.to_json_value();
        assert!(jsonschema::is_valid(schema::report_schema(), &instance));

        let mut broken = instance.clone();
        broken["sections"][0]["status"] = json!("exploded");
        assert!(!jsonschema::is_valid(schema::report_schema(), &broken));
    }
}
