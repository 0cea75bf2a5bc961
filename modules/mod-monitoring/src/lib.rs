use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use sysboard_sdk::{
    Band, CommandKind, DashboardConfig, DashboardInput, MonitoringFeed, Outcome, Panel,
    PanelMetadata, Section, Thresholds, register_panel,
};

pub mod alerts;
pub mod timeline;

use alerts::{AlertLevel, parse_alert_log};
use timeline::{Sample, group_by_filesystem, headline, height, load_components, load_scale, window};

const ID: &str = "monitoring";
const TITLE: &str = "Resource Monitoring";
const ALERTS_ID: &str = "alerts";
const ALERTS_TITLE: &str = "Recent Alerts";

/// CPU and memory charts never scale below 100%.
const PERCENT_SCALE_FLOOR: f64 = 100.0;

struct MonitoringPanel;

impl Panel for MonitoringPanel {
    fn metadata(&self) -> PanelMetadata {
        PanelMetadata {
            id: ID,
            title: TITLE,
            description: "CPU, memory, disk and load history",
            order: 20,
        }
    }

    fn build(&self, input: &DashboardInput) -> Result<Section> {
        match input.monitoring() {
            Ok(feed) => Ok(section_from_feed(feed, input.config())),
            Err(error) => Ok(Section::error(
                ID,
                TITLE,
                format!("Error loading monitoring data: {error}"),
            )),
        }
    }
}

struct AlertsPanel;

impl Panel for AlertsPanel {
    fn metadata(&self) -> PanelMetadata {
        PanelMetadata {
            id: ALERTS_ID,
            title: ALERTS_TITLE,
            description: "Tail of the monitoring alert log",
            order: 25,
        }
    }

    fn build(&self, input: &DashboardInput) -> Result<Section> {
        let limit = input.config().windows.alerts;
        let outcome = match input.command_text(CommandKind::AlertLog) {
            Ok(text) => Outcome::from_rows(parse_alert_log(text, limit)),
            Err(error) => Outcome::Failed(error),
        };
        Ok(alerts_section(outcome))
    }
}

fn create_monitoring_panel() -> Box<dyn Panel> {
    Box::new(MonitoringPanel)
}

fn create_alerts_panel() -> Box<dyn Panel> {
    Box::new(AlertsPanel)
}

register_panel!(create_monitoring_panel);
register_panel!(create_alerts_panel);

#[derive(Debug, Clone, Serialize, PartialEq)]
struct ChartPoint {
    timestamp: DateTime<Utc>,
    value: f64,
    band: Band,
    height: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct MetricChart {
    latest: f64,
    band: Band,
    scale: f64,
    points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct DiskGroup {
    filesystem: String,
    mountpoint: String,
    latest: f64,
    band: Band,
    points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct LoadPoint {
    timestamp: DateTime<Utc>,
    load1: f64,
    load5: f64,
    load15: f64,
    heights: [f64; 3],
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct LoadChart {
    cores: Option<f64>,
    scale: f64,
    points: Vec<LoadPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct MonitoringSummary {
    last_run: String,
    alerts: u64,
    cpu_usage: String,
    memory_usage: String,
    disk_usage: String,
}

fn section_from_feed(feed: &MonitoringFeed, config: &DashboardConfig) -> Section {
    let cpu = timeline::samples(&feed.cpu, "value");
    let memory = timeline::samples(&feed.memory, "value");
    let disk = timeline::samples(&feed.disk, "value");
    let load = timeline::samples(&feed.load, "load1");

    if cpu.is_empty() && memory.is_empty() && disk.is_empty() && load.is_empty() {
        return Section::empty(ID, TITLE, "No monitoring data available".into());
    }

    let windows = &config.windows;
    let thresholds = &config.thresholds;
    let summary = summarize(&feed.summary, &cpu, &memory, &disk);

    let cpu_chart = metric_chart(window(&cpu, windows.metrics), thresholds.cpu);
    let memory_chart = metric_chart(window(&memory, windows.metrics), thresholds.memory);
    let disk_groups = disk_groups(&disk, windows.disk, thresholds.disk);
    let load_chart = load_chart(window(&load, windows.metrics));

    let mut notes = Vec::new();
    for (label, missing) in [
        ("CPU", cpu_chart.is_none()),
        ("memory", memory_chart.is_none()),
        ("disk", disk_groups.is_empty()),
        ("load", load_chart.is_none()),
    ] {
        if missing {
            notes.push(format!("No {label} data available"));
        }
    }

    let body = json!({
        "summary": summary,
        "cpu": cpu_chart,
        "memory": memory_chart,
        "disk": disk_groups,
        "load": load_chart,
    });

    let mut section = Section::success(ID, TITLE, body);
    section.summary = Some(format!(
        "CPU {}, memory {}, disk {}",
        summary.cpu_usage, summary.memory_usage, summary.disk_usage
    ));
    section.notes = notes;

    if let Some(chart) = &cpu_chart {
        section.flag(chart.band, format!("CPU usage at {:.1}%", chart.latest));
    }
    if let Some(chart) = &memory_chart {
        section.flag(chart.band, format!("Memory usage at {:.1}%", chart.latest));
    }
    for group in &disk_groups {
        section.flag(
            group.band,
            format!("Filesystem {} at {:.1}%", group.mountpoint, group.latest),
        );
    }

    section
}

fn summarize(
    summary: &sysboard_sdk::JsonObject,
    cpu: &[Sample],
    memory: &[Sample],
    disk: &[Sample],
) -> MonitoringSummary {
    let last_run = match summary.get("timestamp") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => "Never".to_string(),
    };
    let alerts = summary.get("alerts").and_then(Value::as_u64).unwrap_or(0);

    MonitoringSummary {
        last_run,
        alerts,
        cpu_usage: headline_text(cpu),
        memory_usage: headline_text(memory),
        disk_usage: headline_text(disk),
    }
}

fn headline_text(series: &[Sample]) -> String {
    headline(series)
        .map(|sample| format!("{:.1}%", sample.value))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn chart_points(recent: &[Sample], thresholds: Thresholds, scale: f64) -> Vec<ChartPoint> {
    recent
        .iter()
        .map(|sample| ChartPoint {
            timestamp: sample.timestamp,
            value: sample.value,
            band: thresholds.classify(sample.value),
            height: height(sample.value, scale),
        })
        .collect()
}

fn metric_chart(recent: &[Sample], thresholds: Thresholds) -> Option<MetricChart> {
    let latest = headline(recent)?.value;
    let scale = recent
        .iter()
        .map(|sample| sample.value)
        .fold(PERCENT_SCALE_FLOOR, f64::max);

    Some(MetricChart {
        latest,
        band: thresholds.classify(latest),
        scale,
        points: chart_points(recent, thresholds, scale),
    })
}

fn disk_groups(disk: &[Sample], size: usize, thresholds: Thresholds) -> Vec<DiskGroup> {
    group_by_filesystem(disk)
        .into_iter()
        .filter_map(|(filesystem, members)| {
            let recent = window(&members, size);
            let last = headline(recent)?;
            let mountpoint = last
                .attribute("mountpoint")
                .unwrap_or(filesystem.as_str())
                .to_string();
            Some(DiskGroup {
                latest: last.value,
                band: thresholds.classify(last.value),
                points: chart_points(recent, thresholds, PERCENT_SCALE_FLOOR),
                filesystem,
                mountpoint,
            })
        })
        .collect()
}

fn load_chart(recent: &[Sample]) -> Option<LoadChart> {
    let scale = load_scale(recent)?;
    let points = recent
        .iter()
        .map(|sample| {
            let [load1, load5, load15] = load_components(sample);
            LoadPoint {
                timestamp: sample.timestamp,
                load1,
                load5,
                load15,
                heights: [load1, load5, load15].map(|load| height(load, scale.max)),
            }
        })
        .collect();

    Some(LoadChart {
        cores: scale.cores,
        scale: scale.max,
        points,
    })
}

fn alerts_section(outcome: Outcome<Vec<alerts::AlertEntry>>) -> Section {
    let entries = match outcome {
        Outcome::Ready(entries) => entries,
        Outcome::NoData => return Section::empty(ALERTS_ID, ALERTS_TITLE, "No alerts found".into()),
        Outcome::Failed(error) => {
            return Section::error(
                ALERTS_ID,
                ALERTS_TITLE,
                format!("Error loading alerts: {error}"),
            );
        }
    };

    let high = entries
        .iter()
        .filter(|entry| entry.level == AlertLevel::High)
        .count();
    let medium = entries
        .iter()
        .filter(|entry| entry.level == AlertLevel::Medium)
        .count();

    let mut section = Section::success(ALERTS_ID, ALERTS_TITLE, json!({ "alerts": entries }));
    section.summary = Some(format!(
        "{} alerts ({} high, {} medium)",
        entries.len(),
        high,
        medium
    ));
    if high > 0 {
        section.flag(Band::Critical, format!("{high} high-severity alerts logged"));
    } else if medium > 0 {
        section.flag(Band::Warning, format!("{medium} medium-severity alerts logged"));
    }
    section
}
