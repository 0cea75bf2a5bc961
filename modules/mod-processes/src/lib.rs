use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use sysboard_sdk::table::{self, TableSpec};
use sysboard_sdk::{
    Band, CommandKind, DashboardInput, Outcome, Panel, PanelMetadata, Section, Thresholds,
    register_panel,
};

const ID: &str = "processes";
const TITLE: &str = "Running Processes";

/// `ps aux`: USER PID %CPU %MEM VSZ RSS TTY STAT START TIME COMMAND
const PS_AUX: TableSpec = TableSpec::new(11).with_header().with_tail(10);

struct ProcessesPanel;

impl Panel for ProcessesPanel {
    fn metadata(&self) -> PanelMetadata {
        PanelMetadata {
            id: ID,
            title: TITLE,
            description: "Top processes by CPU from ps aux",
            order: 30,
        }
    }

    fn build(&self, input: &DashboardInput) -> Result<Section> {
        let outcome = match input.command_text(CommandKind::ProcessList) {
            Ok(text) => Outcome::from_rows(parse_process_listing(text)),
            Err(error) => Outcome::Failed(error),
        };
        Ok(section_from_outcome(
            outcome,
            input.config().thresholds.process,
        ))
    }
}

fn create_panel() -> Box<dyn Panel> {
    Box::new(ProcessesPanel)
}

register_panel!(create_panel);

/// One `ps aux` line. Numeric columns that do not parse are `None`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcessRecord {
    pub pid: Option<u32>,
    pub user: String,
    pub cpu_percent: Option<f64>,
    pub mem_percent: Option<f64>,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct ProcessRow {
    #[serde(flatten)]
    record: ProcessRecord,
    cpu_band: Band,
    mem_band: Band,
}

/// Parses `ps aux` output. Short rows are skipped; unreadable numbers are kept as `None`.
pub fn parse_process_listing(text: &str) -> Vec<ProcessRecord> {
    table::rows(text, PS_AUX)
        .filter_map(|row| {
            let record = ProcessRecord {
                user: row.get(0)?.to_string(),
                pid: row.get(1)?.parse().ok(),
                cpu_percent: row.get(2)?.parse().ok(),
                mem_percent: row.get(3)?.parse().ok(),
                command: row.get(10)?.to_string(),
            };
            Some(record)
        })
        .collect()
}

fn band_of(value: Option<f64>, thresholds: Thresholds) -> Band {
    value.map_or(Band::Normal, |value| thresholds.classify(value))
}

fn pid_label(pid: Option<u32>) -> String {
    pid.map_or_else(|| "?".to_string(), |pid| pid.to_string())
}

fn section_from_outcome(outcome: Outcome<Vec<ProcessRecord>>, thresholds: Thresholds) -> Section {
    let records = match outcome {
        Outcome::Ready(records) => records,
        Outcome::NoData => return Section::empty(ID, TITLE, "No process data available".into()),
        Outcome::Failed(error) => {
            return Section::error(ID, TITLE, format!("Error retrieving process data: {error}"));
        }
    };

    let rows: Vec<ProcessRow> = records
        .into_iter()
        .map(|record| ProcessRow {
            cpu_band: band_of(record.cpu_percent, thresholds),
            mem_band: band_of(record.mem_percent, thresholds),
            record,
        })
        .collect();

    let busiest = rows
        .iter()
        .filter_map(|row| row.record.cpu_percent)
        .fold(0.0_f64, f64::max);

    let mut section = Section::success(ID, TITLE, json!({ "processes": rows }));
    section.summary = Some(format!(
        "{} processes, busiest at {:.1}% CPU",
        rows.len(),
        busiest
    ));

    for row in &rows {
        if row.cpu_band == Band::Critical {
            section.flag(
                Band::Warning,
                format!(
                    "PID {} ({}) at {:.1}% CPU",
                    pid_label(row.record.pid),
                    row.record.user,
                    row.record.cpu_percent.unwrap_or_default()
                ),
            );
        }
        if row.mem_band == Band::Critical {
            section.flag(
                Band::Warning,
                format!(
                    "PID {} ({}) at {:.1}% memory",
                    pid_label(row.record.pid),
                    row.record.user,
                    row.record.mem_percent.unwrap_or_default()
                ),
            );
        }
    }

    section
}
