use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use sysboard_sdk::table::{self, TableSpec};
use sysboard_sdk::{
    Band, CommandKind, DashboardInput, Outcome, Panel, PanelMetadata, Section, Thresholds,
    register_panel,
};

const ID: &str = "storage";
const TITLE: &str = "Disk Usage";

/// `df -h`: Filesystem Size Used Avail Use% Mounted on
const DF: TableSpec = TableSpec::new(6).with_header().with_tail(5);

struct StoragePanel;

impl Panel for StoragePanel {
    fn metadata(&self) -> PanelMetadata {
        PanelMetadata {
            id: ID,
            title: TITLE,
            description: "Filesystem usage across mounted volumes",
            order: 40,
        }
    }

    fn build(&self, input: &DashboardInput) -> Result<Section> {
        let outcome = match input.command_text(CommandKind::DiskUsage) {
            Ok(text) => Outcome::from_rows(parse_disk_usage(text)),
            Err(error) => Outcome::Failed(error),
        };
        Ok(section_from_outcome(outcome, input.config().thresholds.disk))
    }
}

fn create_panel() -> Box<dyn Panel> {
    Box::new(StoragePanel)
}

register_panel!(create_panel);

/// One line of `df -h`. Sizes keep their human-readable form; a Use% of `-`
/// (pseudo and overlay mounts) is `None`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiskRow {
    pub filesystem: String,
    pub size_text: String,
    pub used_text: String,
    pub available_text: String,
    pub use_percent: Option<u32>,
    pub mountpoint: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct DiskRowView {
    #[serde(flatten)]
    row: DiskRow,
    band: Band,
}

pub fn parse_disk_usage(text: &str) -> Vec<DiskRow> {
    table::rows(text, DF)
        .filter_map(|row| {
            Some(DiskRow {
                filesystem: row.get(0)?.to_string(),
                size_text: row.get(1)?.to_string(),
                used_text: row.get(2)?.to_string(),
                available_text: row.get(3)?.to_string(),
                use_percent: parse_use_percent(row.get(4)?),
                mountpoint: row.get(5)?.to_string(),
            })
        })
        .collect()
}

fn parse_use_percent(value: &str) -> Option<u32> {
    value.strip_suffix('%').unwrap_or(value).parse().ok()
}

fn section_from_outcome(outcome: Outcome<Vec<DiskRow>>, thresholds: Thresholds) -> Section {
    let rows = match outcome {
        Outcome::Ready(rows) => rows,
        Outcome::NoData => {
            return Section::empty(ID, TITLE, "No disk usage data available".into());
        }
        Outcome::Failed(error) => {
            return Section::error(
                ID,
                TITLE,
                format!("Error retrieving disk usage data: {error}"),
            );
        }
    };

    let views: Vec<DiskRowView> = rows
        .into_iter()
        .map(|row| DiskRowView {
            band: row
                .use_percent
                .map_or(Band::Normal, |percent| thresholds.classify(f64::from(percent))),
            row,
        })
        .collect();

    let mut section = Section::success(ID, TITLE, json!({ "filesystems": views }));

    let fullest = views
        .iter()
        .filter_map(|view| Some((view.row.use_percent?, &view.row.mountpoint)))
        .max_by_key(|(percent, _)| *percent);
    section.summary = Some(match fullest {
        Some((percent, mountpoint)) => format!(
            "{} filesystems, fullest {} at {}%",
            views.len(),
            mountpoint,
            percent
        ),
        None => format!("{} filesystems", views.len()),
    });

    for view in &views {
        if let Some(percent) = view.row.use_percent {
            section.flag(
                view.band,
                format!("Mount {} at {}% capacity", view.row.mountpoint, percent),
            );
        }
    }

    section
}
