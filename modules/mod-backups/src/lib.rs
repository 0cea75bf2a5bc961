use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use sysboard_sdk::table::{self, TableSpec};
use sysboard_sdk::{
    ArchiveEntry, CommandKind, DashboardInput, JsonObject, Panel, PanelMetadata, Section,
    UpstreamError, register_panel,
};

const ID: &str = "backups";
const TITLE: &str = "Backups";

/// Symlink to the newest archive, never an archive itself.
const LATEST_LINK: &str = "latest";

/// `ls -1`: one name per line, spaces included.
const LISTING: TableSpec = TableSpec::new(1).with_tail(0);

struct BackupsPanel;

impl Panel for BackupsPanel {
    fn metadata(&self) -> PanelMetadata {
        PanelMetadata {
            id: ID,
            title: TITLE,
            description: "Last backup run and available archives",
            order: 60,
        }
    }

    fn build(&self, input: &DashboardInput) -> Result<Section> {
        Ok(build_section(input))
    }
}

fn create_panel() -> Box<dyn Panel> {
    Box::new(BackupsPanel)
}

register_panel!(create_panel);

/// Date and time decomposed from an archive id, digits kept as written.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Timestamp {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
    pub second: String,
}

impl Timestamp {
    pub fn display(&self) -> String {
        format!(
            "{}-{}-{} {}:{}:{}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Splits `YYYYMMDD_HHMMSS...` into its parts. Only the length and the `_` at
/// offset 8 are checked; the digits themselves are taken as written.
pub fn parse(id: &str) -> Option<Timestamp> {
    if id.len() < 15 || id.as_bytes()[8] != b'_' {
        return None;
    }
    let part = |range: std::ops::Range<usize>| id.get(range).map(str::to_string);

    Some(Timestamp {
        year: part(0..4)?,
        month: part(4..6)?,
        day: part(6..8)?,
        hour: part(9..11)?,
        minute: part(11..13)?,
        second: part(13..15)?,
    })
}

/// Newest first, relying on the fixed-width id layout; duplicates collapse.
pub fn sort_descending<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let unique: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
    unique.into_iter().rev().collect()
}

/// Text shown for an archive: the decoded date followed by the id, or the id alone.
pub fn display_label(id: &str) -> String {
    match parse(id) {
        Some(timestamp) => format!("{} ({})", timestamp.display(), id),
        None => id.to_string(),
    }
}

/// Human-readable byte count with two decimals.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Archive names from `ls` output, without the `latest` link.
pub fn parse_listing(text: &str) -> Vec<String> {
    table::rows(text, LISTING)
        .filter_map(|row| row.get(0))
        .filter(|name| *name != LATEST_LINK)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct LastBackup {
    timestamp: String,
    location: String,
    directories: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct ArchiveView {
    id: String,
    label: String,
    timestamp: Option<Timestamp>,
    size_bytes: Option<u64>,
    size: Option<String>,
}

fn last_backup(info: &JsonObject) -> LastBackup {
    let text = |key: &str, fallback: &str| match info.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Number(number)) => number.to_string(),
        _ => fallback.to_string(),
    };

    LastBackup {
        timestamp: text("timestamp", "Never"),
        location: text("location", "Unknown"),
        directories: text("directories", "None"),
    }
}

fn archive_views(entries: Vec<ArchiveEntry>) -> Vec<ArchiveView> {
    let mut entries = entries;
    entries.retain(|entry| entry.id != LATEST_LINK);
    entries.sort_by(|a, b| b.id.cmp(&a.id));
    entries.dedup_by(|a, b| a.id == b.id);

    entries
        .into_iter()
        .map(|entry| ArchiveView {
            label: display_label(&entry.id),
            timestamp: parse(&entry.id),
            size: entry.size_bytes.map(format_size),
            size_bytes: entry.size_bytes,
            id: entry.id,
        })
        .collect()
}

fn list_archives(input: &DashboardInput) -> Result<Vec<ArchiveView>, UpstreamError> {
    if let Ok(feed) = input.backups() {
        if !feed.archives.is_empty() {
            return Ok(archive_views(feed.archives.clone()));
        }
    }

    let ids = match input.command_text(CommandKind::BackupListing) {
        Ok(text) => parse_listing(text),
        Err(UpstreamError::NotCaptured(_)) => Vec::new(),
        Err(error) => return Err(error),
    };

    Ok(sort_descending(ids)
        .into_iter()
        .map(|id| ArchiveView {
            label: display_label(&id),
            timestamp: parse(&id),
            size_bytes: None,
            size: None,
            id,
        })
        .collect())
}

fn build_section(input: &DashboardInput) -> Section {
    let mut notes = Vec::new();

    let last = match input.backups() {
        Ok(feed) if !feed.last_backup.is_empty() => Some(last_backup(&feed.last_backup)),
        Ok(_) => None,
        Err(error) => {
            notes.push(format!("Error loading backup data: {error}"));
            None
        }
    };

    let archives = match list_archives(input) {
        Ok(archives) => archives,
        Err(error) => {
            notes.push(format!("Error loading backup list: {error}"));
            Vec::new()
        }
    };

    if last.is_none() && archives.is_empty() {
        let mut section = if notes.is_empty() {
            Section::empty(ID, TITLE, "No backups found".into())
        } else {
            Section::error(ID, TITLE, notes.join("; "))
        };
        section.notes = notes;
        return section;
    }

    let last = last.unwrap_or_else(|| last_backup(&JsonObject::new()));
    let summary = format!("{} archives, last backup {}", archives.len(), last.timestamp);
    let body = json!({
        "last_backup": last,
        "archives": archives,
    });

    let mut section = if notes.is_empty() {
        Section::success(ID, TITLE, body)
    } else {
        Section::degraded(ID, TITLE, summary.clone(), body)
    };
    section.summary = Some(summary);
    section.notes = notes;
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysboard_sdk::{BackupFeed, CommandOutput, SectionStatus};

    #[test]
    fn parses_timestamp_prefix() {
        let timestamp = parse("20240115_143022_full").expect("timestamp");
        assert_eq!(timestamp.year, "2024");
        assert_eq!(timestamp.month, "01");
        assert_eq!(timestamp.day, "15");
        assert_eq!(timestamp.hour, "14");
        assert_eq!(timestamp.minute, "30");
        assert_eq!(timestamp.second, "22");
    }

    #[test]
    fn rejects_other_layouts() {
        assert_eq!(parse("snapshot-a"), None);
        assert_eq!(parse("20240115-143022"), None);
        assert_eq!(parse("20240115_1430"), None);
        // Split fields would cut through the multi-byte character.
        assert_eq!(parse("202\u{e9}015_143022"), None);
    }

    #[test]
    fn non_digit_fields_are_split_as_written() {
        let timestamp = parse("2024XX15_143022_full").expect("timestamp");
        assert_eq!(timestamp.month, "XX");
        assert_eq!(timestamp.display(), "2024-XX-15 14:30:22");
        assert_eq!(
            display_label("2024XX15_143022_full"),
            "2024-XX-15 14:30:22 (2024XX15_143022_full)"
        );
    }

    #[test]
    fn out_of_range_values_are_kept() {
        let timestamp = parse("20241399_996161").expect("timestamp");
        assert_eq!(timestamp.month, "13");
        assert_eq!(timestamp.display(), "2024-13-99 99:61:61");
    }

    #[test]
    fn sorts_newest_first() {
        let sorted = sort_descending(["20240101_000000", "20240301_000000", "20240201_000000"]);
        assert_eq!(
            sorted,
            vec!["20240301_000000", "20240201_000000", "20240101_000000"]
        );
    }

    #[test]
    fn labels_pass_unparsed_ids_through() {
        assert_eq!(
            display_label("20240115_143022"),
            "2024-01-15 14:30:22 (20240115_143022)"
        );
        assert_eq!(display_label("manual copy"), "manual copy");
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn listing_skips_latest_link() {
        let ids = parse_listing("20240101_000000\nlatest\n\n20240201_000000\n");
        assert_eq!(ids, vec!["20240101_000000", "20240201_000000"]);
    }

    #[test]
    fn section_from_listing_and_last_run() {
        let mut input = DashboardInput::new();
        let mut feed = BackupFeed::default();
        feed.last_backup
            .insert("timestamp".into(), json!("2024-02-01 00:00:00"));
        feed.last_backup
            .insert("directories".into(), json!(["/etc", "/home"]));
        input.set_backups(Ok(feed));
        input.set_command(
            CommandKind::BackupListing,
            CommandOutput::ok("20240101_000000\n20240201_000000\nold-copy\n"),
        );

        let section = build_section(&input);
        assert_eq!(section.status, SectionStatus::Success);
        assert_eq!(section.body["last_backup"]["directories"], "/etc, /home");
        assert_eq!(section.body["last_backup"]["location"], "Unknown");
        let archives = section.body["archives"].as_array().unwrap();
        assert_eq!(archives[0]["id"], "old-copy");
        assert_eq!(archives[1]["id"], "20240201_000000");
        assert_eq!(archives[1]["label"], "2024-02-01 00:00:00 (20240201_000000)");
        assert!(archives[0]["timestamp"].is_null());
    }

    #[test]
    fn scanned_archives_carry_sizes() {
        let mut input = DashboardInput::new();
        input.set_backups(Ok(BackupFeed {
            last_backup: JsonObject::new(),
            archives: vec![
                ArchiveEntry {
                    id: "20240101_000000".into(),
                    size_bytes: Some(2048),
                },
                ArchiveEntry {
                    id: "20240301_000000".into(),
                    size_bytes: Some(0),
                },
            ],
        }));
        let section = build_section(&input);
        let archives = section.body["archives"].as_array().unwrap();
        assert_eq!(archives[0]["id"], "20240301_000000");
        assert_eq!(archives[0]["size"], "0B");
        assert_eq!(archives[1]["size"], "2.00 KB");
        assert_eq!(section.body["last_backup"]["timestamp"], "Never");
    }

    #[test]
    fn nothing_known_is_no_data() {
        let section = build_section(&DashboardInput::new());
        assert_eq!(section.status, SectionStatus::Empty);
    }

    #[test]
    fn listing_with_only_latest_link_is_no_data() {
        let mut input = DashboardInput::new();
        input.set_command(CommandKind::BackupListing, CommandOutput::ok("latest\n"));
        let section = build_section(&input);
        assert_eq!(section.status, SectionStatus::Empty);
        assert!(section.notes.is_empty());
    }

    #[test]
    fn failed_sources_are_error() {
        let mut input = DashboardInput::new();
        input.set_backups(Err(UpstreamError::Unavailable("backup api down".into())));
        input.set_command(
            CommandKind::BackupListing,
            CommandOutput::failed("ls: cannot access"),
        );
        let section = build_section(&input);
        assert_eq!(section.status, SectionStatus::Error);
        assert_eq!(section.notes.len(), 2);
    }
}
