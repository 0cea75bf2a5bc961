//! Loads the feeds written by the collection scripts into a [`DashboardInput`].
//!
//! A missing file means the collector has not run yet and yields an empty feed.
//! A file that exists but cannot be read or decoded puts the feed in an error state.

use anyhow::{Context as _, Result};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use sysboard_sdk::{
    ArchiveEntry, BackupFeed, DashboardInput, Fetched, JsonObject, MonitoringFeed, SecurityFeed,
    UpstreamError,
};
use walkdir::WalkDir;

const MONITORING_SUMMARY: &str = "monitoring_summary.json";
const MONITORING_DATA: &str = "monitoring_data.json";
const SECURITY_SUMMARY: &str = "security_summary.json";
const SECURITY_DATA: &str = "security_data.json";
const LAST_BACKUP: &str = "last_backup_info.json";
const SYSTEM_INFO: &str = "system_info.json";
const BACKUP_DIR: &str = "backups";
const LATEST_LINK: &str = "latest";

pub fn load_data_dir(dir: &Path, input: &mut DashboardInput) {
    input.set_monitoring(fetched(load_monitoring(dir)));
    input.set_security(fetched(load_security(dir)));
    input.set_backups(fetched(load_backups(dir)));
    input.set_system(fetched(load_system(dir)));
}

fn fetched<T>(result: Result<T>) -> Fetched<T> {
    result.map_err(|error| {
        tracing::warn!(error = %format!("{error:#}"), "feed unavailable");
        UpstreamError::Unavailable(format!("{error:#}"))
    })
}

fn load_monitoring(dir: &Path) -> Result<MonitoringFeed> {
    let mut feed = MonitoringFeed {
        summary: read_json_object(&dir.join(MONITORING_SUMMARY))?.unwrap_or_default(),
        ..MonitoringFeed::default()
    };

    let mut ignored = 0usize;
    for point in read_json_lines(&dir.join(MONITORING_DATA))? {
        if !feed.push_point(point) {
            ignored += 1;
        }
    }
    if ignored > 0 {
        tracing::debug!(ignored, "monitoring points with unknown type");
    }

    tracing::debug!(
        cpu = feed.cpu.len(),
        memory = feed.memory.len(),
        disk = feed.disk.len(),
        load = feed.load.len(),
        "loaded monitoring data"
    );
    Ok(feed)
}

fn load_security(dir: &Path) -> Result<SecurityFeed> {
    let feed = SecurityFeed {
        summary: read_json_object(&dir.join(SECURITY_SUMMARY))?.unwrap_or_default(),
        issues: read_json_lines(&dir.join(SECURITY_DATA))?,
    };
    tracing::debug!(issues = feed.issues.len(), "loaded security data");
    Ok(feed)
}

fn load_backups(dir: &Path) -> Result<BackupFeed> {
    Ok(BackupFeed {
        last_backup: read_json_object(&dir.join(LAST_BACKUP))?.unwrap_or_default(),
        archives: scan_archives(&dir.join(BACKUP_DIR))?,
    })
}

/// Collected system info, or a probe of the local host when none was collected.
fn load_system(dir: &Path) -> Result<JsonObject> {
    match read_json_object(&dir.join(SYSTEM_INFO))? {
        Some(info) => Ok(info),
        None => {
            tracing::debug!("no collected system info, probing local host");
            Ok(mod_system::probe_local())
        }
    }
}

fn read_json_object(path: &Path) -> Result<Option<JsonObject>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    match value {
        Value::Object(object) => Ok(Some(object)),
        _ => anyhow::bail!("{} does not contain a JSON object", path.display()),
    }
}

/// One JSON document per line; undecodable lines are skipped.
fn read_json_lines(path: &Path) -> Result<Vec<Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let mut values = Vec::new();
    let mut skipped = 0usize;
    for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match serde_json::from_str(line) {
            Ok(value) => values.push(value),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(path = %path.display(), skipped, "skipped malformed JSON lines");
    }
    Ok(values)
}

fn scan_archives(path: &Path) -> Result<Vec<ArchiveEntry>> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => {
            return Err(error).with_context(|| format!("failed to list {}", path.display()));
        }
    };

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", path.display()))?;
        let id = entry.file_name().to_string_lossy().into_owned();
        if id == LATEST_LINK {
            continue;
        }
        archives.push(ArchiveEntry {
            size_bytes: Some(tree_size(&entry.path())),
            id,
        });
    }
    Ok(archives)
}

/// Total size of regular files below `path`; unreadable entries count as zero.
fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
