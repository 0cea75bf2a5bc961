use anyhow::{Context as _, Result};
use etc_os_release::OsRelease;
use procfs::{Current, Uptime};
use rustix::system::uname;
use serde::Serialize;
use serde_json::{Value, json};
use sysboard_sdk::{DashboardInput, JsonObject, Panel, PanelMetadata, Section, register_panel};

const ID: &str = "system";
const TITLE: &str = "System Information";
const UNKNOWN: &str = "Unknown";

struct SystemPanel;

impl Panel for SystemPanel {
    fn metadata(&self) -> PanelMetadata {
        PanelMetadata {
            id: ID,
            title: TITLE,
            description: "Host identity, kernel and uptime",
            order: 10,
        }
    }

    fn build(&self, input: &DashboardInput) -> Result<Section> {
        Ok(match input.system() {
            Ok(info) if info.is_empty() => {
                Section::empty(ID, TITLE, "No system information available".into())
            }
            Ok(info) => section_from_info(info),
            Err(error) => Section::error(ID, TITLE, format!("Error loading system data: {error}")),
        })
    }
}

fn create_panel() -> Box<dyn Panel> {
    Box::new(SystemPanel)
}

register_panel!(create_panel);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct SystemView {
    hostname: String,
    os: String,
    kernel: String,
    uptime: String,
    collected_at: String,
}

impl SystemView {
    fn from_info(info: &JsonObject) -> Self {
        let text = |key: &str| match info.get(key) {
            Some(Value::String(value)) if !value.trim().is_empty() => value.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => UNKNOWN.to_string(),
        };

        let uptime = match info.get("uptime") {
            Some(Value::Number(seconds)) => seconds
                .as_f64()
                .map(format_uptime)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            _ => text("uptime"),
        };

        Self {
            hostname: text("hostname"),
            os: text("os"),
            kernel: text("kernel"),
            uptime,
            collected_at: text("collected_at"),
        }
    }
}

fn section_from_info(info: &JsonObject) -> Section {
    let view = SystemView::from_info(info);
    let summary = format!("{} ({}), up {}", view.hostname, view.os, view.uptime);
    let mut section = Section::success(ID, TITLE, json!(view));
    section.summary = Some(summary);
    section
}

/// Uptime as "D days, H hours, M minutes", dropping leading zero units.
pub fn format_uptime(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let days = total / 86_400;
    let hours = total % 86_400 / 3_600;
    let minutes = total % 3_600 / 60;

    if days > 0 {
        format!("{days} days, {hours} hours, {minutes} minutes")
    } else if hours > 0 {
        format!("{hours} hours, {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}

/// System information of the local host, used when no collected snapshot exists.
/// Fields that cannot be read are reported as "Unknown".
pub fn probe_local() -> JsonObject {
    let uts = uname();
    let mut info = JsonObject::new();
    info.insert("hostname".into(), json!(cstr(uts.nodename())));
    info.insert("kernel".into(), json!(cstr(uts.release())));
    info.insert(
        "uptime".into(),
        json!(
            read_uptime()
                .map(format_uptime)
                .unwrap_or_else(|_| UNKNOWN.to_string())
        ),
    );
    info.insert(
        "collected_at".into(),
        json!(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    info.insert(
        "os".into(),
        json!(os_pretty_name().unwrap_or_else(|_| UNKNOWN.to_string())),
    );
    info
}

fn read_uptime() -> Result<f64> {
    let uptime = Uptime::current().context("failed to read /proc/uptime")?;
    Ok(uptime.uptime)
}

fn os_pretty_name() -> Result<String> {
    let os = OsRelease::open().context("failed to open /etc/os-release")?;
    Ok(os.pretty_name().to_string())
}

fn cstr(value: &std::ffi::CStr) -> String {
    value.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysboard_sdk::{SectionStatus, UpstreamError};

    #[test]
    fn formats_uptime_units() {
        assert_eq!(
            format_uptime(3.0 * 86_400.0 + 4.0 * 3_600.0 + 5.0 * 60.0 + 9.0),
            "3 days, 4 hours, 5 minutes"
        );
        assert_eq!(format_uptime(2.0 * 3_600.0 + 59.0), "2 hours, 0 minutes");
        assert_eq!(format_uptime(59.9), "0 minutes");
        assert_eq!(format_uptime(86_400.0), "1 days, 0 hours, 0 minutes");
    }

    #[test]
    fn missing_fields_are_unknown() {
        let mut info = JsonObject::new();
        info.insert("hostname".into(), json!("web01"));
        info.insert("uptime".into(), json!(7_260));
        let section = section_from_info(&info);

        assert_eq!(section.status, SectionStatus::Success);
        assert_eq!(section.body["hostname"], "web01");
        assert_eq!(section.body["os"], "Unknown");
        assert_eq!(section.body["uptime"], "2 hours, 1 minutes");
        assert_eq!(
            section.summary.as_deref(),
            Some("web01 (Unknown), up 2 hours, 1 minutes")
        );
    }

    #[test]
    fn empty_and_failed_feeds() {
        let panel = SystemPanel;
        let section = panel.build(&DashboardInput::new()).unwrap();
        assert_eq!(section.status, SectionStatus::Empty);

        let mut input = DashboardInput::new();
        input.set_system(Err(UpstreamError::Unavailable("connection refused".into())));
        let section = panel.build(&input).unwrap();
        assert_eq!(section.status, SectionStatus::Error);
    }

    #[test]
    fn local_probe_fills_every_key() {
        let info = probe_local();
        for key in ["hostname", "kernel", "uptime", "collected_at", "os"] {
            assert!(info.get(key).and_then(Value::as_str).is_some(), "{key}");
        }
    }
}
