use askama::Template;
use serde_json::Value;

use super::{Report, Section, SectionStatus};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Template)]
#[template(path = "report.md", escape = "none")]
struct MarkdownReport<'a> {
    report: &'a Report,
    sections: Vec<SectionView>,
}

#[derive(Template)]
#[template(path = "report.html")]
struct HtmlReport<'a> {
    report: &'a Report,
    sections: Vec<SectionView>,
}

pub fn render_markdown(report: &Report) -> askama::Result<String> {
    MarkdownReport {
        report,
        sections: build_section_views(report),
    }
    .render()
}

pub fn render_html(report: &Report) -> askama::Result<String> {
    HtmlReport {
        report,
        sections: build_section_views(report),
    }
    .render()
}

#[derive(Debug)]
struct SectionView {
    title: String,
    status_class: &'static str,
    status_label: String,
    summary: Option<String>,
    notes: Vec<String>,
    flags: Vec<String>,
    key_values: Vec<KeyValue>,
    tables: Vec<TableView>,
    lists: Vec<ListView>,
    has_key_values: bool,
    has_tables: bool,
    has_lists: bool,
    has_notes: bool,
    has_flags: bool,
}

impl SectionView {
    fn new(section: &Section) -> Self {
        Self {
            title: section.title.to_string(),
            status_class: status_class(&section.status),
            status_label: status_label(&section.status),
            summary: section.summary.clone(),
            notes: section.notes.clone(),
            flags: section
                .flags
                .iter()
                .map(|flag| format!("{}: {}", flag.band, flag.message))
                .collect(),
            key_values: Vec::new(),
            tables: Vec::new(),
            lists: Vec::new(),
            has_key_values: false,
            has_tables: false,
            has_lists: false,
            has_notes: section.has_notes(),
            has_flags: !section.flags.is_empty(),
        }
    }

    fn add_kv<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.key_values.push(KeyValue {
            key: key.into(),
            value: value.into(),
        });
    }

    fn add_table(&mut self, table: TableView) {
        if !table.rows.is_empty() {
            self.tables.push(table);
        }
    }

    fn add_list(&mut self, list: ListView) {
        if !list.items.is_empty() {
            self.lists.push(list);
        }
    }

    fn finalize(&mut self) {
        self.has_key_values = !self.key_values.is_empty();
        self.has_tables = !self.tables.is_empty();
        self.has_lists = !self.lists.is_empty();
    }
}

#[derive(Debug)]
struct KeyValue {
    key: String,
    value: String,
}

#[derive(Debug)]
struct TableView {
    title: Option<String>,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableView {
    fn new(title: impl Into<String>, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            title: Some(title.into()),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }
}

#[derive(Debug)]
struct ListView {
    title: Option<String>,
    items: Vec<String>,
}

fn build_section_views(report: &Report) -> Vec<SectionView> {
    report
        .sections
        .iter()
        .map(|section| {
            let mut view = SectionView::new(section);
            if section.status != SectionStatus::Error {
                populate_section(&mut view, section.id, &section.body);
            }
            view.finalize();
            view
        })
        .collect()
}

fn populate_section(view: &mut SectionView, id: &str, body: &Value) {
    match id {
        "system" => populate_system(view, body),
        "monitoring" => populate_monitoring(view, body),
        "alerts" => populate_alerts(view, body),
        "processes" => populate_processes(view, body),
        "storage" => populate_storage(view, body),
        "network" => populate_network(view, body),
        "backups" => populate_backups(view, body),
        "security" => populate_security(view, body),
        _ => populate_generic(view, body),
    }
}

fn populate_system(view: &mut SectionView, body: &Value) {
    for (key, label) in [
        ("hostname", "Hostname"),
        ("os", "Operating System"),
        ("kernel", "Kernel"),
        ("uptime", "Uptime"),
        ("collected_at", "Collected At"),
    ] {
        if let Some(value) = body.get(key).and_then(Value::as_str) {
            view.add_kv(label, value);
        }
    }
}

fn populate_monitoring(view: &mut SectionView, body: &Value) {
    if let Some(summary) = body.get("summary") {
        view.add_kv("Last Run", text(summary, "last_run"));
        view.add_kv("Alerts", text(summary, "alerts"));
        view.add_kv("CPU Usage", text(summary, "cpu_usage"));
        view.add_kv("Memory Usage", text(summary, "memory_usage"));
        view.add_kv("Disk Usage", text(summary, "disk_usage"));
    }

    for (key, title) in [("cpu", "CPU"), ("memory", "Memory")] {
        let Some(points) = body.pointer(&format!("/{key}/points")).and_then(Value::as_array)
        else {
            continue;
        };
        let rows = points
            .iter()
            .map(|point| {
                vec![
                    text(point, "timestamp"),
                    format_percent(point.get("value")),
                    text(point, "band"),
                ]
            })
            .collect();
        view.add_table(TableView::new(
            format!("{title} (last {})", points.len()),
            &["Time", "Usage", "Band"],
            rows,
        ));
    }

    if let Some(groups) = body.get("disk").and_then(Value::as_array) {
        let rows = groups
            .iter()
            .map(|group| {
                vec![
                    text(group, "filesystem"),
                    text(group, "mountpoint"),
                    format_percent(group.get("latest")),
                    text(group, "band"),
                ]
            })
            .collect();
        view.add_table(TableView::new(
            "Disk",
            &["Filesystem", "Mountpoint", "Usage", "Band"],
            rows,
        ));
    }

    if let Some(load) = body.get("load").filter(|load| load.is_object()) {
        if let Some(cores) = load.get("cores").and_then(Value::as_f64) {
            view.add_kv("CPU Cores", format!("{cores}"));
        }
        let rows = load
            .get("points")
            .and_then(Value::as_array)
            .map(|points| {
                points
                    .iter()
                    .map(|point| {
                        let mut row = vec![text(point, "timestamp")];
                        for key in ["load1", "load5", "load15"] {
                            row.push(format_fixed(point.get(key), 2));
                        }
                        row
                    })
                    .collect()
            })
            .unwrap_or_default();
        view.add_table(TableView::new(
            "Load Average",
            &["Time", "1m", "5m", "15m"],
            rows,
        ));
    }
}

fn populate_alerts(view: &mut SectionView, body: &Value) {
    let Some(alerts) = body.get("alerts").and_then(Value::as_array) else {
        return;
    };
    let rows = alerts
        .iter()
        .map(|alert| {
            vec![
                text(alert, "timestamp"),
                text(alert, "level").to_uppercase(),
                text(alert, "message"),
            ]
        })
        .collect();
    view.add_table(TableView::new(
        "Alert Log",
        &["Time", "Level", "Message"],
        rows,
    ));
}

fn populate_processes(view: &mut SectionView, body: &Value) {
    let Some(processes) = body.get("processes").and_then(Value::as_array) else {
        return;
    };
    let rows = processes
        .iter()
        .map(|process| {
            vec![
                text(process, "pid"),
                text(process, "user"),
                format_fixed(process.get("cpu_percent"), 1),
                format_fixed(process.get("mem_percent"), 1),
                truncate(&text(process, "command")),
            ]
        })
        .collect();
    view.add_table(TableView::new(
        "Top Processes",
        &["PID", "User", "CPU %", "MEM %", "Command"],
        rows,
    ));
}

fn populate_storage(view: &mut SectionView, body: &Value) {
    let Some(filesystems) = body.get("filesystems").and_then(Value::as_array) else {
        return;
    };
    let rows = filesystems
        .iter()
        .map(|fs| {
            vec![
                text(fs, "filesystem"),
                text(fs, "size_text"),
                text(fs, "used_text"),
                text(fs, "available_text"),
                match fs.get("use_percent").and_then(Value::as_u64) {
                    Some(percent) => format!("{percent}%"),
                    None => "-".to_string(),
                },
                text(fs, "mountpoint"),
            ]
        })
        .collect();
    view.add_table(TableView::new(
        "Filesystems",
        &["Filesystem", "Size", "Used", "Avail", "Use%", "Mounted on"],
        rows,
    ));
}

fn populate_network(view: &mut SectionView, body: &Value) {
    let Some(interfaces) = body.get("interfaces").and_then(Value::as_array) else {
        return;
    };
    let rows = interfaces
        .iter()
        .map(|iface| {
            vec![
                text(iface, "name"),
                text(iface, "ip_address"),
                text(iface, "mac_address"),
                text(iface, "status"),
            ]
        })
        .collect();
    view.add_table(TableView::new(
        "Interfaces",
        &["Interface", "IP Address", "MAC Address", "Status"],
        rows,
    ));
}

fn populate_backups(view: &mut SectionView, body: &Value) {
    if let Some(last) = body.get("last_backup") {
        view.add_kv("Last Backup", text(last, "timestamp"));
        view.add_kv("Location", text(last, "location"));
        view.add_kv("Directories", text(last, "directories"));
    }

    if let Some(archives) = body.get("archives").and_then(Value::as_array) {
        let rows = archives
            .iter()
            .map(|archive| vec![text(archive, "label"), text(archive, "size")])
            .collect();
        view.add_table(TableView::new(
            "Available Backups",
            &["Backup", "Size"],
            rows,
        ));
    }
}

fn populate_security(view: &mut SectionView, body: &Value) {
    if let Some(summary) = body.get("summary") {
        view.add_kv("Last Scan", text(summary, "last_scan"));
        view.add_kv("Total Issues", text(summary, "total_issues"));
        view.add_kv("High", text(summary, "high_issues"));
        view.add_kv("Medium", text(summary, "medium_issues"));
        view.add_kv("Low", text(summary, "low_issues"));
    }

    if let Some(issues) = body.get("issues").and_then(Value::as_array) {
        let rows = issues
            .iter()
            .map(|issue| {
                vec![
                    text(issue, "severity").to_uppercase(),
                    text(issue, "message"),
                ]
            })
            .collect();
        view.add_table(TableView::new("Issues", &["Severity", "Message"], rows));
    }

    if let Some(recommendations) = body.get("recommendations").and_then(Value::as_array) {
        let items = recommendations
            .iter()
            .map(|rec| {
                let mut item = format!(
                    "[{}] {}: {}",
                    text(rec, "severity").to_uppercase(),
                    text(rec, "title"),
                    text(rec, "description")
                );
                if let Some(solution) = rec.get("solution").and_then(Value::as_str) {
                    item.push_str(" Solution: ");
                    item.push_str(solution);
                }
                item
            })
            .collect();
        view.add_list(ListView {
            title: Some("Recommendations".to_string()),
            items,
        });
    }
}

fn populate_generic(view: &mut SectionView, body: &Value) {
    match body {
        Value::Object(map) => {
            for (key, value) in map.iter() {
                view.add_kv(key, summarize_value(value));
            }
        }
        Value::Array(items) => {
            let list: Vec<String> = items.iter().take(20).map(summarize_value).collect();
            view.add_list(ListView {
                title: None,
                items: list,
            });
        }
        Value::Null => {}
        other => view.add_kv("Value", summarize_value(other)),
    }
}

fn status_class(status: &SectionStatus) -> &'static str {
    match status {
        SectionStatus::Success => "success",
        SectionStatus::Degraded => "degraded",
        SectionStatus::Empty => "empty",
        SectionStatus::Error => "error",
    }
}

fn status_label(status: &SectionStatus) -> String {
    let mut label = status.to_string();
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    label
}

/// Scalar field rendered as text; missing and null values become "N/A".
fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn format_fixed(value: Option<&Value>, precision: usize) -> String {
    value
        .and_then(Value::as_f64)
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn format_percent(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_f64)
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn summarize_value(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(num) => num.to_string(),
        Value::String(text) => truncate(text),
        Value::Array(arr) => format!("{} entries", arr.len()),
        Value::Object(map) => format!("{} keys", map.len()),
    }
}

fn truncate(input: &str) -> String {
    if input.chars().count() > 120 {
        let head: String = input.chars().take(117).collect();
        format!("{head}…")
    } else {
        input.to_string()
    }
}
