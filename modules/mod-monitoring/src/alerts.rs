use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

/// One line of the alert log: `[timestamp] message`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AlertEntry {
    pub timestamp: String,
    pub level: AlertLevel,
    pub message: String,
}

/// Parses the last `limit` non-blank lines of the alert log.
pub fn parse_alert_log(text: &str, limit: usize) -> Vec<AlertEntry> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..].iter().map(|line| parse_alert_line(line)).collect()
}

pub fn parse_alert_line(line: &str) -> AlertEntry {
    let timestamp = line
        .split_once('[')
        .and_then(|(_, rest)| rest.split_once(']'))
        .map(|(inside, _)| inside.to_string())
        .unwrap_or_default();

    AlertEntry {
        timestamp,
        level: level_of(line),
        message: strip_brackets(line).trim().to_string(),
    }
}

fn level_of(line: &str) -> AlertLevel {
    if line.contains("HIGH") || line.contains("CRITICAL") {
        AlertLevel::High
    } else if line.contains("MEDIUM") || line.contains("WARNING") {
        AlertLevel::Medium
    } else {
        AlertLevel::Low
    }
}

/// Removes every `[...]` segment; an unclosed `[` is kept.
fn strip_brackets(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find('[') {
        match rest[open..].find(']') {
            Some(close) => {
                result.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    result.push_str(rest);
    result
}
