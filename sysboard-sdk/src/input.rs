use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::DashboardConfig;
use crate::outcome::{CommandOutput, UpstreamError};

pub type JsonObject = serde_json::Map<String, Value>;

/// A feed as handed over by the data-retrieval service.
pub type Fetched<T> = Result<T, UpstreamError>;

/// Commands whose raw output the dashboard knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    ProcessList,
    DiskUsage,
    InterfaceAddresses,
    AlertLog,
    BackupListing,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::ProcessList,
        CommandKind::DiskUsage,
        CommandKind::InterfaceAddresses,
        CommandKind::AlertLog,
        CommandKind::BackupListing,
    ];

    /// Shell command line the execution service runs for this kind.
    ///
    /// The backup listing keeps the `latest` link; readers drop it when parsing.
    pub fn command_line(&self) -> &'static str {
        match self {
            CommandKind::ProcessList => "ps aux --sort=-%cpu | head -11",
            CommandKind::DiskUsage => "df -h",
            CommandKind::InterfaceAddresses => "ip -o addr show",
            CommandKind::AlertLog => "tail -n 20 logs/alerts.log",
            CommandKind::BackupListing => "ls -1 data/backups",
        }
    }

    /// File name used when outputs are captured to disk.
    pub fn capture_file(&self) -> &'static str {
        match self {
            CommandKind::ProcessList => "ps.txt",
            CommandKind::DiskUsage => "df.txt",
            CommandKind::InterfaceAddresses => "ip.txt",
            CommandKind::AlertLog => "alerts.log",
            CommandKind::BackupListing => "backups.txt",
        }
    }
}

/// Monitoring time series, one array of raw points per metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitoringFeed {
    #[serde(default)]
    pub summary: JsonObject,
    #[serde(default)]
    pub cpu: Vec<Value>,
    #[serde(default)]
    pub memory: Vec<Value>,
    #[serde(default)]
    pub disk: Vec<Value>,
    #[serde(default)]
    pub load: Vec<Value>,
}

impl MonitoringFeed {
    /// Routes a typed point (`{"type": "cpu", ...}`) into its series.
    /// Returns `false` for points of unknown or missing type.
    pub fn push_point(&mut self, point: Value) -> bool {
        let series = match point.get("type").and_then(Value::as_str) {
            Some("cpu") => &mut self.cpu,
            Some("memory") => &mut self.memory,
            Some("disk") => &mut self.disk,
            Some("load") => &mut self.load,
            _ => return false,
        };
        series.push(point);
        true
    }
}

/// Security scan results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SecurityFeed {
    #[serde(default)]
    pub summary: JsonObject,
    #[serde(default)]
    pub issues: Vec<Value>,
}

/// A backup artifact found on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub id: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// Backup bookkeeping: the last run and, when scanned, the archives on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackupFeed {
    #[serde(default)]
    pub last_backup: JsonObject,
    #[serde(default)]
    pub archives: Vec<ArchiveEntry>,
}

/// Everything a dashboard refresh has fetched, plus the configuration to read it with.
#[derive(Debug, Clone)]
pub struct DashboardInput {
    config: DashboardConfig,
    system: Fetched<JsonObject>,
    monitoring: Fetched<MonitoringFeed>,
    security: Fetched<SecurityFeed>,
    backups: Fetched<BackupFeed>,
    commands: BTreeMap<CommandKind, CommandOutput>,
}

impl Default for DashboardInput {
    fn default() -> Self {
        Self {
            config: DashboardConfig::default(),
            system: Ok(JsonObject::new()),
            monitoring: Ok(MonitoringFeed::default()),
            security: Ok(SecurityFeed::default()),
            backups: Ok(BackupFeed::default()),
            commands: BTreeMap::new(),
        }
    }
}

impl DashboardInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DashboardConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn set_system(&mut self, system: Fetched<JsonObject>) {
        self.system = system;
    }

    pub fn set_monitoring(&mut self, monitoring: Fetched<MonitoringFeed>) {
        self.monitoring = monitoring;
    }

    pub fn set_security(&mut self, security: Fetched<SecurityFeed>) {
        self.security = security;
    }

    pub fn set_backups(&mut self, backups: Fetched<BackupFeed>) {
        self.backups = backups;
    }

    pub fn set_command(&mut self, kind: CommandKind, output: CommandOutput) {
        self.commands.insert(kind, output);
    }

    pub fn system(&self) -> Result<&JsonObject, &UpstreamError> {
        self.system.as_ref()
    }

    pub fn monitoring(&self) -> Result<&MonitoringFeed, &UpstreamError> {
        self.monitoring.as_ref()
    }

    pub fn security(&self) -> Result<&SecurityFeed, &UpstreamError> {
        self.security.as_ref()
    }

    pub fn backups(&self) -> Result<&BackupFeed, &UpstreamError> {
        self.backups.as_ref()
    }

    pub fn command(&self, kind: CommandKind) -> Option<&CommandOutput> {
        self.commands.get(&kind)
    }

    /// Raw text of a captured command, or why there is none.
    pub fn command_text(&self, kind: CommandKind) -> Result<&str, UpstreamError> {
        match self.commands.get(&kind) {
            Some(output) => output.text(),
            None => Err(UpstreamError::NotCaptured(kind.command_line().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn monitoring_points_route_by_type() {
        let mut feed = MonitoringFeed::default();
        assert!(feed.push_point(json!({"type": "cpu", "value": 12.0})));
        assert!(feed.push_point(json!({"type": "load", "load1": 0.5})));
        assert!(!feed.push_point(json!({"type": "zombies"})));
        assert!(!feed.push_point(json!({"value": 1})));
        assert_eq!(feed.cpu.len(), 1);
        assert_eq!(feed.load.len(), 1);
    }

    #[test]
    fn missing_command_is_not_captured() {
        let input = DashboardInput::new();
        let error = input.command_text(CommandKind::DiskUsage).unwrap_err();
        assert_eq!(error, UpstreamError::NotCaptured("df -h".into()));
    }

    #[test]
    fn captured_command_text_is_returned() {
        let mut input = DashboardInput::new();
        input.set_command(CommandKind::AlertLog, CommandOutput::ok("[t] hello"));
        assert_eq!(input.command_text(CommandKind::AlertLog), Ok("[t] hello"));
    }

    #[test]
    fn feeds_default_to_empty() {
        let input = DashboardInput::new();
        assert!(input.monitoring().unwrap().cpu.is_empty());
        assert!(input.security().unwrap().issues.is_empty());
    }
}
