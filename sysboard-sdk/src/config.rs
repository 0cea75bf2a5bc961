use anyhow::{Context as _, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classify::Thresholds;

/// Dashboard configuration, usually read from `sysboard.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub windows: WindowConfig,
}

/// Classification boundaries per metric family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdConfig {
    #[serde(default = "percent_thresholds")]
    pub cpu: Thresholds,
    #[serde(default = "percent_thresholds")]
    pub memory: Thresholds,
    #[serde(default = "disk_thresholds")]
    pub disk: Thresholds,
    #[serde(default = "process_thresholds")]
    pub process: Thresholds,
}

/// How many recent entries each view keeps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    #[serde(default = "default_metric_window")]
    pub metrics: usize,
    #[serde(default = "default_disk_window")]
    pub disk: usize,
    #[serde(default = "default_alert_window")]
    pub alerts: usize,
}

fn percent_thresholds() -> Thresholds {
    Thresholds::PERCENT
}

fn disk_thresholds() -> Thresholds {
    Thresholds::DISK
}

fn process_thresholds() -> Thresholds {
    Thresholds::PROCESS
}

fn default_metric_window() -> usize {
    20
}

fn default_disk_window() -> usize {
    5
}

fn default_alert_window() -> usize {
    20
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu: percent_thresholds(),
            memory: percent_thresholds(),
            disk: disk_thresholds(),
            process: process_thresholds(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            metrics: default_metric_window(),
            disk: default_disk_window(),
            alerts: default_alert_window(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DashboardConfig =
            toml::from_str(contents).context("invalid dashboard configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("load {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, thresholds) in [
            ("cpu", self.thresholds.cpu),
            ("memory", self.thresholds.memory),
            ("disk", self.thresholds.disk),
            ("process", self.thresholds.process),
        ] {
            if !thresholds.warn.is_finite() || !thresholds.critical.is_finite() {
                return Err(anyhow!("{} thresholds must be finite numbers", name));
            }
            if thresholds.warn > thresholds.critical {
                return Err(anyhow!(
                    "{} warn ({:.1}) must be <= critical ({:.1})",
                    name,
                    thresholds.warn,
                    thresholds.critical
                ));
            }
        }

        for (name, size) in [
            ("metrics", self.windows.metrics),
            ("disk", self.windows.disk),
            ("alerts", self.windows.alerts),
        ] {
            if size == 0 {
                return Err(anyhow!("window {} must keep at least one entry", name));
            }
        }

        Ok(())
    }
}
