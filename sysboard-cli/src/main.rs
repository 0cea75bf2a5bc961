use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use sysboard_core::{DashboardConfig, build_report};
use sysboard_sdk::DashboardInput;

mod capture;
mod logging;
mod source;

// Ensure panel crates are linked so their registrations are collected.
use mod_backups as _;
use mod_monitoring as _;
use mod_network as _;
use mod_processes as _;
use mod_security as _;
use mod_storage as _;
use mod_system as _;

#[derive(Parser, Debug)]
#[command(
    name = "sysboard",
    version,
    about = "Administrative dashboard report",
    author = "sysboard developers"
)]
struct Cli {
    /// Dashboard configuration file (TOML)
    #[arg(long, env = "SYSBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the collected monitoring, security and backup data
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory with saved command output (ps.txt, df.txt, ip.txt, alerts.log, backups.txt)
    #[arg(long, conflicts_with = "live")]
    captures: Option<PathBuf>,

    /// Run the dashboard commands on this host
    #[arg(long)]
    live: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
    Html,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };

    let mut input = DashboardInput::with_config(config);
    source::load_data_dir(&cli.data_dir, &mut input);

    if cli.live {
        capture::capture_live(&cli.data_dir, &mut input);
    } else if let Some(dir) = &cli.captures {
        capture::load_captures(dir, &mut input)
            .with_context(|| format!("failed to load captures from {}", dir.display()))?;
    }

    let report = build_report(&input);
    tracing::info!(
        sections = report.metadata.sections,
        overall = report.health_digest.overall.as_str(),
        "report built"
    );

    match cli.format {
        OutputFormat::Markdown => println!("{}", report.to_markdown()?),
        OutputFormat::Html => println!("{}", report.to_html()?),
        OutputFormat::Json => {
            let payload = report.to_json_value();
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "sysboard",
            "--data-dir",
            "/var/lib/dash",
            "--captures",
            "/tmp/cap",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/var/lib/dash"));
        assert_eq!(cli.captures, Some(PathBuf::from("/tmp/cap")));
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(cli.verbose);
    }

    #[test]
    fn live_conflicts_with_captures() {
        assert!(Cli::try_parse_from(["sysboard", "--live", "--captures", "x"]).is_err());
    }
}
