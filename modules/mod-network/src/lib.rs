use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use sysboard_sdk::table::{self, TableSpec};
use sysboard_sdk::{
    Band, CommandKind, DashboardInput, Outcome, Panel, PanelMetadata, Section, register_panel,
};

const ID: &str = "network";
const TITLE: &str = "Network Interfaces";

/// `ip -o addr show`: one record per line, index and name first.
const IP_ONELINE: TableSpec = TableSpec::new(4);

struct NetworkPanel;

impl Panel for NetworkPanel {
    fn metadata(&self) -> PanelMetadata {
        PanelMetadata {
            id: ID,
            title: TITLE,
            description: "Interface addresses and link state",
            order: 50,
        }
    }

    fn build(&self, input: &DashboardInput) -> Result<Section> {
        let outcome = match input.command_text(CommandKind::InterfaceAddresses) {
            Ok(text) => Outcome::from_rows(parse_interfaces(text)),
            Err(error) => Outcome::Failed(error),
        };
        Ok(section_from_outcome(outcome))
    }
}

fn create_panel() -> Box<dyn Panel> {
    Box::new(NetworkPanel)
}

register_panel!(create_panel);

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl InterfaceStatus {
    fn from_state(state: &str) -> Self {
        if state.eq_ignore_ascii_case("up") {
            InterfaceStatus::Up
        } else if state.eq_ignore_ascii_case("down") {
            InterfaceStatus::Down
        } else {
            InterfaceStatus::Unknown
        }
    }

    fn class(&self) -> &'static str {
        match self {
            InterfaceStatus::Up => "success",
            InterfaceStatus::Down => "critical",
            InterfaceStatus::Unknown => "normal",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub name: String,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub status: InterfaceStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct InterfaceView {
    #[serde(flatten)]
    record: InterfaceRecord,
    status_class: &'static str,
}

/// Parses one-line `ip` output. The first line seen for an interface name wins.
pub fn parse_interfaces(text: &str) -> Vec<InterfaceRecord> {
    let mut seen = HashSet::new();
    let mut interfaces = Vec::new();

    for row in table::rows(text, IP_ONELINE) {
        let fields = row.fields();
        let name = fields[1].trim_end_matches(':');
        if name.is_empty() || !seen.insert(name.to_string()) {
            continue;
        }

        let ip_address = value_after(fields, |t| t == "inet")
            .map(|value| leading(value, |c| c.is_ascii_digit() || c == '.'))
            .filter(|value| !value.is_empty());
        let mac_address = value_after(fields, |t| t.eq_ignore_ascii_case("link/ether"))
            .map(|value| leading(value, |c| c.is_ascii_hexdigit() || c == ':'))
            .filter(|value| !value.is_empty());
        let status = value_after(fields, |t| t.eq_ignore_ascii_case("state"))
            .map(|value| leading(value, |c| c.is_alphanumeric() || c == '_'))
            .map(InterfaceStatus::from_state)
            .unwrap_or_default();

        interfaces.push(InterfaceRecord {
            name: name.to_string(),
            ip_address: ip_address.map(str::to_string),
            mac_address: mac_address.map(str::to_string),
            status,
        });
    }

    interfaces
}

fn value_after<'a>(fields: &[&'a str], key: impl Fn(&str) -> bool) -> Option<&'a str> {
    let position = fields.iter().position(|token| key(*token))?;
    fields.get(position + 1).copied()
}

fn leading(value: &str, accept: impl Fn(char) -> bool) -> &str {
    let end = value
        .char_indices()
        .find(|(_, c)| !accept(*c))
        .map(|(index, _)| index)
        .unwrap_or(value.len());
    &value[..end]
}

fn section_from_outcome(outcome: Outcome<Vec<InterfaceRecord>>) -> Section {
    let interfaces = match outcome {
        Outcome::Ready(interfaces) => interfaces,
        Outcome::NoData => return Section::empty(ID, TITLE, "No network interfaces found".into()),
        Outcome::Failed(error) => {
            return Section::error(
                ID,
                TITLE,
                format!("Error retrieving network interface data: {error}"),
            );
        }
    };

    let up = interfaces
        .iter()
        .filter(|iface| iface.status == InterfaceStatus::Up)
        .count();
    let views: Vec<InterfaceView> = interfaces
        .into_iter()
        .map(|record| InterfaceView {
            status_class: record.status.class(),
            record,
        })
        .collect();

    let mut section = Section::success(ID, TITLE, json!({ "interfaces": views }));
    section.summary = Some(format!("{} interfaces, {} up", views.len(), up));

    for view in views
        .iter()
        .filter(|view| view.record.status == InterfaceStatus::Down)
    {
        section.flag(
            Band::Warning,
            format!("Interface {} is down", view.record.name),
        );
    }

    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysboard_sdk::SectionStatus;

    const ADDR: &str = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
1: lo    inet6 ::1/128 scope host \\       valid_lft forever preferred_lft forever
2: eth0    inet 10.0.0.5/24 brd 10.0.0.255 scope global eth0\\       valid_lft forever preferred_lft forever
2: eth0    inet 10.0.0.99/24 scope global secondary eth0\\       valid_lft forever preferred_lft forever
";

    const LINK: &str = "\
2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc fq_codel state UP mode DEFAULT group default qlen 1000\\    link/ether 52:54:00:12:34:56 brd ff:ff:ff:ff:ff:ff
3: wlan0: <BROADCAST,MULTICAST> mtu 1500 qdisc noop state DOWN mode DORMANT group default qlen 1000\\    link/ether A0:B1:C2:D3:E4:F5 brd ff:ff:ff:ff:ff:ff
4: tun0: <POINTOPOINT,UP> mtu 1500 qdisc noop state UNKNOWN group default
";

    #[test]
    fn first_occurrence_wins() {
        let interfaces = parse_interfaces(ADDR);
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[0].name, "lo");
        assert_eq!(interfaces[0].ip_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(interfaces[1].ip_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(interfaces[1].mac_address, None);
        assert_eq!(interfaces[1].status, InterfaceStatus::Unknown);
    }

    #[test]
    fn link_lines_carry_mac_and_state() {
        let interfaces = parse_interfaces(LINK);
        assert_eq!(interfaces.len(), 3);
        assert_eq!(interfaces[0].name, "eth0");
        assert_eq!(
            interfaces[0].mac_address.as_deref(),
            Some("52:54:00:12:34:56")
        );
        assert_eq!(interfaces[0].status, InterfaceStatus::Up);
        assert_eq!(interfaces[1].status, InterfaceStatus::Down);
        assert_eq!(
            interfaces[1].mac_address.as_deref(),
            Some("A0:B1:C2:D3:E4:F5")
        );
        assert_eq!(interfaces[2].status, InterfaceStatus::Unknown);
    }

    #[test]
    fn short_lines_are_ignored() {
        assert!(parse_interfaces("garbage\n1: lo\n").is_empty());
    }

    #[test]
    fn down_interfaces_are_flagged() {
        let section = section_from_outcome(Outcome::Ready(parse_interfaces(LINK)));
        assert_eq!(section.status, SectionStatus::Degraded);
        assert_eq!(section.flags.len(), 1);
        let rows = section.body["interfaces"].as_array().unwrap();
        assert_eq!(rows[0]["status_class"], "success");
        assert_eq!(rows[1]["status_class"], "critical");
        assert_eq!(rows[2]["status"], "unknown");
    }

    #[test]
    fn missing_capture_is_error() {
        let section = NetworkPanel.build(&DashboardInput::new()).unwrap();
        assert_eq!(section.status, SectionStatus::Error);
        assert!(section.summary.unwrap().contains("ip -o addr show"));
    }
}
