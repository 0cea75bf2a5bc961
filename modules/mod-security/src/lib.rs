use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};
use sysboard_sdk::{
    Band, DashboardInput, JsonObject, Panel, PanelMetadata, Section, SecurityFeed, register_panel,
};

mod categorize;
mod recommend;

pub use categorize::{
    CategoryTally, IssueCategory, IssueSeverity, SecurityIssue, categorize, category_of,
};
pub use recommend::{Recommendation, synthesize};

const ID: &str = "security";
const TITLE: &str = "Security Posture";

struct SecurityPanel;

impl Panel for SecurityPanel {
    fn metadata(&self) -> PanelMetadata {
        PanelMetadata {
            id: ID,
            title: TITLE,
            description: "Security scan findings and remediation advice",
            order: 70,
        }
    }

    fn build(&self, input: &DashboardInput) -> Result<Section> {
        Ok(match input.security() {
            Ok(feed) => build_section(feed),
            Err(error) => Section::error(ID, TITLE, format!("Error loading security data: {error}")),
        })
    }
}

fn create_panel() -> Box<dyn Panel> {
    Box::new(SecurityPanel)
}

register_panel!(create_panel);

#[derive(Debug, Clone, Serialize, PartialEq)]
struct ScanSummary {
    last_scan: String,
    total_issues: u64,
    high_issues: u64,
    medium_issues: u64,
    low_issues: u64,
}

fn scan_summary(summary: &JsonObject) -> ScanSummary {
    let count = |key: &str| match summary.get(key) {
        Some(Value::Number(number)) => number.as_u64().unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    };

    ScanSummary {
        last_scan: summary
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or("Never")
            .to_string(),
        total_issues: count("total_issues"),
        high_issues: count("high_issues"),
        medium_issues: count("medium_issues"),
        low_issues: count("low_issues"),
    }
}

fn build_section(feed: &SecurityFeed) -> Section {
    if feed.summary.is_empty() && feed.issues.is_empty() {
        return Section::empty(ID, TITLE, "No security scan results available".into());
    }

    let issues: Vec<SecurityIssue> = feed.issues.iter().map(SecurityIssue::from_value).collect();
    let tallies = categorize(&issues);
    let recommendations = synthesize(&tallies);
    let summary = scan_summary(&feed.summary);

    let categories: Vec<Value> = tallies
        .iter()
        .map(|(category, tally)| {
            json!({
                "category": category,
                "count": tally.count,
                "severity": tally.severity,
            })
        })
        .collect();

    let body = json!({
        "summary": summary,
        "issues": issues,
        "categories": categories,
        "recommendations": recommendations,
    });

    let mut section = Section::success(ID, TITLE, body);
    section.summary = Some(if issues.is_empty() {
        "No security issues found".to_string()
    } else {
        format!(
            "{} issues, {} recommendations",
            issues.len(),
            recommendations.len()
        )
    });

    if !issues.is_empty() && recommendations.is_empty() {
        section
            .notes
            .push("No recommendations available for the reported issues".to_string());
    }

    for recommendation in &recommendations {
        let band = match recommendation.severity {
            IssueSeverity::High => Band::Critical,
            IssueSeverity::Medium => Band::Warning,
            IssueSeverity::Low => Band::Normal,
        };
        section.flag(band, recommendation.title);
    }

    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysboard_sdk::{SectionStatus, UpstreamError};

    fn feed(issues: Vec<Value>) -> SecurityFeed {
        let mut summary = JsonObject::new();
        summary.insert("timestamp".into(), json!("2024-01-15 03:00:00"));
        summary.insert("total_issues".into(), json!(issues.len()));
        summary.insert("high_issues".into(), json!("1"));
        SecurityFeed { summary, issues }
    }

    #[test]
    fn builds_recommendations_and_flags() {
        let section = build_section(&feed(vec![
            json!({"message": "user eve has empty password", "severity": "HIGH"}),
            json!({"message": "SUID binary /usr/local/bin/x", "severity": "MEDIUM"}),
            json!({"message": "nothing to see", "severity": "LOW"}),
        ]));

        assert_eq!(section.status, SectionStatus::Degraded);
        assert_eq!(section.flags.len(), 2);
        assert_eq!(section.flags[0].band, Band::Critical);
        assert_eq!(section.flags[0].message, "Users with Empty Passwords");

        let body = &section.body;
        assert_eq!(body["summary"]["last_scan"], "2024-01-15 03:00:00");
        assert_eq!(body["summary"]["total_issues"], 3);
        assert_eq!(body["summary"]["high_issues"], 1);
        assert_eq!(body["summary"]["low_issues"], 0);
        assert_eq!(body["recommendations"][0]["severity"], "high");
        assert_eq!(body["recommendations"][1]["title"], "Unauthorized SUID Binaries");
        assert_eq!(body["categories"][0]["category"], "empty_passwords");
    }

    #[test]
    fn low_findings_stay_successful() {
        let section = build_section(&feed(vec![
            json!({"message": "open port 8080", "severity": "LOW"}),
        ]));
        assert_eq!(section.status, SectionStatus::Success);
        assert!(section.flags.is_empty());
    }

    #[test]
    fn unmatched_issues_leave_a_note() {
        let section = build_section(&feed(vec![json!({"message": "odd", "severity": "HIGH"})]));
        assert_eq!(section.status, SectionStatus::Success);
        assert_eq!(section.notes.len(), 1);
    }

    #[test]
    fn clean_scan_reports_no_issues() {
        let section = build_section(&feed(Vec::new()));
        assert_eq!(section.summary.as_deref(), Some("No security issues found"));
    }

    #[test]
    fn missing_scan_is_no_data() {
        let section = build_section(&SecurityFeed::default());
        assert_eq!(section.status, SectionStatus::Empty);
    }

    #[test]
    fn failed_feed_is_error() {
        let mut input = DashboardInput::new();
        input.set_security(Err(UpstreamError::Unavailable("scan api timed out".into())));
        let section = SecurityPanel.build(&input).unwrap();
        assert_eq!(section.status, SectionStatus::Error);
        assert!(section.summary.unwrap().contains("scan api timed out"));
    }
}
