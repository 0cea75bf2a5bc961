use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    #[default]
    Low,
    Medium,
    High,
}

impl IssueSeverity {
    /// Scanner severities are upper-case words; anything unknown counts as low.
    ///
    /// The mapping is lossy: `CRITICAL`, `INFO` or a typo all read as [`IssueSeverity::Low`]
    /// and the original word is not kept.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HIGH" => IssueSeverity::High,
            "MEDIUM" => IssueSeverity::Medium,
            _ => IssueSeverity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Low => "low",
            IssueSeverity::Medium => "medium",
            IssueSeverity::High => "high",
        }
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding reported by the security scanner.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SecurityIssue {
    pub message: String,
    pub severity: IssueSeverity,
}

impl SecurityIssue {
    pub fn new(message: impl Into<String>, severity: IssueSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    /// Reads `{message, severity}`; missing fields become an empty message and low severity.
    pub fn from_value(value: &Value) -> Self {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let severity = value
            .get("severity")
            .and_then(Value::as_str)
            .map(IssueSeverity::parse)
            .unwrap_or_default();
        Self::new(message, severity)
    }
}

/// Closed set of issue kinds. Declaration order is presentation order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    EmptyPasswords,
    PasswordAging,
    SuidBinaries,
    OpenPorts,
    WorldWritable,
    UnownedFiles,
    SuspiciousCron,
    SuspiciousProcesses,
    SshRootLogin,
    FailedLogins,
    Rootkits,
    Firewall,
    SecurityUpdates,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 13] = [
        IssueCategory::EmptyPasswords,
        IssueCategory::PasswordAging,
        IssueCategory::SuidBinaries,
        IssueCategory::OpenPorts,
        IssueCategory::WorldWritable,
        IssueCategory::UnownedFiles,
        IssueCategory::SuspiciousCron,
        IssueCategory::SuspiciousProcesses,
        IssueCategory::SshRootLogin,
        IssueCategory::FailedLogins,
        IssueCategory::Rootkits,
        IssueCategory::Firewall,
        IssueCategory::SecurityUpdates,
    ];
}

/// Substrings that must all appear in a message, case-sensitive.
type Predicate = &'static [&'static str];

/// Matching order; the first predicate that holds claims the issue.
const PREDICATES: [(Predicate, IssueCategory); 13] = [
    (&["empty password"], IssueCategory::EmptyPasswords),
    (&["password aging"], IssueCategory::PasswordAging),
    (&["SUID"], IssueCategory::SuidBinaries),
    (&["open port"], IssueCategory::OpenPorts),
    (&["world-writable"], IssueCategory::WorldWritable),
    (&["unowned"], IssueCategory::UnownedFiles),
    (&["suspicious", "cron"], IssueCategory::SuspiciousCron),
    (&["suspicious", "process"], IssueCategory::SuspiciousProcesses),
    (&["SSH", "root login"], IssueCategory::SshRootLogin),
    (&["failed login"], IssueCategory::FailedLogins),
    (&["rootkit"], IssueCategory::Rootkits),
    (&["firewall"], IssueCategory::Firewall),
    (&["security update"], IssueCategory::SecurityUpdates),
];

/// Category claiming `message`, if any.
pub fn category_of(message: &str) -> Option<IssueCategory> {
    PREDICATES
        .iter()
        .find(|(needles, _)| needles.iter().all(|needle| message.contains(needle)))
        .map(|(_, category)| *category)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CategoryTally {
    pub count: usize,
    /// Severity of the most recently seen issue in this category.
    pub severity: IssueSeverity,
}

/// Counts issues per category. Unmatched issues are dropped.
pub fn categorize(issues: &[SecurityIssue]) -> BTreeMap<IssueCategory, CategoryTally> {
    let mut tallies = BTreeMap::new();
    for issue in issues {
        let Some(category) = category_of(&issue.message) else {
            tracing::trace!(message = %issue.message, "security issue matched no category");
            continue;
        };
        tallies
            .entry(category)
            .and_modify(|tally: &mut CategoryTally| {
                tally.count += 1;
                tally.severity = issue.severity;
            })
            .or_insert(CategoryTally {
                count: 1,
                severity: issue.severity,
            });
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_matching_predicate_wins() {
        assert_eq!(
            category_of("SUID binary found in world-writable dir"),
            Some(IssueCategory::SuidBinaries)
        );
        assert_eq!(
            category_of("suspicious process spawned by cron"),
            Some(IssueCategory::SuspiciousCron)
        );
        assert_eq!(
            category_of("suspicious process detected"),
            Some(IssueCategory::SuspiciousProcesses)
        );
    }

    #[test]
    fn predicates_are_case_sensitive() {
        assert_eq!(category_of("suid binary"), None);
        assert_eq!(category_of("Firewall inactive"), None);
        assert_eq!(category_of("ssh allows root login"), None);
        assert_eq!(
            category_of("SSH allows root login"),
            Some(IssueCategory::SshRootLogin)
        );
    }

    #[test]
    fn predicate_table_follows_category_order() {
        let order: Vec<IssueCategory> = PREDICATES.iter().map(|(_, category)| *category).collect();
        assert_eq!(order, IssueCategory::ALL.to_vec());
    }

    #[test]
    fn counts_and_keeps_last_severity() {
        let issues = vec![
            SecurityIssue::new("open port 23 (telnet)", IssueSeverity::High),
            SecurityIssue::new("kernel is shiny", IssueSeverity::High),
            SecurityIssue::new("open port 8080", IssueSeverity::Low),
        ];
        let tallies = categorize(&issues);
        assert_eq!(tallies.len(), 1);
        let tally = tallies[&IssueCategory::OpenPorts];
        assert_eq!(tally.count, 2);
        assert_eq!(tally.severity, IssueSeverity::Low);
    }

    #[test]
    fn unknown_severities_read_as_low() {
        assert_eq!(IssueSeverity::parse(" high "), IssueSeverity::High);
        assert_eq!(IssueSeverity::parse("Medium"), IssueSeverity::Medium);
        assert_eq!(IssueSeverity::parse("CRITICAL"), IssueSeverity::Low);
        assert_eq!(IssueSeverity::parse(""), IssueSeverity::Low);
    }

    #[test]
    fn empty_input_has_no_categories() {
        assert!(categorize(&[]).is_empty());
    }

    #[test]
    fn issue_defaults_from_json() {
        let issue = SecurityIssue::from_value(&json!({"message": "rootkit hint"}));
        assert_eq!(issue.severity, IssueSeverity::Low);
        let issue = SecurityIssue::from_value(&json!({"severity": "medium"}));
        assert_eq!(issue.message, "");
        assert_eq!(issue.severity, IssueSeverity::Medium);
        assert_eq!(IssueSeverity::parse("UNKNOWN"), IssueSeverity::Low);
    }
}
