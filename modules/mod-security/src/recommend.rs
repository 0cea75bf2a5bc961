use crate::categorize::{CategoryTally, IssueCategory, IssueSeverity};
use serde::Serialize;
use std::collections::BTreeMap;

/// A remediation entry shown to the operator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Recommendation {
    pub category: IssueCategory,
    pub title: &'static str,
    pub severity: IssueSeverity,
    pub description: String,
    pub solution: Option<&'static str>,
}

/// One entry per category with findings, in category order.
pub fn synthesize(tallies: &BTreeMap<IssueCategory, CategoryTally>) -> Vec<Recommendation> {
    IssueCategory::ALL
        .iter()
        .filter_map(|category| {
            let tally = tallies.get(category).filter(|tally| tally.count > 0)?;
            Some(recommend(*category, tally))
        })
        .collect()
}

fn recommend(category: IssueCategory, tally: &CategoryTally) -> Recommendation {
    let count = tally.count;
    let (title, description, solution) = match category {
        IssueCategory::EmptyPasswords => (
            "Users with Empty Passwords",
            format!(
                "Found {count} user(s) with empty passwords. This is a serious security risk as it allows anyone to log in without authentication."
            ),
            "Set strong passwords for all user accounts using the passwd command.",
        ),
        IssueCategory::PasswordAging => (
            "Password Aging Not Configured",
            format!(
                "Found {count} user(s) without password aging policies. Password aging ensures that users change their passwords periodically."
            ),
            "Configure password aging using the chage command to enforce regular password changes.",
        ),
        IssueCategory::SuidBinaries => (
            "Unauthorized SUID Binaries",
            format!(
                "Found {count} unauthorized SUID binary/binaries. SUID binaries run with the permissions of the file owner, which can be a security risk if exploited."
            ),
            "Review all SUID binaries and remove the SUID bit from unauthorized files using chmod u-s command.",
        ),
        IssueCategory::OpenPorts => (
            "Unnecessary Open Ports",
            format!(
                "Found {count} potentially unnecessary open port(s). Open ports can be entry points for attackers."
            ),
            "Close unnecessary ports by stopping the associated services or configuring the firewall to block them.",
        ),
        IssueCategory::WorldWritable => (
            "World-Writable Files",
            format!(
                "Found {count} world-writable file(s) or directory/directories. World-writable files can be modified by any user on the system."
            ),
            "Restrict permissions on these files using chmod o-w command to remove write access for others.",
        ),
        IssueCategory::UnownedFiles => (
            "Unowned Files",
            format!(
                "Found {count} file(s) with no valid owner or group. Unowned files may indicate compromised or deleted user accounts."
            ),
            "Assign proper ownership to these files using chown command or remove them if they are not needed.",
        ),
        IssueCategory::SuspiciousCron => (
            "Suspicious Cron Jobs",
            format!(
                "Found {count} suspicious cron job(s). Suspicious cron jobs may indicate unauthorized activities or malware."
            ),
            "Review all cron jobs and remove any unauthorized or suspicious entries.",
        ),
        IssueCategory::SuspiciousProcesses => (
            "Suspicious Processes",
            format!(
                "Found {count} suspicious process(es) running on the system. Suspicious processes may indicate unauthorized activities or malware."
            ),
            "Investigate these processes and terminate any unauthorized ones using the kill command.",
        ),
        IssueCategory::SshRootLogin => (
            "SSH Root Login Allowed",
            "SSH is configured to allow direct root login, which is a security risk. Root login should be disabled to prevent brute force attacks against the root account.".to_string(),
            "Edit /etc/ssh/sshd_config, set \"PermitRootLogin no\", and restart the SSH service.",
        ),
        IssueCategory::FailedLogins => (
            "High Number of Failed Login Attempts",
            "Detected a high number of failed login attempts, which may indicate a brute force attack.".to_string(),
            "Consider implementing fail2ban or similar tools to block IP addresses with multiple failed login attempts.",
        ),
        IssueCategory::Rootkits => (
            "Possible Rootkit Detected",
            "Possible rootkit or malware detected on the system. This is a critical security issue that requires immediate attention.".to_string(),
            "Isolate the system, perform a full security audit, and consider reinstalling the operating system from trusted media.",
        ),
        IssueCategory::Firewall => (
            "Firewall Not Configured",
            "The system firewall is not properly configured or is inactive. A firewall is essential for protecting the system from unauthorized access.".to_string(),
            "Configure and enable the firewall using iptables, ufw, or firewalld depending on your distribution.",
        ),
        IssueCategory::SecurityUpdates => (
            "Security Updates Available",
            format!(
                "{count} security update(s) available. Keeping the system updated is crucial for security."
            ),
            "Install available security updates using your package manager (apt, dnf, etc.).",
        ),
    };

    Recommendation {
        category,
        title,
        severity: tally.severity,
        description,
        solution: Some(solution),
    }
}
