use crate::classify::{Outcome, OutcomeStatus};
use crate::entity::MonitoredEntity;
use crate::logparse::LogRecord;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Channel-agnostic notification content for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
    /// Full-fidelity raw log, attached when something went wrong.
    pub attachment: Option<PathBuf>,
}

const NO_ENTRIES: &str = "(no entries)";

fn excerpt(records: &[LogRecord]) -> String {
    if records.is_empty() {
        return NO_ENTRIES.to_string();
    }
    records
        .iter()
        .map(|r| r.raw.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn section(title: &str, records: &[LogRecord]) -> String {
    format!("== {} ==\n{}\n", title, excerpt(records))
}

/// Compose the report for one run.
///
/// Deterministic and infallible: the same outcome always yields
/// byte-identical output, and empty evidence renders an explicit
/// "(no entries)" marker instead of omitting the section.
pub fn compose(
    entity: &MonitoredEntity,
    outcome: &Outcome,
    invoked_at: DateTime<Utc>,
    raw_log: &std::path::Path,
) -> Report {
    let date = invoked_at.format("%Y-%m-%d");
    let subject = format!("[upmon] {} {} {}", entity.name, outcome.status.label(), date);

    let mut body = String::new();
    body.push_str(&format!("entity: {}\n", entity.name));
    body.push_str(&format!("mode: {}\n", entity.run_mode));
    body.push_str(&format!("status: {}\n", outcome.status.label()));
    if let Some(cause) = outcome.cause {
        body.push_str(&format!("cause: {}\n", cause.describe()));
    }
    body.push_str(&format!("invoked: {}\n\n", invoked_at.format("%Y-%m-%d %H:%M:%S UTC")));

    let attachment = match outcome.status {
        OutcomeStatus::Error | OutcomeStatus::Indeterminate => {
            // Operators need full fidelity when something went wrong.
            body.push_str(&section("errors", &outcome.evidence.errors));
            body.push('\n');
            body.push_str(&section("summary", &outcome.evidence.summary));
            Some(raw_log.to_path_buf())
        }
        OutcomeStatus::DataFound => {
            body.push_str(&section("new data", &outcome.evidence.data_events));
            body.push('\n');
            body.push_str(&section("summary", &outcome.evidence.summary));
            None
        }
        OutcomeStatus::Clean => {
            body.push_str(&section("summary", &outcome.evidence.summary));
            None
        }
    };

    Report {
        subject,
        body,
        attachment,
    }
}
