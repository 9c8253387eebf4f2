use crate::entity::MonitoredEntity;
use crate::logparse::{LineFormat, LogRecord, Severity};
use chrono::{DateTime, Duration, Utc};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Evidence accumulated from a single pass over one run's log stream.
#[derive(Debug, Clone, Default)]
pub struct RunEvidence {
    /// ERROR records, in stream order.
    pub errors: Vec<LogRecord>,
    /// INFO records, in stream order. The client's run summary.
    pub summary: Vec<LogRecord>,
    /// Records matching the data-creation marker, any severity.
    pub data_events: Vec<LogRecord>,
    pub total_lines: usize,
    pub unknown_lines: usize,
}

/// The classified verdict for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Clean,
    DataFound,
    Error,
    Indeterminate,
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Clean => "CLEAN",
            OutcomeStatus::DataFound => "DATA FOUND",
            OutcomeStatus::Error => "ERROR",
            OutcomeStatus::Indeterminate => "INDETERMINATE",
        }
    }
}

/// Why a run classified as INDETERMINATE. Lets operators tell broken
/// monitoring apart from a broken upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndeterminateCause {
    MissingArtifact,
    UnreadableArtifact,
    StaleArtifact,
    EmptySummary,
    ClientTimeout,
}

impl IndeterminateCause {
    pub fn describe(&self) -> &'static str {
        match self {
            IndeterminateCause::MissingArtifact => "log artifact not found",
            IndeterminateCause::UnreadableArtifact => "log artifact not readable",
            IndeterminateCause::StaleArtifact => "log artifact not updated since invocation",
            IndeterminateCause::EmptySummary => "run produced no summary records",
            IndeterminateCause::ClientTimeout => "client timed out and was terminated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub status: OutcomeStatus,
    pub evidence: RunEvidence,
    pub cause: Option<IndeterminateCause>,
}

impl Outcome {
    pub fn indeterminate(cause: IndeterminateCause) -> Self {
        Self {
            status: OutcomeStatus::Indeterminate,
            evidence: RunEvidence::default(),
            cause: Some(cause),
        }
    }
}

/// Existence/readability/mtime of the log artifact, gathered before any
/// content is read.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactMeta {
    pub exists: bool,
    pub readable: bool,
    pub modified: Option<DateTime<Utc>>,
}

pub fn artifact_meta(path: &Path) -> ArtifactMeta {
    match std::fs::metadata(path) {
        Ok(meta) => ArtifactMeta {
            exists: true,
            readable: File::open(path).is_ok(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        },
        Err(_) => ArtifactMeta {
            exists: false,
            readable: false,
            modified: None,
        },
    }
}

/// The staleness gate. Returns the cause that forces INDETERMINATE, or
/// `None` if the artifact is trustworthy and may be parsed.
///
/// `reference` is the invocation start time for online runs; `None` skips
/// the freshness comparison (offline `check` mode). `window` bounds how old
/// the artifact may be in absolute terms.
pub fn check_artifact(
    meta: &ArtifactMeta,
    reference: Option<DateTime<Utc>>,
    window: Duration,
) -> Option<IndeterminateCause> {
    if !meta.exists {
        return Some(IndeterminateCause::MissingArtifact);
    }
    if !meta.readable {
        return Some(IndeterminateCause::UnreadableArtifact);
    }
    let Some(modified) = meta.modified else {
        return Some(IndeterminateCause::UnreadableArtifact);
    };
    if let Some(invoked_at) = reference {
        // Artifact must have been touched by THIS run, not a prior one.
        // A small grace covers filesystems with coarse mtime resolution.
        if modified + Duration::seconds(2) < invoked_at {
            return Some(IndeterminateCause::StaleArtifact);
        }
    }
    if modified + window < Utc::now() {
        return Some(IndeterminateCause::StaleArtifact);
    }
    None
}

/// Classifier for one entity's run log.
#[derive(Debug, Clone)]
pub struct Classifier {
    pub format: LineFormat,
    /// Maximum allowed age of the artifact's last modification.
    pub staleness_window: Duration,
}

impl Classifier {
    pub fn new(format: LineFormat, staleness_window: Duration) -> Self {
        Self {
            format,
            staleness_window,
        }
    }

    /// Accumulate evidence from parsed records. Pure; one forward pass.
    pub fn collect_evidence<I>(&self, records: I) -> RunEvidence
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut evidence = RunEvidence::default();
        for record in records {
            evidence.total_lines += 1;
            if self.format.is_data_event(&record.raw) {
                evidence.data_events.push(record.clone());
            }
            match record.severity {
                Severity::Error => evidence.errors.push(record),
                Severity::Info => evidence.summary.push(record),
                Severity::Unknown => evidence.unknown_lines += 1,
                _ => {}
            }
        }
        evidence
    }

    /// Derive the verdict from evidence. Total: every evidence value maps to
    /// exactly one status. ERROR takes precedence over everything else; a
    /// run with no INFO summary at all is itself a fault signal.
    pub fn verdict(&self, evidence: RunEvidence) -> Outcome {
        if !evidence.errors.is_empty() {
            return Outcome {
                status: OutcomeStatus::Error,
                evidence,
                cause: None,
            };
        }
        if evidence.summary.is_empty() {
            return Outcome {
                status: OutcomeStatus::Indeterminate,
                cause: Some(IndeterminateCause::EmptySummary),
                evidence,
            };
        }
        if !evidence.data_events.is_empty() {
            return Outcome {
                status: OutcomeStatus::DataFound,
                evidence,
                cause: None,
            };
        }
        Outcome {
            status: OutcomeStatus::Clean,
            evidence,
            cause: None,
        }
    }

    /// Classify one run's log artifact.
    ///
    /// The artifact gate runs first; a missing, unreadable, or stale
    /// artifact short-circuits to INDETERMINATE without reading a single
    /// line.
    pub fn classify(
        &self,
        entity: &MonitoredEntity,
        artifact: &Path,
        invoked_at: Option<DateTime<Utc>>,
    ) -> Outcome {
        let meta = artifact_meta(artifact);
        if let Some(cause) = check_artifact(&meta, invoked_at, self.staleness_window) {
            debug!(
                entity = %entity.name,
                artifact = %artifact.display(),
                cause = cause.describe(),
                "artifact gate failed, skipping classification"
            );
            return Outcome::indeterminate(cause);
        }

        // Gate passed above, but the open can still race a removal.
        let file = match File::open(artifact) {
            Ok(file) => file,
            Err(_) => return Outcome::indeterminate(IndeterminateCause::UnreadableArtifact),
        };

        let evidence = self.collect_evidence(self.format.parse(BufReader::new(file)));
        debug!(
            entity = %entity.name,
            total = evidence.total_lines,
            errors = evidence.errors.len(),
            summary = evidence.summary.len(),
            data_events = evidence.data_events.len(),
            "collected run evidence"
        );
        self.verdict(evidence)
    }
}
