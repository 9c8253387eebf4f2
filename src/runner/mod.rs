use crate::archive::{write_archive, ArchiveError};
use crate::classify::{Classifier, IndeterminateCause, Outcome, OutcomeStatus};
use crate::config::types::Config;
use crate::entity::MonitoredEntity;
use crate::logparse::LineFormat;
use crate::notify::{ChannelKind, NotificationSink, Router};
use crate::report::compose;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// A violated precondition of the orchestrator itself. Always escalated to
/// the operator target; always contained to the affected entity.
#[derive(Debug, Error)]
pub enum OperatorFault {
    #[error("entity name is empty")]
    EmptyName,

    #[error("client config '{0}' does not exist")]
    MissingConfigRef(PathBuf),

    #[error("failed to create working log '{path}': {source}")]
    WorkingLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch client '{binary}': {source}")]
    ClientSpawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("client exceeded {0:?} and was terminated")]
    ClientTimeout(std::time::Duration),

    #[error("log artifact '{0}' missing after client run")]
    MissingArtifact(PathBuf),

    #[error("log artifact '{0}' not readable")]
    UnreadableArtifact(PathBuf),

    #[error("log artifact '{0}' not updated since invocation")]
    StaleArtifact(PathBuf),

    #[error("archival failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("all {0} notification deliveries failed")]
    AllDeliveriesFailed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityVerdict {
    /// Pipeline ran end to end; the classified outcome is the run's story.
    Passed,
    /// The orchestrator could not see this run through.
    Failed,
}

/// What happened to one entity during a batch.
#[derive(Debug)]
pub struct EntityRunReport {
    pub entity: String,
    pub verdict: EntityVerdict,
    pub outcome: Option<OutcomeStatus>,
    /// Operator faults raised while processing this entity.
    pub faults: Vec<OperatorFault>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub passed: usize,
    pub failed: usize,
    pub entities: Vec<EntityRunReport>,
}

enum InvokeOutcome {
    Finished(std::process::ExitStatus),
    TimedOut,
}

/// Map an artifact-gate indeterminate cause to the operator fault it is.
/// Content-level causes (empty summary) and the timeout, escalated at its
/// own site, map to none.
fn artifact_fault(outcome: &Outcome, log_path: &Path) -> Option<OperatorFault> {
    match outcome.cause {
        Some(IndeterminateCause::MissingArtifact) => {
            Some(OperatorFault::MissingArtifact(log_path.to_path_buf()))
        }
        Some(IndeterminateCause::UnreadableArtifact) => {
            Some(OperatorFault::UnreadableArtifact(log_path.to_path_buf()))
        }
        Some(IndeterminateCause::StaleArtifact) => {
            Some(OperatorFault::StaleArtifact(log_path.to_path_buf()))
        }
        _ => None,
    }
}

/// Sequences one entity's pipeline (precheck, invoke, classify, compose,
/// archive, notify) and iterates it over the batch with a bounded number of
/// concurrent pipelines.
pub struct Runner {
    config: Config,
    classifier: Classifier,
    router: Router,
    sinks: HashMap<ChannelKind, Arc<dyn NotificationSink>>,
    /// Gate over the shared remote mount: invocations serialize here while
    /// the rest of the pipeline overlaps freely.
    client_gate: Option<tokio::sync::Mutex<()>>,
}

impl Runner {
    pub fn new(config: Config, sinks: HashMap<ChannelKind, Arc<dyn NotificationSink>>) -> Self {
        let format = LineFormat {
            severity_column: config.parser.severity_column,
            data_marker: config.parser.data_marker.clone(),
        };
        let window = chrono::Duration::from_std(config.run.staleness_window)
            .unwrap_or_else(|_| chrono::Duration::hours(23));
        let client_gate = config
            .run
            .serialize_client
            .then(|| tokio::sync::Mutex::new(()));
        Self {
            classifier: Classifier::new(format, window),
            router: Router::new(sinks.clone()),
            sinks,
            client_gate,
            config,
        }
    }

    /// Process the full entity list in order. One entity's failure is
    /// contained and reported; it never aborts the remaining entities.
    pub async fn run_batch(&self, entities: &[MonitoredEntity]) -> BatchSummary {
        let concurrency = self.config.run.max_concurrency.max(1);
        info!(
            entities = entities.len(),
            max_concurrency = concurrency,
            "starting batch"
        );

        let reports: Vec<EntityRunReport> = stream::iter(entities)
            .map(|entity| {
                let run_id = Uuid::new_v4();
                self.process_entity(entity)
                    .instrument(info_span!("entity_run", entity = %entity.name, run_id = %run_id))
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for report in reports {
            match report.verdict {
                EntityVerdict::Passed => summary.passed += 1,
                EntityVerdict::Failed => summary.failed += 1,
            }
            summary.entities.push(report);
        }
        info!(
            passed = summary.passed,
            failed = summary.failed,
            "batch complete"
        );
        summary
    }

    /// One entity, start to finish. Never returns an error: every fault is
    /// folded into the report and escalated through the operator target.
    async fn process_entity(&self, entity: &MonitoredEntity) -> EntityRunReport {
        let mut faults = Vec::new();

        // PRECHECK
        if let Err(fault) = self.precheck(entity) {
            error!(entity = %entity.name, fault = %fault, "precheck failed");
            self.notify_operator(entity, &fault).await;
            return EntityRunReport {
                entity: entity.name.clone(),
                verdict: EntityVerdict::Failed,
                outcome: None,
                faults: vec![fault],
            };
        }

        let invoked_at = Utc::now();
        let log_path = self.working_log_path(entity);

        // INVOKE, serialized over the shared mount when configured
        let gate_guard = match &self.client_gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };
        let invoke_result = self.invoke(entity, &log_path).await;
        drop(gate_guard);

        let invoke = match invoke_result {
            Ok(result) => result,
            Err(fault) => {
                error!(entity = %entity.name, fault = %fault, "client invocation failed");
                self.notify_operator(entity, &fault).await;
                return EntityRunReport {
                    entity: entity.name.clone(),
                    verdict: EntityVerdict::Failed,
                    outcome: None,
                    faults: vec![fault],
                };
            }
        };

        // AWAIT_ARTIFACT / CLASSIFY
        let (outcome, mut verdict) = match invoke {
            InvokeOutcome::Finished(exit) => {
                // Exit code is observed but not authoritative; the log is.
                info!(entity = %entity.name, exit = %exit, "client finished");
                let outcome = self
                    .classifier
                    .classify(entity, &log_path, Some(invoked_at));
                (outcome, EntityVerdict::Passed)
            }
            InvokeOutcome::TimedOut => {
                let fault = OperatorFault::ClientTimeout(self.config.client.timeout);
                error!(entity = %entity.name, fault = %fault, "client timed out");
                self.notify_operator(entity, &fault).await;
                faults.push(fault);
                (
                    Outcome::indeterminate(IndeterminateCause::ClientTimeout),
                    EntityVerdict::Failed,
                )
            }
        };
        info!(entity = %entity.name, status = outcome.status.label(), "run classified");

        // A missing, unreadable or stale artifact means monitoring itself is
        // broken for this entity. That goes to the operator, not just the
        // indeterminate targets.
        if let Some(fault) = artifact_fault(&outcome, &log_path) {
            error!(entity = %entity.name, fault = %fault, "artifact gate failed");
            self.notify_operator(entity, &fault).await;
            faults.push(fault);
            verdict = EntityVerdict::Failed;
        }

        // COMPOSE
        let report = compose(entity, &outcome, invoked_at, &log_path);

        // ARCHIVE runs before NOTIFY so digest targets can attach the
        // cleaned artifact, and unconditionally: the audit trail must never
        // depend on notification success.
        let archive_path = match write_archive(
            &self.classifier.format,
            &log_path,
            &self.config.archive.dir,
            &entity.name,
            invoked_at.date_naive(),
        ) {
            Ok(path) => Some(path),
            Err(err) => {
                let fault = OperatorFault::from(err);
                error!(entity = %entity.name, fault = %fault, "archival failed");
                self.notify_operator(entity, &fault).await;
                faults.push(fault);
                None
            }
        };

        // NOTIFY
        let deliveries = self
            .router
            .route(
                &report,
                outcome.status,
                &self.config.notify.targets,
                archive_path.as_deref(),
            )
            .await;
        if !deliveries.is_empty() && deliveries.iter().all(|d| !d.is_ok()) {
            let fault = OperatorFault::AllDeliveriesFailed(deliveries.len());
            error!(entity = %entity.name, fault = %fault, "notification blackout");
            self.notify_operator(entity, &fault).await;
            faults.push(fault);
        }

        EntityRunReport {
            entity: entity.name.clone(),
            verdict,
            outcome: Some(outcome.status),
            faults,
        }
    }

    fn precheck(&self, entity: &MonitoredEntity) -> Result<(), OperatorFault> {
        if entity.name.trim().is_empty() {
            return Err(OperatorFault::EmptyName);
        }
        if !entity.config_ref.exists() {
            return Err(OperatorFault::MissingConfigRef(entity.config_ref.clone()));
        }
        Ok(())
    }

    fn working_log_path(&self, entity: &MonitoredEntity) -> PathBuf {
        self.config.run.log_dir.join(format!("{}.log", entity.name))
    }

    /// Run the client synchronously, capturing combined stdout+stderr into
    /// the working log. The previous run's log is overwritten; the archive
    /// is the durable record.
    async fn invoke(
        &self,
        entity: &MonitoredEntity,
        log_path: &Path,
    ) -> Result<InvokeOutcome, OperatorFault> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OperatorFault::WorkingLog {
                path: log_path.to_path_buf(),
                source,
            })?;
        }
        let log_file = std::fs::File::create(log_path).map_err(|source| {
            OperatorFault::WorkingLog {
                path: log_path.to_path_buf(),
                source,
            }
        })?;
        let stderr_file = log_file
            .try_clone()
            .map_err(|source| OperatorFault::WorkingLog {
                path: log_path.to_path_buf(),
                source,
            })?;

        let binary = &self.config.client.binary;
        info!(
            entity = %entity.name,
            binary = %binary.display(),
            mode = %entity.run_mode,
            log = %log_path.display(),
            "invoking client"
        );

        let mut child = Command::new(binary)
            .arg("--config")
            .arg(&entity.config_ref)
            .arg("--mode")
            .arg(entity.run_mode.flag())
            .arg("--log-level")
            .arg("trace")
            .args(&self.config.client.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|source| OperatorFault::ClientSpawn {
                binary: binary.clone(),
                source,
            })?;

        match timeout(self.config.client.timeout, child.wait()).await {
            Ok(Ok(exit)) => Ok(InvokeOutcome::Finished(exit)),
            Ok(Err(source)) => Err(OperatorFault::ClientSpawn {
                binary: binary.clone(),
                source,
            }),
            Err(_elapsed) => {
                if let Err(err) = child.kill().await {
                    warn!(entity = %entity.name, error = %err, "failed to kill timed-out client");
                }
                Ok(InvokeOutcome::TimedOut)
            }
        }
    }

    /// Escalate a fault through the dedicated operator target. A failure
    /// here is logged; there is no further place to escalate to.
    async fn notify_operator(&self, entity: &MonitoredEntity, fault: &OperatorFault) {
        let operator = &self.config.notify.operator;
        let Some(sink) = self.sinks.get(&operator.channel) else {
            error!(
                channel = ?operator.channel,
                "no sink configured for operator channel, fault only logged"
            );
            return;
        };

        let subject = format!(
            "[upmon] operator fault: {} {}",
            entity.name,
            Utc::now().format("%Y-%m-%d")
        );
        let body = format!("entity: {}\nfault: {}\n", entity.name, fault);
        if let Err(err) = sink
            .send_digest(&[operator.address.clone()], &subject, &body)
            .await
        {
            error!(
                entity = %entity.name,
                error = %err,
                "operator fault notification failed"
            );
        }
    }
}
