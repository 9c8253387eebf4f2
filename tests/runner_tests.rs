use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use upmon::classify::OutcomeStatus;
use upmon::config::types::{
    ArchiveConfig, ClientConfig, Config, NotifyConfig, ParserConfig, RunConfig,
};
use upmon::entity::{MonitoredEntity, RunMode};
use upmon::notify::{ChannelKind, NotificationSink, NotificationTarget, SinkError};
use upmon::runner::{EntityVerdict, Runner};

#[derive(Default)]
struct RecordingSink {
    digests: AtomicUsize,
    attachments: AtomicUsize,
    subjects: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn sent(&self) -> usize {
        self.digests.load(Ordering::SeqCst) + self.attachments.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_digest(
        &self,
        _recipients: &[String],
        subject: &str,
        _body: &str,
    ) -> Result<(), SinkError> {
        self.digests.fetch_add(1, Ordering::SeqCst);
        self.subjects.lock().unwrap().push(subject.to_string());
        Ok(())
    }

    async fn send_with_attachment(
        &self,
        _recipients: &[String],
        subject: &str,
        _body: &str,
        _attachment: &Path,
    ) -> Result<(), SinkError> {
        self.attachments.fetch_add(1, Ordering::SeqCst);
        self.subjects.lock().unwrap().push(subject.to_string());
        Ok(())
    }
}

/// Write an executable stub standing in for the external client.
fn write_stub_client(dir: &TempDir, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.path().join("mf-client");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn test_config(dir: &TempDir, binary: PathBuf, timeout: Duration) -> Config {
    Config {
        client: ClientConfig {
            binary,
            timeout,
            extra_args: Vec::new(),
        },
        entities: dir.path().join("entities.list"),
        run: RunConfig {
            log_dir: dir.path().join("runs"),
            staleness_window: Duration::from_secs(23 * 60 * 60),
            max_concurrency: 1,
            serialize_client: true,
        },
        parser: ParserConfig::default(),
        archive: ArchiveConfig {
            dir: dir.path().join("archive"),
        },
        notify: NotifyConfig {
            email: None,
            chat: None,
            targets: vec![NotificationTarget {
                channel: ChannelKind::Chat,
                address: "#digest".to_string(),
                statuses: vec![
                    OutcomeStatus::Clean,
                    OutcomeStatus::DataFound,
                    OutcomeStatus::Error,
                    OutcomeStatus::Indeterminate,
                ],
                attach_archive: false,
            }],
            operator: NotificationTarget {
                channel: ChannelKind::Email,
                address: "upmon-dev@example.org".to_string(),
                statuses: vec![OutcomeStatus::Indeterminate],
                attach_archive: false,
            },
        },
    }
}

fn runner_with_mocks(config: Config) -> (Runner, Arc<RecordingSink>, Arc<RecordingSink>) {
    let chat = Arc::new(RecordingSink::default());
    let email = Arc::new(RecordingSink::default());
    let mut sinks: HashMap<ChannelKind, Arc<dyn NotificationSink>> = HashMap::new();
    sinks.insert(ChannelKind::Chat, chat.clone());
    sinks.insert(ChannelKind::Email, email.clone());
    (Runner::new(config, sinks), chat, email)
}

fn entity(name: &str, config_ref: PathBuf) -> MonitoredEntity {
    MonitoredEntity {
        name: name.to_string(),
        config_ref,
        run_mode: RunMode::Data,
    }
}

#[tokio::test]
async fn test_clean_run_passes_and_archives() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub_client(
        &dir,
        r#"echo "2024-01-01 10:00:00 TRACE omics.mf.upload starting"
echo "2024-01-01 10:00:01 INFO omics.mf.upload checked 3 files"
echo "2024-01-01 10:00:02 INFO omics.mf.upload nothing to transfer""#,
    );
    let config = test_config(&dir, stub.clone(), Duration::from_secs(30));
    let (runner, chat, email) = runner_with_mocks(config);

    let summary = runner.run_batch(&[entity("study-a", stub)]).await;

    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.entities[0].outcome, Some(OutcomeStatus::Clean));

    // Digest delivered, no operator fault raised.
    assert_eq!(chat.sent(), 1);
    assert_eq!(email.sent(), 0);

    // The archive exists and carries no TRACE noise.
    let archives: Vec<_> = std::fs::read_dir(dir.path().join("archive"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(archives.len(), 1);
    let content = std::fs::read_to_string(&archives[0]).unwrap();
    assert!(content.contains("checked 3 files"));
    assert!(!content.contains("TRACE"));
}

#[tokio::test]
async fn test_error_in_log_outweighs_zero_exit() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub_client(
        &dir,
        r#"echo "2024-01-01 10:00:00 INFO omics.mf.upload starting"
echo "2024-01-01 10:00:01 ERROR omics.mf.upload transfer aborted"
exit 0"#,
    );
    let config = test_config(&dir, stub.clone(), Duration::from_secs(30));
    let (runner, chat, _email) = runner_with_mocks(config);

    let summary = runner.run_batch(&[entity("study-a", stub)]).await;

    // The pipeline completed; the run's verdict is the classified outcome.
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.entities[0].outcome, Some(OutcomeStatus::Error));
    // Error reports carry the raw log.
    assert_eq!(chat.attachments.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_f_precheck_failure_is_contained() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub_client(
        &dir,
        r#"echo "2024-01-01 10:00:00 INFO omics.mf.upload all quiet""#,
    );
    let config = test_config(&dir, stub.clone(), Duration::from_secs(30));
    let (runner, chat, email) = runner_with_mocks(config);

    let entities = vec![
        entity("study-a", stub.clone()),
        entity("study-broken", dir.path().join("does-not-exist.cfg")),
        entity("study-c", stub),
    ];
    let summary = runner.run_batch(&entities).await;

    assert_eq!(summary.passed, 2);
    assert_eq!(summary.failed, 1);
    let broken = summary
        .entities
        .iter()
        .find(|r| r.entity == "study-broken")
        .unwrap();
    assert_eq!(broken.verdict, EntityVerdict::Failed);
    assert!(broken.outcome.is_none());
    assert_eq!(broken.faults.len(), 1);

    // Exactly one operator-fault notification, on the operator channel.
    assert_eq!(email.sent(), 1);
    assert!(email.subjects.lock().unwrap()[0].contains("operator fault"));
    // The two healthy entities still delivered their digests.
    assert_eq!(chat.sent(), 2);
}

#[tokio::test]
async fn test_hung_client_is_killed_and_reported() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub_client(
        &dir,
        r#"echo "2024-01-01 10:00:00 INFO omics.mf.upload starting"
sleep 30"#,
    );
    let config = test_config(&dir, stub.clone(), Duration::from_millis(500));
    let (runner, _chat, email) = runner_with_mocks(config);

    let summary = runner.run_batch(&[entity("study-a", stub)]).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(
        summary.entities[0].outcome,
        Some(OutcomeStatus::Indeterminate)
    );
    // Timeout is an operator fault: monitoring could not trust this run.
    assert_eq!(email.sent(), 1);
}

#[tokio::test]
async fn test_vanished_artifact_raises_operator_fault() {
    let dir = TempDir::new().unwrap();
    // The client runs but its log artifact is gone by classification time.
    let log_path = dir.path().join("runs").join("study-a.log");
    let stub = write_stub_client(
        &dir,
        &format!(
            r#"echo "2024-01-01 10:00:00 INFO omics.mf.upload starting"
rm -f "{}""#,
            log_path.display()
        ),
    );
    let config = test_config(&dir, stub.clone(), Duration::from_secs(30));
    let (runner, _chat, email) = runner_with_mocks(config);

    let summary = runner.run_batch(&[entity("study-a", stub)]).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(
        summary.entities[0].outcome,
        Some(OutcomeStatus::Indeterminate)
    );
    let faults = &summary.entities[0].faults;
    assert!(faults
        .iter()
        .any(|f| f.to_string().contains("missing after client run")));

    // Both the gate fault and the archival failure it drags along reach the
    // operator channel; neither is only logged.
    assert_eq!(faults.len(), 2);
    assert_eq!(email.sent(), 2);
    assert!(email
        .subjects
        .lock()
        .unwrap()
        .iter()
        .all(|s| s.contains("operator fault")));
}

#[tokio::test]
async fn test_batch_preserves_entity_order() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub_client(
        &dir,
        r#"echo "2024-01-01 10:00:00 INFO omics.mf.upload fine""#,
    );
    let config = test_config(&dir, stub.clone(), Duration::from_secs(30));
    let (runner, _chat, _email) = runner_with_mocks(config);

    let entities = vec![
        entity("study-a", stub.clone()),
        entity("study-b", stub.clone()),
        entity("study-c", stub),
    ];
    let summary = runner.run_batch(&entities).await;

    let names: Vec<&str> = summary.entities.iter().map(|r| r.entity.as_str()).collect();
    assert_eq!(names, ["study-a", "study-b", "study-c"]);
}
