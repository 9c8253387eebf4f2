use crate::notify::NotificationTarget;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    /// Ordered entity list file: `<config_ref> <name> <run_mode>` per line.
    pub entities: PathBuf,
    pub run: RunConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    pub archive: ArchiveConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Path to the external data-transfer client binary.
    pub binary: PathBuf,
    /// Bound on one client invocation; the child is killed on expiry.
    #[serde(with = "humantime_serde", default = "default_client_timeout")]
    pub timeout: Duration,
    /// Extra arguments appended to every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_client_timeout() -> Duration {
    // Matches the default staleness window.
    Duration::from_secs(23 * 60 * 60)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory for per-entity working logs, overwritten each run.
    pub log_dir: PathBuf,
    /// Maximum allowed age of the log artifact's last modification.
    #[serde(with = "humantime_serde", default = "default_staleness_window")]
    pub staleness_window: Duration,
    /// Upper bound on concurrent entity pipelines. The default of 1 keeps
    /// runs strictly sequential, since concurrent clients contend for the
    /// shared remote mount.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Serialize client invocations even when pipelines run concurrently.
    /// The clients share a remote mount, so only the classify/notify/archive
    /// stages are safe to overlap.
    #[serde(default = "default_serialize_client")]
    pub serialize_client: bool,
}

fn default_serialize_client() -> bool {
    true
}

fn default_staleness_window() -> Duration {
    Duration::from_secs(23 * 60 * 60)
}

fn default_max_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Token index of the severity keyword in a client log line.
    #[serde(default = "default_severity_column")]
    pub severity_column: usize,
    /// Case-insensitive substring marking a data-creation event.
    #[serde(default = "default_data_marker")]
    pub data_marker: String,
}

fn default_severity_column() -> usize {
    2
}

fn default_data_marker() -> String {
    "- creating".to_string()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            severity_column: default_severity_column(),
            data_marker: default_data_marker(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Audit location; one filtered artifact per entity per day.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub email: Option<EmailConfig>,
    pub chat: Option<ChatConfig>,
    /// Per-run outcome targets, filtered by status.
    #[serde(default)]
    pub targets: Vec<NotificationTarget>,
    /// Dedicated target for faults in the monitoring itself (bad entity
    /// records, stale artifacts, delivery blackouts).
    pub operator: NotificationTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub starttls: bool,
    pub from: String,
}

fn default_smtp_port() -> u16 {
    25
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub webhook_url: String,
    /// Cap on log content inlined into a chat message.
    #[serde(default = "default_max_inline_bytes")]
    pub max_inline_bytes: usize,
}

fn default_max_inline_bytes() -> usize {
    3000
}
