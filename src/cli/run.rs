use crate::config::parse::load_config;
use crate::config::types::Config;
use crate::entity::load_entities;
use crate::notify::{ChannelKind, ChatSink, EmailSink, NotificationSink, SinkError};
use crate::runner::Runner;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::parse::ConfigError),

    #[error("entity list error: {0}")]
    Entity(#[from] crate::entity::EntityError),

    #[error("sink setup error: {0}")]
    Sink(#[from] SinkError),

    #[error("entity list '{0}' is empty, nothing to monitor")]
    EmptyEntityList(PathBuf),
}

/// Build the transport sinks declared in the config. Channels without a
/// transport section simply get no sink; config validation has already
/// rejected targets pointing at them.
pub fn build_sinks(
    config: &Config,
) -> Result<HashMap<ChannelKind, Arc<dyn NotificationSink>>, SinkError> {
    let mut sinks: HashMap<ChannelKind, Arc<dyn NotificationSink>> = HashMap::new();

    if let Some(email) = &config.notify.email {
        let sink = EmailSink::new(
            &email.smtp_host,
            email.smtp_port,
            email.starttls,
            &email.from,
        )?;
        sinks.insert(ChannelKind::Email, Arc::new(sink));
    }
    if let Some(chat) = &config.notify.chat {
        let sink = ChatSink::new(&chat.webhook_url, chat.max_inline_bytes)?;
        sinks.insert(ChannelKind::Chat, Arc::new(sink));
    }

    Ok(sinks)
}

/// Run the full batch. Returns the number of failed entities so the binary
/// can exit non-zero when something needs operator attention.
pub async fn run(
    config_path: &Path,
    entities_override: Option<PathBuf>,
) -> Result<usize, RunError> {
    info!(config_path = %config_path.display(), "loading configuration");
    let mut config = load_config(config_path)?;
    if let Some(path) = entities_override {
        config.entities = path;
    }

    let entities = load_entities(&config.entities)?;
    if entities.is_empty() {
        return Err(RunError::EmptyEntityList(config.entities.clone()));
    }
    info!(count = entities.len(), "loaded entity list");

    let sinks = build_sinks(&config)?;
    if sinks.is_empty() {
        warn!("no notification transports configured, outcomes will only be logged");
    }

    let runner = Runner::new(config, sinks);
    let summary = runner.run_batch(&entities).await;

    for report in &summary.entities {
        info!(
            entity = %report.entity,
            verdict = ?report.verdict,
            outcome = ?report.outcome,
            faults = report.faults.len(),
            "entity result"
        );
    }

    Ok(summary.failed)
}
