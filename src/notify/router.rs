use super::{ChannelKind, NotificationSink, NotificationTarget, SinkError};
use crate::classify::OutcomeStatus;
use crate::report::Report;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-target delivery record.
#[derive(Debug)]
pub struct DeliveryResult {
    pub channel: ChannelKind,
    pub address: String,
    pub result: Result<(), SinkError>,
}

impl DeliveryResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fan-out dispatcher over the configured sinks.
pub struct Router {
    sinks: HashMap<ChannelKind, Arc<dyn NotificationSink>>,
}

impl Router {
    pub fn new(sinks: HashMap<ChannelKind, Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    async fn dispatch_one(
        &self,
        target: &NotificationTarget,
        report: &Report,
        archive: Option<&Path>,
    ) -> DeliveryResult {
        let result = match self.sinks.get(&target.channel) {
            None => Err(SinkError::ChannelUnconfigured(target.channel)),
            Some(sink) => {
                let recipients = vec![target.address.clone()];
                // A failing run carries the raw log; digest targets may opt
                // into the cleaned archive instead.
                let attachment = report
                    .attachment
                    .as_deref()
                    .or_else(|| archive.filter(|_| target.attach_archive));
                match attachment {
                    Some(path) => {
                        sink.send_with_attachment(&recipients, &report.subject, &report.body, path)
                            .await
                    }
                    None => {
                        sink.send_digest(&recipients, &report.subject, &report.body)
                            .await
                    }
                }
            }
        };

        match &result {
            Ok(()) => info!(
                channel = ?target.channel,
                address = %target.address,
                "notification delivered"
            ),
            Err(err) => warn!(
                channel = ?target.channel,
                address = %target.address,
                error = %err,
                "notification delivery failed"
            ),
        }

        DeliveryResult {
            channel: target.channel,
            address: target.address.clone(),
            result,
        }
    }

    /// Deliver the report to every target whose status filter matches.
    ///
    /// Deliveries are independent: they run as joined futures and one
    /// target's failure never cancels the rest. The caller inspects the
    /// results to decide whether an aggregate failure needs escalation.
    pub async fn route(
        &self,
        report: &Report,
        status: OutcomeStatus,
        targets: &[NotificationTarget],
        archive: Option<&Path>,
    ) -> Vec<DeliveryResult> {
        let matching: Vec<&NotificationTarget> =
            targets.iter().filter(|t| t.matches(status)).collect();

        join_all(
            matching
                .iter()
                .map(|target| self.dispatch_one(target, report, archive)),
        )
        .await
    }
}
