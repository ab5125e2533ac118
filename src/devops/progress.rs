use std::sync::Arc;

use log::info;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// What a progress message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateType {
    /// Something was found while scanning remote resources.
    LoadingStatus,
    /// A step of the pipeline create/update flow started.
    PipelineStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub correlation_id: String,
    pub update_type: UpdateType,
    pub message: String,
}

/// Receives fire-and-forget progress notifications.
///
/// Delivery is best effort; a sink must never fail the operation.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, update: ProgressUpdate);
}

pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn notify(&self, _update: ProgressUpdate) {}
}

/// Writes updates to the log at `info` level.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn notify(&self, update: ProgressUpdate) {
        info!("[{}] {}", update.correlation_id, update.message);
    }
}

/// Forwards updates to an unbounded channel. A closed receiver is ignored.
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new(sender: UnboundedSender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn notify(&self, update: ProgressUpdate) {
        let _ = self.sender.send(update);
    }
}

/// Progress channel keyed by a caller-supplied correlation id.
///
/// Without a correlation id nothing is emitted.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    correlation_id: Option<String>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>, correlation_id: Option<String>) -> Self {
        Self {
            sink,
            correlation_id: correlation_id.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopProgress), None)
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(UpdateType::LoadingStatus, message);
    }

    pub fn step(&self, message: impl Into<String>) {
        self.emit(UpdateType::PipelineStep, message);
    }

    fn emit(&self, update_type: UpdateType, message: impl Into<String>) {
        if let Some(correlation_id) = &self.correlation_id {
            self.sink.notify(ProgressUpdate {
                correlation_id: correlation_id.clone(),
                update_type,
                message: message.into(),
            });
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::disabled()
    }
}
