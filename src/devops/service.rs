use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::Connection;
use crate::config::PipelineSettings;
use crate::error::Result;

use super::api::Connector;
use super::progress::ProgressReporter;

/// Entry point for every DevOps operation.
///
/// Holds the connection parameters and the static pipeline tables; each
/// public operation opens its own session and drops it before returning.
pub struct DevOpsService<C: Connector> {
    connector: C,
    connection: Connection,
    settings: Arc<PipelineSettings>,
    pub(super) progress: ProgressReporter,
    cancel: CancellationToken,
}

impl<C: Connector> DevOpsService<C> {
    pub fn new(connector: C, connection: Connection, settings: PipelineSettings) -> Self {
        Self {
            connector,
            connection,
            settings: Arc::new(settings),
            progress: ProgressReporter::disabled(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Remote calls made after `cancel` fires fail with `Cancelled`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn organization(&self) -> &str {
        &self.connection.organization
    }

    /// Opens a session scoped to one top-level operation.
    pub(super) fn session(&self) -> Result<C::Session> {
        self.connector
            .connect(&self.connection, self.cancel.child_token())
    }
}
