use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::devops::{ChannelProgress, ProgressReporter, ProgressUpdate, UpdateType};

use super::styling::{bright_green, bright_red, bright_yellow, dim};

/// Spinner on stderr fed by the service's progress updates.
pub struct ProgressSpinner {
    pb: ProgressBar,
    forward: JoinHandle<()>,
}

impl ProgressSpinner {
    /// Starts the spinner and returns the reporter to hand to the service.
    pub fn start(title: &str, correlation_id: &str) -> (Self, ProgressReporter) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ProgressUpdate>();
        let pb = create_spinner(bright_yellow(title).to_string());

        let bar = pb.clone();
        let forward = tokio::spawn(async move {
            while let Some(update) = receiver.recv().await {
                let message = match update.update_type {
                    UpdateType::PipelineStep => bright_yellow(&update.message).to_string(),
                    UpdateType::LoadingStatus => dim(&update.message).to_string(),
                };
                bar.set_message(message);
            }
        });

        let reporter = ProgressReporter::new(
            Arc::new(ChannelProgress::new(sender)),
            Some(correlation_id.to_string()),
        );
        (Self { pb, forward }, reporter)
    }

    pub fn finish(self, message: &str) {
        self.forward.abort();
        self.pb
            .finish_with_message(bright_green(format!("{message} ✓")).to_string());
    }

    pub fn fail(self, message: &str) {
        self.forward.abort();
        self.pb
            .abandon_with_message(bright_red(format!("{message} ✗")).to_string());
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spinner_shows_forwarded_steps() {
        let (spinner, reporter) = ProgressSpinner::start("Working", "run-1");

        reporter.step("Resolving agent pool");
        for _ in 0..50 {
            if spinner.pb.message().contains("Resolving agent pool") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert!(spinner.pb.message().contains("Resolving agent pool"));
        spinner.finish("Done");
    }
}
