//! Periodic progress reporting while a run is in flight.

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use censustag::pipeline::{PipelineMonitor, PipelineSnapshot};

pub struct ProgressReporter {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// Start reporting every `every`. With `spinner` off, each interval is
    /// logged at info level instead of drawn.
    pub fn start(monitor: PipelineMonitor, every: Duration, spinner: bool) -> Result<Self> {
        let pb = if spinner {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(report_loop(monitor, every, pb, stop_rx));
        Ok(Self { stop_tx, handle })
    }

    pub async fn stop(self) {
        // The loop may already be gone if the task panicked
        let _ = self.stop_tx.send(());
        let _ = self.handle.await;
    }
}

async fn report_loop(
    monitor: PipelineMonitor,
    every: Duration,
    pb: Option<ProgressBar>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate tick
    timer.tick().await;

    let mut last = monitor.snapshot();
    loop {
        tokio::select! {
            _ = timer.tick() => {
                let now = monitor.snapshot();
                let delta = now.since(&last);
                match &pb {
                    Some(pb) => {
                        pb.set_message(status_line(&now));
                        debug!(
                            started = delta.started,
                            saved = delta.saved,
                            failed = delta.failed,
                            dropped = delta.dropped,
                            input_queue = now.input_queue,
                            output_queue = now.output_queue,
                            "Progress interval"
                        );
                    }
                    None => info!(
                        "{} (+{} started, +{} saved, +{} failed, +{} dropped)",
                        status_line(&now),
                        delta.started,
                        delta.saved,
                        delta.failed,
                        delta.dropped
                    ),
                }
                last = now;
            }
            _ = &mut stop_rx => break,
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message(status_line(&monitor.snapshot()));
    }
}

fn status_line(s: &PipelineSnapshot) -> String {
    format!(
        "{} started, {} saved, {} failed, {} dropped, {} in flight, queues {}/{}",
        s.started,
        s.saved,
        s.failed,
        s.dropped,
        s.in_flight(),
        s.input_queue,
        s.output_queue
    )
}
