//! Streaming labeling pipeline.
//!
//! ```text
//! Reader → input queue → N workers ─┬→ output queue  → saved writer
//!                                   ├→ failed queue  → failed writer
//!                                   └→ dropped queue → dropped writer
//! ```
//!
//! Every queue is bounded, so a slow stage blocks the stage feeding it.
//! Completion is an explicit join: the reader closes the input queue at end of
//! input, workers exit once it drains and drop their sink senders, and each
//! writer exits when its queue closes and flushes. `run` returns only after all
//! of them have finished, at which point every started record has reached
//! exactly one sink.

mod counters;
mod labeler;
mod layout;
mod reader;
mod worker;
mod writer;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task;
use tracing::{info, warn};

pub use self::counters::{Outcome, PipelineCounters, PipelineMonitor, PipelineSnapshot, Queue};
pub use self::labeler::{
    CoordField, Endpoint, LabelError, RowLabeler, DEFAULT_FEATURES, GEOGRAPHY_FIELDS,
};
pub use self::layout::{CoordColumns, FieldLayout, LayoutError};
pub use self::worker::{route, Routed};
use self::worker::{label_worker, WorkerSinks};
use crate::pip::Geocoder;

/// Default capacity of the input and output queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 250;

/// Default capacity of the failed and dropped queues
pub const DEFAULT_SIDE_QUEUE_CAPACITY: usize = 25;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("input has no header row")]
    MissingHeader,

    #[error("field layout does not fit the input: {0}")]
    Layout(#[from] LayoutError),

    #[error("{0} queue closed before the run finished")]
    QueueClosed(&'static str),

    #[error("pipeline task failed: {0}")]
    Task(#[from] task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub side_queue_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            side_queue_capacity: DEFAULT_SIDE_QUEUE_CAPACITY,
        }
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Input and sink locations for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub input: PathBuf,
    pub saved: PathBuf,
    pub failed: PathBuf,
    pub dropped: PathBuf,
}

/// Final counts of a completed run
#[derive(Debug, Clone, Copy)]
pub struct PipelineSummary {
    pub started: u64,
    pub saved: u64,
    pub failed: u64,
    pub dropped: u64,
    pub elapsed: Duration,
}

impl PipelineSummary {
    /// Every started record reached a sink
    pub fn is_balanced(&self) -> bool {
        self.started == self.saved + self.failed + self.dropped
    }
}

/// One labeling run over shared, read-only boundary data
pub struct Pipeline {
    geocoder: Arc<Geocoder>,
    layout: Arc<FieldLayout>,
    settings: PipelineSettings,
    counters: Arc<PipelineCounters>,
}

impl Pipeline {
    pub fn new(geocoder: Arc<Geocoder>, layout: FieldLayout, settings: PipelineSettings) -> Self {
        Self {
            geocoder,
            layout: Arc::new(layout),
            settings,
            counters: Arc::new(PipelineCounters::default()),
        }
    }

    /// Handle for observing counters while `run` is in progress
    pub fn monitor(&self) -> PipelineMonitor {
        PipelineMonitor::new(Arc::clone(&self.counters))
    }

    /// Label every row of `paths.input` into the three sinks.
    ///
    /// Any I/O or CSV error is fatal. Stages downstream of the failure drain
    /// what they already hold, upstream stages stop when their queue closes,
    /// and the error is returned once everything has been joined.
    pub async fn run(self, paths: PipelinePaths) -> Result<PipelineSummary, PipelineError> {
        let started_at = Instant::now();
        let workers = self.settings.workers.max(1);
        info!("Using {} labeling workers", workers);

        let input_path = paths.input.clone();
        let (input, header) = task::spawn_blocking(move || reader::open_input(&input_path)).await??;
        let appended_at = self.layout.check_header(header.len())?;

        let sink_paths = paths.clone();
        let (mut saved_out, mut failed_out, mut dropped_out) = task::spawn_blocking(move || {
            Ok::<_, PipelineError>((
                writer::open_sink(&sink_paths.saved, false)?,
                writer::open_sink(&sink_paths.failed, true)?,
                writer::open_sink(&sink_paths.dropped, true)?,
            ))
        })
        .await??;

        let (input_tx, input_rx) = mpsc::channel(self.settings.queue_capacity);
        let (saved_tx, saved_rx) = mpsc::channel(self.settings.queue_capacity);
        let (failed_tx, failed_rx) = mpsc::channel(self.settings.side_queue_capacity);
        let (dropped_tx, dropped_rx) = mpsc::channel(self.settings.side_queue_capacity);

        // Writers
        let saved_task = {
            let layout = Arc::clone(&self.layout);
            let counters = Arc::clone(&self.counters);
            task::spawn_blocking(move || {
                writer::write_saved(&mut saved_out, &header, &layout, appended_at, saved_rx, &counters)
            })
        };
        let failed_task = {
            let counters = Arc::clone(&self.counters);
            task::spawn_blocking(move || {
                writer::write_records(&mut failed_out, failed_rx, Outcome::Failed, &counters)
            })
        };
        let dropped_task = {
            let counters = Arc::clone(&self.counters);
            task::spawn_blocking(move || {
                writer::write_records(&mut dropped_out, dropped_rx, Outcome::Dropped, &counters)
            })
        };

        // Workers
        let input_rx = Arc::new(Mutex::new(input_rx));
        let sinks = WorkerSinks {
            saved: saved_tx,
            failed: failed_tx,
            dropped: dropped_tx,
        };
        let worker_tasks: Vec<_> = (0..workers)
            .map(|worker_id| {
                tokio::spawn(label_worker(
                    worker_id,
                    Arc::clone(&input_rx),
                    Arc::clone(&self.geocoder),
                    Arc::clone(&self.layout),
                    sinks.clone(),
                    Arc::clone(&self.counters),
                ))
            })
            .collect();
        // Only workers may hold queue ends now, or the writers would never see the close
        drop(input_rx);
        drop(sinks);

        // Reader
        let reader_task = {
            let counters = Arc::clone(&self.counters);
            task::spawn_blocking(move || reader::read_rows(input, input_tx, &counters))
        };

        let read_result = reader_task.await?;
        let worker_results = futures::future::join_all(worker_tasks).await;
        let saved_result = saved_task.await?;
        let failed_result = failed_task.await?;
        let dropped_result = dropped_task.await?;

        // A writer failure is the cause of any closed-queue error upstream
        for result in [&saved_result, &failed_result, &dropped_result] {
            if let Err(e) = result {
                warn!(error = %e, "Writer stage failed");
            }
        }
        saved_result?;
        failed_result?;
        dropped_result?;
        read_result?;
        for result in worker_results {
            result??;
        }

        let snapshot = self.counters.snapshot();
        let summary = PipelineSummary {
            started: snapshot.started,
            saved: snapshot.saved,
            failed: snapshot.failed,
            dropped: snapshot.dropped,
            elapsed: started_at.elapsed(),
        };
        info!(
            "Run complete: {} started, {} saved, {} failed, {} dropped",
            summary.started, summary.saved, summary.failed, summary.dropped
        );
        Ok(summary)
    }
}
