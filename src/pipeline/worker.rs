//! Labeling workers - route each record to exactly one sink.

use std::sync::Arc;

use csv::StringRecord;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

use super::counters::{PipelineCounters, Queue};
use super::labeler::RowLabeler;
use super::layout::FieldLayout;
use super::PipelineError;
use crate::pip::Geocoder;

/// Where a record goes after labeling
#[derive(Debug, PartialEq, Eq)]
pub enum Routed {
    /// Original fields plus the six geography values
    Labeled(StringRecord),
    /// Original fields plus the error text
    Failed(StringRecord),
    /// Original fields, a required column was empty
    Dropped(StringRecord),
}

/// Classify a record.
///
/// A record with any empty required column is dropped before labeling is
/// attempted, so it can never also appear as failed.
pub fn route(record: StringRecord, labeler: &RowLabeler<'_>) -> Routed {
    if labeler.layout().has_empty_required(&record) {
        return Routed::Dropped(record);
    }

    match labeler.label(&record) {
        Ok(labeled) => Routed::Labeled(labeled),
        Err(e) => {
            let mut failed = record;
            failed.push_field(&e.to_string());
            Routed::Failed(failed)
        }
    }
}

/// Sending halves of the three sink queues
#[derive(Clone)]
pub struct WorkerSinks {
    pub saved: mpsc::Sender<StringRecord>,
    pub failed: mpsc::Sender<StringRecord>,
    pub dropped: mpsc::Sender<StringRecord>,
}

/// Per-worker tallies, for logging only
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerStats {
    pub labeled: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Labeling worker.
///
/// Workers share the input receiver and exit once it is closed and drained.
/// Dropping the worker's sink senders on exit is what lets the writers finish.
pub async fn label_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<StringRecord>>>,
    geocoder: Arc<Geocoder>,
    layout: Arc<FieldLayout>,
    sinks: WorkerSinks,
    counters: Arc<PipelineCounters>,
) -> Result<WorkerStats, PipelineError> {
    trace!(worker_id, "Label worker starting");
    let labeler = RowLabeler::new(&geocoder, &layout);
    let mut stats = WorkerStats::default();

    loop {
        let msg = {
            let mut rx_guard = rx.lock().await;
            rx_guard.recv().await
        };

        let Some(record) = msg else {
            break;
        };
        counters.dequeued(Queue::Input);

        match route(record, &labeler) {
            Routed::Labeled(labeled) => {
                counters.enqueued(Queue::Output);
                if sinks.saved.send(labeled).await.is_err() {
                    counters.dequeued(Queue::Output);
                    return Err(PipelineError::QueueClosed("saved"));
                }
                stats.labeled += 1;
            }
            Routed::Failed(failed) => {
                if sinks.failed.send(failed).await.is_err() {
                    return Err(PipelineError::QueueClosed("failed"));
                }
                stats.failed += 1;
            }
            Routed::Dropped(dropped) => {
                if sinks.dropped.send(dropped).await.is_err() {
                    return Err(PipelineError::QueueClosed("dropped"));
                }
                stats.dropped += 1;
            }
        }
    }

    trace!(
        worker_id,
        labeled = stats.labeled,
        failed = stats.failed,
        dropped = stats.dropped,
        "Label worker finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, Boundaries, County, Tract};
    use crate::pipeline::layout::CoordColumns;

    fn square() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0]]
    }

    fn geocoder() -> Geocoder {
        Geocoder::new(Boundaries {
            counties: vec![County::new("C", square())],
            tracts: vec![Tract::new("C", "T", square())],
            blocks: vec![Block::new("C", "T", "B", square())],
        })
    }

    fn layout() -> FieldLayout {
        FieldLayout::new(
            CoordColumns { x: 1, y: 2 },
            CoordColumns { x: 3, y: 4 },
            vec![0, 1, 2, 3, 4],
        )
    }

    #[test]
    fn test_route_labeled() {
        let (geocoder, layout) = (geocoder(), layout());
        let labeler = RowLabeler::new(&geocoder, &layout);

        match route(StringRecord::from(vec!["id", "1", "1", "2", "2"]), &labeler) {
            Routed::Labeled(r) => assert_eq!(r.len(), 11),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_required_is_dropped_without_labeling() {
        let (geocoder, layout) = (geocoder(), layout());
        let labeler = RowLabeler::new(&geocoder, &layout);

        // Unparseable coordinates too, but the empty id wins
        let record = StringRecord::from(vec!["", "x", "y", "2", "2"]);
        assert_eq!(route(record.clone(), &labeler), Routed::Dropped(record));
    }

    #[test]
    fn test_failed_gets_error_field() {
        let (geocoder, layout) = (geocoder(), layout());
        let labeler = RowLabeler::new(&geocoder, &layout);

        match route(StringRecord::from(vec!["id", "1", "nope", "2", "2"]), &labeler) {
            Routed::Failed(r) => {
                assert_eq!(r.len(), 6);
                assert_eq!(&r[5], "unable to parse start-y from 'nope'");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_worker_drains_queue_and_exits() {
        let counters = Arc::new(PipelineCounters::default());
        let (input_tx, input_rx) = mpsc::channel(16);
        let (saved_tx, mut saved_rx) = mpsc::channel(16);
        let (failed_tx, mut failed_rx) = mpsc::channel(16);
        let (dropped_tx, mut dropped_rx) = mpsc::channel(16);

        for row in [
            vec!["a", "1", "1", "2", "2"],
            vec!["b", "1", "1", "20", "2"],
            vec!["", "1", "1", "2", "2"],
        ] {
            counters.enqueued(Queue::Input);
            input_tx.send(StringRecord::from(row)).await.unwrap();
        }
        drop(input_tx);

        let sinks = WorkerSinks {
            saved: saved_tx,
            failed: failed_tx,
            dropped: dropped_tx,
        };
        let stats = label_worker(
            0,
            Arc::new(Mutex::new(input_rx)),
            Arc::new(geocoder()),
            Arc::new(layout()),
            sinks,
            Arc::clone(&counters),
        )
        .await
        .unwrap();

        assert_eq!((stats.labeled, stats.failed, stats.dropped), (1, 1, 1));
        assert_eq!(&saved_rx.recv().await.unwrap()[0], "a");
        assert_eq!(&failed_rx.recv().await.unwrap()[5], "unable to find end county");
        assert_eq!(&dropped_rx.recv().await.unwrap()[1], "1");

        // Worker dropped its senders on exit
        assert!(saved_rx.recv().await.is_none());
        assert!(failed_rx.recv().await.is_none());
        assert!(dropped_rx.recv().await.is_none());

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.input_queue, 0);
        assert_eq!(snapshot.output_queue, 1);
    }
}
