//! Shared run counters and queue gauges.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Terminal outcome of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Saved,
    Failed,
    Dropped,
}

/// Queues whose depth is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    Input,
    Output,
}

/// Counters updated concurrently by the reader, workers and writers.
///
/// Gauges are raised before a send and lowered after the matching receive,
/// so they never go below zero.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    started: AtomicU64,
    saved: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    input_queued: AtomicU64,
    output_queued: AtomicU64,
}

impl PipelineCounters {
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Saved => &self.saved,
            Outcome::Failed => &self.failed,
            Outcome::Dropped => &self.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn enqueued(&self, queue: Queue) {
        self.gauge(queue).fetch_add(1, Ordering::Relaxed);
    }

    pub fn dequeued(&self, queue: Queue) {
        self.gauge(queue).fetch_sub(1, Ordering::Relaxed);
    }

    fn gauge(&self, queue: Queue) -> &AtomicU64 {
        match queue {
            Queue::Input => &self.input_queued,
            Queue::Output => &self.output_queued,
        }
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            started: self.started.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            input_queue: self.input_queued.load(Ordering::Relaxed),
            output_queue: self.output_queued.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub started: u64,
    pub saved: u64,
    pub failed: u64,
    pub dropped: u64,
    pub input_queue: u64,
    pub output_queue: u64,
}

impl PipelineSnapshot {
    /// Records that reached a sink
    pub fn finished(&self) -> u64 {
        self.saved + self.failed + self.dropped
    }

    pub fn in_flight(&self) -> u64 {
        self.started.saturating_sub(self.finished())
    }

    /// Counter growth since `earlier`; queue depths are taken from `self`
    pub fn since(&self, earlier: &PipelineSnapshot) -> PipelineSnapshot {
        PipelineSnapshot {
            started: self.started.saturating_sub(earlier.started),
            saved: self.saved.saturating_sub(earlier.saved),
            failed: self.failed.saturating_sub(earlier.failed),
            dropped: self.dropped.saturating_sub(earlier.dropped),
            input_queue: self.input_queue,
            output_queue: self.output_queue,
        }
    }
}

/// Read-only handle for progress reporters
#[derive(Debug, Clone)]
pub struct PipelineMonitor {
    counters: Arc<PipelineCounters>,
}

impl PipelineMonitor {
    pub(crate) fn new(counters: Arc<PipelineCounters>) -> Self {
        Self { counters }
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.counters.snapshot()
    }
}
