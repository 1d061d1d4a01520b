//! Writer stages - one dedicated writer per sink.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{StringRecord, Writer, WriterBuilder};
use tokio::sync::mpsc;
use tracing::debug;

use super::counters::{Outcome, PipelineCounters, Queue};
use super::layout::FieldLayout;
use super::PipelineError;

/// Create (or truncate) an output file.
///
/// Failed and dropped rows vary in width from the header, so those sinks are
/// opened flexible.
pub fn open_sink(path: &Path, flexible: bool) -> Result<Writer<File>, PipelineError> {
    let file = File::create(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(WriterBuilder::new().flexible(flexible).from_writer(file))
}

/// Saved-output writer.
///
/// Writes the retained header names followed by the feature names, then for
/// each labeled record its retained values followed by the appended values,
/// which start at `appended_at`.
pub fn write_saved<W: Write>(
    writer: &mut Writer<W>,
    header: &StringRecord,
    layout: &FieldLayout,
    appended_at: usize,
    mut rx: mpsc::Receiver<StringRecord>,
    counters: &PipelineCounters,
) -> Result<u64, PipelineError> {
    let names = layout
        .retained
        .iter()
        .map(|&i| header.get(i).unwrap_or(""))
        .chain(layout.features.iter().map(String::as_str));
    writer.write_record(names)?;

    let mut written = 0u64;
    while let Some(record) = rx.blocking_recv() {
        counters.dequeued(Queue::Output);

        let retained = layout.retained.iter().map(|&i| record.get(i).unwrap_or(""));
        let appended =
            (0..layout.features.len()).map(|i| record.get(appended_at + i).unwrap_or(""));
        writer.write_record(retained.chain(appended))?;

        counters.record(Outcome::Saved);
        written += 1;
    }

    writer.flush().map_err(csv::Error::from)?;
    debug!(written, "Saved writer finished");
    Ok(written)
}

/// Failed/dropped writer: every field of every record, as received
pub fn write_records<W: Write>(
    writer: &mut Writer<W>,
    mut rx: mpsc::Receiver<StringRecord>,
    outcome: Outcome,
    counters: &PipelineCounters,
) -> Result<u64, PipelineError> {
    let mut written = 0u64;
    while let Some(record) = rx.blocking_recv() {
        writer.write_record(&record)?;
        counters.record(outcome);
        written += 1;
    }

    writer.flush().map_err(csv::Error::from)?;
    debug!(written, ?outcome, "Record writer finished");
    Ok(written)
}
