//! Reader stage - streams input rows into the bounded input queue.

use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, Reader, ReaderBuilder, StringRecord};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::counters::{PipelineCounters, Queue};
use super::PipelineError;
use crate::source::open_source;

pub type InputReader = Reader<Box<dyn Read + Send>>;

/// Open the input file and read its header row
pub fn open_input(path: &Path) -> Result<(InputReader, StringRecord), PipelineError> {
    info!("Using input file: {}", path.display());
    let source = open_source(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    input_from(source)
}

/// Wrap a byte stream as CSV input and read its header row
pub fn input_from<R: Read>(source: R) -> Result<(Reader<R>, StringRecord), PipelineError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(source);
    let header = decode_lossy(reader.byte_headers()?.clone());
    if header.is_empty() {
        return Err(PipelineError::MissingHeader);
    }
    Ok((reader, header))
}

/// Send every data row into the input queue.
///
/// Blocks while the queue is full. Empty lines never produce a record and
/// are not counted. Invalid UTF-8 is replaced rather than rejected. Dropping
/// `tx` on return closes the queue.
pub fn read_rows<R: Read>(
    reader: Reader<R>,
    tx: mpsc::Sender<StringRecord>,
    counters: &PipelineCounters,
) -> Result<u64, PipelineError> {
    let mut read = 0u64;

    for result in reader.into_byte_records() {
        let record = result.map_err(|e| {
            debug!(rows = read, "Input read failed");
            e
        })?;
        let record = decode_lossy(record);

        counters.record_started();
        counters.enqueued(Queue::Input);
        if tx.blocking_send(record).is_err() {
            counters.dequeued(Queue::Input);
            return Err(PipelineError::QueueClosed("input"));
        }
        read += 1;
    }

    info!("Finished reading {} rows", read);
    Ok(read)
}

/// Decode a raw record, substituting U+FFFD for invalid UTF-8 sequences
fn decode_lossy(record: ByteRecord) -> StringRecord {
    match StringRecord::from_byte_record(record) {
        Ok(record) => record,
        Err(e) => {
            trace!(position = ?e.utf8_error().field(), "Replacing invalid UTF-8");
            e.into_byte_record()
                .iter()
                .map(String::from_utf8_lossy)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_not_counted_and_blank_lines_skipped() {
        let input = "id,x,y\n1,2,3\n\n4,5,6\n\n";
        let (reader, header) = input_from(input.as_bytes()).unwrap();
        assert_eq!(header, StringRecord::from(vec!["id", "x", "y"]));

        let counters = PipelineCounters::default();
        let (tx, mut rx) = mpsc::channel(8);
        let read = read_rows(reader, tx, &counters).unwrap();
        assert_eq!(read, 2);
        assert_eq!(counters.snapshot().started, 2);
        assert_eq!(counters.snapshot().input_queue, 2);

        assert_eq!(&rx.blocking_recv().unwrap()[0], "1");
        assert_eq!(&rx.blocking_recv().unwrap()[0], "4");
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            input_from("".as_bytes()),
            Err(PipelineError::MissingHeader)
        ));
    }

    #[test]
    fn test_ragged_row_is_fatal() {
        let (reader, _) = input_from("a,b\n1,2\n3\n".as_bytes()).unwrap();
        let (tx, _rx) = mpsc::channel(8);
        let counters = PipelineCounters::default();
        assert!(matches!(
            read_rows(reader, tx, &counters),
            Err(PipelineError::Csv(_))
        ));
        assert_eq!(counters.snapshot().started, 1);
    }

    #[test]
    fn test_closed_queue() {
        let (reader, _) = input_from("a\n1\n".as_bytes()).unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(matches!(
            read_rows(reader, tx, &PipelineCounters::default()),
            Err(PipelineError::QueueClosed("input"))
        ));
    }

    #[test]
    fn test_invalid_utf8_replaced_not_fatal() {
        let input: &[u8] = b"id,name\n1,ok\n2,caf\xe9\n3,fin\n";
        let (reader, _) = input_from(input).unwrap();

        let counters = PipelineCounters::default();
        let (tx, mut rx) = mpsc::channel(8);
        assert_eq!(read_rows(reader, tx, &counters).unwrap(), 3);

        assert_eq!(&rx.blocking_recv().unwrap()[1], "ok");
        let decoded = rx.blocking_recv().unwrap();
        assert_eq!(&decoded[0], "2");
        assert_eq!(&decoded[1], "caf\u{FFFD}");
        assert_eq!(&rx.blocking_recv().unwrap()[1], "fin");
    }

    #[test]
    fn test_invalid_utf8_header() {
        let input: &[u8] = b"id,\xffx\n1,2\n";
        let (_, header) = input_from(input).unwrap();
        assert_eq!(header, StringRecord::from(vec!["id", "\u{FFFD}x"]));
    }
}
