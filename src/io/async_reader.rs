//! Asynchronous CSV reader with batch interface
//!
//! Provides batch reading over transfer requests from a CSV file for the
//! async strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of SequencedRequests
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::core::r#async::SequencedRequest;
use crate::io::csv_format::{convert_csv_record, CsvRecord};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Numbers every request in file order so results can be reported in input
/// order after concurrent processing.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    next_seq: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            next_seq: 0,
        }
    }

    /// Rows consumed so far, valid or not
    pub fn rows_read(&self) -> usize {
        self.next_seq
    }

    /// Read up to `batch_size` requests
    ///
    /// Invalid rows are logged and skipped; they still consume a sequence
    /// number. Returns an empty vector at end of file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<SequencedRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(record) = records.next().await else {
                break;
            };
            let seq = self.next_seq;
            self.next_seq += 1;

            let converted = record
                .map_err(|e| format!("CSV parse error: {}", e))
                .and_then(convert_csv_record);

            match converted {
                Ok(request) => batch.push(SequencedRequest { seq, request }),
                Err(e) => warn!(line = seq + 2, error = %e, "Skipping invalid request"),
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    const HEADER: &str = "sender,receiver,account_number,amount,remarks,timestamp\n";

    fn reader(rows: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        AsyncReader::new(Cursor::new(format!("{}{}", HEADER, rows).into_bytes()))
    }

    #[tokio::test]
    async fn test_async_reader_multiple_batches() {
        let mut reader = reader(
            "1,2,1002,10,a,1\n\
             1,2,1002,20,b,2\n\
             2,1,1001,30,c,3\n",
        );

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].seq, 0);
        assert_eq!(batch[1].request.amount, 20);

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].seq, 2);
        assert_eq!(batch[0].request.sender_id, 2);

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows_keeping_sequence() {
        let mut reader = reader("1,2,1002,abc,bad,1\n1,2,1002,5,ok,2\n");

        let batch = reader.read_batch(10).await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].seq, 1);
        assert_eq!(batch[0].request.remarks, "ok");
        assert_eq!(reader.rows_read(), 2);
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut reader = reader("");
        assert!(reader.read_batch(10).await.is_empty());
    }
}
