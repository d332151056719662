//! Asynchronous CSV reader with batch interface
//!
//! Provides batched streaming over marketplace events from an async
//! source. Supports the async replay strategy, which reads batches ahead
//! while the engine applies earlier ones.
//!
//! # Architecture
//!
//! ```text
//! CSV source → AsyncReader → batches of MarketEvents
//!                  ↓
//!           csv_format module
//!           (EventRow, convert_event_row)
//! ```

use crate::io::csv_format::{convert_event_row, EventRow};
use crate::types::MarketEvent;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV event reader
///
/// Maintains streaming behavior with constant memory usage per batch.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async source
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of events
    ///
    /// Reads up to `batch_size` rows, converting them to MarketEvents.
    /// Invalid rows are logged and skipped; replay continues.
    ///
    /// # Returns
    ///
    /// The next batch, or an empty vector at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<MarketEvent> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.csv_reader.deserialize::<EventRow>();

        while batch.len() < batch_size {
            match rows.next().await {
                Some(Ok(row)) => match convert_event_row(row) {
                    Ok(event) => batch.push(event),
                    Err(e) => tracing::warn!("Event conversion error: {}", e),
                },
                Some(Err(e)) => tracing::warn!("CSV parse error: {}", e),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventOp;
    use futures::io::Cursor;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let csv_content = "op,actor,target,amount,rate,detail\n\
                           register,1,,,,individual\n\
                           deposit,1,,500.00,,PSK1\n\
                           register,2,,,,venture\n";
        let reader = Cursor::new(csv_content.as_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].op, EventOp::Register);
        assert_eq!(batch[1].amount, Some(Decimal::new(50000, 2)));

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].actor, 2);

        let batch = async_reader.read_batch(2).await;
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let csv_content = "op,actor,target,amount,rate,detail\n\
                           register,1,,,,individual\n\
                           deposit,1,,bogus,,\n\
                           register,2,,,,company\n";
        let reader = Cursor::new(csv_content.as_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(10).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].actor, 1);
        assert_eq!(batch[1].actor, 2);
    }

    #[tokio::test]
    async fn test_async_reader_empty_input() {
        let reader = Cursor::new(b"op,actor,target,amount,rate,detail\n".to_vec());
        let mut async_reader = AsyncReader::new(reader);
        assert!(async_reader.read_batch(10).await.is_empty());
    }
}
