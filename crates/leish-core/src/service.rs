//! The analysis service collaborator and a JSON-lines implementation.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::envelope::AnalysisEnvelope;
use crate::error::TransportError;

/// Ordered stream of envelopes. An `Err` item means the stream itself broke.
pub type EnvelopeStream = BoxStream<'static, Result<AnalysisEnvelope, TransportError>>;

/// Producer of analysis results.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Open the result stream.
    async fn results(&self) -> Result<EnvelopeStream, TransportError>;
}

/// Envelopes read one JSON object per line from any buffered reader (a file,
/// stdin, a socket). Blank lines are ignored.
pub struct JsonLinesSource<R> {
    reader: Mutex<Option<R>>,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Stream the reader's lines as envelopes.
    ///
    /// A line that is not UTF-8 is an undecodable envelope like any other
    /// malformed line. Only a failing read ends the stream with an error.
    pub fn envelopes(reader: R) -> EnvelopeStream {
        stream::unfold(reader, |mut reader| async move {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => return None,
                    Ok(_) => {}
                    Err(e) => return Some((Err(TransportError::Io(e)), reader)),
                }

                let envelope = match std::str::from_utf8(&buf) {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => AnalysisEnvelope::parse(line),
                    Err(e) => AnalysisEnvelope::Undecodable {
                        reason: format!("line is not valid UTF-8: {e}"),
                    },
                };
                return Some((Ok(envelope), reader));
            }
        })
        .boxed()
    }
}

#[async_trait]
impl<R> AnalysisService for JsonLinesSource<R>
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    /// The reader can be drained once; later calls report the source as
    /// unavailable.
    async fn results(&self) -> Result<EnvelopeStream, TransportError> {
        let reader = self
            .reader
            .lock()
            .map_err(|e| TransportError::Unavailable(format!("source poisoned: {e}")))?
            .take()
            .ok_or_else(|| TransportError::Unavailable("source already drained".to_string()))?;
        debug!("opened JSON-lines result stream");
        Ok(Self::envelopes(reader))
    }
}
