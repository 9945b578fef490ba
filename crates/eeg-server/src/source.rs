//! Sample sources: serial device lines and the simulated line stream

use eeg_core::{BandPowers, EegError, IngestMode, Sample};
use std::io;
use std::num::IntErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tokio_stream::wrappers::{ReceiverStream, SplitStream};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::stats::PipelineStats;

/// One accepted device line
#[derive(Debug, Clone, PartialEq)]
pub enum SourceItem {
    Sample(Sample),
    Bands(BandPowers),
}

/// Why a device line was discarded
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineError {
    #[error("empty line")]
    Empty,
    #[error("not an integer sample: {0:?}")]
    NotAnInteger(String),
    #[error("integer sample out of range: {0:?}")]
    OutOfRange(String),
    #[error("invalid band line: {0}")]
    InvalidJson(String),
    #[error("invalid band values: {0}")]
    InvalidBands(#[from] EegError),
}

/// Source failures that end the stream
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },
    #[error("Read error: {0}")]
    Io(#[from] io::Error),
}

/// Turns raw device lines into [`SourceItem`]s for one ingest mode
#[derive(Debug, Clone, Copy)]
pub struct LineParser {
    mode: IngestMode,
}

impl LineParser {
    pub fn new(mode: IngestMode) -> Self {
        Self { mode }
    }

    /// Parse one line with surrounding whitespace and line terminators removed.
    ///
    /// Sample lines must be a whole base-10 integer. Band lines must be a JSON
    /// object with all five band fields as finite, non-negative numbers.
    pub fn parse(&self, line: &str) -> Result<SourceItem, LineError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(LineError::Empty);
        }

        match self.mode {
            IngestMode::Samples => line.parse::<Sample>().map(SourceItem::Sample).map_err(|e| {
                match e.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                        LineError::OutOfRange(line.to_string())
                    }
                    _ => LineError::NotAnInteger(line.to_string()),
                }
            }),
            IngestMode::Bands => {
                let powers: BandPowers = serde_json::from_str(line)
                    .map_err(|e| LineError::InvalidJson(e.to_string()))?;
                powers.validate()?;
                Ok(SourceItem::Bands(powers))
            }
        }
    }
}

/// Parse lines from `lines` and forward accepted items to `sender`.
///
/// Malformed lines are counted and skipped. Returns when the stream ends or
/// the receiving pipeline has gone away.
pub async fn pump_lines<S>(
    mut lines: S,
    parser: LineParser,
    sender: mpsc::Sender<SourceItem>,
    stats: Arc<PipelineStats>,
) -> Result<(), SourceError>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    while let Some(line) = lines.next().await {
        let line = line?;

        match parser.parse(&line) {
            Ok(item) => {
                stats.record_line_accepted();
                if sender.send(item).await.is_err() {
                    debug!("Pipeline closed, stopping source");
                    return Ok(());
                }
            }
            Err(LineError::Empty) => {}
            Err(e) => {
                stats.record_line_rejected();
                debug!("Discarding device line: {}", e);
            }
        }
    }

    warn!("Sample source reached end of stream");
    Ok(())
}

/// Newline-delimited lines from any byte reader, decoded lossily
pub fn byte_lines<R>(reader: R) -> impl Stream<Item = io::Result<String>> + Unpin + Send
where
    R: AsyncRead + Unpin + Send,
{
    SplitStream::new(BufReader::new(reader).split(b'\n'))
        .map(|segment| segment.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

/// Open a serial device and stream its lines
pub fn serial_lines(
    port: &str,
    baud_rate: u32,
) -> Result<impl Stream<Item = io::Result<String>> + Unpin + Send, SourceError> {
    let stream = tokio_serial::new(port, baud_rate)
        .open_native_async()
        .map_err(|source| SourceError::Open {
            port: port.to_string(),
            source,
        })?;

    info!("Serial port {} opened at {} baud", port, baud_rate);
    Ok(byte_lines(stream))
}

/// Adapt the simulator's line channel to the same stream shape as a device
pub fn channel_lines(
    receiver: mpsc::Receiver<String>,
) -> impl Stream<Item = io::Result<String>> + Unpin + Send {
    ReceiverStream::new(receiver).map(Ok)
}
