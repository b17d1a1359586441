//! Two-stage pipeline: raw bytes -> frames -> records.

use crate::codec::{DecodeError, Decoder};
use crate::config::Config;
use crate::frame::{FrameObserver, FrameStream, FramingConfig, LogObserver};
use crate::value::DecodedRecord;
use std::sync::Arc;

/// Counters since the pipeline was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub bytes_in: u64,
    pub frames: u64,
    pub records: u64,
    pub rejected: u64,
}

/// Frames one stream and decodes each payload. The decoder may be shared by several pipelines.
#[derive(Debug)]
pub struct Pipeline<O = LogObserver> {
    stream: FrameStream<O>,
    decoder: Arc<Decoder>,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(framing: FramingConfig, decoder: Arc<Decoder>) -> Self {
        Pipeline::with_observer(framing, decoder, LogObserver)
    }

    pub fn from_config(config: &Config) -> Self {
        Pipeline::new(config.framing.clone(), Arc::new(config.decoder()))
    }
}

impl<O: FrameObserver> Pipeline<O> {
    pub fn with_observer(framing: FramingConfig, decoder: Arc<Decoder>, observer: O) -> Self {
        Pipeline {
            stream: FrameStream::with_observer(framing, observer),
            decoder,
            stats: PipelineStats::default(),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.stats.bytes_in += data.len() as u64;
        self.stream.push(data);
    }

    /// Decode the next available frame. `None` means more input is needed.
    /// A decode error rejects that frame only; the next call moves on.
    pub fn next_record(&mut self) -> Option<Result<DecodedRecord, DecodeError>> {
        let payload = self.stream.next_frame()?;
        self.stats.frames += 1;
        let result = self.decoder.decode(&payload);
        match &result {
            Ok(_) => self.stats.records += 1,
            Err(e) => {
                self.stats.rejected += 1;
                log::debug!("frame rejected: {}", e);
            }
        }
        Some(result)
    }

    /// Push `data` and decode everything that became available.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<DecodedRecord, DecodeError>> {
        self.push(data);
        std::iter::from_fn(|| self.next_record()).collect()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn stream(&self) -> &FrameStream<O> {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut FrameStream<O> {
        &mut self.stream
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }
}
